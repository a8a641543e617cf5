//! The parsed representation of a patch: [`FilePatch`], [`Hunk`] and the
//! small enums that tag them.

use crate::line::Line;

/// Sentinel old/new path used by diff dialects to mean "no file".
pub const DEV_NULL: &str = "/dev/null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkLineKind {
    Context,
    Delete,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: HunkLineKind,
    pub line: Line,
}

impl HunkLine {
    pub fn new(kind: HunkLineKind, line: Line) -> Self {
        HunkLine { kind, line }
    }
}

/// One `@@ ... @@` (or `***`/`---`) block: the lines it touches plus the
/// header's 1-based line numbers and counts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// The sequence a hunk must match against in the target: context and
    /// delete lines, in order. This is the hunk's pre-image.
    pub fn match_block(&self) -> Vec<&HunkLine> {
        self.lines
            .iter()
            .filter(|l| l.kind != HunkLineKind::Insert)
            .collect()
    }

    /// The sequence a hunk produces once applied: context and insert lines,
    /// in order. This is the hunk's post-image.
    pub fn replacement_block(&self) -> Vec<&HunkLine> {
        self.lines
            .iter()
            .filter(|l| l.kind != HunkLineKind::Delete)
            .collect()
    }

    /// The hunk with delete/insert swapped and old/new header fields
    /// exchanged — what applying this hunk in `--reverse` means.
    pub fn inverted(&self) -> Hunk {
        let lines = self
            .lines
            .iter()
            .map(|hl| {
                let kind = match hl.kind {
                    HunkLineKind::Context => HunkLineKind::Context,
                    HunkLineKind::Delete => HunkLineKind::Insert,
                    HunkLineKind::Insert => HunkLineKind::Delete,
                };
                HunkLine::new(kind, hl.line.clone())
            })
            .collect();
        Hunk {
            old_start: self.new_start,
            old_count: self.new_count,
            new_start: self.old_start,
            new_count: self.old_count,
            lines,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.kind != HunkLineKind::Context)
    }
}

/// What kind of change a [`FilePatch`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Modify,
    Create,
    Delete,
    Rename,
    Copy,
    ModeChangeOnly,
    BinaryUnsupported,
}

/// Which dialect a [`FilePatch`] was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Unified,
    Context,
    Git,
}

/// One file's worth of changes, as produced by the parser and consumed once
/// by the applier.
#[derive(Debug, Clone)]
pub struct FilePatch {
    pub old_path: String,
    pub new_path: String,
    pub operation: Operation,
    pub old_mode: Option<u32>,
    pub new_mode: Option<u32>,
    pub index_old: Option<String>,
    pub index_new: Option<String>,
    pub format: Format,
    pub hunks: Vec<Hunk>,
    /// The raw `---`/`***` header line content (path plus any timestamp field), verbatim as it
    /// appeared in the patch. A `.rej` file does not reproduce this path portion as-is (it may
    /// still carry a git-style `a/`/`b/` prefix the target resolution already stripped) — only
    /// the timestamp field, pulled back out via `header_timestamp_suffix`, survives verbatim.
    pub header_old: String,
    /// The raw `+++`/`---` (new side) header line content, verbatim.
    pub header_new: String,
}

impl FilePatch {
    pub fn old_is_dev_null(&self) -> bool {
        self.old_path == DEV_NULL
    }

    pub fn new_is_dev_null(&self) -> bool {
        self.new_path == DEV_NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::Terminator;

    fn line(s: &str) -> Line {
        Line::new(s.as_bytes(), Terminator::Lf)
    }

    #[test]
    fn match_and_replacement_blocks() {
        let hunk = Hunk {
            old_start: 1,
            old_count: 2,
            new_start: 1,
            new_count: 2,
            lines: vec![
                HunkLine::new(HunkLineKind::Context, line("a")),
                HunkLine::new(HunkLineKind::Delete, line("b")),
                HunkLine::new(HunkLineKind::Insert, line("c")),
            ],
        };
        assert_eq!(hunk.match_block().len(), 2);
        assert_eq!(hunk.replacement_block().len(), 2);
        assert!(hunk.has_changes());
    }

    #[test]
    fn inverted_swaps_delete_and_insert() {
        let hunk = Hunk {
            old_start: 3,
            old_count: 1,
            new_start: 5,
            new_count: 1,
            lines: vec![HunkLine::new(HunkLineKind::Delete, line("gone"))],
        };
        let inv = hunk.inverted();
        assert_eq!(inv.old_start, 5);
        assert_eq!(inv.new_start, 3);
        assert_eq!(inv.lines[0].kind, HunkLineKind::Insert);
    }

    #[test]
    fn dev_null_sentinel() {
        let fp = FilePatch {
            old_path: DEV_NULL.to_string(),
            new_path: "x".to_string(),
            operation: Operation::Create,
            old_mode: None,
            new_mode: None,
            index_old: None,
            index_new: None,
            format: Format::Unified,
            hunks: vec![],
            header_old: DEV_NULL.to_string(),
            header_new: "x".to_string(),
        };
        assert!(fp.old_is_dev_null());
        assert!(!fp.new_is_dev_null());
    }
}
