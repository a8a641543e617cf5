//! Rendering rejected hunks to a `.rej` file, in either unified or context format.
//!
//! Rejects head the hunk body with the `---`/`+++` pair (or `***`/`---` for context) built from
//! the resolved (stripped) target path plus the original header's timestamp field, so the reject
//! file looks like a patch the user could feed straight back into `patch` by hand.

use crate::models::{Hunk, HunkLineKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "lower")]
pub enum RejectFormat {
    Unified,
    Context,
}

/// Render `rejected` hunks against `old_path`/`new_path` in `format`.
pub fn render(old_path: &str, new_path: &str, rejected: &[&Hunk], format: RejectFormat) -> Vec<u8> {
    match format {
        RejectFormat::Unified => render_unified(old_path, new_path, rejected),
        RejectFormat::Context => render_context(old_path, new_path, rejected),
    }
}

fn render_unified(old_path: &str, new_path: &str, rejected: &[&Hunk]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!("--- {}\n", old_path));
    out.push_str(&format!("+++ {}\n", new_path));
    for hunk in rejected {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        ));
        for hl in &hunk.lines {
            let marker = match hl.kind {
                HunkLineKind::Context => ' ',
                HunkLineKind::Delete => '-',
                HunkLineKind::Insert => '+',
            };
            out.push(marker);
            out.push_str(&hl.line.text());
            out.push('\n');
        }
    }
    out.into_bytes()
}

/// Group a hunk's lines into the old- and new-half line sequences a context diff prints, pairing
/// an adjacent delete-run with the insert-run that immediately follows it as `!`-marked "changed"
/// lines (the same grouping GNU context diff uses), rather than showing them as independent `-`/`+`
/// runs.
fn context_groups(lines: &[crate::models::HunkLine]) -> (Vec<(&'static str, &crate::models::HunkLine)>, Vec<(&'static str, &crate::models::HunkLine)>) {
    let mut old = Vec::new();
    let mut new = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        match lines[i].kind {
            HunkLineKind::Context => {
                old.push(("  ", &lines[i]));
                new.push(("  ", &lines[i]));
                i += 1;
            }
            HunkLineKind::Delete => {
                let del_start = i;
                let mut j = i;
                while j < lines.len() && lines[j].kind == HunkLineKind::Delete {
                    j += 1;
                }
                let del_count = j - del_start;
                let ins_start = j;
                let mut k = j;
                while k < lines.len() && lines[k].kind == HunkLineKind::Insert {
                    k += 1;
                }
                let ins_count = k - ins_start;
                let paired = del_count.min(ins_count);
                for p in 0..paired {
                    old.push(("! ", &lines[del_start + p]));
                    new.push(("! ", &lines[ins_start + p]));
                }
                for p in paired..del_count {
                    old.push(("- ", &lines[del_start + p]));
                }
                for p in paired..ins_count {
                    new.push(("+ ", &lines[ins_start + p]));
                }
                i = k;
            }
            HunkLineKind::Insert => {
                new.push(("+ ", &lines[i]));
                i += 1;
            }
        }
    }
    (old, new)
}

fn render_context(old_path: &str, new_path: &str, rejected: &[&Hunk]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!("*** {}\n", old_path));
    out.push_str(&format!("--- {}\n", new_path));
    for hunk in rejected {
        out.push_str("***************\n");
        out.push_str(&format!("*** {},{} ****\n", hunk.old_start, hunk.old_start + hunk.old_count.saturating_sub(1)));
        let (old_side, new_side) = context_groups(&hunk.lines);
        if !old_side.is_empty() {
            for (marker, hl) in &old_side {
                out.push_str(marker);
                out.push_str(&hl.line.text());
                out.push('\n');
            }
        }
        out.push_str(&format!("--- {},{} ----\n", hunk.new_start, hunk.new_start + hunk.new_count.saturating_sub(1)));
        if !new_side.is_empty() {
            for (marker, hl) in &new_side {
                out.push_str(marker);
                out.push_str(&hl.line.text());
                out.push('\n');
            }
        }
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{Line, Terminator};
    use crate::models::HunkLine;

    fn line(s: &str) -> Line {
        Line::new(s.as_bytes(), Terminator::Lf)
    }

    fn sample_hunk() -> Hunk {
        Hunk {
            old_start: 1,
            old_count: 3,
            new_start: 1,
            new_count: 3,
            lines: vec![
                HunkLine::new(HunkLineKind::Context, line("abc")),
                HunkLine::new(HunkLineKind::Delete, line("def")),
                HunkLine::new(HunkLineKind::Insert, line("123")),
                HunkLine::new(HunkLineKind::Context, line("ghi")),
            ],
        }
    }

    #[test]
    fn unified_reject_rebuilds_hunk_header() {
        let hunk = sample_hunk();
        let rendered = render("a", "b", &[&hunk], RejectFormat::Unified);
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.starts_with("--- a\n+++ b\n@@ -1,3 +1,3 @@\n"));
        assert!(text.contains("-def\n"));
        assert!(text.contains("+123\n"));
    }

    #[test]
    fn context_reject_uses_star_dash_framing() {
        let hunk = sample_hunk();
        let rendered = render("reject", "reject", &[&hunk], RejectFormat::Context);
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.starts_with("*** reject\n--- reject\n"));
        assert!(text.contains("***************\n"));
        assert!(text.contains("! def\n"));
        assert!(text.contains("! 123\n"));
    }
}
