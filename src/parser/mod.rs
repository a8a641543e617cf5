//! Patch parsing (C2): turns a patch byte stream into a sequence of
//! [`FilePatch`] records, sniffing the unified, context, and git-extended
//! dialects header-by-header.

mod context;
mod path;
mod unified;

pub use path::{decode_path, header_timestamp_suffix, strip_components, strip_git_prefix};

use crate::line::{split_lines, Line};
use crate::models::{FilePatch, Format, Operation, DEV_NULL};

/// Errors that abort parsing of the whole patch stream before any write
/// happens.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unable to determine patch format")]
    UnableToDetermineFormat,
    #[error("ed format patches are not supported by this version of patch")]
    EdFormatUnsupported,
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),
    #[error("invalid git extended header: {0}")]
    InvalidGitHeader(String),
}

/// Parse every `FilePatch` out of `bytes`, in order.
pub fn parse(bytes: &[u8]) -> Result<Vec<FilePatch>, ParseError> {
    let lines = split_lines(bytes);
    let mut idx = 0;
    let mut patches = Vec::new();

    while idx < lines.len() {
        if is_git_header(&lines[idx]) {
            let (patch, next) = parse_git_file_patch(&lines, idx)?;
            patches.push(patch);
            idx = next;
            continue;
        }
        if is_unified_header(&lines, idx) {
            let (patch, next) = parse_unified_file_patch(&lines, idx)?;
            patches.push(patch);
            idx = next;
            continue;
        }
        if is_context_header(&lines, idx) {
            let (patch, next) = parse_context_file_patch(&lines, idx)?;
            patches.push(patch);
            idx = next;
            continue;
        }
        if is_ed_hunk_header(&lines[idx].text()) {
            return Err(ParseError::EdFormatUnsupported);
        }
        idx += 1;
    }

    if patches.is_empty() {
        return Err(ParseError::UnableToDetermineFormat);
    }
    Ok(patches)
}

fn is_unified_header(lines: &[Line], idx: usize) -> bool {
    lines[idx].text().starts_with("--- ")
        && lines
            .get(idx + 1)
            .map(|l| l.text().starts_with("+++ "))
            .unwrap_or(false)
}

fn is_context_header(lines: &[Line], idx: usize) -> bool {
    lines[idx].text().starts_with("*** ")
        && lines
            .get(idx + 1)
            .map(|l| l.text().starts_with("--- "))
            .unwrap_or(false)
}

fn is_git_header(line: &Line) -> bool {
    line.text().starts_with("diff --git ")
}

/// A tight match for an ed script command line, e.g. `3d`, `1,3c`, `5a`.
/// Deliberately narrow so ordinary preamble text is never misdetected.
fn is_ed_hunk_header(text: &str) -> bool {
    let text = text.trim();
    let Some(cmd) = text.chars().last() else {
        return false;
    };
    if !matches!(cmd, 'a' | 'c' | 'd') {
        return false;
    }
    let digits_part = &text[..text.len() - 1];
    !digits_part.is_empty()
        && digits_part
            .split(',')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn parse_unified_file_patch(lines: &[Line], idx: usize) -> Result<(FilePatch, usize), ParseError> {
    let header_old = path::header_raw(&lines[idx].text());
    let header_new = path::header_raw(&lines[idx + 1].text());
    let old_path = path::header_path(&lines[idx].text());
    let new_path = path::header_path(&lines[idx + 1].text());
    let (hunks, next) = unified::parse_hunks(lines, idx + 2)?;
    let operation = if old_path == DEV_NULL {
        Operation::Create
    } else if new_path == DEV_NULL {
        Operation::Delete
    } else {
        Operation::Modify
    };
    Ok((
        FilePatch {
            old_path,
            new_path,
            operation,
            old_mode: None,
            new_mode: None,
            index_old: None,
            index_new: None,
            format: Format::Unified,
            hunks,
            header_old,
            header_new,
        },
        next,
    ))
}

fn parse_context_file_patch(lines: &[Line], idx: usize) -> Result<(FilePatch, usize), ParseError> {
    let header_old = path::header_raw(&lines[idx].text());
    let header_new = path::header_raw(&lines[idx + 1].text());
    let old_path = path::header_path(&lines[idx].text());
    let new_path = path::header_path(&lines[idx + 1].text());
    let (hunks, next) = context::parse_hunks(lines, idx + 2)?;
    let operation = if old_path == DEV_NULL {
        Operation::Create
    } else if new_path == DEV_NULL {
        Operation::Delete
    } else {
        Operation::Modify
    };
    Ok((
        FilePatch {
            old_path,
            new_path,
            operation,
            old_mode: None,
            new_mode: None,
            index_old: None,
            index_new: None,
            format: Format::Context,
            hunks,
            header_old,
            header_new,
        },
        next,
    ))
}

fn parse_octal_mode(text: &str) -> Option<u32> {
    u32::from_str_radix(text.trim(), 8).ok()
}

fn parse_git_diff_line(text: &str) -> Option<(String, String)> {
    let rest = text.strip_prefix("diff --git ")?;
    let split_at = rest.rfind(" b/")?;
    let old = &rest[..split_at];
    let new = &rest[split_at + 1..];
    Some((
        path::decode_path(old.strip_prefix("a/").unwrap_or(old)),
        path::decode_path(new.strip_prefix("b/").unwrap_or(new)),
    ))
}

#[derive(Default)]
struct GitMetadata {
    old_mode: Option<u32>,
    new_mode: Option<u32>,
    index_old: Option<String>,
    index_new: Option<String>,
    is_new_file: bool,
    is_deleted_file: bool,
    rename_from: Option<String>,
    rename_to: Option<String>,
    copy_from: Option<String>,
    copy_to: Option<String>,
    similarity_100: bool,
    is_binary: bool,
}

fn parse_git_file_patch(lines: &[Line], idx: usize) -> Result<(FilePatch, usize), ParseError> {
    let header_text = lines[idx].text().into_owned();
    let (diff_old, diff_new) =
        parse_git_diff_line(&header_text).ok_or_else(|| ParseError::InvalidGitHeader(header_text.clone()))?;

    let mut idx = idx + 1;
    let mut meta = GitMetadata::default();

    loop {
        if idx >= lines.len() {
            break;
        }
        let text = lines[idx].text();
        if let Some(rest) = text.strip_prefix("old mode ") {
            meta.old_mode = parse_octal_mode(rest);
        } else if let Some(rest) = text.strip_prefix("new mode ") {
            meta.new_mode = parse_octal_mode(rest);
        } else if let Some(rest) = text.strip_prefix("deleted file mode ") {
            meta.is_deleted_file = true;
            meta.old_mode = parse_octal_mode(rest);
        } else if let Some(rest) = text.strip_prefix("new file mode ") {
            meta.is_new_file = true;
            meta.new_mode = parse_octal_mode(rest);
        } else if let Some(rest) = text.strip_prefix("index ") {
            let spec = rest.split(' ').next().unwrap_or(rest);
            if let Some((old, new)) = spec.split_once("..") {
                meta.index_old = Some(old.to_string());
                meta.index_new = Some(new.to_string());
            }
        } else if let Some(rest) = text.strip_prefix("similarity index ") {
            meta.similarity_100 = rest.trim() == "100%";
        } else if text.starts_with("dissimilarity index ") {
            // no-op: informational only
        } else if let Some(rest) = text.strip_prefix("rename from ") {
            meta.rename_from = Some(path::decode_path(rest));
        } else if let Some(rest) = text.strip_prefix("rename to ") {
            meta.rename_to = Some(path::decode_path(rest));
        } else if let Some(rest) = text.strip_prefix("copy from ") {
            meta.copy_from = Some(path::decode_path(rest));
        } else if let Some(rest) = text.strip_prefix("copy to ") {
            meta.copy_to = Some(path::decode_path(rest));
        } else if text.starts_with("GIT binary patch") {
            meta.is_binary = true;
            idx += 1;
            // Skip the (opaque, unsupported) binary literal block until the
            // next recognisable header or EOF.
            while idx < lines.len()
                && !is_git_header(&lines[idx])
                && !is_unified_header(lines, idx)
                && !is_context_header(lines, idx)
            {
                idx += 1;
            }
            continue;
        } else {
            break;
        }
        idx += 1;
    }

    let (hunks, idx) = if is_unified_header(lines, idx) {
        let old_header = path::strip_git_prefix(&path::header_path(&lines[idx].text())).to_string();
        let new_header = path::strip_git_prefix(&path::header_path(&lines[idx + 1].text())).to_string();
        let old_header_raw = path::header_raw(&lines[idx].text());
        let new_header_raw = path::header_raw(&lines[idx + 1].text());
        let (hunks, next) = unified::parse_hunks(lines, idx + 2)?;
        (hunks, next, Some((old_header, new_header, old_header_raw, new_header_raw)))
    } else {
        (Vec::new(), idx, None)
    }
    .into();

    let (old_path, new_path) = if let Some((h_old, h_new, _, _)) = &hunks.2 {
        (h_old.clone(), h_new.clone())
    } else if let (Some(from), Some(to)) = (&meta.rename_from, &meta.rename_to) {
        (from.clone(), to.clone())
    } else if let (Some(from), Some(to)) = (&meta.copy_from, &meta.copy_to) {
        (from.clone(), to.clone())
    } else {
        (diff_old.clone(), diff_new.clone())
    };

    let (header_old, header_new) = if let Some((_, _, h_old_raw, h_new_raw)) = &hunks.2 {
        (h_old_raw.clone(), h_new_raw.clone())
    } else {
        (old_path.clone(), new_path.clone())
    };

    let operation = if meta.is_binary {
        Operation::BinaryUnsupported
    } else if meta.rename_from.is_some() && meta.rename_to.is_some() {
        Operation::Rename
    } else if meta.copy_from.is_some() && meta.copy_to.is_some() {
        Operation::Copy
    } else if meta.is_new_file {
        Operation::Create
    } else if meta.is_deleted_file {
        Operation::Delete
    } else if hunks.0.is_empty() && (meta.old_mode.is_some() || meta.new_mode.is_some()) {
        Operation::ModeChangeOnly
    } else {
        Operation::Modify
    };
    let _ = meta.similarity_100;

    Ok((
        FilePatch {
            old_path,
            new_path,
            operation,
            old_mode: meta.old_mode,
            new_mode: meta.new_mode,
            index_old: meta.index_old,
            index_new: meta.index_new,
            format: Format::Git,
            hunks: hunks.0,
            header_old,
            header_new,
        },
        hunks.1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_unified_patch() {
        let bytes = b"--- a\t2022\n+++ b\t2022\n@@ -1,1 +1,1 @@\n-x\n+y\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].format, Format::Unified);
        assert_eq!(patches[0].operation, Operation::Modify);
    }

    #[test]
    fn create_via_dev_null_old_path() {
        let bytes = b"--- /dev/null\n+++ new_file\t2022\n@@ -0,0 +1,1 @@\n+hi\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches[0].operation, Operation::Create);
    }

    #[test]
    fn context_patch_detected() {
        let bytes = b"*** a\t2022\n--- b\t2022\n***************\n*** 1,1 ****\n--- 1,2 ----\n  x\n+ y\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches[0].format, Format::Context);
    }

    #[test]
    fn git_pure_rename() {
        let bytes =
            b"diff --git a/orig_file b/another_new\nsimilarity index 100%\nrename from orig_file\nrename to another_new\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches[0].operation, Operation::Rename);
        assert_eq!(patches[0].old_path, "orig_file");
        assert_eq!(patches[0].new_path, "another_new");
        assert!(patches[0].hunks.is_empty());
    }

    #[test]
    fn git_new_file_with_hunk() {
        let bytes = b"diff --git a/f b/f\nnew file mode 100644\nindex 0000000..abcdef\n--- /dev/null\n+++ b/f\n@@ -0,0 +1,1 @@\n+hello\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches[0].operation, Operation::Create);
        assert_eq!(patches[0].new_mode, Some(0o100644));
    }

    #[test]
    fn git_mode_change_only() {
        let bytes = b"diff --git a/f b/f\nold mode 100644\nnew mode 100755\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches[0].operation, Operation::ModeChangeOnly);
        assert!(patches[0].hunks.is_empty());
    }

    #[test]
    fn git_binary_unsupported() {
        let bytes =
            b"diff --git a/a.txt b/a.txt\nindex 1111111..2222222 100644\nGIT binary patch\nliteral 10\nXXXXXXXXXX\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches[0].operation, Operation::BinaryUnsupported);
    }

    #[test]
    fn unparseable_input_is_fatal() {
        assert!(matches!(
            parse(b"not a patch at all\njust some text\n"),
            Err(ParseError::UnableToDetermineFormat)
        ));
    }

    #[test]
    fn ed_format_detected() {
        assert!(matches!(parse(b"3d\n"), Err(ParseError::EdFormatUnsupported)));
    }

    #[test]
    fn multiple_file_patches_in_one_stream() {
        let bytes = b"--- a\n+++ a\n@@ -1 +1 @@\n-x\n+y\n--- b\n+++ b\n@@ -1 +1 @@\n-p\n+q\n";
        let patches = parse(bytes).unwrap();
        assert_eq!(patches.len(), 2);
    }
}
