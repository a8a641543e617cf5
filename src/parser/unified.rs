//! Hunk-body parsing for the unified diff dialect (`@@ -A,B +C,D @@`). Also
//! used for the hunks of git-extended patches, which are plain unified
//! hunks following extended metadata lines.

use crate::line::{Line, Terminator};
use crate::models::{Hunk, HunkLine, HunkLineKind};
use crate::parser::ParseError;

/// Parse zero or more consecutive `@@ ... @@` hunks starting at `idx`.
/// Stops as soon as the line at the current index no longer looks like a
/// hunk header.
pub fn parse_hunks(lines: &[Line], mut idx: usize) -> Result<(Vec<Hunk>, usize), ParseError> {
    let mut hunks = Vec::new();
    while idx < lines.len() && lines[idx].text().starts_with("@@ ") {
        let (hunk, next) = parse_one_hunk(lines, idx)?;
        hunks.push(hunk);
        idx = next;
    }
    Ok((hunks, idx))
}

fn parse_one_hunk(lines: &[Line], idx: usize) -> Result<(Hunk, usize), ParseError> {
    let header_text = lines[idx].text().into_owned();
    let (old_start, old_count, new_start, new_count) = parse_hunk_header(&header_text)?;
    let mut hunk = Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines: Vec::new(),
    };

    let mut idx = idx + 1;
    let mut old_seen = 0usize;
    let mut new_seen = 0usize;
    while idx < lines.len() && (old_seen < old_count || new_seen < new_count) {
        let raw = &lines[idx];
        if raw.content.starts_with(b"\\") {
            if let Some(last) = hunk.lines.last_mut() {
                last.line.terminator = Terminator::None;
            }
            idx += 1;
            continue;
        }
        if raw.content.is_empty() {
            hunk.lines.push(HunkLine::new(
                HunkLineKind::Context,
                Line::new(Vec::new(), raw.terminator),
            ));
            old_seen += 1;
            new_seen += 1;
            idx += 1;
            continue;
        }
        let marker = raw.content[0];
        let content = Line::new(raw.content[1..].to_vec(), raw.terminator);
        match marker {
            b' ' => {
                hunk.lines.push(HunkLine::new(HunkLineKind::Context, content));
                old_seen += 1;
                new_seen += 1;
            }
            b'+' => {
                hunk.lines.push(HunkLine::new(HunkLineKind::Insert, content));
                new_seen += 1;
            }
            b'-' => {
                hunk.lines.push(HunkLine::new(HunkLineKind::Delete, content));
                old_seen += 1;
            }
            _ => break,
        }
        idx += 1;
    }
    Ok((hunk, idx))
}

/// Parse a `@@ -A[,B] +C[,D] @@` header line. A missing count means 1; an
/// explicit `0` is kept literal (an empty side, as for pure file creation).
fn parse_hunk_header(text: &str) -> Result<(usize, usize, usize, usize), ParseError> {
    let rest = text
        .strip_prefix("@@ ")
        .ok_or_else(|| ParseError::InvalidHunkHeader(text.to_string()))?;
    let end = rest
        .find(" @@")
        .ok_or_else(|| ParseError::InvalidHunkHeader(text.to_string()))?;
    let ranges = &rest[..end];
    let mut parts = ranges.split_whitespace();
    let old = parts
        .next()
        .ok_or_else(|| ParseError::InvalidHunkHeader(text.to_string()))?;
    let new = parts
        .next()
        .ok_or_else(|| ParseError::InvalidHunkHeader(text.to_string()))?;
    let (old_start, old_count) = parse_range(old, '-', text)?;
    let (new_start, new_count) = parse_range(new, '+', text)?;
    Ok((old_start, old_count, new_start, new_count))
}

fn parse_range(token: &str, sigil: char, whole_line: &str) -> Result<(usize, usize), ParseError> {
    let token = token
        .strip_prefix(sigil)
        .ok_or_else(|| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
    if let Some((start, count)) = token.split_once(',') {
        let start = start
            .parse()
            .map_err(|_| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
        let count = count
            .parse()
            .map_err(|_| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
        Ok((start, count))
    } else {
        let start = token
            .parse()
            .map_err(|_| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
        Ok((start, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::split_lines;

    #[test]
    fn parse_single_hunk() {
        let bytes = b"@@ -1,3 +1,4 @@\n int main()\n {\n+\treturn 0;\n }\n";
        let lines = split_lines(bytes);
        let (hunks, next) = parse_hunks(&lines, 0).unwrap();
        assert_eq!(next, lines.len());
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!((h.old_start, h.old_count, h.new_start, h.new_count), (1, 3, 1, 4));
        assert_eq!(h.lines.len(), 4);
        assert_eq!(h.lines[2].kind, HunkLineKind::Insert);
    }

    #[test]
    fn omitted_count_defaults_to_one() {
        let bytes = b"@@ -1 +1 @@\n-a\n+b\n";
        let lines = split_lines(bytes);
        let (hunks, _) = parse_hunks(&lines, 0).unwrap();
        assert_eq!((hunks[0].old_count, hunks[0].new_count), (1, 1));
    }

    #[test]
    fn explicit_zero_count_is_literal() {
        let bytes = b"@@ -0,0 +1,2 @@\n+a\n+b\n";
        let lines = split_lines(bytes);
        let (hunks, _) = parse_hunks(&lines, 0).unwrap();
        assert_eq!(hunks[0].old_count, 0);
    }

    #[test]
    fn no_newline_marker_strips_terminator() {
        let bytes = b"@@ -1 +1 @@\n-a\n\\ No newline at end of file\n+b\n\\ No newline at end of file\n";
        let lines = split_lines(bytes);
        let (hunks, _) = parse_hunks(&lines, 0).unwrap();
        assert_eq!(hunks[0].lines[0].line.terminator, Terminator::None);
        assert_eq!(hunks[0].lines[1].line.terminator, Terminator::None);
    }

    #[test]
    fn multiple_hunks_back_to_back() {
        let bytes = b"@@ -1,1 +1,1 @@\n-a\n+b\n@@ -5,1 +5,1 @@\n-c\n+d\n";
        let lines = split_lines(bytes);
        let (hunks, next) = parse_hunks(&lines, 0).unwrap();
        assert_eq!(hunks.len(), 2);
        assert_eq!(next, lines.len());
    }

    #[test]
    fn bad_header_is_an_error() {
        let bytes = b"@@ garbage @@\n";
        let lines = split_lines(bytes);
        assert!(parse_hunks(&lines, 0).is_err());
    }
}
