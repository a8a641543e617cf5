//! Hunk-body parsing for the context diff dialect: `***************`
//! bracketed blocks with an old half (`*** A,B ****`) and a new half
//! (`--- C,D ----`).

use crate::line::Line;
use crate::models::{Hunk, HunkLine, HunkLineKind};
use crate::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HalfKind {
    Context,
    Changed, // '-' in the old half, '+' in the new half, or '!' in either
}

struct HalfLine {
    kind: HalfKind,
    line: Line,
}

/// Parse zero or more consecutive context-format hunks starting at `idx`.
pub fn parse_hunks(lines: &[Line], mut idx: usize) -> Result<(Vec<Hunk>, usize), ParseError> {
    let mut hunks = Vec::new();
    while idx < lines.len() && lines[idx].text() == "***************" {
        let (hunk, next) = parse_one_hunk(lines, idx)?;
        hunks.push(hunk);
        idx = next;
    }
    Ok((hunks, idx))
}

fn parse_range(text: &str, open: &str, close: &str, whole_line: &str) -> Result<(usize, usize), ParseError> {
    let inner = text
        .strip_prefix(open)
        .and_then(|s| s.strip_suffix(close))
        .ok_or_else(|| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
    let inner = inner.trim();
    if let Some((a, b)) = inner.split_once(',') {
        let a = a
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
        let b = b
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
        Ok((a, b))
    } else {
        let a = inner
            .parse()
            .map_err(|_| ParseError::InvalidHunkHeader(whole_line.to_string()))?;
        Ok((a, 1))
    }
}

fn parse_half(lines: &[Line], mut idx: usize, stop_at: &str) -> (Vec<HalfLine>, usize) {
    let mut body = Vec::new();
    while idx < lines.len() {
        let text = lines[idx].text();
        if text.starts_with(stop_at) || text == "***************" {
            break;
        }
        if text.starts_with('\\') {
            // "\ No newline at end of file" — attach to the line just parsed.
            if let Some(last) = body.last_mut() {
                last.line.terminator = crate::line::Terminator::None;
            }
            idx += 1;
            continue;
        }
        if text.len() < 2 {
            idx += 1;
            continue;
        }
        let marker = &text[..2];
        let content = lines[idx].content[2.min(lines[idx].content.len())..].to_vec();
        let content_line = Line::new(content, lines[idx].terminator);
        let kind = match marker {
            "  " => HalfKind::Context,
            "- " | "+ " | "! " => HalfKind::Changed,
            _ => {
                idx += 1;
                continue;
            }
        };
        body.push(HalfLine {
            kind,
            line: content_line,
        });
        idx += 1;
    }
    (body, idx)
}

fn parse_one_hunk(lines: &[Line], idx: usize) -> Result<(Hunk, usize), ParseError> {
    let idx = idx + 1; // consume "***************"
    let old_header = lines
        .get(idx)
        .ok_or_else(|| ParseError::InvalidHunkHeader("<eof>".to_string()))?
        .text()
        .into_owned();
    let (old_start, old_count) = parse_range(&old_header, "*** ", " ****", &old_header)?;
    let (old_half, idx) = parse_half(lines, idx + 1, "--- ");

    let new_header = lines
        .get(idx)
        .ok_or_else(|| ParseError::InvalidHunkHeader("<eof>".to_string()))?
        .text()
        .into_owned();
    let (new_start, new_count) = parse_range(&new_header, "--- ", " ----", &new_header)?;
    let (new_half, idx) = parse_half(lines, idx + 1, "***");

    let merged = merge_halves(old_half, new_half);

    Ok((
        Hunk {
            old_start,
            old_count,
            new_start,
            new_count,
            lines: merged,
        },
        idx,
    ))
}

/// Context diffs elide an empty half when it carries nothing but
/// unmodified context (GNU `diff -c` omits a half that would be pure
/// context, since the other half repeats it). Reconstruct a single
/// context/delete/insert stream from the two halves.
fn merge_halves(old_half: Vec<HalfLine>, new_half: Vec<HalfLine>) -> Vec<HunkLine> {
    if old_half.is_empty() {
        return new_half
            .into_iter()
            .map(|hl| {
                let kind = match hl.kind {
                    HalfKind::Context => HunkLineKind::Context,
                    HalfKind::Changed => HunkLineKind::Insert,
                };
                HunkLine::new(kind, hl.line)
            })
            .collect();
    }
    if new_half.is_empty() {
        return old_half
            .into_iter()
            .map(|hl| {
                let kind = match hl.kind {
                    HalfKind::Context => HunkLineKind::Context,
                    HalfKind::Changed => HunkLineKind::Delete,
                };
                HunkLine::new(kind, hl.line)
            })
            .collect();
    }

    // Walk both halves in lockstep. A context line is shared by both halves at the same
    // position, so it advances both indices together. A `!`-changed block instead runs as a
    // matched pair of runs — every consecutive Changed entry on the old side (the deletes) next
    // to every consecutive Changed entry on the new side (the inserts) — consumed as one unit
    // before either side's index can reach its next context line.
    let mut out = Vec::new();
    let mut oi = 0;
    let mut ni = 0;
    while oi < old_half.len() || ni < new_half.len() {
        let old_is_context = old_half.get(oi).map(|l| l.kind == HalfKind::Context).unwrap_or(false);
        let new_is_context = new_half.get(ni).map(|l| l.kind == HalfKind::Context).unwrap_or(false);

        if old_is_context && new_is_context {
            out.push(HunkLine::new(HunkLineKind::Context, old_half[oi].line.clone()));
            oi += 1;
            ni += 1;
            continue;
        }
        if old_is_context {
            // Old has already reached the next shared context line but new is still mid-run —
            // the change block has more inserts than deletes; drain the rest of new's run first.
            out.push(HunkLine::new(HunkLineKind::Insert, new_half[ni].line.clone()));
            ni += 1;
            continue;
        }
        if !old_is_context && oi < old_half.len() {
            while oi < old_half.len() && old_half[oi].kind == HalfKind::Changed {
                out.push(HunkLine::new(HunkLineKind::Delete, old_half[oi].line.clone()));
                oi += 1;
            }
            while ni < new_half.len() && new_half[ni].kind == HalfKind::Changed {
                out.push(HunkLine::new(HunkLineKind::Insert, new_half[ni].line.clone()));
                ni += 1;
            }
            continue;
        }
        // Old is exhausted; any remaining new entries are a trailing insert-only run.
        if ni < new_half.len() && new_half[ni].kind == HalfKind::Changed {
            out.push(HunkLine::new(HunkLineKind::Insert, new_half[ni].line.clone()));
            ni += 1;
            continue;
        }
        break;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::split_lines;

    #[test]
    fn pure_insertion_elides_old_half() {
        let bytes = b"***************\n*** 1,3 ****\n--- 1,4 ----\n  int main()\n  {\n+\treturn 0;\n  }\n";
        let lines = split_lines(bytes);
        let (hunks, next) = parse_hunks(&lines, 0).unwrap();
        assert_eq!(next, lines.len());
        let h = &hunks[0];
        assert_eq!((h.old_start, h.old_count, h.new_start, h.new_count), (1, 3, 1, 4));
        assert_eq!(h.lines.len(), 4);
        assert_eq!(h.lines[2].kind, HunkLineKind::Insert);
    }

    #[test]
    fn pure_deletion_elides_new_half() {
        let bytes = b"***************\n*** 1,3 ****\n  a\n- b\n  c\n--- 1,2 ----\n";
        let lines = split_lines(bytes);
        let (hunks, _) = parse_hunks(&lines, 0).unwrap();
        let h = &hunks[0];
        assert_eq!(h.lines.len(), 3);
        assert_eq!(h.lines[1].kind, HunkLineKind::Delete);
    }

    #[test]
    fn change_block_both_halves() {
        let bytes =
            b"***************\n*** 1,3 ****\n  a\n! b\n  c\n--- 1,3 ----\n  a\n! b2\n  c\n";
        let lines = split_lines(bytes);
        let (hunks, _) = parse_hunks(&lines, 0).unwrap();
        let h = &hunks[0];
        // a(context) b(delete) b2(insert) c(context)
        assert_eq!(h.lines.len(), 4);
        assert_eq!(h.lines[1].kind, HunkLineKind::Delete);
        assert_eq!(h.lines[2].kind, HunkLineKind::Insert);
    }
}
