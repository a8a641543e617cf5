//! Hunk location (C3): finds where a hunk applies in a target line
//! sequence, tolerating line-number drift, fuzz, whitespace-insensitivity,
//! and already-applied/reversed patches.

use crate::line::Line;
use crate::models::{Hunk, HunkLine, HunkLineKind};

/// Matching policy for one hunk search.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub fuzz_max: usize,
    pub ignore_whitespace: bool,
    /// Whether inverted (reversed) matches should be attempted when the
    /// forward search fails, i.e. `--reverse`.
    pub reverse: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            fuzz_max: 2,
            ignore_whitespace: false,
            reverse: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOutcome {
    Located {
        at: usize,
        fuzz_used: usize,
        /// The match was found against the inverted hunk.
        reversed: bool,
        /// The match was found against the hunk's post-image rather than
        /// its pre-image: this hunk looks like it has already been applied.
        already_applied: bool,
    },
    Failed,
}

/// Trim up to `fuzz` leading/trailing CONTEXT lines from a match or
/// replacement block (DELETE/INSERT lines at the edges are never trimmed).
fn trim_block<'a>(block: Vec<&'a HunkLine>, fuzz: usize) -> Vec<&'a HunkLine> {
    let mut front = 0;
    while front < fuzz
        && block
            .get(front)
            .map(|l| l.kind == HunkLineKind::Context)
            .unwrap_or(false)
    {
        front += 1;
    }
    let mut back = 0;
    while back < fuzz && front + back < block.len() {
        let idx = block.len() - 1 - back;
        if block[idx].kind == HunkLineKind::Context {
            back += 1;
        } else {
            break;
        }
    }
    block[front..block.len() - back].to_vec()
}

/// Try to match `pattern` against `target` starting exactly at `base`.
/// Returns whether it matched, and whether any line matched content but
/// differed only in terminator (the CRLF/LF fuzz-2 case).
fn attempt(target: &[Line], base: usize, pattern: &[&HunkLine], ignore_whitespace: bool) -> Option<bool> {
    if pattern.is_empty() {
        return Some(false);
    }
    if base + pattern.len() > target.len() {
        return None;
    }
    let mut terminator_mismatch = false;
    for (i, hl) in pattern.iter().enumerate() {
        let candidate = &target[base + i];
        let content_match = if ignore_whitespace {
            hl.line.content_eq_ignoring_whitespace(candidate)
        } else {
            hl.line.content_eq(candidate)
        };
        if !content_match {
            return None;
        }
        if hl.line.terminator != candidate.terminator {
            terminator_mismatch = true;
        }
    }
    Some(terminator_mismatch)
}

/// Search outward from `guess`: offsets `0, +1, -1, +2, -2, ...`, bounded by
/// the target's length. Returns the first match found, preferring smaller
/// |offset| and positive offsets over negative ones at the same magnitude.
fn search_at_fuzz(
    target: &[Line],
    pattern: &[&HunkLine],
    guess: usize,
    ignore_whitespace: bool,
) -> Option<(usize, bool)> {
    let bound = target.len() + 1;
    if let Some(term_mismatch) = attempt(target, guess, pattern, ignore_whitespace) {
        return Some((guess, term_mismatch));
    }
    for d in 1..=bound {
        let plus = guess.checked_add(d);
        if let Some(base) = plus {
            if let Some(term_mismatch) = attempt(target, base, pattern, ignore_whitespace) {
                return Some((base, term_mismatch));
            }
        }
        if let Some(base) = guess.checked_sub(d) {
            if let Some(term_mismatch) = attempt(target, base, pattern, ignore_whitespace) {
                return Some((base, term_mismatch));
            }
        }
    }
    None
}

/// Run the fuzz ladder (0..=fuzz_max) over `selector`'s trimmed block,
/// returning the lowest fuzz level that finds a match.
fn search_ladder(
    target: &[Line],
    hunk: &Hunk,
    guess: usize,
    policy: &Policy,
    selector: impl Fn(&Hunk) -> Vec<&HunkLine>,
) -> Option<(usize, usize, bool)> {
    for fuzz in 0..=policy.fuzz_max {
        let full = selector(hunk);
        let front_trimmed_count = {
            let mut front = 0;
            while front < fuzz
                && full
                    .get(front)
                    .map(|l| l.kind == HunkLineKind::Context)
                    .unwrap_or(false)
            {
                front += 1;
            }
            front
        };
        let pattern = trim_block(full, fuzz);
        let base_guess = guess + front_trimmed_count;
        if let Some((at, term_mismatch)) = search_at_fuzz(target, &pattern, base_guess, policy.ignore_whitespace) {
            let start = at.saturating_sub(front_trimmed_count);
            return Some((start, fuzz, term_mismatch));
        }
    }
    None
}

/// How many leading/trailing CONTEXT lines a fuzz level trims from `lines` — the same count
/// applies whether the caller is looking at the hunk's match-block or replacement-block view,
/// since both share the same underlying CONTEXT entries at the edges. The Applier uses this to
/// know which target lines a located match actually covers once splicing in the new content.
pub(crate) fn trim_counts(lines: &[HunkLine], fuzz: usize) -> (usize, usize) {
    let mut front = 0;
    while front < fuzz
        && lines
            .get(front)
            .map(|l| l.kind == HunkLineKind::Context)
            .unwrap_or(false)
    {
        front += 1;
    }
    let mut back = 0;
    while back < fuzz && front + back < lines.len() {
        let idx = lines.len() - 1 - back;
        if lines[idx].kind == HunkLineKind::Context {
            back += 1;
        } else {
            break;
        }
    }
    (front, back)
}

/// Locate `hunk` in `target`, starting the search at line index `guess`.
pub fn locate(target: &[Line], hunk: &Hunk, guess: usize, policy: &Policy) -> LocateOutcome {
    if let Some((at, fuzz, term_mismatch)) = search_ladder(target, hunk, guess, policy, Hunk::match_block) {
        let fuzz_used = bump_for_terminator(fuzz, term_mismatch, policy.ignore_whitespace);
        return LocateOutcome::Located {
            at,
            fuzz_used,
            reversed: false,
            already_applied: false,
        };
    }

    if let Some((at, fuzz, term_mismatch)) = search_ladder(target, hunk, guess, policy, Hunk::replacement_block) {
        let fuzz_used = bump_for_terminator(fuzz, term_mismatch, policy.ignore_whitespace);
        return LocateOutcome::Located {
            at,
            fuzz_used,
            reversed: false,
            already_applied: true,
        };
    }

    if policy.reverse {
        let inverted = hunk.inverted();
        if let Some((at, fuzz, term_mismatch)) = search_ladder(target, &inverted, guess, policy, Hunk::match_block) {
            let fuzz_used = bump_for_terminator(fuzz, term_mismatch, policy.ignore_whitespace);
            return LocateOutcome::Located {
                at,
                fuzz_used,
                reversed: true,
                already_applied: false,
            };
        }
    }

    LocateOutcome::Failed
}

/// GNU `patch` reports a content-identical match whose lines differ only in
/// terminator as fuzz 2, regardless of the fuzz level the content search
/// actually needed. `--ignore-whitespace` suppresses the bump.
fn bump_for_terminator(fuzz: usize, terminator_mismatch: bool, ignore_whitespace: bool) -> usize {
    if terminator_mismatch && !ignore_whitespace {
        fuzz.max(2)
    } else {
        fuzz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::Terminator;
    use crate::models::{Hunk, HunkLineKind};

    fn line(s: &str, term: Terminator) -> Line {
        Line::new(s.as_bytes(), term)
    }

    fn lf(s: &str) -> Line {
        line(s, Terminator::Lf)
    }

    fn target_lines(strs: &[&str]) -> Vec<Line> {
        strs.iter().map(|s| lf(s)).collect()
    }

    fn simple_hunk() -> Hunk {
        Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 2,
            lines: vec![
                HunkLine::new(HunkLineKind::Context, lf("b")),
                HunkLine::new(HunkLineKind::Insert, lf("new")),
            ],
        }
    }

    #[test]
    fn exact_match_at_guess() {
        let target = target_lines(&["a", "b", "c"]);
        let hunk = simple_hunk();
        let outcome = locate(&target, &hunk, 1, &Policy::default());
        assert_eq!(
            outcome,
            LocateOutcome::Located {
                at: 1,
                fuzz_used: 0,
                reversed: false,
                already_applied: false
            }
        );
    }

    #[test]
    fn drifted_match_found_by_offset_search() {
        let target = target_lines(&["x", "a", "b", "c"]);
        let hunk = simple_hunk();
        // header says line 2 (idx 1), but "b" is actually now at idx 2.
        let outcome = locate(&target, &hunk, 1, &Policy::default());
        assert_eq!(
            outcome,
            LocateOutcome::Located {
                at: 2,
                fuzz_used: 0,
                reversed: false,
                already_applied: false
            }
        );
    }

    #[test]
    fn already_applied_is_detected() {
        let target = target_lines(&["a", "b", "new", "c"]);
        let hunk = simple_hunk();
        let outcome = locate(&target, &hunk, 1, &Policy::default());
        match outcome {
            LocateOutcome::Located { already_applied, .. } => assert!(already_applied),
            _ => panic!("expected a located match"),
        }
    }

    #[test]
    fn terminator_only_mismatch_reports_fuzz_two() {
        let target = target_lines(&["a", "b", "c"]);
        let hunk = Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 1,
            lines: vec![HunkLine::new(
                HunkLineKind::Context,
                line("b", Terminator::CrLf),
            )],
        };
        let outcome = locate(&target, &hunk, 1, &Policy::default());
        match outcome {
            LocateOutcome::Located { fuzz_used, .. } => assert_eq!(fuzz_used, 2),
            _ => panic!("expected a located match"),
        }
    }

    #[test]
    fn reverse_mode_finds_inverted_hunk() {
        let target = target_lines(&["a", "b", "c"]);
        // A forward hunk that deletes "b" and inserts "z" does not match
        // forward (target still has "b"), nor as already-applied (no "z").
        // Its inverse (delete "z", insert "b") matches the *original* form
        // when the target is actually the pre-image of a reversed patch.
        let hunk = Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 1,
            lines: vec![
                HunkLine::new(HunkLineKind::Delete, lf("z")),
                HunkLine::new(HunkLineKind::Insert, lf("b")),
            ],
        };
        let policy = Policy {
            reverse: true,
            ..Policy::default()
        };
        let outcome = locate(&target, &hunk, 1, &policy);
        match outcome {
            LocateOutcome::Located { reversed, .. } => assert!(reversed),
            _ => panic!("expected a located match via reversal"),
        }
    }

    #[test]
    fn no_match_anywhere_fails() {
        let target = target_lines(&["a", "b", "c"]);
        let hunk = Hunk {
            old_start: 1,
            old_count: 1,
            new_start: 1,
            new_count: 1,
            lines: vec![HunkLine::new(HunkLineKind::Context, lf("nowhere"))],
        };
        let outcome = locate(&target, &hunk, 0, &Policy::default());
        assert_eq!(outcome, LocateOutcome::Failed);
    }

    #[test]
    fn ignore_whitespace_matches_despite_spacing_differences() {
        let target = target_lines(&["a", "b   c", "d"]);
        let hunk = Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 1,
            lines: vec![HunkLine::new(HunkLineKind::Context, lf("b c"))],
        };
        let policy = Policy {
            ignore_whitespace: true,
            ..Policy::default()
        };
        let outcome = locate(&target, &hunk, 1, &policy);
        assert!(matches!(outcome, LocateOutcome::Located { .. }));
    }
}
