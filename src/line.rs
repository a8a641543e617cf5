//! Byte-accurate line splitting that remembers each line's own terminator.
//!
//! `patch` has to reproduce a target file's line endings exactly (or convert
//! them deliberately under `--newline-output`), so the terminator is carried
//! as data on every [`Line`] rather than stripped at read time.

use clap::ValueEnum;

/// The terminator a line was (or should be) written with.
///
/// `None` is only legal on the last line of a file — it means the file has
/// no trailing newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminator {
    Lf,
    CrLf,
    None,
}

impl Terminator {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Terminator::Lf => b"\n",
            Terminator::CrLf => b"\r\n",
            Terminator::None => b"",
        }
    }
}

/// A single line of a file: its content (without terminator) plus the
/// terminator it was found with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Line {
    pub content: Vec<u8>,
    pub terminator: Terminator,
}

impl Line {
    pub fn new(content: impl Into<Vec<u8>>, terminator: Terminator) -> Self {
        Line {
            content: content.into(),
            terminator,
        }
    }

    /// Lossily decode the content as UTF-8, for diagnostics and header parsing.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Content with runs of whitespace collapsed to a single space and
    /// leading/trailing whitespace trimmed, per `--ignore-whitespace`.
    pub fn whitespace_normalized(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.content.len());
        let mut in_run = false;
        for &b in &self.content {
            if b == b' ' || b == b'\t' {
                in_run = true;
                continue;
            }
            if in_run && !out.is_empty() {
                out.push(b' ');
            }
            in_run = false;
            out.push(b);
        }
        out
    }

    /// Byte-for-byte content equality, ignoring terminator.
    pub fn content_eq(&self, other: &Line) -> bool {
        self.content == other.content
    }

    pub fn content_eq_ignoring_whitespace(&self, other: &Line) -> bool {
        self.whitespace_normalized() == other.whitespace_normalized()
    }
}

/// Split a byte buffer into [`Line`]s, recording each line's own terminator.
///
/// `split_lines` is a total, injective inverse of [`emit`] under
/// [`NewlinePolicy::Preserve`]: re-emitting the returned lines reproduces
/// `bytes` exactly.
pub fn split_lines(bytes: &[u8]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            if i > start && bytes[i - 1] == b'\r' {
                lines.push(Line::new(&bytes[start..i - 1], Terminator::CrLf));
            } else {
                lines.push(Line::new(&bytes[start..i], Terminator::Lf));
            }
            i += 1;
            start = i;
        } else {
            i += 1;
        }
    }
    if start < bytes.len() {
        lines.push(Line::new(&bytes[start..], Terminator::None));
    }
    lines
}

/// Policy controlling how line terminators are written back out, exposed via
/// `--newline-output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum NewlinePolicy {
    /// Keep each line's own recorded terminator.
    Preserve,
    Lf,
    Crlf,
    /// Coerce to the host platform's native line ending.
    Native,
}

impl NewlinePolicy {
    fn coerced(&self, original: Terminator) -> Terminator {
        match self {
            NewlinePolicy::Preserve => original,
            NewlinePolicy::Lf => {
                if original == Terminator::None {
                    Terminator::None
                } else {
                    Terminator::Lf
                }
            }
            NewlinePolicy::Crlf => {
                if original == Terminator::None {
                    Terminator::None
                } else {
                    Terminator::CrLf
                }
            }
            NewlinePolicy::Native => {
                if original == Terminator::None {
                    Terminator::None
                } else if cfg!(windows) {
                    Terminator::CrLf
                } else {
                    Terminator::Lf
                }
            }
        }
    }
}

/// Serialize `lines` to bytes under `policy`.
pub fn emit(lines: &[Line], policy: NewlinePolicy) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(&line.content);
        out.extend_from_slice(policy.coerced(line.terminator).as_bytes());
    }
    out
}
