//! patch: apply a unified, context, or git-extended diff to a set of target files.
//!
//! The crate is split along the same lines the GNU `patch` pipeline is: bytes come in, get parsed
//! into a structured patch, each hunk gets located against whatever's on disk (tolerating drift
//! and fuzz), and located hunks get spliced in and committed.
//!
//! # Architecture
//!
//! - [`line`] - byte-accurate line splitting that remembers each line's own terminator
//! - [`models`] - the parsed representation of a patch ([`models::FilePatch`], [`models::Hunk`])
//! - [`parser`] - turns a patch byte stream into [`models::FilePatch`]s (unified/context/git)
//! - [`locate`] - finds where a hunk applies in a target, tolerating drift, fuzz, and reversal
//! - [`reject`] - renders hunks that didn't locate back out as a `.rej` file
//! - [`fs`] - the filesystem primitive layer the applier is built against, for testability
//! - [`apply`] - the applier: resolves one `FilePatch`'s target, locates and splices its hunks,
//!   commits the result
//! - [`driver`] - reads the patch stream, parses it, and runs every `FilePatch` through the
//!   applier, tracking the worst exit code seen
//! - [`cli`] - the command-line configuration record

pub mod apply;
pub mod cli;
pub mod driver;
pub mod fs;
pub mod line;
pub mod locate;
pub mod models;
pub mod parser;
pub mod reject;
