//! The Driver (C5): reads a patch from `-i`/stdin, parses it, and feeds every
//! [`FilePatch`] it contains through the Applier, tracking the worst exit code seen.
//!
//! Parser errors are fatal — they abort the whole run before any file is touched, the same way a
//! malformed command aborts [`crate::cli`]. Per-[`FilePatch`] failures are local: the Driver keeps
//! going and reports the worst of them at the end, the same "keep going, report at the end"
//! posture `app::App::run` takes in the codebase this grew out of.

use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;

use log::info;

use crate::apply::{self, ApplyConfig, ApplyError};
use crate::fs::FileSystem;
use crate::parser::{self, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error("{0}")]
    Io(String),
}

pub struct Driver<FS: FileSystem> {
    fs: FS,
    config: ApplyConfig,
}

impl<FS: FileSystem> Driver<FS> {
    pub fn new(fs: FS, config: ApplyConfig) -> Self {
        Driver { fs, config }
    }

    /// Run the whole patch stream, returning the process exit code: `0` if every hunk of every
    /// file applied cleanly, `1` if some hunks were rejected or files refused, `2` if the patch
    /// stream itself couldn't be parsed.
    pub fn run(&self, patch_bytes: &[u8]) -> Result<u8, DriverError> {
        let file_patches = parser::parse(patch_bytes)?;
        info!("parsed {} file patch(es)", file_patches.len());

        let mut worst = 0u8;
        let mut backed_up: HashSet<PathBuf> = HashSet::new();

        for fp in &file_patches {
            let outcome = apply::apply_file_patch(fp, &self.config, &self.fs, &mut backed_up)?;
            worst = worst.max(outcome.exit_code);
        }

        Ok(worst)
    }
}

/// Read the patch bytes `-i`/positional-input names, or stdin if none was given (or `-` was).
pub fn read_patch_source(input: Option<&str>) -> Result<Vec<u8>, DriverError> {
    match input {
        None | Some("-") => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| DriverError::Io(e.to_string()))?;
            Ok(buf)
        }
        Some(path) => std::fs::read(path).map_err(|e| DriverError::Io(format!("{path}: {e}"))),
    }
}
