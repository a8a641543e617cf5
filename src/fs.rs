//! The filesystem primitive layer the Applier (C4) is built against.
//!
//! `patch` deliberately treats open/read/write/rename/unlink/chmod/mkdir/rmdir as an external
//! collaborator rather than calling `std::fs` directly throughout C4 — this is the same shape as
//! [`crate::git`]'s `GitOps` trait in the codebase this grew out of: a thin trait so the applier's
//! decision logic can be unit-tested against an in-memory fake instead of a real working
//! directory, while the binary wires up the real implementation.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl FsError {
    fn wrap(path: &Path, source: io::Error) -> Self {
        FsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What kind of filesystem entry a path resolves to, as far as the Applier cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Other,
    Missing,
}

/// The filesystem primitives C4 needs. Paths are always relative to whatever directory the
/// Driver has already `chdir`'d into (`--directory`/`-d`) — this trait never resolves `-d` itself.
pub trait FileSystem {
    fn kind_of(&self, path: &Path) -> EntryKind;
    fn is_readonly(&self, path: &Path) -> Result<bool, FsError>;
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;
    fn set_mode(&self, path: &Path, mode: u32) -> Result<(), FsError>;
    fn mode_of(&self, path: &Path) -> Result<Option<u32>, FsError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;
    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError>;
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;
    /// Remove `dir` and then each ancestor of it, in order, stopping at the first ancestor
    /// that is non-empty (or doesn't exist). Used after deleting a file whose directory chain
    /// would otherwise be left as empty husks.
    fn remove_empty_ancestors(&self, dir: &Path) -> Result<(), FsError>;
}

/// The real filesystem, backed directly by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        RealFileSystem
    }
}

impl FileSystem for RealFileSystem {
    fn kind_of(&self, path: &Path) -> EntryKind {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_file() => EntryKind::Regular,
            Ok(meta) if meta.is_dir() => EntryKind::Directory,
            Ok(_) => EntryKind::Other,
            Err(_) => EntryKind::Missing,
        }
    }

    #[cfg(unix)]
    fn is_readonly(&self, path: &Path) -> Result<bool, FsError> {
        use std::os::unix::fs::PermissionsExt;
        let meta = fs::metadata(path).map_err(|e| FsError::wrap(path, e))?;
        Ok(meta.permissions().mode() & 0o200 == 0)
    }

    #[cfg(not(unix))]
    fn is_readonly(&self, path: &Path) -> Result<bool, FsError> {
        let meta = fs::metadata(path).map_err(|e| FsError::wrap(path, e))?;
        Ok(meta.permissions().readonly())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        fs::read(path).map_err(|e| FsError::wrap(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| FsError::wrap(parent, e))?;
            }
        }
        // Write-then-rename: a crash mid-write leaves the previous file intact.
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.patch-tmp-", file_name_or(path, "out")))
            .tempfile_in(dir)
            .map_err(|e| FsError::wrap(dir, e))?;
        tmp.write_all(contents).map_err(|e| FsError::wrap(path, e))?;
        tmp.flush().map_err(|e| FsError::wrap(path, e))?;
        if let Some(mode) = self.mode_of(path)? {
            let _ = self.set_mode(tmp.path(), mode);
        }
        tmp.persist(path).map_err(|e| FsError::wrap(path, e.error))?;
        Ok(())
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| FsError::wrap(path, e))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, _path: &Path, _mode: u32) -> Result<(), FsError> {
        Ok(())
    }

    #[cfg(unix)]
    fn mode_of(&self, path: &Path) -> Result<Option<u32>, FsError> {
        use std::os::unix::fs::PermissionsExt;
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(meta.permissions().mode())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FsError::wrap(path, e)),
        }
    }

    #[cfg(not(unix))]
    fn mode_of(&self, _path: &Path) -> Result<Option<u32>, FsError> {
        Ok(None)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| FsError::wrap(parent, e))?;
            }
        }
        fs::rename(from, to).map_err(|e| FsError::wrap(from, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| FsError::wrap(parent, e))?;
            }
        }
        fs::copy(from, to).map(|_| ()).map_err(|e| FsError::wrap(from, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path).map_err(|e| FsError::wrap(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::wrap(path, e))
    }

    fn remove_empty_ancestors(&self, dir: &Path) -> Result<(), FsError> {
        let mut current = Some(dir);
        while let Some(d) = current {
            if d.as_os_str().is_empty() || d == Path::new(".") {
                break;
            }
            match fs::read_dir(d) {
                Ok(mut entries) => {
                    if entries.next().is_some() {
                        break;
                    }
                }
                Err(_) => break,
            }
            if fs::remove_dir(d).is_err() {
                break;
            }
            current = d.parent();
        }
        Ok(())
    }
}

fn file_name_or<'a>(path: &'a Path, default: &'a str) -> &'a str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or(default)
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::FakeFileSystem;
    use std::path::Path;

    #[test]
    fn fake_write_then_read_round_trips() {
        let fake = FakeFileSystem::default();
        fake.write(Path::new("a"), b"hello").unwrap();
        assert_eq!(fake.read(Path::new("a")).unwrap(), b"hello");
    }

    #[test]
    fn real_fs_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let real = RealFileSystem::new();
        real.write(&path, b"contents").unwrap();
        assert_eq!(real.read(&path).unwrap(), b"contents");
    }

    #[test]
    fn real_fs_kind_of_missing() {
        let dir = tempfile::tempdir().unwrap();
        let real = RealFileSystem::new();
        assert_eq!(real.kind_of(&dir.path().join("nope")), EntryKind::Missing);
    }
}
