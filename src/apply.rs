//! The Applier (C4): orchestrates one [`FilePatch`] end to end — resolves which file on disk it
//! targets, loads it, locates and splices each hunk via [`crate::locate`], then commits the result
//! (writing content, backups, mode changes, renames, deletions) or writes a `.rej` file for
//! whatever didn't locate.

use std::collections::HashSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::cli::ReadOnlyPolicy;
use crate::fs::{EntryKind, FileSystem, FsError};
use crate::line::{self, Line, NewlinePolicy};
use crate::locate::{self, LocateOutcome, Policy};
use crate::models::{FilePatch, Hunk, Operation};
use crate::parser::{header_timestamp_suffix, strip_components};
use crate::reject::{self, RejectFormat};

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// What the Applier needs from the Driver to process a single [`FilePatch`].
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    pub dry_run: bool,
    pub reverse: bool,
    pub forward: bool,
    pub backup: bool,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub strip: Option<usize>,
    pub ignore_whitespace: bool,
    pub fuzz_max: usize,
    pub newline_output: NewlinePolicy,
    pub read_only: ReadOnlyPolicy,
    pub reject_format: RejectFormat,
    pub reject_file: Option<String>,
    /// `-o`: write the result somewhere other than the target. `-` means stdout.
    pub output: Option<String>,
    /// A positional target file, overriding path resolution from the patch headers entirely.
    pub explicit_file: Option<String>,
    /// `-f`/`--force`: accepted for GNU compatibility. This applier never prompts in the first
    /// place (there's no interactive path to suppress), so the flag has nothing to toggle — it's
    /// threaded through so `--dry-run --force` round-trips and the option isn't silently rejected.
    pub force: bool,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        ApplyConfig {
            dry_run: false,
            reverse: false,
            forward: false,
            backup: false,
            prefix: None,
            suffix: None,
            strip: None,
            ignore_whitespace: false,
            fuzz_max: 2,
            newline_output: NewlinePolicy::Preserve,
            read_only: ReadOnlyPolicy::Warn,
            reject_format: RejectFormat::Unified,
            reject_file: None,
            output: None,
            explicit_file: None,
            force: false,
        }
    }
}

/// What happened when applying one [`FilePatch`] — never a hard error for a well-formed patch;
/// see [`ApplyError`] for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOutcome {
    /// `0` if every hunk located and committed cleanly; `1` if something was rejected, left as a
    /// content mismatch, or refused (read-only, not-a-regular-file, binary).
    pub exit_code: u8,
}

/// Resolved file roles for one [`FilePatch`], after strip/`-R`/explicit-file adjustments.
struct Resolved {
    /// Where to read the pre-image from, if any (`None` for pure creation).
    read_path: Option<PathBuf>,
    /// Where the post-image is ultimately written, if any (`None` for pure deletion).
    write_path: Option<PathBuf>,
    /// The name reported in diagnostics — always the old-path side, even under `--reverse`.
    display_name: String,
    annotation: Option<String>,
    op: Operation,
    /// `Rename`/`Copy` with no hunks carrying real changes — a plain move/duplicate with no
    /// content rewrite. True regardless of whether the move already happened on disk; used only
    /// to gate the pre-image backup (a pure rename/copy never gets a `.orig`), not to decide
    /// whether the rename/copy itself still needs to be performed.
    pure_rename_or_copy: bool,
    /// The rename/copy already happened on disk (source gone, destination present) *and* there
    /// are no real hunk changes left to apply — nothing at all to do for this `FilePatch` beyond
    /// reporting it.
    already_done: bool,
    /// `---`/`***` reject-file header: the resolved (stripped) old-side path plus whatever
    /// timestamp the original patch header carried.
    reject_header_old: String,
    /// `+++`/`---` reject-file header: the resolved (stripped) new-side path plus timestamp.
    reject_header_new: String,
}

fn backup_name(basename: &str, prefix: &Option<String>, suffix: &Option<String>) -> String {
    match (prefix, suffix) {
        // GNU quirk: an explicit prefix with the untouched default suffix drops the basename
        // entirely and glues the literal word "orig" onto the prefix.
        (Some(p), None) => format!("{p}orig"),
        (Some(p), Some(s)) => format!("{p}{basename}{s}"),
        (None, Some(s)) => format!("{basename}{s}"),
        (None, None) => format!("{basename}.orig"),
    }
}

fn resolve<FS: FileSystem>(fp: &FilePatch, config: &ApplyConfig, fs: &FS) -> Resolved {
    // Git-dialect paths already had their `a/`/`b/` prefix removed at parse time, so an
    // unspecified `-p` means "strip nothing further" there, not the traditional-diff default of
    // "strip down to the basename".
    let strip = config.strip.or(match fp.format {
        crate::models::Format::Git => Some(0),
        _ => None,
    });
    let stripped_old = strip_components(&fp.old_path, strip);
    let stripped_new = strip_components(&fp.new_path, strip);

    if let Some(explicit) = &config.explicit_file {
        return Resolved {
            read_path: Some(PathBuf::from(explicit)),
            write_path: Some(PathBuf::from(explicit)),
            display_name: explicit.clone(),
            annotation: None,
            op: Operation::Modify,
            pure_rename_or_copy: false,
            already_done: false,
            reject_header_old: explicit.clone(),
            reject_header_new: explicit.clone(),
        };
    }

    let old_candidate = (!fp.old_is_dev_null()).then(|| stripped_old.clone());
    let new_candidate = (!fp.new_is_dev_null()).then(|| stripped_new.clone());

    // Plain modifications name the same logical file on both sides of the header (old_path and
    // new_path differ only incidentally, e.g. `a/foo` vs `b/foo`); prefer whichever actually
    // exists so a patch generated with different path prefixes still finds its target. Under
    // `--reverse` the roles swap, so the existence check prefers the other side first.
    let (base_read, base_write) = if fp.operation == Operation::Modify {
        let (first, second) = if config.reverse {
            (&new_candidate, &old_candidate)
        } else {
            (&old_candidate, &new_candidate)
        };
        let first_exists = first
            .as_deref()
            .map(|p| fs.kind_of(Path::new(p)) != EntryKind::Missing)
            .unwrap_or(false);
        let preferred = if first_exists || second.is_none() {
            first.clone()
        } else {
            second.clone()
        };
        (preferred.clone(), preferred)
    } else {
        (old_candidate, new_candidate)
    };
    let base_op = fp.operation;

    let (read, write, op) = if config.reverse {
        let reversed_op = match base_op {
            Operation::Create => Operation::Delete,
            Operation::Delete => Operation::Create,
            other => other,
        };
        (base_write, base_read, reversed_op)
    } else {
        (base_read, base_write, base_op)
    };

    // The rename/copy may already have happened on disk in an earlier invocation (or a hand
    // edit): the recorded source is gone and the destination already holds *some* content. When
    // that's true, hunks must be located and spliced against the destination's current content,
    // not the (nonexistent) source, and the on-disk rename/copy step itself must be skipped —
    // re-running it would error since there's nothing left at the source to move.
    let source_already_moved = matches!(op, Operation::Rename | Operation::Copy)
        && read.as_deref().map(|p| fs.kind_of(Path::new(p)) == EntryKind::Missing).unwrap_or(false)
        && write.as_deref().map(|p| fs.kind_of(Path::new(p)) != EntryKind::Missing).unwrap_or(false);

    let no_real_hunk_changes = !fp.hunks.iter().any(Hunk::has_changes);
    let pure_rename_or_copy = matches!(op, Operation::Rename | Operation::Copy) && no_real_hunk_changes;
    let already_done = source_already_moved && no_real_hunk_changes;

    let annotation = match op {
        Operation::Rename if source_already_moved => Some(format!("(already renamed from {stripped_old})")),
        Operation::Rename => Some(format!("(renamed from {stripped_old})")),
        Operation::Copy if source_already_moved => Some(format!("(already copied from {stripped_old})")),
        Operation::Copy => Some(format!("(copied from {stripped_old})")),
        _ => None,
    };

    let effective_read = if source_already_moved { write.clone() } else { read };

    // Reject-file headers reproduce the resolved (stripped) path, not whatever `a/`/`b/`-prefixed
    // form the patch happened to carry — only the timestamp field survives from the original
    // header verbatim.
    let reject_header_old = format!("{stripped_old}{}", header_timestamp_suffix(&fp.header_old));
    let reject_header_new = format!("{stripped_new}{}", header_timestamp_suffix(&fp.header_new));

    Resolved {
        read_path: effective_read.map(PathBuf::from),
        write_path: write.map(PathBuf::from),
        display_name: stripped_old,
        annotation,
        op,
        pure_rename_or_copy,
        already_done,
        reject_header_old,
        reject_header_new,
    }
}

fn describe_action(dry_run: bool, target: &str, annotation: Option<&str>) -> String {
    let verb = if dry_run { "checking" } else { "patching" };
    match annotation {
        Some(a) => format!("{verb} file {target} {a}"),
        None => format!("{verb} file {target}"),
    }
}

/// Splice `hunk` (or its inversion, if `reversed`) into `buf` at the position [`locate::locate`]
/// found. Returns the net change in line count (new minus old), or `None` if the hunk was already
/// applied (nothing to splice).
fn splice_hunk(buf: &mut Vec<Line>, hunk: &Hunk, outcome: LocateOutcome) -> Option<isize> {
    let LocateOutcome::Located { at, fuzz_used, reversed, already_applied } = outcome else {
        return None;
    };
    if already_applied {
        return None;
    }
    let effective = if reversed { hunk.inverted() } else { hunk.clone() };
    let (front_trim, back_trim) = locate::trim_counts(&effective.lines, fuzz_used);
    let match_block = effective.match_block();
    let replacement_block = effective.replacement_block();
    let matched_len = match_block.len() - front_trim - back_trim;
    let replaced_len = replacement_block.len() - front_trim - back_trim;

    let start = at + front_trim;
    let end = start + matched_len;
    let new_lines: Vec<Line> = replacement_block[front_trim..replacement_block.len() - back_trim]
        .iter()
        .map(|hl| hl.line.clone())
        .collect();
    buf.splice(start.min(buf.len())..end.min(buf.len()), new_lines);
    Some(replaced_len as isize - matched_len as isize)
}

/// What happened to the hunks of one [`FilePatch`] that didn't simply splice in cleanly.
struct HunkResults<'a> {
    /// Hunks that never located, at any fuzz level.
    failed: Vec<&'a Hunk>,
    /// Hunks detected as already applied and left alone because the patch looks unreversed.
    ignored: Vec<&'a Hunk>,
}

/// Apply every hunk of `fp` against `buf` in order, reporting progress and returning the hunks
/// that didn't end up spliced in.
fn apply_hunks<'a>(buf: &mut Vec<Line>, hunks: &'a [Hunk], policy: &Policy, forward: bool) -> HunkResults<'a> {
    let mut failed = Vec::new();
    let mut ignored = Vec::new();
    let mut line_offset: isize = 0;
    let mut warned_unreversed = false;

    for (i, hunk) in hunks.iter().enumerate() {
        let number = i + 1;
        let guess = ((hunk.old_start as isize - 1) + line_offset).max(0) as usize;
        let outcome = locate::locate(buf, hunk, guess, policy);
        trace!("hunk #{number}: guess={guess} outcome={outcome:?}");

        match outcome {
            LocateOutcome::Located { at, fuzz_used, already_applied, .. } if already_applied => {
                if forward {
                    debug!("hunk #{number} already applied at {}; skipping under --forward", at + 1);
                } else {
                    if !warned_unreversed {
                        println!("Unreversed patch detected! Skipping patch.");
                        warned_unreversed = true;
                    }
                    println!("Hunk #{number} skipped at {} with fuzz {}.", at + 1, fuzz_used);
                    ignored.push(hunk);
                }
            }
            LocateOutcome::Located { at, fuzz_used, .. } => {
                if let Some(delta) = splice_hunk(buf, hunk, outcome) {
                    line_offset += delta;
                    if fuzz_used > 0 {
                        println!("Hunk #{number} succeeded at {} with fuzz {}.", at + 1, fuzz_used);
                    }
                }
            }
            LocateOutcome::Failed => {
                println!("Hunk #{number} FAILED at {}.", guess + 1);
                failed.push(hunk);
            }
        }
    }
    HunkResults { failed, ignored }
}

fn write_reject(
    resolved: &Resolved,
    rejected: &[&Hunk],
    target_name: &str,
    config: &ApplyConfig,
    fs: &impl FileSystem,
) -> Result<PathBuf, ApplyError> {
    let rej_path = match &config.reject_file {
        Some(custom) => PathBuf::from(custom),
        None => PathBuf::from(format!("{target_name}.rej")),
    };
    let body = reject::render(
        &resolved.reject_header_old,
        &resolved.reject_header_new,
        rejected,
        config.reject_format,
    );
    fs.write(&rej_path, &body)?;
    Ok(rej_path)
}

fn summary_line(failed: usize, total: usize, verb: &str, rej: Option<&Path>) -> String {
    match rej {
        Some(path) => format!("{failed} out of {total} hunk {verb} -- saving rejects to file {}", path.display()),
        None => format!("{failed} out of {total} hunk {verb}"),
    }
}

/// Apply a single [`FilePatch`] against the filesystem, honouring `config`.
pub fn apply_file_patch<FS: FileSystem>(
    fp: &FilePatch,
    config: &ApplyConfig,
    fs: &FS,
    backed_up: &mut HashSet<PathBuf>,
) -> Result<FileOutcome, ApplyError> {
    let resolved = resolve(fp, config, fs);

    if fp.operation == Operation::BinaryUnsupported {
        println!("File {}: git binary diffs are not supported.", resolved.display_name);
        return Ok(FileOutcome { exit_code: 1 });
    }

    if resolved.already_done {
        let verb = if resolved.op == Operation::Copy { "copied" } else { "renamed" };
        println!(
            "patching file {} (already {verb} from {})",
            resolved.write_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
            resolved.display_name
        );
        return Ok(FileOutcome { exit_code: 0 });
    }

    let write_to_stdout = config.output.as_deref() == Some("-");

    let effective_write_path: Option<PathBuf> = match &config.output {
        Some(out) if out == "-" => None, // stdout, handled separately
        Some(out) => Some(PathBuf::from(out)),
        None => resolved.write_path.clone(),
    };

    let annotation = if config.output.is_some() {
        Some(format!("(read from {})", resolved.display_name))
    } else {
        resolved.annotation.clone()
    };
    let reported_target = if write_to_stdout {
        "-".to_string()
    } else {
        effective_write_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| resolved.display_name.clone())
    };

    let action_line = describe_action(config.dry_run, &reported_target, annotation.as_deref());
    if write_to_stdout {
        eprintln!("{action_line}");
    } else {
        println!("{action_line}");
    }

    // Target existence / kind checks (not-a-regular-file refusal).
    if let Some(read_path) = &resolved.read_path {
        match fs.kind_of(read_path) {
            EntryKind::Directory | EntryKind::Other => {
                println!("File {} is not a regular file -- refusing to patch", resolved.display_name);
                let rej = write_reject(&resolved, &fp.hunks.iter().collect::<Vec<_>>(), &resolved.display_name, config, fs)?;
                println!("{}", summary_line(fp.hunks.len(), fp.hunks.len(), "FAILED", Some(&rej)));
                return Ok(FileOutcome { exit_code: 1 });
            }
            _ => {}
        }
    }

    let read_only = resolved
        .read_path
        .as_ref()
        .map(|p| fs.is_readonly(p).unwrap_or(false))
        .unwrap_or(false);

    if read_only {
        match config.read_only {
            ReadOnlyPolicy::Fail => {
                println!("File {} is read-only; refusing to patch", resolved.display_name);
                let rej = write_reject(&resolved, &fp.hunks.iter().collect::<Vec<_>>(), &resolved.display_name, config, fs)?;
                println!("{}", summary_line(fp.hunks.len(), fp.hunks.len(), "ignored", Some(&rej)));
                return Ok(FileOutcome { exit_code: 1 });
            }
            ReadOnlyPolicy::Warn => {
                println!("File {} is read-only; trying to patch anyway", resolved.display_name);
            }
            ReadOnlyPolicy::Ignore => {}
        }
    }

    let original_bytes = match &resolved.read_path {
        Some(p) if fs.kind_of(p) != EntryKind::Missing => fs.read(p)?,
        _ => Vec::new(),
    };
    let mut buf = line::split_lines(&original_bytes);
    let had_pre_existing_content = !original_bytes.is_empty() || resolved.read_path.as_ref().map(|p| fs.kind_of(p) != EntryKind::Missing).unwrap_or(false);

    // `--reverse` is realised by inverting each hunk up front and then running an entirely
    // ordinary forward search/splice against the inverted hunks — `locate`'s own `reverse`
    // fallback exists for auto-detecting a patch that looks reversed when the caller didn't ask
    // for one, which is orthogonal to this flag, so it stays off here.
    let policy = Policy {
        fuzz_max: config.fuzz_max,
        ignore_whitespace: config.ignore_whitespace,
        reverse: false,
    };
    let hunks: Vec<Hunk> = if config.reverse {
        fp.hunks.iter().map(Hunk::inverted).collect()
    } else {
        fp.hunks.clone()
    };
    let results = apply_hunks(&mut buf, &hunks, &policy, config.forward);
    let failed = results.failed.len();
    let ignored = results.ignored.len();
    let total = fp.hunks.len();

    if failed + ignored > 0 && total > 0 {
        let verb = if failed > 0 { "FAILED" } else { "ignored" };
        let mut not_applied: Vec<&Hunk> = results.failed.clone();
        not_applied.extend(results.ignored.iter().copied());
        if !config.dry_run {
            let rej = write_reject(&resolved, &not_applied, &resolved.display_name, config, fs)?;
            println!("{}", summary_line(failed + ignored, total, verb, Some(&rej)));
        } else {
            println!("{}", summary_line(failed + ignored, total, verb, None));
        }
    }

    if config.dry_run {
        if write_to_stdout {
            let bytes = line::emit(&buf, config.newline_output);
            std::io::stdout().write_all(&bytes).ok();
        }
        return Ok(FileOutcome { exit_code: if failed + ignored > 0 { 1 } else { 0 } });
    }

    let output_bytes = line::emit(&buf, config.newline_output);

    if write_to_stdout {
        std::io::stdout().write_all(&output_bytes).ok();
        return Ok(FileOutcome { exit_code: if failed + ignored > 0 { 1 } else { 0 } });
    }

    let Some(final_write_path) = effective_write_path.clone() else {
        // No write target: either a pure deletion, or this patch targets /dev/null with nowhere
        // else to go.
        return handle_deletion(fp, &resolved, &output_bytes, had_pre_existing_content, config, fs, backed_up, failed + ignored, total);
    };

    // Backup, if this is the first time this invocation touches the destination.
    if config.backup && !backed_up.contains(&final_write_path) {
        backed_up.insert(final_write_path.clone());
        if had_pre_existing_content && !resolved.pure_rename_or_copy {
            let basename = final_write_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("backup");
            let backup_path = final_write_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.join(backup_name(basename, &config.prefix, &config.suffix)))
                .unwrap_or_else(|| PathBuf::from(backup_name(basename, &config.prefix, &config.suffix)));
            fs.write(&backup_path, &original_bytes)?;
        }
    }

    // Rename/copy the underlying file before (re)writing content at the new location.
    if let (Operation::Rename, Some(read_path)) = (resolved.op, &resolved.read_path) {
        if fs.kind_of(read_path) != EntryKind::Missing && read_path != &final_write_path {
            fs.rename(read_path, &final_write_path)?;
        }
    }
    if let (Operation::Copy, Some(read_path)) = (resolved.op, &resolved.read_path) {
        if fs.kind_of(read_path) != EntryKind::Missing && read_path != &final_write_path {
            fs.copy(read_path, &final_write_path)?;
        }
    }

    fs.write(&final_write_path, &output_bytes)?;

    let effective_mode = if config.reverse { fp.old_mode } else { fp.new_mode };
    if let Some(mode) = effective_mode {
        fs.set_mode(&final_write_path, mode)?;
    } else if read_only {
        if let Some(read_path) = &resolved.read_path {
            if let Some(original_mode) = fs.mode_of(read_path)? {
                fs.set_mode(&final_write_path, original_mode)?;
            }
        }
    }

    Ok(FileOutcome { exit_code: if failed + ignored > 0 { 1 } else { 0 } })
}

#[allow(clippy::too_many_arguments)]
fn handle_deletion<FS: FileSystem>(
    fp: &FilePatch,
    resolved: &Resolved,
    output_bytes: &[u8],
    had_pre_existing_content: bool,
    _config: &ApplyConfig,
    fs: &FS,
    _backed_up: &mut HashSet<PathBuf>,
    failed: usize,
    total: usize,
) -> Result<FileOutcome, ApplyError> {
    let Some(read_path) = &resolved.read_path else {
        return Ok(FileOutcome { exit_code: if failed > 0 { 1 } else { 0 } });
    };

    if !output_bytes.is_empty() {
        println!("Not deleting file {} as content differs from patch", resolved.display_name);
        fs.write(read_path, output_bytes)?;
        return Ok(FileOutcome { exit_code: 1 });
    }

    if had_pre_existing_content || fs.kind_of(read_path) != EntryKind::Missing {
        fs.remove_file(read_path)?;
        if let Some(parent) = read_path.parent() {
            fs.remove_empty_ancestors(parent)?;
        }
    }
    let _ = fp;
    Ok(FileOutcome { exit_code: if failed > 0 { 1 } else { 0 } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::testing::FakeFileSystem;
    use crate::line::Terminator;
    use crate::models::{Format, HunkLine, HunkLineKind, DEV_NULL};

    fn line(s: &str) -> Line {
        Line::new(s.as_bytes(), Terminator::Lf)
    }

    fn modify_patch(path: &str, hunks: Vec<Hunk>) -> FilePatch {
        FilePatch {
            old_path: path.to_string(),
            new_path: path.to_string(),
            operation: Operation::Modify,
            old_mode: None,
            new_mode: None,
            index_old: None,
            index_new: None,
            format: Format::Unified,
            hunks,
            header_old: path.to_string(),
            header_new: path.to_string(),
        }
    }

    fn add_return_hunk() -> Hunk {
        Hunk {
            old_start: 1,
            old_count: 3,
            new_start: 1,
            new_count: 4,
            lines: vec![
                HunkLine::new(HunkLineKind::Context, line("int main()")),
                HunkLine::new(HunkLineKind::Context, line("{")),
                HunkLine::new(HunkLineKind::Insert, line("\treturn 0;")),
                HunkLine::new(HunkLineKind::Context, line("}")),
            ],
        }
    }

    #[test]
    fn basic_add_line_applies_cleanly() {
        let fs = FakeFileSystem::default();
        fs.write(Path::new("to_patch"), b"int main()\n{\n}\n").unwrap();
        let fp = modify_patch("to_patch", vec![add_return_hunk()]);
        let config = ApplyConfig::default();
        let mut backed_up = HashSet::new();
        let outcome = apply_file_patch(&fp, &config, &fs, &mut backed_up).unwrap();
        assert_eq!(outcome.exit_code, 0);
        let result = fs.read(Path::new("to_patch")).unwrap();
        assert_eq!(result, b"int main()\n{\n\treturn 0;\n}\n");
    }

    #[test]
    fn create_from_dev_null_writes_new_file() {
        let fs = FakeFileSystem::default();
        let hunk = Hunk {
            old_start: 0,
            old_count: 0,
            new_start: 1,
            new_count: 1,
            lines: vec![HunkLine::new(HunkLineKind::Insert, line("hello"))],
        };
        let fp = FilePatch {
            old_path: DEV_NULL.to_string(),
            new_path: "new_file".to_string(),
            operation: Operation::Create,
            old_mode: None,
            new_mode: None,
            index_old: None,
            index_new: None,
            format: Format::Unified,
            hunks: vec![hunk],
            header_old: DEV_NULL.to_string(),
            header_new: "new_file".to_string(),
        };
        let config = ApplyConfig::default();
        let mut backed_up = HashSet::new();
        let outcome = apply_file_patch(&fp, &config, &fs, &mut backed_up).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(fs.read(Path::new("new_file")).unwrap(), b"hello\n");
    }

    #[test]
    fn delete_with_trailing_garbage_leaves_residue() {
        let fs = FakeFileSystem::default();
        fs.write(Path::new("remove"), b"a\nb\nc\n// some trailing garbage\n").unwrap();
        let hunk = Hunk {
            old_start: 1,
            old_count: 3,
            new_start: 0,
            new_count: 0,
            lines: vec![
                HunkLine::new(HunkLineKind::Delete, line("a")),
                HunkLine::new(HunkLineKind::Delete, line("b")),
                HunkLine::new(HunkLineKind::Delete, line("c")),
            ],
        };
        let fp = FilePatch {
            old_path: "remove".to_string(),
            new_path: DEV_NULL.to_string(),
            operation: Operation::Delete,
            old_mode: None,
            new_mode: None,
            index_old: None,
            index_new: None,
            format: Format::Unified,
            hunks: vec![hunk],
            header_old: "remove".to_string(),
            header_new: DEV_NULL.to_string(),
        };
        let config = ApplyConfig::default();
        let mut backed_up = HashSet::new();
        let outcome = apply_file_patch(&fp, &config, &fs, &mut backed_up).unwrap();
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(fs.read(Path::new("remove")).unwrap(), b"// some trailing garbage\n");
    }

    #[test]
    fn failing_hunk_writes_reject_file() {
        let fs = FakeFileSystem::default();
        fs.write(Path::new("a"), b"completely different content\n").unwrap();
        let fp = modify_patch("a", vec![add_return_hunk()]);
        let config = ApplyConfig::default();
        let mut backed_up = HashSet::new();
        let outcome = apply_file_patch(&fp, &config, &fs, &mut backed_up).unwrap();
        assert_eq!(outcome.exit_code, 1);
        assert!(fs.read(Path::new("a.rej")).is_ok());
    }

    #[test]
    fn backup_name_quirks() {
        assert_eq!(backup_name("x", &None, &None), "x.orig");
        assert_eq!(backup_name("x", &Some("pre.".to_string()), &None), "pre.orig");
        assert_eq!(backup_name("x", &None, &Some(".post".to_string())), "x.post");
        assert_eq!(
            backup_name("x", &Some("pre.".to_string()), &Some(".post".to_string())),
            "pre.x.post"
        );
    }

    #[test]
    fn backup_written_once_across_two_file_patches() {
        let fs = FakeFileSystem::default();
        fs.write(Path::new("a"), b"1\n2\n3\n").unwrap();
        let mut config = ApplyConfig::default();
        config.backup = true;
        let mut backed_up = HashSet::new();

        let hunk1 = Hunk {
            old_start: 1,
            old_count: 1,
            new_start: 1,
            new_count: 1,
            lines: vec![
                HunkLine::new(HunkLineKind::Delete, line("1")),
                HunkLine::new(HunkLineKind::Insert, line("one")),
            ],
        };
        let hunk2 = Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 1,
            lines: vec![
                HunkLine::new(HunkLineKind::Delete, line("2")),
                HunkLine::new(HunkLineKind::Insert, line("two")),
            ],
        };
        let fp1 = modify_patch("a", vec![hunk1]);
        let fp2 = modify_patch("a", vec![hunk2]);
        apply_file_patch(&fp1, &config, &fs, &mut backed_up).unwrap();
        apply_file_patch(&fp2, &config, &fs, &mut backed_up).unwrap();

        assert_eq!(fs.read(Path::new("a.orig")).unwrap(), b"1\n2\n3\n");
        assert_eq!(backed_up.len(), 1);
    }
}
