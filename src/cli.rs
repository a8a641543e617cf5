//! The configuration record, produced by a `clap`-derive `Cli` struct matching the option table
//! of the external interface field-for-field — the same derive style and short/long option
//! conventions the codebase's other binary entrypoint uses for its `PlanArgs`.

use clap::Parser;

use crate::line::NewlinePolicy;
use crate::reject::RejectFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "lower")]
pub enum ReadOnlyPolicy {
    Warn,
    Ignore,
    Fail,
}

impl Default for ReadOnlyPolicy {
    fn default() -> Self {
        ReadOnlyPolicy::Warn
    }
}

#[derive(Parser, Debug)]
#[command(name = "patch")]
#[command(version = "0.0.1")]
#[command(before_help = "patch - (C) 2022 Shannon Booth")]
#[command(about = "patch reads a patch file containing a difference (diff) and applies it to files.")]
pub struct Cli {
    /// Patch source; `-` or omitted means stdin
    #[arg(short = 'i', long = "input", value_name = "file")]
    pub input: Option<String>,

    /// Write result to file; `-` means stdout
    #[arg(short = 'o', long = "output", value_name = "file")]
    pub output: Option<String>,

    /// Override `.rej` destination
    #[arg(short = 'r', long = "reject-file", value_name = "file")]
    pub reject_file: Option<String>,

    /// Try the patch inverted first
    #[arg(short = 'R', long)]
    pub reverse: bool,

    /// Skip already-applied hunks without prompting
    #[arg(short = 'N', long)]
    pub forward: bool,

    /// Save pre-image as `<name>.orig` (first touch only)
    #[arg(short = 'b', long)]
    pub backup: bool,

    /// Prefix for backup name
    #[arg(long)]
    pub prefix: Option<String>,

    /// Suffix for backup name (default `.orig`)
    #[arg(long)]
    pub suffix: Option<String>,

    /// Strip N leading path components
    #[arg(short = 'p', long = "strip", value_name = "N")]
    pub strip: Option<usize>,

    /// Chdir before operating
    #[arg(short = 'd', long = "directory", value_name = "dir")]
    pub directory: Option<String>,

    /// No writes; diagnostics say "checking" instead of "patching"
    #[arg(long)]
    pub dry_run: bool,

    /// Assume defaults; never prompt
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Whitespace-insensitive matching
    #[arg(short = 'l', long)]
    pub ignore_whitespace: bool,

    /// `preserve` (default) | `lf` | `crlf` | `native`
    #[arg(long = "newline-output", value_enum, default_value = "preserve")]
    pub newline_output: NewlinePolicy,

    /// `warn` (default) | `ignore` | `fail`
    #[arg(long = "read-only", value_enum, default_value = "warn")]
    pub read_only: ReadOnlyPolicy,

    /// `unified` (default) | `context`
    #[arg(long = "reject-format", value_enum, default_value = "unified")]
    pub reject_format: RejectFormat,

    /// Fatal: ed patches are not supported by this version of patch
    #[arg(long)]
    pub ed: bool,

    /// Repeatable; raises internal trace logging
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The target file, if given positionally instead of derived from the patch headers
    #[arg(value_name = "file")]
    pub file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_spec() {
        let cli = Cli::parse_from(["patch"]);
        assert_eq!(cli.newline_output, NewlinePolicy::Preserve);
        assert_eq!(cli.read_only, ReadOnlyPolicy::Warn);
        assert_eq!(cli.reject_format, RejectFormat::Unified);
        assert!(!cli.reverse);
        assert!(!cli.backup);
    }

    #[test]
    fn short_flags_parse() {
        let cli = Cli::parse_from(["patch", "-R", "-N", "-b", "-l", "-f"]);
        assert!(cli.reverse);
        assert!(cli.forward);
        assert!(cli.backup);
        assert!(cli.ignore_whitespace);
        assert!(cli.force);
    }
}
