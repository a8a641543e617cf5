use clap::Parser;
use log::LevelFilter;

use patch::apply::ApplyConfig;
use patch::cli::Cli;
use patch::driver::{self, Driver, DriverError};
use patch::fs::RealFileSystem;

const VERSION_TEXT: &str = "patch 0.0.1\nCopyright (C) 2022 Shannon Booth\n";

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().skip(1).any(|a| a == "--version") {
        print!("{VERSION_TEXT}");
        std::process::exit(0);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), clap::error::ErrorKind::UnknownArgument) => {
            let arg = args.get(1).map(String::as_str).unwrap_or("");
            eprintln!("patch: **** unknown commandline argument {arg}");
            eprintln!("Try 'patch --help' for more information.");
            std::process::exit(2);
        }
        Err(e) => e.exit(),
    };

    let log_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp(None)
        .init();

    if cli.ed {
        eprintln!("patch: **** ed format patches are not supported by this version of patch");
        std::process::exit(2);
    }

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("patch: **** can't cd to {dir}: {e}");
            std::process::exit(2);
        }
    }

    let patch_bytes = match driver::read_patch_source(cli.input.as_deref()) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("patch: **** {e}");
            std::process::exit(2);
        }
    };

    let config = ApplyConfig {
        dry_run: cli.dry_run,
        reverse: cli.reverse,
        forward: cli.forward,
        backup: cli.backup,
        prefix: cli.prefix.clone(),
        suffix: cli.suffix.clone(),
        strip: cli.strip,
        ignore_whitespace: cli.ignore_whitespace,
        fuzz_max: 2,
        newline_output: cli.newline_output,
        read_only: cli.read_only,
        reject_format: cli.reject_format,
        reject_file: cli.reject_file.clone(),
        output: cli.output.clone(),
        explicit_file: cli.file.clone(),
        force: cli.force,
    };

    let driver = Driver::new(RealFileSystem::new(), config);

    match driver.run(&patch_bytes) {
        Ok(code) => std::process::exit(code as i32),
        Err(DriverError::Parse(e)) => {
            eprintln!("patch: **** {e}");
            std::process::exit(2);
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("patch: **** {e}");
            std::process::exit(2);
        }
    }
}
