use crate::error::{CliError, Result};
use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt::{self},
    prelude::*,
};

/// Target prefix shared by the library and the binary.
const APP_TARGET: &str = "mdbench";

fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// HTTP and runtime crates stay at WARN unless everything is traced.
fn dependency_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::ERROR
    } else if verbosity >= 3 {
        LevelFilter::TRACE
    } else {
        LevelFilter::WARN
    }
}

fn console_filter(verbosity: u8, quiet: bool) -> Targets {
    Targets::new()
        .with_target(APP_TARGET, console_level(verbosity, quiet))
        .with_default(dependency_level(verbosity, quiet))
}

/// The log file always keeps per-repetition DEBUG records, whatever the console shows.
fn file_filter(verbosity: u8) -> Targets {
    let app_level = if verbosity >= 3 {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };
    Targets::new()
        .with_target(APP_TARGET, app_level)
        .with_default(dependency_level(verbosity, false))
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(console_filter(verbosity, quiet));

    let subscriber = tracing_subscriber::registry().with(stderr_layer);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(CliError::Io)?;
        }
        let file = File::create(&path).map_err(CliError::Io)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true)
            .with_filter(file_filter(verbosity));

        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    Ok(())
}
