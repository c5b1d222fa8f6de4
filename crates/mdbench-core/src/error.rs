use crate::config::{BuildProfile, ConfigError};
use crate::extract::ExtractionError;
use crate::process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Build of '{profile}' failed at step '{step}' ({status})", status = describe_exit(.code))]
    Build {
        profile: BuildProfile,
        step: &'static str,
        code: Option<i32>,
    },

    #[error("Simulation setup failed ({status}); measurement aborted", status = describe_exit(.code))]
    Setup { code: Option<i32> },

    #[error("Unsupported profiler '{0}'. Expected one of: perf, gprof.")]
    UnsupportedProfiler(String),

    #[error("Repetition {repetition} produced no metric: {source}")]
    Extraction {
        repetition: usize,
        #[source]
        source: ExtractionError,
    },

    #[error("Simulation binary not found at {}. Run 'mdbench build' first.", .0.display())]
    BinaryNotFound(PathBuf),

    #[error("Input file not found: {}. Run 'mdbench fetch-inputs' to download it.", .0.display())]
    MissingInput(PathBuf),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write summary table: {0}")]
    Csv(#[from] csv::Error),
}

pub(crate) fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
