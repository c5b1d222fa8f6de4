use crate::config::{BuildConfig, BuildProfile};
use crate::error::EngineError;
use crate::process::{CommandExecutor, CommandSpec, shell_quote};
use crate::progress::{Progress, ProgressReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    AlreadyBuilt(PathBuf),
    Built(PathBuf),
}

impl BuildOutcome {
    pub fn binary(&self) -> &Path {
        match self {
            BuildOutcome::AlreadyBuilt(path) | BuildOutcome::Built(path) => path,
        }
    }
}

/// Recursively searches `dir` for a file at `bin/gmx`.
pub fn find_binary(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if path.file_name().is_some_and(|n| n == "bin") && path.join("gmx").is_file() {
                return Some(path.join("gmx"));
            }
            subdirs.push(path);
        }
    }
    subdirs.sort();
    subdirs.iter().find_map(|sub| find_binary(sub))
}

pub struct BuildManager<'a, E: CommandExecutor> {
    config: &'a BuildConfig,
    executor: E,
    reporter: &'a ProgressReporter<'a>,
}

impl<'a, E: CommandExecutor> BuildManager<'a, E> {
    pub fn new(config: &'a BuildConfig, executor: E, reporter: &'a ProgressReporter<'a>) -> Self {
        Self {
            config,
            executor,
            reporter,
        }
    }

    pub fn build_dir(&self, profile: BuildProfile) -> PathBuf {
        self.config.paths.build_root.join(profile.dir_name())
    }

    /// Guarantees a binary for `profile` exists, building it when absent.
    #[instrument(skip_all, fields(profile = %profile))]
    pub fn ensure(&self, profile: BuildProfile) -> Result<BuildOutcome, EngineError> {
        let build_dir = self.build_dir(profile);
        if let Some(binary) = find_binary(&build_dir) {
            let binary = binary.canonicalize().unwrap_or(binary);
            info!("{} version already built. Binary under {:?}", profile, binary);
            return Ok(BuildOutcome::AlreadyBuilt(binary));
        }

        self.reporter.phase(format!("Building {} configuration", profile));
        fs::create_dir_all(&build_dir)?;

        for (step, line) in self.steps(profile) {
            info!("[{}] {}", step, line);
            let spec = CommandSpec::new(&line, &build_dir)
                .echo(true)
                .timeout(self.config.timeout);
            let output = self.executor.execute(&spec)?;
            if !output.success() {
                self.reporter.report(Progress::PhaseFinish);
                return Err(EngineError::Build {
                    profile,
                    step,
                    code: output.code,
                });
            }
            debug!("Step '{}' finished in {:.1}s", step, output.elapsed.as_secs_f64());
        }
        self.reporter.report(Progress::PhaseFinish);

        let binary = find_binary(&build_dir).ok_or_else(|| EngineError::BinaryNotFound(build_dir))?;
        info!("Built {} binary at {:?}", profile, binary);
        Ok(BuildOutcome::Built(binary))
    }

    fn steps(&self, profile: BuildProfile) -> Vec<(&'static str, String)> {
        let configure = format!(
            "cmake {} {}",
            shell_quote(&self.config.paths.source_dir),
            profile.cmake_flags().join(" ")
        );
        let compile = match self.config.jobs {
            Some(jobs) => format!("make -j{}", jobs),
            None => "make".to_string(),
        };
        vec![("configure", configure), ("compile", compile)]
    }
}
