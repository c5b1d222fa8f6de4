use crate::build::find_binary;
use crate::config::{BuildProfile, ExperimentConfig, ExtractionFailurePolicy, ProfileSelection};
use crate::error::EngineError;
use crate::extract::{MarkerExtractor, MetricExtractor, ReportExtractor};
use crate::pipeline::{self, INPUT_FILES, ResolvedPipeline, SIMULATION_STEP};
use crate::process::{CommandExecutor, CommandSpec};
use crate::profiler::Profiler;
use crate::progress::{Progress, ProgressReporter};
use crate::results::{PersistedFiles, ResultSet, RunResult};
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentOutcome {
    pub results: ResultSet,
    pub files: Option<PersistedFiles>,
}

pub struct ExperimentRunner<'a, E: CommandExecutor> {
    config: &'a ExperimentConfig,
    executor: E,
    reporter: &'a ProgressReporter<'a>,
}

impl<'a, E: CommandExecutor> ExperimentRunner<'a, E> {
    pub fn new(config: &'a ExperimentConfig, executor: E, reporter: &'a ProgressReporter<'a>) -> Self {
        Self {
            config,
            executor,
            reporter,
        }
    }

    /// Resolves the binary for `profile`: the conventional `bin/gmx` path if
    /// present, otherwise the first `bin/gmx` found below the build directory.
    pub fn locate_binary(&self, profile: BuildProfile) -> Result<PathBuf, EngineError> {
        let conventional = pipeline::binary_path(&self.config.paths.build_root, profile);
        if conventional.is_file() {
            return Ok(conventional);
        }
        find_binary(&self.config.paths.build_root.join(profile.dir_name()))
            .ok_or(EngineError::BinaryNotFound(conventional))
    }

    /// Runs the timed experiment for every selected configuration, each with
    /// its own result set. Every binary is located before the first command runs.
    pub fn run_selection(
        &self,
        selection: ProfileSelection,
    ) -> Result<Vec<ExperimentOutcome>, EngineError> {
        let binaries = selection
            .profiles()
            .into_iter()
            .map(|profile| Ok((profile, self.locate_binary(profile)?)))
            .collect::<Result<Vec<_>, EngineError>>()?;

        binaries
            .into_iter()
            .map(|(profile, binary)| self.run_timed(profile, binary))
            .collect()
    }

    #[instrument(skip_all, fields(profile = %profile))]
    pub fn run_timed(
        &self,
        profile: BuildProfile,
        binary: PathBuf,
    ) -> Result<ExperimentOutcome, EngineError> {
        let pipeline = pipeline::resolve(&binary, SIMULATION_STEP);
        let extractor = MarkerExtractor::new(self.config.markers.clone());
        self.execute(profile.name(), &pipeline, &extractor, false)
    }

    /// Runs the measured step under `profiler` against the profiling build.
    #[instrument(skip_all, fields(profiler = %profiler))]
    pub fn run_profiled(
        &self,
        profiler: Profiler,
        binary: PathBuf,
    ) -> Result<ExperimentOutcome, EngineError> {
        let pipeline = pipeline::resolve(&binary, &profiler.measured_template());
        let label = format!("{}_{}", BuildProfile::ProfilingRelease.dir_name(), profiler);
        self.execute(&label, &pipeline, &ReportExtractor, true)
    }

    fn execute(
        &self,
        label: &str,
        pipeline: &ResolvedPipeline,
        extractor: &dyn MetricExtractor,
        echo: bool,
    ) -> Result<ExperimentOutcome, EngineError> {
        info!("Using binary {:?}", &pipeline.binary);
        if self.config.skip_setup {
            info!("Skipping simulation setup as requested.");
        } else {
            self.setup(label, pipeline)?;
        }

        let results = self.measure(label, pipeline, extractor, echo)?;

        let files = if self.config.persist {
            Some(results.persist(&self.config.paths.results_dir)?)
        } else {
            None
        };
        Ok(ExperimentOutcome { results, files })
    }

    fn setup(&self, label: &str, pipeline: &ResolvedPipeline) -> Result<(), EngineError> {
        let workspace = &self.config.paths.workspace;
        if let Some(missing) = INPUT_FILES
            .iter()
            .map(|name| workspace.join(name))
            .find(|path| !path.is_file())
        {
            return Err(EngineError::MissingInput(missing));
        }

        self.reporter.phase(format!("Setting up {} simulation", label));
        debug!("Setup command: {}", &pipeline.setup_command);
        let spec = CommandSpec::new(&pipeline.setup_command, workspace)
            .stdin(&self.config.stdin_token)
            .timeout(self.config.timeout);
        let output = self.executor.execute(&spec)?;
        self.reporter.report(Progress::PhaseFinish);

        if !output.success() {
            error!(
                "Setup stderr (last {} lines):\n{}",
                STDERR_TAIL_LINES,
                tail(&output.stderr, STDERR_TAIL_LINES)
            );
            return Err(EngineError::Setup { code: output.code });
        }
        info!("Setup finished in {:.1}s", output.elapsed.as_secs_f64());
        Ok(())
    }

    fn measure(
        &self,
        label: &str,
        pipeline: &ResolvedPipeline,
        extractor: &dyn MetricExtractor,
        echo: bool,
    ) -> Result<ResultSet, EngineError> {
        let repetitions = self.config.repetitions;
        let mut results = ResultSet::with_kind(label, extractor.kind());

        self.reporter
            .phase(format!("Running {} mode experiments", label));
        self.reporter.report(Progress::TaskStart {
            total_steps: repetitions as u64,
        });

        let spec = CommandSpec::new(&pipeline.measured_command, &self.config.paths.workspace)
            .echo(echo)
            .timeout(self.config.timeout);

        for repetition in 1..=repetitions {
            debug!("Repetition {}/{}", repetition, repetitions);
            let output = self.executor.execute(&spec)?;
            if !output.success() {
                warn!(
                    "Repetition {} exited with {:?}; attempting extraction anyway",
                    repetition, output.code
                );
            }

            let metric = match extractor.extract(&output) {
                Ok(metric) => Some(metric),
                Err(source) => match &self.config.extraction_policy {
                    ExtractionFailurePolicy::Abort => {
                        self.reporter.report(Progress::TaskFinish);
                        self.reporter.report(Progress::PhaseFinish);
                        return Err(EngineError::Extraction { repetition, source });
                    }
                    ExtractionFailurePolicy::Skip => {
                        warn!("Skipping repetition {}: {}", repetition, source);
                        self.reporter
                            .message(format!("repetition {} skipped: {}", repetition, source));
                        None
                    }
                    ExtractionFailurePolicy::Sentinel(value) => {
                        warn!(
                            "Recording '{}' for repetition {}: {}",
                            value, repetition, source
                        );
                        self.reporter.message(format!(
                            "repetition {} recorded as {}: {}",
                            repetition, value, source
                        ));
                        Some(value.clone())
                    }
                },
            };

            if let Some(metric) = metric {
                results.results.push(RunResult {
                    repetition,
                    metric,
                    stderr: output.stderr,
                    elapsed: output.elapsed,
                });
            }
            self.reporter.report(Progress::TaskIncrement);
        }

        self.reporter.report(Progress::TaskFinish);
        self.reporter.report(Progress::PhaseFinish);
        info!(
            "Collected {} of {} {} result(s).",
            results.len(),
            repetitions,
            label
        );
        Ok(results)
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
