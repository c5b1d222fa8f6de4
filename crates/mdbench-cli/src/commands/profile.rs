use crate::cli::ProfileArgs;
use crate::config::{self, ConfigSources};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mdbench::config::BuildProfile;
use mdbench::process::ShellExecutor;
use mdbench::progress::ProgressReporter;
use mdbench::runner::ExperimentRunner;
use tracing::info;

pub async fn run(args: ProfileArgs, sources: &ConfigSources<'_>) -> Result<()> {
    let file_config = config::load_file_config(sources)?;
    let settings = config::build_profile_settings(&args, &file_config)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let executor = ShellExecutor::new().with_line_sink(progress_handler.line_sink());
    let runner = ExperimentRunner::new(&settings.core, &executor, &reporter);

    let binary = runner.locate_binary(BuildProfile::ProfilingRelease)?;
    println!(
        "Profiling {} with {} ({} repetition(s))",
        binary.display(),
        settings.profiler,
        settings.core.repetitions
    );
    info!("Invoking the profiled experiment...");

    let outcome =
        tokio::task::block_in_place(|| runner.run_profiled(settings.profiler, binary))?;
    super::report_outcome(&outcome);
    Ok(())
}
