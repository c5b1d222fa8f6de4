use crate::cli::RunArgs;
use crate::config::{self, ConfigSources};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mdbench::process::ShellExecutor;
use mdbench::progress::ProgressReporter;
use mdbench::runner::ExperimentRunner;
use tracing::info;

pub async fn run(args: RunArgs, sources: &ConfigSources<'_>) -> Result<()> {
    let file_config = config::load_file_config(sources)?;
    let settings = config::build_run_settings(&args, &file_config)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let executor = ShellExecutor::new().with_line_sink(progress_handler.line_sink());
    let runner = ExperimentRunner::new(&settings.core, &executor, &reporter);

    println!(
        "Running {} repetition(s) for: {}",
        settings.core.repetitions,
        settings
            .selection
            .profiles()
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("Invoking the experiment runner...");

    let outcomes = tokio::task::block_in_place(|| runner.run_selection(settings.selection))?;
    for outcome in &outcomes {
        super::report_outcome(outcome);
    }
    Ok(())
}
