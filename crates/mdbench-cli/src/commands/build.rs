use crate::cli::BuildArgs;
use crate::config::{self, ConfigSources};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mdbench::build::{BuildManager, BuildOutcome};
use mdbench::process::ShellExecutor;
use mdbench::progress::ProgressReporter;
use tracing::info;

pub async fn run(args: BuildArgs, sources: &ConfigSources<'_>) -> Result<()> {
    let file_config = config::load_file_config(sources)?;
    let settings = config::build_build_settings(&args, &file_config)?;

    if settings.download_inputs {
        super::inputs::download(&settings.inputs).await?;
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let executor = ShellExecutor::new().with_line_sink(progress_handler.line_sink());
    let manager = BuildManager::new(&settings.core, &executor, &reporter);

    for profile in settings.profiles {
        info!("Ensuring {} build in {:?}", profile, manager.build_dir(profile));
        let outcome = tokio::task::block_in_place(|| manager.ensure(profile))?;
        match outcome {
            BuildOutcome::AlreadyBuilt(binary) => println!(
                "✓ {} version already built: {}",
                profile,
                binary.display()
            ),
            BuildOutcome::Built(binary) => {
                println!("✓ {} version built: {}", profile, binary.display())
            }
        }
    }
    Ok(())
}
