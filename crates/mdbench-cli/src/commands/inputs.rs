use crate::cli::FetchArgs;
use crate::config::{self, ConfigSources, InputSettings};
use crate::error::Result;
use crate::inputs::{InputFetcher, InputProgress};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

pub async fn run(args: FetchArgs, sources: &ConfigSources<'_>) -> Result<()> {
    let file_config = config::load_file_config(sources)?;
    let settings = config::build_input_settings(&args, &file_config)?;
    download(&settings).await
}

/// Downloads whatever input files the workspace is missing.
pub async fn download(settings: &InputSettings) -> Result<()> {
    let fetcher = InputFetcher::new(settings)?;
    if fetcher.pending_files().is_empty() {
        println!(
            "Input files already present in {}",
            fetcher.workspace().display()
        );
        return Ok(());
    }

    println!("Downloading input files to: {}", fetcher.workspace().display());
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg:<10} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        )
        .expect("Failed to create download style template")
        .progress_chars("#>-"),
    );
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(2));

    let result = fetcher
        .fetch(|progress| match progress {
            InputProgress::DownloadStarted { file, total_size } => {
                pb.reset();
                pb.set_length(total_size.unwrap_or(0));
                pb.set_message(file.to_string());
            }
            InputProgress::Downloading { downloaded } => {
                pb.set_position(downloaded);
            }
            InputProgress::FileFinished { file } => {
                pb.println(format!("  ✓ {}", file));
            }
        })
        .await;

    match result {
        Ok(written) => {
            pb.finish_with_message("✓ Done");
            info!("Downloaded {} input file(s).", written.len());
            Ok(())
        }
        Err(e) => {
            pb.finish_with_message("✗ Download failed.");
            Err(e)
        }
    }
}
