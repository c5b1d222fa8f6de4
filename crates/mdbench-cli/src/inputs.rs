use crate::config::InputSettings;
use crate::error::{CliError, Result};
use futures_util::StreamExt;
use mdbench::pipeline::INPUT_FILES;
use reqwest::Url;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum InputProgress<'a> {
    DownloadStarted {
        file: &'a str,
        total_size: Option<u64>,
    },
    Downloading {
        downloaded: u64,
    },
    FileFinished {
        file: &'a str,
    },
}

/// Downloads the pipeline input files into the workspace.
#[derive(Debug)]
pub struct InputFetcher {
    workspace: PathBuf,
    base_url: Url,
    force: bool,
}

impl InputFetcher {
    pub fn new(settings: &InputSettings) -> Result<Self> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            CliError::Config(format!("Invalid inputs base URL '{}': {}", base, e))
        })?;
        Ok(Self {
            workspace: settings.workspace.clone(),
            base_url,
            force: settings.force,
        })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Files that would be downloaded: all of them with `force`, otherwise the missing ones.
    pub fn pending_files(&self) -> Vec<&'static str> {
        INPUT_FILES
            .iter()
            .copied()
            .filter(|name| self.force || !self.workspace.join(name).is_file())
            .collect()
    }

    pub fn file_url(&self, name: &str) -> Result<Url> {
        self.base_url
            .join(name)
            .map_err(|e| CliError::Data(format!("Cannot build URL for '{}': {}", name, e)))
    }

    pub async fn fetch(
        &self,
        mut progress_callback: impl FnMut(InputProgress<'_>),
    ) -> Result<Vec<PathBuf>> {
        let pending = self.pending_files();
        if pending.is_empty() {
            info!("All input files already present in {:?}", &self.workspace);
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.workspace)?;

        let client = reqwest::Client::new();
        let mut written = Vec::with_capacity(pending.len());
        for name in pending {
            let url = self.file_url(name)?;
            info!("Downloading {} from {}", name, url);
            let response = client.get(url).send().await?.error_for_status()?;

            let total_size = response.content_length();
            progress_callback(InputProgress::DownloadStarted {
                file: name,
                total_size,
            });

            let target = self.workspace.join(name);
            let partial = self.workspace.join(format!("{}.part", name));
            let mut file = File::create(&partial)?;
            let mut downloaded: u64 = 0;
            let mut stream = response.bytes_stream();
            while let Some(item) = stream.next().await {
                let chunk = item?;
                file.write_all(&chunk)?;
                downloaded += chunk.len() as u64;
                progress_callback(InputProgress::Downloading { downloaded });
            }
            file.flush()?;
            drop(file);

            if downloaded == 0 {
                fs::remove_file(&partial)?;
                return Err(CliError::Data(format!(
                    "Server returned an empty body for '{}'",
                    name
                )));
            }
            fs::rename(&partial, &target)?;
            debug!("Wrote {} bytes to {:?}", downloaded, &target);
            progress_callback(InputProgress::FileFinished { file: name });
            written.push(target);
        }
        Ok(written)
    }
}
