use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const METRIC_DELIMITER: &str = ",";
pub const LOG_DELIMITER: &str = ";";

/// Outcome of one measured repetition.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// 1-based repetition index.
    pub repetition: usize,
    pub metric: String,
    pub stderr: String,
    /// Wall-clock duration of the measured command as seen by the runner.
    pub elapsed: Duration,
}

/// What a metric holds, which decides how it is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    /// A single scraped value such as an execution time.
    #[default]
    Scalar,
    /// A free-form profiler report; stored one file per repetition.
    Report,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub label: String,
    pub kind: MetricKind,
    pub results: Vec<RunResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFiles {
    /// Delimited metrics; for reports, the names of the report files.
    pub metrics: PathBuf,
    pub log: PathBuf,
    pub summary: PathBuf,
    /// One file per kept repetition, empty for scalar metrics.
    pub reports: Vec<PathBuf>,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    repetition: usize,
    metric: &'a str,
    wall_seconds: f64,
}

impl ResultSet {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_kind(label, MetricKind::Scalar)
    }

    pub fn with_kind(label: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            label: label.into(),
            kind,
            results: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.metric.as_str())
    }

    pub fn metrics_line(&self) -> String {
        self.metrics().collect::<Vec<_>>().join(METRIC_DELIMITER)
    }

    pub fn log_line(&self) -> String {
        self.results
            .iter()
            .map(|r| r.stderr.as_str())
            .collect::<Vec<_>>()
            .join(LOG_DELIMITER)
    }

    pub fn file_paths(&self, dir: &Path) -> PersistedFiles {
        PersistedFiles {
            metrics: dir.join(format!("{}_run_data.csv", self.label)),
            log: dir.join(format!("{}_log_data.csv", self.label)),
            summary: dir.join(format!("{}_summary.csv", self.label)),
            reports: match self.kind {
                MetricKind::Scalar => Vec::new(),
                MetricKind::Report => self
                    .results
                    .iter()
                    .map(|r| dir.join(format!("{}_report_{}.txt", self.label, r.repetition)))
                    .collect(),
            },
        }
    }

    /// Writes the metric, log and summary files under `dir`, creating it if needed.
    ///
    /// Reports may contain the delimiter, so each goes to its own file and the
    /// metrics file lists those file names instead.
    pub fn persist(&self, dir: &Path) -> Result<PersistedFiles, crate::error::EngineError> {
        fs::create_dir_all(dir)?;
        let files = self.file_paths(dir);

        for (result, path) in self.results.iter().zip(&files.reports) {
            fs::write(path, &result.metric)?;
        }
        let report_names: Vec<String> = files
            .reports
            .iter()
            .map(|p| file_name(p))
            .collect();

        let metrics_line = match self.kind {
            MetricKind::Scalar => self.metrics_line(),
            MetricKind::Report => report_names.join(METRIC_DELIMITER),
        };
        fs::write(&files.metrics, metrics_line)?;
        fs::write(&files.log, self.log_line())?;

        let mut writer = csv::Writer::from_path(&files.summary)?;
        for (i, result) in self.results.iter().enumerate() {
            let metric = match self.kind {
                MetricKind::Scalar => result.metric.as_str(),
                MetricKind::Report => report_names[i].as_str(),
            };
            writer.serialize(SummaryRow {
                repetition: result.repetition,
                metric,
                wall_seconds: result.elapsed.as_secs_f64(),
            })?;
        }
        writer.flush()?;

        info!(
            "{} execution time data exported to {:?}",
            self.label, &files.metrics
        );
        Ok(files)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
