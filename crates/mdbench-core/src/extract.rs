use crate::config::Markers;
use crate::process::CommandOutput;
use crate::results::MetricKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ExtractionError {
    #[error("start marker {0:?} not found in output")]
    StartMarkerMissing(String),

    #[error("end marker {0:?} not found after the start marker")]
    EndMarkerMissing(String),

    #[error("command produced no output")]
    EmptyOutput,
}

/// Turns one repetition's captured output into its metric.
pub trait MetricExtractor {
    fn extract(&self, output: &CommandOutput) -> Result<String, ExtractionError>;

    fn kind(&self) -> MetricKind {
        MetricKind::Scalar
    }
}

/// Takes the text strictly between two literal markers in stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerExtractor {
    markers: Markers,
}

impl MarkerExtractor {
    pub fn new(markers: Markers) -> Self {
        Self { markers }
    }

    pub fn between<'t>(&self, text: &'t str) -> Result<&'t str, ExtractionError> {
        let start = text
            .find(&self.markers.start)
            .ok_or_else(|| ExtractionError::StartMarkerMissing(self.markers.start.clone()))?
            + self.markers.start.len();
        let len = text[start..]
            .find(&self.markers.end)
            .ok_or_else(|| ExtractionError::EndMarkerMissing(self.markers.end.clone()))?;
        Ok(&text[start..start + len])
    }
}

impl Default for MarkerExtractor {
    fn default() -> Self {
        Self::new(Markers::default())
    }
}

impl MetricExtractor for MarkerExtractor {
    fn extract(&self, output: &CommandOutput) -> Result<String, ExtractionError> {
        self.between(&output.stdout).map(str::to_string)
    }
}

/// Keeps the whole stdout, used when a profiler's report is the metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportExtractor;

impl MetricExtractor for ReportExtractor {
    fn extract(&self, output: &CommandOutput) -> Result<String, ExtractionError> {
        if output.stdout.trim().is_empty() {
            Err(ExtractionError::EmptyOutput)
        } else {
            Ok(output.stdout.clone())
        }
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdout(text: &str) -> CommandOutput {
        CommandOutput {
            code: Some(0),
            stdout: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn extracts_exact_text_between_markers() {
        let extractor = MarkerExtractor::new(Markers {
            start: "exec. time: ".to_string(),
            end: " !".to_string(),
        });
        let metric = extractor
            .extract(&stdout("...exec. time: 12.34 !..."))
            .unwrap();
        assert_eq!(metric, "12.34");
    }

    #[test]
    fn default_markers_match_mdrunner_timing_line() {
        let output = stdout(
            "Steepest Descents:\n   Tolerance (Fmax)   =  1.00000e+03\n\
             runner.mdrunner() exec. time: 41.872 !\nGROMACS reminds you: ...\n",
        );
        assert_eq!(
            MarkerExtractor::default().extract(&output).unwrap(),
            "41.872"
        );
    }

    #[test]
    fn end_marker_is_searched_after_start_marker() {
        let extractor = MarkerExtractor::new(Markers {
            start: "time: ".to_string(),
            end: " !".to_string(),
        });
        let output = stdout("warning !\ntime: 3.5 !\n");
        assert_eq!(extractor.extract(&output).unwrap(), "3.5");
    }

    #[test]
    fn missing_start_marker_is_an_error() {
        let result = MarkerExtractor::default().extract(&stdout("Segmentation fault\n"));
        assert_eq!(
            result,
            Err(ExtractionError::StartMarkerMissing(
                "runner.mdrunner() exec. time: ".to_string()
            ))
        );
    }

    #[test]
    fn missing_end_marker_is_an_error() {
        let result =
            MarkerExtractor::default().extract(&stdout("runner.mdrunner() exec. time: 9.1\n"));
        assert_eq!(
            result,
            Err(ExtractionError::EndMarkerMissing(" !".to_string()))
        );
    }

    #[test]
    fn adjacent_markers_yield_empty_metric() {
        let extractor = MarkerExtractor::new(Markers {
            start: "[".to_string(),
            end: "]".to_string(),
        });
        assert_eq!(extractor.extract(&stdout("x[]y")).unwrap(), "");
    }

    #[test]
    fn report_extractor_keeps_whole_stdout() {
        let report = "Flat profile:\n  %   cumulative\n";
        assert_eq!(ReportExtractor.extract(&stdout(report)).unwrap(), report);
    }

    #[test]
    fn report_extractor_rejects_blank_output() {
        assert_eq!(
            ReportExtractor.extract(&stdout("  \n")),
            Err(ExtractionError::EmptyOutput)
        );
    }
}
