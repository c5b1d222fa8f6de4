pub mod build;
pub mod inputs;
pub mod profile;
pub mod run;

use mdbench::results::MetricKind;
use mdbench::runner::ExperimentOutcome;
use mdbench::stats::Summary;

/// Prints the per-configuration result lines shared by `run` and `profile`.
fn report_outcome(outcome: &ExperimentOutcome) {
    let results = &outcome.results;
    match Summary::from_metrics(results.metrics()) {
        Some(summary) => println!(
            "✓ {}: {} run(s), mean {:.3} s, std dev {:.3} s, min {:.3} s, max {:.3} s",
            results.label, summary.count, summary.mean, summary.std_dev, summary.min, summary.max
        ),
        None => println!("✓ {}: {} run(s) collected", results.label, results.len()),
    }
    match &outcome.files {
        Some(files) => {
            println!("  Execution times: {}", files.metrics.display());
            println!("  Logs:            {}", files.log.display());
            println!("  Summary:         {}", files.summary.display());
            if !files.reports.is_empty() {
                println!("  Reports:         {} file(s) next to the summary", files.reports.len());
            }
        }
        None if results.kind == MetricKind::Report => {
            println!("  {} report(s) kept in memory (--no-write)", results.len())
        }
        None => println!("  {}", results.metrics_line()),
    }
}
