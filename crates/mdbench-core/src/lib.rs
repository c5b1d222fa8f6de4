//! # mdbench core library
//!
//! Building and benchmarking the GROMACS `gmx` binary through a fixed
//! energy-minimisation pipeline.
//!
//! - [`build`] makes sure a binary exists for a [`config::BuildProfile`],
//!   invoking cmake and make only when none is found.
//! - [`runner`] runs the setup pipeline once and the measured step N times,
//!   scraping a metric from each repetition with an [`extract::MetricExtractor`].
//! - [`results`] holds the per-repetition values and writes them to disk.
//!
//! All external work goes through [`process::CommandExecutor`], so the
//! orchestration can be exercised without the real toolchain.

pub mod build;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod process;
pub mod profiler;
pub mod progress;
pub mod results;
pub mod runner;
pub mod stats;
