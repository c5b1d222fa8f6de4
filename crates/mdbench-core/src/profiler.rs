use crate::error::EngineError;
use crate::pipeline::BIN_PLACEHOLDER;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profiler {
    Perf,
    Gprof,
}

impl Profiler {
    pub const SUPPORTED: [Profiler; 2] = [Profiler::Perf, Profiler::Gprof];

    pub fn name(&self) -> &'static str {
        match self {
            Profiler::Perf => "perf",
            Profiler::Gprof => "gprof",
        }
    }

    /// Measured-step template with the profiler wrapped around `mdrun`.
    pub fn measured_template(&self) -> String {
        let prefix = match self {
            Profiler::Perf => "perf record -g",
            Profiler::Gprof => "gprof",
        };
        format!("{} {} mdrun -v -deffnm em", prefix, BIN_PLACEHOLDER)
    }
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profiler {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| EngineError::UnsupportedProfiler(s.to_string()))
    }
}
