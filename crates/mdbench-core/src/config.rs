use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STDIN_TOKEN: &str = "13";
pub const DEFAULT_START_MARKER: &str = "runner.mdrunner() exec. time: ";
pub const DEFAULT_END_MARKER: &str = " !";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Unknown build configuration '{0}'. Expected one of: debug, release, profiling-release.")]
    UnknownProfile(String),

    #[error("Unknown extraction failure policy '{0}'. Expected one of: abort, skip, sentinel.")]
    UnknownPolicy(String),
}

/// A named build variant of the simulation binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildProfile {
    Debug,
    Release,
    /// Release build instrumented with `-pg` for gprof.
    ProfilingRelease,
}

impl BuildProfile {
    pub const ALL: [BuildProfile; 3] = [
        BuildProfile::Debug,
        BuildProfile::Release,
        BuildProfile::ProfilingRelease,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
            BuildProfile::ProfilingRelease => "profiling-release",
        }
    }

    /// Directory under the build root holding this variant's build tree.
    pub fn dir_name(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
            BuildProfile::ProfilingRelease => "profiling",
        }
    }

    pub fn cmake_build_type(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "Debug",
            BuildProfile::Release | BuildProfile::ProfilingRelease => "Release",
        }
    }

    pub fn cmake_flags(&self) -> Vec<String> {
        let mut flags = vec![
            "-DGMX_BUILD_OWN_FFTW=ON".to_string(),
            format!("-DCMAKE_BUILD_TYPE={}", self.cmake_build_type()),
        ];
        if *self == BuildProfile::ProfilingRelease {
            flags.extend(
                [
                    "-DCMAKE_CXX_FLAGS=-pg",
                    "-DCMAKE_EXE_LINKER_FLAGS=-pg",
                    "-DCMAKE_SHARED_LINKER_FLAGS=-pg",
                ]
                .map(String::from),
            );
        }
        flags
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuildProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildProfile::Debug),
            "release" => Ok(BuildProfile::Release),
            "profiling-release" | "profiling" => Ok(BuildProfile::ProfilingRelease),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

/// Which configurations a `run` covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSelection {
    Single(BuildProfile),
    All,
}

impl ProfileSelection {
    /// Profiles in execution order. `All` runs release before debug.
    pub fn profiles(&self) -> Vec<BuildProfile> {
        match self {
            ProfileSelection::Single(profile) => vec![*profile],
            ProfileSelection::All => vec![BuildProfile::Release, BuildProfile::Debug],
        }
    }
}

impl FromStr for ProfileSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(ProfileSelection::All)
        } else {
            s.parse().map(ProfileSelection::Single)
        }
    }
}

/// What to do when a repetition's output carries no metric.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtractionFailurePolicy {
    #[default]
    Abort,
    Skip,
    Sentinel(String),
}

impl ExtractionFailurePolicy {
    pub fn parse(name: &str, sentinel: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(ExtractionFailurePolicy::Abort),
            "skip" => Ok(ExtractionFailurePolicy::Skip),
            "sentinel" => Ok(ExtractionFailurePolicy::Sentinel(sentinel.to_string())),
            _ => Err(ConfigError::UnknownPolicy(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPaths {
    /// CMake source tree of the simulation package.
    pub source_dir: PathBuf,
    /// Parent of the per-configuration build directories.
    pub build_root: PathBuf,
    /// Directory holding the input files; every pipeline command runs here.
    pub workspace: PathBuf,
    pub results_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub paths: ProjectPaths,
    pub jobs: Option<usize>,
    pub timeout: Option<Duration>,
}

impl BuildConfig {
    /// Rejects zero `jobs` and a zero `timeout`, which would kill every step at once.
    pub fn new(
        paths: ProjectPaths,
        jobs: Option<usize>,
        timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        if jobs == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "jobs",
                reason: "must be at least 1".to_string(),
            });
        }
        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidParameter {
                name: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            paths,
            jobs,
            timeout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_MARKER.to_string(),
            end: DEFAULT_END_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub paths: ProjectPaths,
    pub repetitions: usize,
    pub persist: bool,
    /// Menu selection piped to the setup pipeline's interactive prompt.
    pub stdin_token: String,
    pub timeout: Option<Duration>,
    pub skip_setup: bool,
    pub extraction_policy: ExtractionFailurePolicy,
    pub markers: Markers,
}

#[derive(Default)]
pub struct ExperimentConfigBuilder {
    paths: Option<ProjectPaths>,
    repetitions: Option<usize>,
    persist: Option<bool>,
    stdin_token: Option<String>,
    timeout: Option<Duration>,
    skip_setup: bool,
    extraction_policy: Option<ExtractionFailurePolicy>,
    markers: Option<Markers>,
}

impl ExperimentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(mut self, paths: ProjectPaths) -> Self {
        self.paths = Some(paths);
        self
    }
    pub fn repetitions(mut self, n: usize) -> Self {
        self.repetitions = Some(n);
        self
    }
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = Some(persist);
        self
    }
    pub fn stdin_token(mut self, token: impl Into<String>) -> Self {
        self.stdin_token = Some(token.into());
        self
    }
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn skip_setup(mut self, skip: bool) -> Self {
        self.skip_setup = skip;
        self
    }
    pub fn extraction_policy(mut self, policy: ExtractionFailurePolicy) -> Self {
        self.extraction_policy = Some(policy);
        self
    }
    pub fn markers(mut self, markers: Markers) -> Self {
        self.markers = Some(markers);
        self
    }

    pub fn build(self) -> Result<ExperimentConfig, ConfigError> {
        let repetitions = self
            .repetitions
            .ok_or(ConfigError::MissingParameter("repetitions"))?;
        if repetitions == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "repetitions",
                reason: "must be a positive integer".to_string(),
            });
        }

        let markers = self.markers.unwrap_or_default();
        if markers.start.is_empty() || markers.end.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "markers",
                reason: "start and end markers must be non-empty".to_string(),
            });
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidParameter {
                    name: "timeout",
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(ExperimentConfig {
            paths: self.paths.ok_or(ConfigError::MissingParameter("paths"))?,
            repetitions,
            persist: self.persist.ok_or(ConfigError::MissingParameter("persist"))?,
            stdin_token: self
                .stdin_token
                .unwrap_or_else(|| DEFAULT_STDIN_TOKEN.to_string()),
            timeout: self.timeout,
            skip_setup: self.skip_setup,
            extraction_policy: self.extraction_policy.unwrap_or_default(),
            markers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> ProjectPaths {
        ProjectPaths {
            source_dir: PathBuf::from("/src/gromacs"),
            build_root: PathBuf::from("/src/gromacs/experiments"),
            workspace: PathBuf::from("/src/gromacs/experiments/exp-1"),
            results_dir: PathBuf::from("/src/gromacs/experiments/files"),
        }
    }

    #[test]
    fn profile_names_round_trip_through_from_str() {
        for profile in BuildProfile::ALL {
            assert_eq!(profile.name().parse::<BuildProfile>().unwrap(), profile);
        }
        assert_eq!(
            "profiling".parse::<BuildProfile>().unwrap(),
            BuildProfile::ProfilingRelease
        );
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert_eq!(
            "fast".parse::<BuildProfile>(),
            Err(ConfigError::UnknownProfile("fast".to_string()))
        );
    }

    #[test]
    fn profiling_release_adds_pg_flags() {
        let flags = BuildProfile::ProfilingRelease.cmake_flags();
        assert!(flags.contains(&"-DCMAKE_BUILD_TYPE=Release".to_string()));
        assert!(flags.contains(&"-DCMAKE_CXX_FLAGS=-pg".to_string()));
        assert!(flags.contains(&"-DCMAKE_EXE_LINKER_FLAGS=-pg".to_string()));
        assert!(flags.contains(&"-DCMAKE_SHARED_LINKER_FLAGS=-pg".to_string()));

        let debug = BuildProfile::Debug.cmake_flags();
        assert_eq!(
            debug,
            vec!["-DGMX_BUILD_OWN_FFTW=ON", "-DCMAKE_BUILD_TYPE=Debug"]
        );
    }

    #[test]
    fn all_selection_runs_release_before_debug() {
        let selection: ProfileSelection = "all".parse().unwrap();
        assert_eq!(
            selection.profiles(),
            vec![BuildProfile::Release, BuildProfile::Debug]
        );
        let single: ProfileSelection = "debug".parse().unwrap();
        assert_eq!(single.profiles(), vec![BuildProfile::Debug]);
    }

    #[test]
    fn builder_applies_defaults() {
        let config = ExperimentConfigBuilder::new()
            .paths(paths())
            .repetitions(10)
            .persist(true)
            .build()
            .unwrap();

        assert_eq!(config.stdin_token, DEFAULT_STDIN_TOKEN);
        assert_eq!(config.markers, Markers::default());
        assert_eq!(config.extraction_policy, ExtractionFailurePolicy::Abort);
        assert!(config.timeout.is_none());
        assert!(!config.skip_setup);
    }

    #[test]
    fn builder_rejects_zero_repetitions() {
        let result = ExperimentConfigBuilder::new()
            .paths(paths())
            .repetitions(0)
            .persist(false)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "repetitions",
                ..
            })
        ));
    }

    #[test]
    fn builder_reports_missing_paths() {
        let result = ExperimentConfigBuilder::new()
            .repetitions(3)
            .persist(false)
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("paths")));
    }

    #[test]
    fn builder_rejects_empty_markers() {
        let result = ExperimentConfigBuilder::new()
            .paths(paths())
            .repetitions(1)
            .persist(false)
            .markers(Markers {
                start: String::new(),
                end: " !".to_string(),
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "markers", .. })
        ));
    }

    #[test]
    fn extraction_policy_parses_known_names() {
        assert_eq!(
            ExtractionFailurePolicy::parse("skip", "NaN").unwrap(),
            ExtractionFailurePolicy::Skip
        );
        assert_eq!(
            ExtractionFailurePolicy::parse("Sentinel", "NaN").unwrap(),
            ExtractionFailurePolicy::Sentinel("NaN".to_string())
        );
        assert!(ExtractionFailurePolicy::parse("retry", "NaN").is_err());
    }

    #[test]
    fn build_config_rejects_zero_jobs_and_timeout() {
        let paths = ProjectPaths {
            source_dir: PathBuf::from("/src"),
            build_root: PathBuf::from("/builds"),
            workspace: PathBuf::from("/work"),
            results_dir: PathBuf::from("/work/files"),
        };

        assert!(matches!(
            BuildConfig::new(paths.clone(), None, Some(Duration::ZERO)),
            Err(ConfigError::InvalidParameter { name: "timeout", .. })
        ));
        assert!(matches!(
            BuildConfig::new(paths.clone(), Some(0), None),
            Err(ConfigError::InvalidParameter { name: "jobs", .. })
        ));
        let config = BuildConfig::new(paths, Some(8), Some(Duration::from_secs(3600))).unwrap();
        assert_eq!(config.jobs, Some(8));
    }
}
