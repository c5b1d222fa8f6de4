mod defaults;
mod file;

pub use defaults::DefaultsConfig;
pub use file::FileConfig;

use crate::cli::{BuildArgs, FetchArgs, PathArgs, ProfileArgs, RunArgs};
use crate::error::{CliError, Result};
use directories::ProjectDirs;
use mdbench::config::{
    self as core_config, BuildProfile, ExtractionFailurePolicy, Markers, ProfileSelection,
    ProjectPaths,
};
use mdbench::profiler::Profiler;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Options shared by every subcommand: the config file and `--set` overrides.
pub struct ConfigSources<'a> {
    pub config_path: Option<&'a Path>,
    pub set_values: &'a [String],
}

pub struct BuildSettings {
    pub core: core_config::BuildConfig,
    pub profiles: Vec<BuildProfile>,
    pub inputs: InputSettings,
    pub download_inputs: bool,
}

pub struct RunSettings {
    pub core: core_config::ExperimentConfig,
    pub selection: ProfileSelection,
}

pub struct ProfileSettings {
    pub core: core_config::ExperimentConfig,
    pub profiler: Profiler,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSettings {
    pub workspace: PathBuf,
    pub base_url: String,
    pub force: bool,
}

pub fn load_file_config(sources: &ConfigSources) -> Result<FileConfig> {
    let file_config = match sources.config_path {
        Some(path) => FileConfig::from_file(path)?,
        None => match default_config_path() {
            Some(path) if path.is_file() => {
                info!("Using configuration file {:?}", &path);
                FileConfig::from_file(&path)?
            }
            _ => FileConfig::default(),
        },
    };
    apply_set_values(file_config, sources.set_values)
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "mdbench", "mdbench").map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn build_build_settings(args: &BuildArgs, file_config: &FileConfig) -> Result<BuildSettings> {
    let defaults = DefaultsConfig::default();
    let profiles = parse_build_modes(&args.mode)?;
    let paths = resolve_paths(&args.paths, None, file_config, &defaults)?;
    let build_file = file_config.build.clone().unwrap_or_default();

    let core = core_config::BuildConfig::new(
        paths.clone(),
        args.jobs.or(build_file.jobs),
        build_file.timeout_secs.map(Duration::from_secs),
    )?;

    Ok(BuildSettings {
        core,
        profiles,
        inputs: input_settings(paths.workspace, file_config, &defaults, false),
        download_inputs: !args.skip_download,
    })
}

pub fn build_run_settings(args: &RunArgs, file_config: &FileConfig) -> Result<RunSettings> {
    let selection: ProfileSelection = args
        .mode
        .parse()
        .map_err(|e: core_config::ConfigError| CliError::Argument(e.to_string()))?;
    let core = experiment_config(
        &args.paths,
        args.results_dir.as_deref(),
        args.repetitions,
        !args.no_write,
        args.skip_setup,
        args.timeout_secs,
        file_config,
    )?;
    Ok(RunSettings { core, selection })
}

/// Parses the profiler first so an unsupported name fails before anything else.
pub fn build_profile_settings(
    args: &ProfileArgs,
    file_config: &FileConfig,
) -> Result<ProfileSettings> {
    let profiler: Profiler = args.profiler.parse()?;
    let core = experiment_config(
        &args.paths,
        args.results_dir.as_deref(),
        args.repetitions,
        !args.no_write,
        args.skip_setup,
        args.timeout_secs,
        file_config,
    )?;
    Ok(ProfileSettings { core, profiler })
}

pub fn build_input_settings(args: &FetchArgs, file_config: &FileConfig) -> Result<InputSettings> {
    let defaults = DefaultsConfig::default();
    let paths = resolve_paths(&args.paths, None, file_config, &defaults)?;
    Ok(input_settings(
        paths.workspace,
        file_config,
        &defaults,
        args.force,
    ))
}

fn input_settings(
    workspace: PathBuf,
    file_config: &FileConfig,
    defaults: &DefaultsConfig,
    force: bool,
) -> InputSettings {
    let base_url = file_config
        .inputs
        .as_ref()
        .and_then(|i| i.base_url.clone())
        .unwrap_or_else(|| defaults.inputs_base_url.clone());
    InputSettings {
        workspace,
        base_url,
        force,
    }
}

fn experiment_config(
    path_args: &PathArgs,
    results_dir: Option<&Path>,
    repetitions: usize,
    persist: bool,
    skip_setup: bool,
    timeout_secs: Option<u64>,
    file_config: &FileConfig,
) -> Result<core_config::ExperimentConfig> {
    let defaults = DefaultsConfig::default();
    let paths = resolve_paths(path_args, results_dir, file_config, &defaults)?;
    let run_file = file_config.run.clone().unwrap_or_default();
    let extraction_file = file_config.extraction.clone().unwrap_or_default();

    let policy = ExtractionFailurePolicy::parse(
        run_file
            .on_extraction_failure
            .as_deref()
            .unwrap_or(&defaults.extraction_failure_policy),
        run_file.sentinel.as_deref().unwrap_or(&defaults.sentinel),
    )?;

    let markers = Markers {
        start: extraction_file
            .start_marker
            .unwrap_or(defaults.start_marker),
        end: extraction_file.end_marker.unwrap_or(defaults.end_marker),
    };

    let config = core_config::ExperimentConfigBuilder::new()
        .paths(paths)
        .repetitions(repetitions)
        .persist(persist)
        .skip_setup(skip_setup)
        .stdin_token(run_file.stdin_token.unwrap_or(defaults.stdin_token))
        .timeout(timeout_secs.or(run_file.timeout_secs).map(Duration::from_secs))
        .extraction_policy(policy)
        .markers(markers)
        .build()?;
    debug!("Resolved experiment configuration: {:?}", &config);
    Ok(config)
}

fn resolve_paths(
    args: &PathArgs,
    results_dir: Option<&Path>,
    file_config: &FileConfig,
    defaults: &DefaultsConfig,
) -> Result<ProjectPaths> {
    let file_paths = file_config.paths.clone().unwrap_or_default();
    let pick = |cli: Option<&Path>, file: Option<PathBuf>, default: &str| -> Result<PathBuf> {
        let chosen = cli
            .map(Path::to_path_buf)
            .or(file)
            .unwrap_or_else(|| PathBuf::from(default));
        Ok(std::path::absolute(&chosen)?)
    };

    Ok(ProjectPaths {
        source_dir: pick(
            args.source_dir.as_deref(),
            file_paths.source_dir,
            &defaults.source_dir,
        )?,
        build_root: pick(
            args.build_root.as_deref(),
            file_paths.build_root,
            &defaults.build_root,
        )?,
        workspace: pick(
            args.workspace.as_deref(),
            file_paths.workspace,
            &defaults.workspace,
        )?,
        results_dir: pick(results_dir, file_paths.results_dir, &defaults.results_dir)?,
    })
}

fn parse_build_modes(mode: &str) -> Result<Vec<BuildProfile>> {
    if mode.trim().eq_ignore_ascii_case("all") {
        return Ok(BuildProfile::ALL.to_vec());
    }
    mode.parse::<BuildProfile>()
        .map(|p| vec![p])
        .map_err(|e| CliError::Argument(e.to_string()))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;
        let parse_u64 = || -> Result<u64> {
            value_str.parse().map_err(|_| {
                CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
            })
        };

        match key {
            "paths.source-dir" => {
                config.paths.get_or_insert_with(Default::default).source_dir =
                    Some(PathBuf::from(value_str));
            }
            "paths.build-root" => {
                config.paths.get_or_insert_with(Default::default).build_root =
                    Some(PathBuf::from(value_str));
            }
            "paths.workspace" => {
                config.paths.get_or_insert_with(Default::default).workspace =
                    Some(PathBuf::from(value_str));
            }
            "paths.results-dir" => {
                config.paths.get_or_insert_with(Default::default).results_dir =
                    Some(PathBuf::from(value_str));
            }
            "build.jobs" => {
                config.build.get_or_insert_with(Default::default).jobs = Some(parse_u64()? as usize);
            }
            "build.timeout-secs" => {
                config.build.get_or_insert_with(Default::default).timeout_secs = Some(parse_u64()?);
            }
            "run.stdin-token" => {
                config.run.get_or_insert_with(Default::default).stdin_token =
                    Some(value_str.to_string());
            }
            "run.timeout-secs" => {
                config.run.get_or_insert_with(Default::default).timeout_secs = Some(parse_u64()?);
            }
            "run.on-extraction-failure" => {
                config
                    .run
                    .get_or_insert_with(Default::default)
                    .on_extraction_failure = Some(value_str.to_string());
            }
            "run.sentinel" => {
                config.run.get_or_insert_with(Default::default).sentinel =
                    Some(value_str.to_string());
            }
            "extraction.start-marker" => {
                config
                    .extraction
                    .get_or_insert_with(Default::default)
                    .start_marker = Some(value_str.to_string());
            }
            "extraction.end-marker" => {
                config
                    .extraction
                    .get_or_insert_with(Default::default)
                    .end_marker = Some(value_str.to_string());
            }
            "inputs.base-url" => {
                config.inputs.get_or_insert_with(Default::default).base_url =
                    Some(value_str.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn run_args() -> RunArgs {
        RunArgs {
            paths: PathArgs::default(),
            repetitions: 10,
            mode: "all".to_string(),
            results_dir: None,
            no_write: false,
            skip_setup: false,
            timeout_secs: None,
        }
    }

    fn profile_args(profiler: &str) -> ProfileArgs {
        ProfileArgs {
            paths: PathArgs::default(),
            profiler: profiler.to_string(),
            repetitions: 1,
            results_dir: None,
            no_write: true,
            skip_setup: false,
            timeout_secs: None,
        }
    }

    #[test]
    fn run_settings_use_defaults() {
        let settings = build_run_settings(&run_args(), &FileConfig::default()).unwrap();
        let core = settings.core;

        assert_eq!(settings.selection, ProfileSelection::All);
        assert_eq!(core.repetitions, 10);
        assert!(core.persist);
        assert_eq!(core.stdin_token, "13");
        assert_eq!(core.markers, Markers::default());
        assert_eq!(core.extraction_policy, ExtractionFailurePolicy::Abort);
        assert!(core.timeout.is_none());
        assert!(core.paths.workspace.is_absolute());
        assert!(core.paths.results_dir.ends_with("files"));
    }

    #[test]
    fn file_values_are_merged_and_cli_wins() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        let toml = r#"
            [paths]
            build-root = "/opt/experiments"
            workspace = "/opt/experiments/exp-1"
            results-dir = "/opt/experiments/files"

            [run]
            stdin-token = "15"
            timeout-secs = 900
            on-extraction-failure = "sentinel"
            sentinel = "-1"

            [extraction]
            start-marker = "Elapsed: "
            end-marker = " s"
            "#;
        fs::write(&cfg_path, toml).unwrap();
        let file_config = FileConfig::from_file(&cfg_path).unwrap();

        let mut args = run_args();
        args.mode = "debug".to_string();
        args.timeout_secs = Some(60);
        args.results_dir = Some(PathBuf::from("/tmp/results"));

        let settings = build_run_settings(&args, &file_config).unwrap();
        let core = settings.core;

        assert_eq!(
            settings.selection,
            ProfileSelection::Single(BuildProfile::Debug)
        );
        assert_eq!(core.paths.build_root, PathBuf::from("/opt/experiments"));
        assert_eq!(core.paths.workspace, PathBuf::from("/opt/experiments/exp-1"));
        assert_eq!(core.paths.results_dir, PathBuf::from("/tmp/results"));
        assert_eq!(core.stdin_token, "15");
        assert_eq!(core.timeout, Some(Duration::from_secs(60)));
        assert_eq!(
            core.extraction_policy,
            ExtractionFailurePolicy::Sentinel("-1".to_string())
        );
        assert_eq!(core.markers.start, "Elapsed: ");
        assert_eq!(core.markers.end, " s");
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "[run]\nrepeat = 3\n").unwrap();

        let result = FileConfig::from_file(&cfg_path);

        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn set_values_override_file() {
        let config = apply_set_values(
            FileConfig::default(),
            &[
                "run.stdin-token=14".to_string(),
                "build.jobs=6".to_string(),
                "extraction.end-marker= sec".to_string(),
            ],
        )
        .unwrap();

        assert_eq!(config.run.unwrap().stdin_token.as_deref(), Some("14"));
        assert_eq!(config.build.unwrap().jobs, Some(6));
        assert_eq!(
            config.extraction.unwrap().end_marker.as_deref(),
            Some(" sec")
        );
    }

    #[test]
    fn malformed_or_unknown_set_values_fail() {
        assert!(matches!(
            apply_set_values(FileConfig::default(), &["run.stdin-token".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            apply_set_values(FileConfig::default(), &["run.colour=red".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            apply_set_values(FileConfig::default(), &["build.jobs=many".to_string()]),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn zero_repetitions_are_rejected() {
        let mut args = run_args();
        args.repetitions = 0;
        assert!(build_run_settings(&args, &FileConfig::default()).is_err());
    }

    #[test]
    fn invalid_mode_is_an_argument_error() {
        let mut args = run_args();
        args.mode = "turbo".to_string();
        assert!(matches!(
            build_run_settings(&args, &FileConfig::default()),
            Err(CliError::Argument(_))
        ));
    }

    #[test]
    fn unsupported_profiler_fails_fast() {
        let result = build_profile_settings(&profile_args("valgrind"), &FileConfig::default());
        assert!(matches!(
            result,
            Err(CliError::Core(mdbench::error::EngineError::UnsupportedProfiler(_)))
        ));

        let settings =
            build_profile_settings(&profile_args("gprof"), &FileConfig::default()).unwrap();
        assert_eq!(settings.profiler, Profiler::Gprof);
        assert!(!settings.core.persist);
    }

    #[test]
    fn build_modes_expand_all_to_every_profile() {
        assert_eq!(parse_build_modes("all").unwrap(), BuildProfile::ALL.to_vec());
        assert_eq!(
            parse_build_modes("profiling-release").unwrap(),
            vec![BuildProfile::ProfilingRelease]
        );
        assert!(parse_build_modes("fast").is_err());
    }

    #[test]
    fn build_settings_reject_zero_jobs() {
        let args = BuildArgs {
            paths: PathArgs::default(),
            mode: "release".to_string(),
            jobs: Some(0),
            skip_download: true,
        };
        assert!(build_build_settings(&args, &FileConfig::default()).is_err());
    }

    #[test]
    fn build_settings_reject_zero_timeout_from_set() {
        let file_config =
            apply_set_values(FileConfig::default(), &["build.timeout-secs=0".to_string()])
                .unwrap();
        let args = BuildArgs {
            paths: PathArgs::default(),
            mode: "debug".to_string(),
            jobs: None,
            skip_download: true,
        };

        let result = build_build_settings(&args, &file_config);

        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("timeout")));
    }

    #[test]
    fn input_settings_take_base_url_from_file() {
        let mut file_config = FileConfig::default();
        file_config.inputs = Some(file::FileInputsConfig {
            base_url: Some("http://mirror.local/inputs/".to_string()),
        });
        let args = FetchArgs {
            paths: PathArgs {
                workspace: Some(PathBuf::from("/data/exp")),
                ..Default::default()
            },
            force: true,
        };

        let settings = build_input_settings(&args, &file_config).unwrap();

        assert_eq!(settings.base_url, "http://mirror.local/inputs/");
        assert_eq!(settings.workspace, PathBuf::from("/data/exp"));
        assert!(settings.force);
    }
}
