use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "mdbench - build GROMACS in debug, release and profiling configurations and benchmark its energy-minimisation run.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a TOML configuration file.
    /// Defaults to `config.toml` in the user configuration directory when present.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S run.timeout-secs=600
    #[arg(short = 'S', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the simulation binary for each configuration that is missing one,
    /// and download the pipeline input files.
    Build(BuildArgs),
    /// Run the timed experiment N times per configuration and collect execution times.
    Run(RunArgs),
    /// Run the simulation under a profiler using the instrumented release build.
    Profile(ProfileArgs),
    /// Download the pipeline input files (6LVN.pdb, ions.mdp) into the workspace.
    FetchInputs(FetchArgs),
}

/// Paths shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// CMake source directory of the simulation package.
    #[arg(long, value_name = "PATH")]
    pub source_dir: Option<PathBuf>,

    /// Directory holding the per-configuration build directories.
    #[arg(long, value_name = "PATH")]
    pub build_root: Option<PathBuf>,

    /// Directory containing the input files; pipeline commands run here.
    #[arg(short, long, value_name = "PATH")]
    pub workspace: Option<PathBuf>,
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Configurations to build: debug, release, profiling-release, or all.
    #[arg(short = 'm', long = "mode", value_name = "CONFIG", default_value = "all")]
    pub mode: String,

    /// Number of parallel make jobs.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub jobs: Option<usize>,

    /// Do not download missing input files.
    #[arg(long)]
    pub skip_download: bool,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Number of measured repetitions per configuration.
    #[arg(short = 'n', long = "nruns", value_name = "INT", default_value_t = 10)]
    pub repetitions: usize,

    /// Configuration to run: debug, release, profiling-release, or all (release then debug).
    #[arg(short = 'm', long = "mode", value_name = "CONFIG", default_value = "all")]
    pub mode: String,

    /// Directory the result CSV files are written to.
    #[arg(short, long, value_name = "PATH")]
    pub results_dir: Option<PathBuf>,

    /// Keep results in memory only; do not write CSV files.
    #[arg(long)]
    pub no_write: bool,

    /// Skip the setup pipeline and rerun only the measured step.
    #[arg(long)]
    pub skip_setup: bool,

    /// Kill any single command that runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

/// Arguments for the `profile` subcommand.
#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Profiler to wrap the simulation with: perf or gprof.
    #[arg(required = true, value_name = "PROFILER")]
    pub profiler: String,

    /// Number of profiled repetitions.
    #[arg(short = 'n', long = "nruns", value_name = "INT", default_value_t = 1)]
    pub repetitions: usize,

    /// Directory the report files are written to.
    #[arg(short, long, value_name = "PATH")]
    pub results_dir: Option<PathBuf>,

    /// Keep reports in memory only; do not write files.
    #[arg(long)]
    pub no_write: bool,

    /// Skip the setup pipeline and rerun only the profiled step.
    #[arg(long, alias = "simulation-only")]
    pub skip_setup: bool,

    /// Kill any single command that runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

/// Arguments for the `fetch-inputs` subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Re-download files that already exist.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults_are_ten_repetitions_of_all() {
        let cli = Cli::parse_from(["mdbench", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.repetitions, 10);
        assert_eq!(args.mode, "all");
        assert!(!args.no_write);
        assert!(!args.skip_setup);
    }

    #[test]
    fn profile_requires_profiler_argument() {
        assert!(Cli::try_parse_from(["mdbench", "profile"]).is_err());
        let cli = Cli::parse_from(["mdbench", "profile", "perf", "-n", "3"]);
        let Commands::Profile(args) = cli.command else {
            panic!("expected profile command");
        };
        assert_eq!(args.profiler, "perf");
        assert_eq!(args.repetitions, 3);
    }

    #[test]
    fn profile_accepts_skip_setup_and_its_alias() {
        for flag in ["--skip-setup", "--simulation-only"] {
            let cli = Cli::parse_from(["mdbench", "profile", "gprof", flag]);
            let Commands::Profile(args) = cli.command else {
                panic!("expected profile command");
            };
            assert!(args.skip_setup, "{} should skip setup", flag);
        }
    }

    #[test]
    fn global_flags_are_accepted_after_subcommand() {
        let cli = Cli::parse_from([
            "mdbench",
            "build",
            "-vv",
            "-S",
            "build.jobs=4",
            "--skip-download",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.set_values, vec!["build.jobs=4".to_string()]);
    }
}
