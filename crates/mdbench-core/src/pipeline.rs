//! The fixed simulation pipeline: protein preparation, solvation, ion
//! placement and energy minimisation of the 6LVN structure.
//!
//! The external tool is sensitive to flag syntax, so the templates below are
//! reproduced exactly; only [`BIN_PLACEHOLDER`] is substituted.

use crate::config::BuildProfile;
use crate::process::shell_quote;
use std::path::{Path, PathBuf};

pub const BIN_PLACEHOLDER: &str = "##BINPATH##";

pub const SETUP_STEPS: [&str; 6] = [
    "##BINPATH## pdb2gmx -f 6LVN.pdb -o 6LVN_processed.gro -water spce -ff oplsaa",
    "##BINPATH## editconf -f 6LVN_processed.gro -o 6LVN_newbox.gro -c -d 1.0 -bt cubic",
    "##BINPATH## solvate -cp 6LVN_newbox.gro -cs spc216.gro -o 6LVN_solv.gro -p topol.top",
    "##BINPATH## grompp -f ions.mdp -c 6LVN_solv.gro -p topol.top -o ions.tpr",
    "##BINPATH## genion -s ions.tpr -o 6LVN_solv_ions.gro -p topol.top -pname NA -nname CL -neutral",
    "##BINPATH## grompp -f ions.mdp -c 6LVN_solv_ions.gro -p topol.top -o em.tpr",
];

pub const SIMULATION_STEP: &str = "##BINPATH## mdrun -v -deffnm em";

/// Files the pipeline reads from the workspace.
pub const INPUT_FILES: [&str; 2] = ["6LVN.pdb", "ions.mdp"];

// Any failing step fails the composite, so a broken setup never reaches mdrun.
const STEP_SEPARATOR: &str = " && ";

const BINARY_RELATIVE_PATH: [&str; 2] = ["bin", "gmx"];

/// Conventional location of a configuration's binary.
pub fn binary_path(build_root: &Path, profile: BuildProfile) -> PathBuf {
    BINARY_RELATIVE_PATH
        .iter()
        .fold(build_root.join(profile.dir_name()), |path, part| {
            path.join(part)
        })
}

/// The setup and measured command lines, bound to one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPipeline {
    pub binary: PathBuf,
    pub setup_command: String,
    pub measured_command: String,
}

pub fn resolve(binary: &Path, measured_template: &str) -> ResolvedPipeline {
    let bin = shell_quote(binary);
    let setup_command = SETUP_STEPS
        .iter()
        .map(|step| step.replace(BIN_PLACEHOLDER, &bin))
        .collect::<Vec<_>>()
        .join(STEP_SEPARATOR);
    ResolvedPipeline {
        binary: binary.to_path_buf(),
        setup_command,
        measured_command: measured_template.replace(BIN_PLACEHOLDER, &bin),
    }
}
