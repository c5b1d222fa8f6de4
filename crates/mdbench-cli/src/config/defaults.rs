use mdbench::config::{DEFAULT_END_MARKER, DEFAULT_START_MARKER, DEFAULT_STDIN_TOKEN};

pub const INPUTS_BASE_URL: &str = "https://www.ic.unicamp.br/~edson/disciplinas/mo833/2021-1s/anexos/";

/// Layout of a classic experiment tree, relative to the experiment directory.
pub struct DefaultsConfig {
    pub source_dir: String,
    pub build_root: String,
    pub workspace: String,
    pub results_dir: String,
    pub stdin_token: String,
    pub start_marker: String,
    pub end_marker: String,
    pub extraction_failure_policy: String,
    pub sentinel: String,
    pub inputs_base_url: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            source_dir: "../..".to_string(),
            build_root: "..".to_string(),
            workspace: ".".to_string(),
            results_dir: "files".to_string(),
            stdin_token: DEFAULT_STDIN_TOKEN.to_string(),
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            extraction_failure_policy: "abort".to_string(),
            sentinel: "NaN".to_string(),
            inputs_base_url: INPUTS_BASE_URL.to_string(),
        }
    }
}
