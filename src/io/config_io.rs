use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::ChartConfig;
use crate::model::workspace::Workspace;

/// Name of the directory that marks a workspace
pub const CHART_DIR: &str = "stepchart";

/// Name of the config file inside the chart directory
pub const CONFIG_FILE: &str = "config.toml";

const CONFIG_TOML_TEMPLATE: &str = r##"[workspace]
name = "{name}"

[store]
# Charts are stored in stepchart/<namespace>.json
namespace = "charts"

[template]
# Shape of a new chart when nothing is stored for it yet.
root_name = "New Project"
child_names = ["Step 1", "Step 2"]
span_days = 7

# Use a JSON chart file (relative to stepchart/) as the template instead:
# file = "template.json"
"##;

/// Error type for workspace config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a stepchart workspace: no stepchart/config.toml found")]
    NotAWorkspace,
    #[error("workspace already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the workspace by walking up from `start`, looking for a
/// `stepchart/config.toml`.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CHART_DIR).join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotAWorkspace);
        }
    }
}

/// Read and parse `config.toml` from the chart directory
pub fn read_config(chart_dir: &Path) -> Result<ChartConfig, ConfigError> {
    let config_path = chart_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Load the workspace rooted at `root`
pub fn load_workspace(root: &Path) -> Result<Workspace, ConfigError> {
    let chart_dir = root.join(CHART_DIR);
    if !chart_dir.is_dir() {
        return Err(ConfigError::NotAWorkspace);
    }
    let config = read_config(&chart_dir)?;
    Ok(Workspace {
        root: root.to_path_buf(),
        chart_dir,
        config,
    })
}

/// Create `stepchart/config.toml` under `root`.
/// Refuses to overwrite an existing config unless `force` is set.
pub fn init_workspace(root: &Path, name: &str, force: bool) -> Result<Workspace, ConfigError> {
    let chart_dir = root.join(CHART_DIR);
    let config_path = chart_dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        return Err(ConfigError::AlreadyExists(chart_dir));
    }
    fs::create_dir_all(&chart_dir)?;
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    fs::write(&config_path, CONFIG_TOML_TEMPLATE.replace("{name}", &escaped))?;
    load_workspace(root)
}
