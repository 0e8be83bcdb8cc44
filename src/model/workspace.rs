use std::path::PathBuf;

use super::config::ChartConfig;

/// A loaded stepchart workspace
#[derive(Debug)]
pub struct Workspace {
    /// Root directory of the workspace (parent of `stepchart/`)
    pub root: PathBuf,
    /// Path to the `stepchart/` directory
    pub chart_dir: PathBuf,
    /// Parsed config.toml
    pub config: ChartConfig,
}
