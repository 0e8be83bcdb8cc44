use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub template: TemplateConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage namespace; charts live in `<namespace>.json`.
    /// Default: `charts`
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            namespace: default_namespace(),
        }
    }
}

/// Cold-start chart shape, used when a chart has nothing stored yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_root_name")]
    pub root_name: String,
    #[serde(default = "default_child_names")]
    pub child_names: Vec<String>,
    /// Days between the template's start and end date
    #[serde(default = "default_span_days")]
    pub span_days: u32,
    /// Optional JSON template file, relative to the `stepchart/` directory.
    /// Takes precedence over the fields above when set.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            root_name: default_root_name(),
            child_names: default_child_names(),
            span_days: default_span_days(),
            file: None,
        }
    }
}

fn default_namespace() -> String {
    "charts".to_string()
}

fn default_root_name() -> String {
    "New Project".to_string()
}

fn default_child_names() -> Vec<String> {
    vec!["Step 1".to_string(), "Step 2".to_string()]
}

fn default_span_days() -> u32 {
    7
}
