use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use crate::model::config::TemplateConfig;
use crate::model::step::RawStep;
use crate::ops::build::default_template;

/// Error type for fetching a chart template
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("could not read template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse template {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Source of the tree a chart starts from when nothing is stored for it
pub trait TemplateSource {
    fn fetch_default_template(&self) -> Result<RawStep, TemplateError>;
}

/// Generated template: configured root and children over `span_days` from today
#[derive(Debug, Clone)]
pub struct BuiltinTemplate {
    config: TemplateConfig,
    today: NaiveDate,
}

impl BuiltinTemplate {
    pub fn new(config: TemplateConfig) -> Self {
        Self::starting(config, Local::now().date_naive())
    }

    /// Template anchored at a fixed day instead of today
    pub fn starting(config: TemplateConfig, today: NaiveDate) -> Self {
        BuiltinTemplate { config, today }
    }
}

impl TemplateSource for BuiltinTemplate {
    fn fetch_default_template(&self) -> Result<RawStep, TemplateError> {
        Ok(default_template(self.today, &self.config))
    }
}

/// Template read from a JSON file in the stored chart format
#[derive(Debug, Clone)]
pub struct FileTemplate {
    path: PathBuf,
}

impl FileTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTemplate { path: path.into() }
    }
}

impl TemplateSource for FileTemplate {
    fn fetch_default_template(&self) -> Result<RawStep, TemplateError> {
        let content = fs::read_to_string(&self.path).map_err(|source| TemplateError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| TemplateError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// Pick the template source for a workspace: the configured file if any,
/// otherwise the generated default.
pub fn template_source(chart_dir: &Path, config: &TemplateConfig) -> Box<dyn TemplateSource> {
    match &config.file {
        Some(file) => Box::new(FileTemplate::new(chart_dir.join(file))),
        None => Box::new(BuiltinTemplate::new(config.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builtin_template_starts_on_given_day() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let raw = BuiltinTemplate::starting(TemplateConfig::default(), day)
            .fetch_default_template()
            .unwrap();
        let dates = raw.dates.unwrap();
        assert_eq!(dates.start, day);
        assert_eq!(dates.end, NaiveDate::from_ymd_opt(2025, 2, 8).unwrap());
        assert_eq!(raw.steps.len(), 2);
    }

    #[test]
    fn file_template_reads_json() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("template.json"),
            r#"{"name":"Launch","dates":{"start":"2025-01-01","end":"2025-01-31"},"steps":[{"name":"Plan"}]}"#,
        )
        .unwrap();
        let config = TemplateConfig {
            file: Some("template.json".to_string()),
            ..Default::default()
        };
        let raw = template_source(dir.path(), &config)
            .fetch_default_template()
            .unwrap();
        assert_eq!(raw.name, "Launch");
        assert_eq!(raw.steps[0].name, "Plan");
        assert_eq!(raw.steps[0].dates, None);
    }

    #[test]
    fn missing_template_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = FileTemplate::new(dir.path().join("nope.json"))
            .fetch_default_template()
            .unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
    }

    #[test]
    fn invalid_template_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "42").unwrap();
        let err = FileTemplate::new(path).fetch_default_template().unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }
}
