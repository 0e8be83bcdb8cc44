//! Recovery log and atomic file writes.
//!
//! Chart data the store had to drop or failed to save is appended to
//! `.recovery.log` in the chart directory, so nothing is lost silently.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

const LOG_FILE: &str = ".recovery.log";

const PREAMBLE: &str = "\
<!-- stepchart recovery log (append-only).
     Chart data that could not be read or saved is copied here.
     Delete the file once you have recovered what you need. -->
";

/// What happened to the chart data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incident {
    /// The namespace file was not a JSON object; it was moved to `backup`
    UnreadableStore { backup: PathBuf },
    /// A stored chart could not be built and was replaced by the template
    UnreadableChart { chart: String },
    /// The namespace file could not be written
    FailedWrite,
}

impl Incident {
    fn title(&self) -> String {
        match self {
            Incident::UnreadableStore { .. } => "unreadable chart store".to_string(),
            Incident::UnreadableChart { chart } => format!("unreadable chart {}", chart),
            Incident::FailedWrite => "chart store write failed".to_string(),
        }
    }
}

/// One incident, with the data involved
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub at: DateTime<Utc>,
    pub incident: Incident,
    /// File the data came from or was headed to
    pub file: PathBuf,
    pub error: String,
    /// The dropped or unsaved data, verbatim
    pub payload: String,
}

impl RecoveryEntry {
    pub fn now(incident: Incident, file: &Path, error: impl ToString, payload: impl Into<String>) -> Self {
        RecoveryEntry {
            at: Utc::now(),
            incident,
            file: file.to_path_buf(),
            error: error.to_string(),
            payload: payload.into(),
        }
    }

    fn render(&self) -> String {
        let mut out = format!(
            "\n## {} {}\n\n- file: {}\n- error: {}\n",
            self.at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.incident.title(),
            self.file.display(),
            self.error,
        );
        if let Incident::UnreadableStore { backup } = &self.incident {
            out.push_str(&format!("- backup: {}\n", backup.display()));
        }
        if !self.payload.is_empty() {
            let newline = if self.payload.ends_with('\n') { "" } else { "\n" };
            out.push_str(&format!("\n```json\n{}{}```\n", self.payload, newline));
        }
        out
    }
}

pub fn recovery_log_path(chart_dir: &Path) -> PathBuf {
    chart_dir.join(LOG_FILE)
}

/// Replace `path` with `content` in one step: write a sibling temp file,
/// then rename it over the target.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Append an entry to the chart directory's recovery log. A log that
/// cannot be written is reported through tracing and otherwise ignored.
pub fn log_recovery(chart_dir: &Path, entry: RecoveryEntry) {
    let path = recovery_log_path(chart_dir);
    if let Err(e) = append(&path, &entry) {
        tracing::warn!(path = %path.display(), error = %e, "could not write recovery log");
    }
}

fn append(path: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        file.write_all(PREAMBLE.as_bytes())?;
    }
    file.write_all(entry.render().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn at_noon(incident: Incident, payload: &str) -> RecoveryEntry {
        RecoveryEntry {
            at: DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            incident,
            file: PathBuf::from("stepchart/charts.json"),
            error: "expected value at line 1 column 1".to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charts.json");
        atomic_write(&path, b"{}").unwrap();
        atomic_write(&path, b"{\"0\": 1}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"0\": 1}");
    }

    #[test]
    fn chart_entry_keeps_payload() {
        let dir = TempDir::new().unwrap();
        let incident = Incident::UnreadableChart {
            chart: "4".to_string(),
        };
        log_recovery(dir.path(), at_noon(incident, "[1, 2"));
        let content = fs::read_to_string(recovery_log_path(dir.path())).unwrap();
        assert!(content.starts_with("<!-- stepchart recovery log"));
        assert!(content.contains("## 2025-03-01 12:00:00 UTC unreadable chart 4\n"));
        assert!(content.contains("- file: stepchart/charts.json\n"));
        assert!(content.contains("```json\n[1, 2\n```\n"));
    }

    #[test]
    fn store_entry_names_backup() {
        let dir = TempDir::new().unwrap();
        let incident = Incident::UnreadableStore {
            backup: PathBuf::from("stepchart/charts.json.bak"),
        };
        log_recovery(dir.path(), at_noon(incident, ""));
        let content = fs::read_to_string(recovery_log_path(dir.path())).unwrap();
        assert!(content.contains("- backup: stepchart/charts.json.bak\n"));
        assert!(!content.contains("```"));
    }

    #[test]
    fn preamble_is_written_once() {
        let dir = TempDir::new().unwrap();
        log_recovery(dir.path(), at_noon(Incident::FailedWrite, "{}"));
        log_recovery(dir.path(), at_noon(Incident::FailedWrite, "{\"0\": {}}"));
        let content = fs::read_to_string(recovery_log_path(dir.path())).unwrap();
        assert_eq!(content.matches("<!-- stepchart").count(), 1);
        assert_eq!(content.matches("chart store write failed").count(), 2);
        assert!(content.find("{}\n```").unwrap() < content.find("{\"0\": {}}").unwrap());
    }

    #[test]
    fn unwritable_log_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no/such/dir");
        log_recovery(&missing, at_noon(Incident::FailedWrite, ""));
        assert!(!recovery_log_path(&missing).exists());
    }
}
