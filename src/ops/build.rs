use chrono::{Days, NaiveDate};

use crate::model::config::TemplateConfig;
use crate::model::step::{DateRange, RawStep, Step};
use crate::ops::dates::{DateError, days_between, progress_dates};

/// Error type for building a step tree from raw data
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("step {name:?}: {source}")]
    InvalidRange { name: String, source: DateError },
    #[error("step {name:?} has no dates and no parent to inherit them from")]
    MissingDates { name: String },
    #[error("malformed chart data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Build a canonical step tree from raw data.
///
/// This is a full rebuild: every step is new and every derived field is
/// recomputed. A raw step without dates takes them from `baseline`; for
/// children the baseline is the parent being built.
pub fn build(raw: &RawStep, baseline: Option<&Step>) -> Result<Step, BuildError> {
    let dates = match (raw.dates, baseline) {
        (Some(dates), _) => dates,
        (None, Some(base)) => base.dates,
        (None, None) => {
            return Err(BuildError::MissingDates {
                name: raw.name.clone(),
            });
        }
    };
    let days = days_between(dates.start, dates.end).map_err(|source| BuildError::InvalidRange {
        name: raw.name.clone(),
        source,
    })?;
    let progress = raw.progress.unwrap_or(0);

    let mut step = Step {
        name: raw.name.clone(),
        progress,
        dates,
        progress_dates: progress_dates(&days, progress),
        steps: Vec::with_capacity(raw.steps.len()),
        expanded: raw.expanded.unwrap_or(true),
    };
    for child in &raw.steps {
        let built = build(child, Some(&step))?;
        step.steps.push(built);
    }
    Ok(step)
}

/// Parse a stored chart payload and build it
pub fn parse_stored(payload: &str) -> Result<Step, BuildError> {
    let raw: RawStep = serde_json::from_str(payload)?;
    build(&raw, None)
}

/// Serialize a step tree into its stored form
pub fn serialize_step(root: &Step) -> Result<String, serde_json::Error> {
    serde_json::to_string(root)
}

/// Cold-start chart: a root and its children, all at 0%, spanning
/// `span_days` days from `today`.
pub fn default_template(today: NaiveDate, config: &TemplateConfig) -> RawStep {
    let end = today
        .checked_add_days(Days::new(u64::from(config.span_days)))
        .unwrap_or(today);
    let dates = DateRange { start: today, end };
    let mut root = RawStep::new(config.root_name.clone(), 0, dates);
    root.steps = config
        .child_names
        .iter()
        .map(|name| RawStep::new(name.clone(), 0, dates))
        .collect();
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange {
            start: d(start),
            end: d(end),
        }
    }

    #[test]
    fn build_derives_progress_dates() {
        let raw = RawStep::new("Root", 50, range("2024-01-01", "2024-01-08"));
        let step = build(&raw, None).unwrap();
        assert_eq!(step.progress_dates().len(), 4);
        assert_eq!(step.progress_dates()[3], d("2024-01-04"));
        assert!(step.expanded);
    }

    #[test]
    fn build_keeps_explicit_expanded_state() {
        let mut raw = RawStep::new("Root", 0, range("2024-01-01", "2024-01-08"));
        raw.expanded = Some(false);
        raw.steps.push(RawStep::new("Child", 0, range("2024-01-01", "2024-01-02")));
        let step = build(&raw, None).unwrap();
        assert!(!step.expanded);
        assert!(step.steps[0].expanded);
    }

    #[test]
    fn children_inherit_missing_dates_from_parent() {
        let json = r#"{
            "name": "Root",
            "progress": 0,
            "dates": {"start": "2024-05-01", "end": "2024-05-10"},
            "steps": [{"name": "Child", "progress": 100, "steps": [{"name": "Grandchild"}]}]
        }"#;
        let step = parse_stored(json).unwrap();
        let child = &step.steps[0];
        assert_eq!(child.dates, range("2024-05-01", "2024-05-10"));
        assert_eq!(child.progress_dates().len(), 10);
        assert_eq!(child.steps[0].dates, child.dates);
        assert_eq!(child.steps[0].progress, 0);
    }

    #[test]
    fn root_without_dates_or_baseline_fails() {
        let raw = RawStep {
            name: "Nowhere".into(),
            ..Default::default()
        };
        assert!(matches!(
            build(&raw, None),
            Err(BuildError::MissingDates { name }) if name == "Nowhere"
        ));
        let base = Step::new("Base", range("2024-01-01", "2024-01-03"));
        let step = build(&raw, Some(&base)).unwrap();
        assert_eq!(step.dates, base.dates);
    }

    #[test]
    fn inverted_child_range_fails_the_whole_build() {
        let mut raw = RawStep::new("Root", 0, range("2024-01-01", "2024-01-08"));
        raw.steps.push(RawStep::new("Bad", 0, range("2024-01-05", "2024-01-02")));
        let err = build(&raw, None).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRange { ref name, .. } if name == "Bad"));
    }

    #[test]
    fn stored_progress_dates_are_recomputed() {
        let json = r#"{
            "name": "Root",
            "progress": 25,
            "progressDates": ["2000-01-01", "2000-01-02", "2000-01-03"],
            "dates": {"start": "2024-01-01", "end": "2024-01-08"},
            "steps": []
        }"#;
        let step = parse_stored(json).unwrap();
        assert_eq!(step.progress_dates(), &[d("2024-01-01"), d("2024-01-02")]);
    }

    #[test]
    fn malformed_payload_is_reported() {
        assert!(matches!(parse_stored("[1, 2"), Err(BuildError::Malformed(_))));
        assert!(matches!(parse_stored("\"just a string\""), Err(BuildError::Malformed(_))));
    }

    #[test]
    fn stored_form_rebuilds_to_the_same_tree() {
        let mut raw = default_template(d("2024-06-01"), &TemplateConfig::default());
        raw.steps[1].progress = Some(40);
        raw.steps[1].expanded = Some(false);
        let step = build(&raw, None).unwrap();
        let payload = serialize_step(&step).unwrap();
        let again = parse_stored(&payload).unwrap();
        assert_eq!(again, step);
    }

    #[test]
    fn default_template_has_two_children_over_a_week() {
        let raw = default_template(d("2024-06-01"), &TemplateConfig::default());
        let step = build(&raw, None).unwrap();
        assert_eq!(step.name, "New Project");
        assert_eq!(step.progress, 0);
        assert_eq!(step.dates, range("2024-06-01", "2024-06-08"));
        let names: Vec<&str> = step.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Step 1", "Step 2"]);
        assert!(step.steps.iter().all(|s| s.dates == step.dates && s.progress == 0));
        assert!(step.steps.iter().all(|s| s.progress_dates().is_empty()));
    }
}
