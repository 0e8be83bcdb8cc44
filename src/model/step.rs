use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Whether `start <= end`
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Whether `day` falls inside the range (inclusive on both ends)
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    /// Zero for an inverted range.
    pub fn day_count(&self) -> usize {
        let diff = (self.end - self.start).num_days();
        if diff < 0 { 0 } else { diff as usize + 1 }
    }
}

/// A step in a project chart: one task or phase with its own sub-steps.
///
/// `progress_dates` is derived from `dates` and `progress` and is only
/// ever written by the builder and the step operations. The field is
/// serialized (as `progressDates`) so stored charts stay readable, but it is
/// never read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Display name
    pub name: String,
    /// Completion percentage, nominally 0–100
    pub progress: i32,
    /// Planned date range
    pub dates: DateRange,
    /// Leading days of `dates` considered complete
    pub(crate) progress_dates: Vec<NaiveDate>,
    /// Child steps in display order
    pub steps: Vec<Step>,
    /// Fold state of this step in tree views
    pub expanded: bool,
}

impl Step {
    /// A fresh step at 0% with no children, expanded
    pub fn new(name: impl Into<String>, dates: DateRange) -> Self {
        Step {
            name: name.into(),
            progress: 0,
            dates,
            progress_dates: Vec::new(),
            steps: Vec::new(),
            expanded: true,
        }
    }

    pub fn progress_dates(&self) -> &[NaiveDate] {
        &self.progress_dates
    }

    pub fn has_children(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Total number of steps in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.steps.iter().map(Step::subtree_len).sum::<usize>()
    }
}

/// Step-like input data as it arrives from storage or a template.
///
/// Everything except `name` is optional: missing `dates` are inherited from
/// the parent during build, missing `progress` is 0, missing `expanded` is
/// `true`. A stored `progressDates` field is accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<DateRange>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
}

impl RawStep {
    pub fn new(name: impl Into<String>, progress: i32, dates: DateRange) -> Self {
        RawStep {
            name: name.into(),
            progress: Some(progress),
            dates: Some(dates),
            steps: Vec::new(),
            expanded: None,
        }
    }
}

impl From<&Step> for RawStep {
    fn from(step: &Step) -> Self {
        RawStep {
            name: step.name.clone(),
            progress: Some(step.progress),
            dates: Some(step.dates),
            steps: step.steps.iter().map(RawStep::from).collect(),
            expanded: Some(step.expanded),
        }
    }
}
