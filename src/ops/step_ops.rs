use chrono::NaiveDate;

use crate::model::step::{DateRange, Step};
use crate::ops::dates::{DateError, days_between, progress_dates, range_progress_dates};

/// Name given to steps created by [`add_child_step`]
pub const NEW_STEP_NAME: &str = "New Step";

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find a step by its path from the root
pub fn find_step<'a>(root: &'a Step, path: &[usize]) -> Option<&'a Step> {
    path.iter().try_fold(root, |step, &i| step.steps.get(i))
}

/// Find a mutable step by its path from the root
pub fn find_step_mut<'a>(root: &'a mut Step, path: &[usize]) -> Option<&'a mut Step> {
    let mut current = root;
    for &i in path {
        current = current.steps.get_mut(i)?;
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// Content edits (local)
// ---------------------------------------------------------------------------

pub fn rename_step(step: &mut Step, name: impl Into<String>) {
    step.name = name.into();
}

/// Set progress and recompute the step's progress dates
pub fn update_progress(step: &mut Step, percent: i32) -> &[NaiveDate] {
    step.progress = percent;
    // A built step always has a valid range
    step.progress_dates = range_progress_dates(&step.dates, percent).unwrap_or_default();
    &step.progress_dates
}

/// Replace the step's date range and recompute its progress dates.
/// An inverted range is rejected and leaves the step untouched.
pub fn update_date_range(step: &mut Step, dates: DateRange) -> Result<&[NaiveDate], DateError> {
    let days = days_between(dates.start, dates.end)?;
    step.dates = dates;
    step.progress_dates = progress_dates(&days, step.progress);
    Ok(&step.progress_dates)
}

// ---------------------------------------------------------------------------
// Shape edits (structural)
// ---------------------------------------------------------------------------

/// Append a fresh child spanning the parent's dates and expand the parent.
/// Returns the new child's index.
pub fn add_child_step(parent: &mut Step) -> usize {
    parent.expanded = true;
    parent.steps.push(Step::new(NEW_STEP_NAME, parent.dates));
    parent.steps.len() - 1
}

/// Remove and return the child at `index`
pub fn delete_child_step(parent: &mut Step, index: usize) -> Option<Step> {
    (index < parent.steps.len()).then(|| parent.steps.remove(index))
}

/// Flip the fold state, returning the new state
pub fn toggle_expanded(step: &mut Step) -> bool {
    step.expanded = !step.expanded;
    step.expanded
}
