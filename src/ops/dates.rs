use chrono::NaiveDate;

use crate::model::step::DateRange;

/// Error type for date range calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("invalid date range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Build a range, rejecting `end < start`
pub fn checked_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, DateError> {
    let range = DateRange { start, end };
    if !range.is_valid() {
        return Err(DateError::InvalidRange { start, end });
    }
    Ok(range)
}

/// Every calendar day from `start` to `end`, both included, earliest first.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, DateError> {
    let range = checked_range(start, end)?;
    Ok(start.iter_days().take(range.day_count()).collect())
}

/// The days of a range, see [`days_between`]
pub fn range_days(range: &DateRange) -> Result<Vec<NaiveDate>, DateError> {
    days_between(range.start, range.end)
}

/// Number of leading days covered by `percent` of `len` days:
/// `round(len * percent / 100)` rounding halves up, clamped to `[0, len]`.
pub fn covered_days(len: usize, percent: i32) -> usize {
    let len = len as i64;
    let count = (len * i64::from(percent) + 50).div_euclid(100);
    count.clamp(0, len) as usize
}

/// The leading days of `days` considered complete at `percent` progress.
///
/// Out-of-range percentages are clamped here rather than rejected: a stored
/// 120% shades every day, a stored -5% shades none.
pub fn progress_dates(days: &[NaiveDate], percent: i32) -> Vec<NaiveDate> {
    days[..covered_days(days.len(), percent)].to_vec()
}

/// Progress dates for a step's range at `percent`
pub fn range_progress_dates(range: &DateRange, percent: i32) -> Result<Vec<NaiveDate>, DateError> {
    Ok(progress_dates(&range_days(range)?, percent))
}
