use regex::Regex;
use tracing::{info, warn};

use crate::io::store::{ChartStore, StoreError};
use crate::io::template::TemplateSource;
use crate::model::step::{DateRange, Step};
use crate::ops::build;
use crate::session::{ChartError, ChartSession};

/// One line of the chart list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSummary {
    pub id: String,
    pub name: String,
    pub progress: i32,
    pub dates: DateRange,
    /// Number of steps below the root
    pub step_count: usize,
}

impl ChartSummary {
    fn from_root(id: &str, root: &Step) -> Self {
        ChartSummary {
            id: id.to_string(),
            name: root.name.clone(),
            progress: root.progress,
            dates: root.dates,
            step_count: root.subtree_len() - 1,
        }
    }
}

/// Compile a case-insensitive chart name filter; falls back to a literal
/// match when `pattern` is not a valid regex.
pub fn name_filter(pattern: &str) -> Option<Regex> {
    Regex::new(&format!("(?i){}", pattern))
        .or_else(|_| Regex::new(&format!("(?i){}", regex::escape(pattern))))
        .ok()
}

/// Summaries of every readable chart in storage order, optionally filtered
/// by root name. Unreadable charts are skipped.
pub fn list_charts(
    store: &impl ChartStore,
    filter: Option<&Regex>,
) -> Result<Vec<ChartSummary>, StoreError> {
    let mut charts = Vec::new();
    for id in store.keys()? {
        let Some(payload) = store.load(&id)? else {
            continue;
        };
        match build::parse_stored(&payload) {
            Ok(root) => {
                if filter.is_none_or(|re| re.is_match(&root.name)) {
                    charts.push(ChartSummary::from_root(&id, &root));
                }
            }
            Err(e) => warn!(chart = %id, error = %e, "skipping unreadable chart"),
        }
    }
    Ok(charts)
}

/// Next free numeric chart id: one past the largest numeric id in use,
/// or `0` for an empty store.
pub fn next_chart_id(store: &impl ChartStore) -> Result<String, StoreError> {
    let next = store
        .keys()?
        .iter()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(0, |n| n + 1);
    Ok(next.to_string())
}

/// Create a chart from the template and store it. Returns its id.
pub fn create_chart<S: ChartStore>(
    store: &mut S,
    template: &dyn TemplateSource,
    id: Option<String>,
) -> Result<String, ChartError> {
    let id = match id {
        Some(id) => id,
        None => next_chart_id(&*store)?,
    };
    if store.load(&id)?.is_some() {
        return Err(ChartError::ChartExists(id));
    }
    let session = ChartSession::open(&mut *store, template, id.as_str())?;
    info!(chart = %id, name = %session.root().name, "chart created");
    Ok(id)
}

/// Delete a chart. Returns whether it existed.
pub fn remove_chart(store: &mut impl ChartStore, id: &str) -> Result<bool, StoreError> {
    let removed = store.remove(id)?;
    if removed {
        info!(chart = %id, "chart removed");
    }
    Ok(removed)
}
