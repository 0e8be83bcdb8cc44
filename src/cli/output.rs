use chrono::NaiveDate;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::model::flat::{FlatNode, FlatView};
use crate::ops::chart_ops::ChartSummary;

/// Widest progress bar, in columns. Longer charts fold several days into
/// each column.
const MAX_BAR_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ChartSummaryJson {
    pub id: String,
    pub name: String,
    pub progress: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub steps: usize,
}

#[derive(Serialize)]
pub struct RowJson {
    pub row: usize,
    pub level: usize,
    pub name: String,
    pub progress: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub expandable: bool,
    pub expanded: bool,
    pub progress_dates: Vec<NaiveDate>,
}

#[derive(Serialize)]
pub struct ChartJson {
    pub id: String,
    pub generation: u64,
    pub rows: Vec<RowJson>,
}

#[derive(Serialize)]
pub struct CalendarJson {
    pub id: String,
    pub days: Vec<NaiveDate>,
}

#[derive(Serialize)]
pub struct CreatedJson {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn summary_to_json(summary: &ChartSummary) -> ChartSummaryJson {
    ChartSummaryJson {
        id: summary.id.clone(),
        name: summary.name.clone(),
        progress: summary.progress,
        start: summary.dates.start,
        end: summary.dates.end,
        steps: summary.step_count,
    }
}

pub fn row_to_json(row: usize, node: &FlatNode) -> RowJson {
    RowJson {
        row,
        level: node.level,
        name: node.name.clone(),
        progress: node.progress,
        start: node.dates.start,
        end: node.dates.end,
        expandable: node.expandable,
        expanded: node.expanded,
        progress_dates: node.progress_dates.clone(),
    }
}

pub fn chart_to_json(id: &str, view: &FlatView, rows: &[usize]) -> ChartJson {
    ChartJson {
        id: id.to_string(),
        generation: view.generation().0,
        rows: rows
            .iter()
            .filter_map(|&i| view.nodes().get(i).map(|node| row_to_json(i, node)))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Format the chart list, one aligned line per chart
pub fn format_chart_list(charts: &[ChartSummary]) -> Vec<String> {
    let id_width = charts.iter().map(|c| c.id.width()).max().unwrap_or(0);
    let name_width = charts.iter().map(|c| c.name.width()).max().unwrap_or(0);
    charts
        .iter()
        .map(|c| {
            format!(
                "{}{}  {}{}  {:>3}%  {} .. {}  {} steps",
                c.id,
                pad(&c.id, id_width),
                c.name,
                pad(&c.name, name_width),
                c.progress,
                c.dates.start,
                c.dates.end,
                c.step_count
            )
        })
        .collect()
}

fn disclosure_marker(node: &FlatNode) -> char {
    match (node.expandable, node.expanded) {
        (true, true) => '▾',
        (true, false) => '▸',
        (false, _) => ' ',
    }
}

fn row_label(node: &FlatNode) -> String {
    format!(
        "{}{} {}",
        "  ".repeat(node.level),
        disclosure_marker(node),
        node.name
    )
}

fn pad(text: &str, width: usize) -> String {
    " ".repeat(width.saturating_sub(text.width()))
}

/// Progress bar for one row over the chart's day axis:
/// `#` for completed days, `-` for the rest of the row's range.
pub fn progress_bar(node: &FlatNode, axis: &[NaiveDate]) -> String {
    if axis.is_empty() {
        return String::new();
    }
    let per_column = axis.len().div_ceil(MAX_BAR_WIDTH);
    axis.chunks(per_column)
        .map(|days| {
            if days.iter().any(|d| node.progress_dates.binary_search(d).is_ok()) {
                '#'
            } else if days.iter().any(|d| node.dates.contains(*d)) {
                '-'
            } else {
                ' '
            }
        })
        .collect()
}

/// Format the selected rows of a view as an indented outline. Row numbers
/// are indices into the full view, so they stay usable for edit commands
/// even when folded rows are hidden.
pub fn format_outline(view: &FlatView, axis: &[NaiveDate], rows: &[usize]) -> Vec<String> {
    let nodes: Vec<(usize, &FlatNode)> = rows
        .iter()
        .filter_map(|&i| view.nodes().get(i).map(|node| (i, node)))
        .collect();
    let index_width = nodes
        .iter()
        .map(|(i, _)| i.to_string().len())
        .max()
        .unwrap_or(0);
    let labels: Vec<String> = nodes.iter().map(|(_, node)| row_label(node)).collect();
    let label_width = labels.iter().map(|l| l.width()).max().unwrap_or(0);

    nodes
        .iter()
        .zip(&labels)
        .map(|((i, node), label)| {
            format!(
                "{:>iw$}  {}{}  {:>3}%  {} .. {}  |{}|",
                i,
                label,
                pad(label, label_width),
                node.progress,
                node.dates.start,
                node.dates.end,
                progress_bar(node, axis),
                iw = index_width
            )
        })
        .collect()
}

/// Format a chart's day axis, one day per line, marking `today`
pub fn format_calendar(days: &[NaiveDate], today: NaiveDate) -> Vec<String> {
    days.iter()
        .map(|day| {
            let marker = if *day == today { '>' } else { ' ' };
            format!("{} {} {}", marker, day, day.format("%a"))
        })
        .collect()
}
