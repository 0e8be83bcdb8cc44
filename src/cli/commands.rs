use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sc", about = concat!("stepchart v", env!("CARGO_PKG_VERSION"), " - nested step charts"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a stepchart workspace in the current directory
    Init(InitArgs),
    /// List charts
    Charts(ChartsArgs),
    /// Create a chart from the template
    New(NewArgs),
    /// Delete a chart
    Remove(RemoveArgs),
    /// Show a chart as an outline with progress bars
    Show(ShowArgs),
    /// Show the days a chart spans
    Calendar(CalendarArgs),
    /// Rename a step
    Rename(RenameArgs),
    /// Add a child step under a row
    Add(RowArgs),
    /// Delete a row and everything below it
    Rm(RowArgs),
    /// Fold or unfold a row
    Toggle(RowArgs),
    /// Set a step's progress in percent
    Progress(ProgressArgs),
    /// Set a step's date range
    Dates(DatesArgs),
}

// ---------------------------------------------------------------------------
// Workspace and chart args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Workspace name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Reinitialize even if stepchart/ already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ChartsArgs {
    /// Only charts whose name matches this regex (case-insensitive)
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct NewArgs {
    /// Chart id (default: next free number)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Chart id
    pub chart: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Chart id
    pub chart: String,
    /// Include rows hidden under folded steps
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct CalendarArgs {
    /// Chart id
    pub chart: String,
}

// ---------------------------------------------------------------------------
// Step edit args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RowArgs {
    /// Chart id
    pub chart: String,
    /// Row number as printed by `sc show`
    pub row: usize,
}

#[derive(Args)]
pub struct RenameArgs {
    /// Chart id
    pub chart: String,
    /// Row number as printed by `sc show`
    pub row: usize,
    /// New step name
    pub name: String,
}

#[derive(Args)]
pub struct ProgressArgs {
    /// Chart id
    pub chart: String,
    /// Row number as printed by `sc show`
    pub row: usize,
    /// Percent complete; clamped to 0..=100
    #[arg(allow_negative_numbers = true)]
    pub percent: i32,
}

#[derive(Args)]
pub struct DatesArgs {
    /// Chart id
    pub chart: String,
    /// Row number as printed by `sc show`
    pub row: usize,
    /// First day (YYYY-MM-DD)
    pub start: NaiveDate,
    /// Last day (YYYY-MM-DD)
    pub end: NaiveDate,
}
