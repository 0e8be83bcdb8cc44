mod init;
use init::cmd_init;

use std::error::Error;
use std::path::PathBuf;

use chrono::Local;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::store::{ChartStore, JsonFileStore};
use crate::io::template;
use crate::model::flat::NodeHandle;
use crate::model::step::DateRange;
use crate::model::workspace::Workspace;
use crate::ops::chart_ops;
use crate::session::ChartSession;

type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(command: Commands, json: bool, project_dir: Option<&str>) -> CmdResult {
    // Init creates the workspace; every other command discovers it first
    let workspace = || load_workspace_from(project_dir);
    match command {
        Commands::Init(args) => cmd_init(args, project_dir),

        // Chart list
        Commands::Charts(args) => cmd_charts(&workspace()?, args, json),
        Commands::New(args) => cmd_new(&workspace()?, args, json),
        Commands::Remove(args) => cmd_remove(&workspace()?, args),

        // Read commands
        Commands::Show(args) => cmd_show(&workspace()?, args, json),
        Commands::Calendar(args) => cmd_calendar(&workspace()?, args, json),

        // Step edits
        Commands::Rename(args) => cmd_rename(&workspace()?, args, json),
        Commands::Add(args) => cmd_add(&workspace()?, args, json),
        Commands::Rm(args) => cmd_rm(&workspace()?, args, json),
        Commands::Toggle(args) => cmd_toggle(&workspace()?, args, json),
        Commands::Progress(args) => cmd_progress(&workspace()?, args, json),
        Commands::Dates(args) => cmd_dates(&workspace()?, args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_workspace_from(project_dir: Option<&str>) -> Result<Workspace, Box<dyn Error>> {
    let start: PathBuf = match project_dir {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let root = config_io::discover_workspace(&start)?;
    Ok(config_io::load_workspace(&root)?)
}

fn open_store(workspace: &Workspace) -> Result<JsonFileStore, Box<dyn Error>> {
    Ok(JsonFileStore::open(
        &workspace.chart_dir,
        &workspace.config.store.namespace,
    )?)
}

/// Open an existing chart. Unknown ids are an error here rather than a
/// fresh chart, so a typo never creates one. A readable chart is not
/// rewritten until it is edited.
fn open_chart(
    workspace: &Workspace,
    chart: &str,
) -> Result<ChartSession<JsonFileStore>, Box<dyn Error>> {
    let store = open_store(workspace)?;
    if store.load(chart)?.is_none() {
        return Err(format!("chart not found: {}", chart).into());
    }
    let template = template::template_source(&workspace.chart_dir, &workspace.config.template);
    Ok(ChartSession::open(store, template.as_ref(), chart)?)
}

fn row_handle(session: &ChartSession<JsonFileStore>, row: usize) -> Result<NodeHandle, Box<dyn Error>> {
    session.view().handle(row).ok_or_else(|| {
        format!(
            "no row {} in chart {} ({} rows)",
            row,
            session.chart_id(),
            session.view().len()
        )
        .into()
    })
}

/// Print one row of the current view, as JSON or an outline line
fn print_row(session: &ChartSession<JsonFileStore>, row: usize, json: bool) -> CmdResult {
    let view = session.view();
    if json {
        let node = view
            .nodes()
            .get(row)
            .ok_or_else(|| format!("no row {} in chart {}", row, session.chart_id()))?;
        println!("{}", serde_json::to_string_pretty(&row_to_json(row, node))?);
    } else {
        for line in format_outline(view, &session.calendar(), &[row]) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Chart list
// ---------------------------------------------------------------------------

fn cmd_charts(workspace: &Workspace, args: ChartsArgs, json: bool) -> CmdResult {
    let store = open_store(workspace)?;
    let filter = args.search.as_deref().and_then(chart_ops::name_filter);
    let charts = chart_ops::list_charts(&store, filter.as_ref())?;

    if json {
        let out: Vec<ChartSummaryJson> = charts.iter().map(summary_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if charts.is_empty() {
        println!("no charts");
    } else {
        for line in format_chart_list(&charts) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_new(workspace: &Workspace, args: NewArgs, json: bool) -> CmdResult {
    let mut store = open_store(workspace)?;
    let template = template::template_source(&workspace.chart_dir, &workspace.config.template);
    let id = chart_ops::create_chart(&mut store, template.as_ref(), args.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&CreatedJson { id })?);
    } else {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_remove(workspace: &Workspace, args: RemoveArgs) -> CmdResult {
    let mut store = open_store(workspace)?;
    if !chart_ops::remove_chart(&mut store, &args.chart)? {
        return Err(format!("chart not found: {}", args.chart).into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(workspace: &Workspace, args: ShowArgs, json: bool) -> CmdResult {
    let session = open_chart(workspace, &args.chart)?;
    let view = session.view();
    let rows: Vec<usize> = if args.all {
        (0..view.len()).collect()
    } else {
        view.visible_indices()
    };

    if json {
        let out = chart_to_json(session.chart_id(), view, &rows);
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_outline(view, &session.calendar(), &rows) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_calendar(workspace: &Workspace, args: CalendarArgs, json: bool) -> CmdResult {
    let session = open_chart(workspace, &args.chart)?;
    let days = session.calendar();

    if json {
        let out = CalendarJson {
            id: session.chart_id().to_string(),
            days,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_calendar(&days, Local::now().date_naive()) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Step edits
// ---------------------------------------------------------------------------

fn cmd_rename(workspace: &Workspace, args: RenameArgs, json: bool) -> CmdResult {
    let mut session = open_chart(workspace, &args.chart)?;
    let handle = row_handle(&session, args.row)?;
    session.rename_step(handle, args.name)?;
    print_row(&session, args.row, json)
}

fn cmd_add(workspace: &Workspace, args: RowArgs, json: bool) -> CmdResult {
    let mut session = open_chart(workspace, &args.chart)?;
    let handle = row_handle(&session, args.row)?;
    let child = session.add_child_step(handle)?;
    let row = session.view().index(child)?;
    print_row(&session, row, json)
}

fn cmd_rm(workspace: &Workspace, args: RowArgs, json: bool) -> CmdResult {
    let mut session = open_chart(workspace, &args.chart)?;
    let handle = row_handle(&session, args.row)?;
    if !session.delete_step(handle)? {
        return Err("the chart's root step cannot be deleted".into());
    }

    if json {
        let view = session.view();
        let rows: Vec<usize> = (0..view.len()).collect();
        let out = chart_to_json(session.chart_id(), view, &rows);
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Deleted row {} from chart {}", args.row, session.chart_id());
    }
    Ok(())
}

fn cmd_toggle(workspace: &Workspace, args: RowArgs, json: bool) -> CmdResult {
    let mut session = open_chart(workspace, &args.chart)?;
    let handle = row_handle(&session, args.row)?;
    session.toggle_expanded(handle)?;
    print_row(&session, args.row, json)
}

fn cmd_progress(workspace: &Workspace, args: ProgressArgs, json: bool) -> CmdResult {
    let mut session = open_chart(workspace, &args.chart)?;
    let handle = row_handle(&session, args.row)?;
    session.update_progress(handle, args.percent)?;
    print_row(&session, args.row, json)
}

fn cmd_dates(workspace: &Workspace, args: DatesArgs, json: bool) -> CmdResult {
    let mut session = open_chart(workspace, &args.chart)?;
    let handle = row_handle(&session, args.row)?;
    let dates = DateRange {
        start: args.start,
        end: args.end,
    };
    session.update_date_range(handle, dates)?;
    print_row(&session, args.row, json)
}
