use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, CHART_DIR};

/// Infer a workspace name from a directory name: hyphens and underscores
/// become spaces, words are title-cased.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn cmd_init(args: InitArgs, project_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match project_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    // A workspace further up would otherwise be shadowed silently
    if let Some(parent) = root.parent()
        && let Ok(parent_root) = config_io::discover_workspace(parent)
    {
        eprintln!(
            "Note: parent workspace found at {}/",
            parent_root.join(CHART_DIR).display()
        );
        eprintln!("Creating new workspace in ./{}/", CHART_DIR);
    }

    let name = args.name.unwrap_or_else(|| {
        root.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let workspace = config_io::init_workspace(&root, &name, args.force)?;
    println!("Initialized stepchart workspace: {}", workspace.config.workspace.name);
    Ok(())
}
