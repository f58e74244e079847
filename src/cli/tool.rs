//! Software tool commands: add, edit, list, delete, run.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::model::{ClassData, SoftwareTool};
use crate::storage::Storage;
use crate::tool::render_document;

use super::{resolve, short_id};

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// Add a tool from an HTML file. Prints its ID.
    Add {
        /// Tool name.
        name: String,

        /// Icon shown next to the name (defaults to 💻).
        #[arg(long, default_value = "")]
        icon: String,

        /// HTML content of the tool.
        #[arg(long)]
        file: PathBuf,
    },

    /// Change a tool's name, icon, or content.
    Edit {
        /// Tool: ID, ID prefix, or name.
        tool: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        /// Replace the HTML content with this file.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List tools.
    List,

    /// Delete a tool.
    Delete {
        /// Tool: ID, ID prefix, or name.
        tool: String,
    },

    /// Render a tool for a class as a standalone HTML page.
    ///
    /// The class roster is available to the tool's scripts as
    /// `window.students`. Written to `--out` (if given) or stdout.
    Run {
        /// Tool: ID, ID prefix, or name.
        tool: String,

        /// Class: ID, ID prefix, or name.
        #[arg(long)]
        class: String,

        /// Write the page to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub(super) fn dispatch(storage: &Storage, command: &ToolCommand) -> Result<(), String> {
    match command {
        ToolCommand::Add { name, icon, file } => cmd_add(storage, name, icon, file),
        ToolCommand::Edit {
            tool,
            name,
            icon,
            file,
        } => cmd_edit(storage, tool, name.as_deref(), icon.as_deref(), file.as_deref()),
        ToolCommand::List => cmd_list(storage),
        ToolCommand::Delete { tool } => cmd_delete(storage, tool),
        ToolCommand::Run { tool, class, out } => cmd_run(storage, tool, class, out.as_deref()),
    }
}

fn read_html(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}

fn cmd_add(storage: &Storage, name: &str, icon: &str, file: &Path) -> Result<(), String> {
    let tool = SoftwareTool::new(name, icon, read_html(file)?).map_err(|e| e.to_string())?;
    let tool = storage
        .append(tool)
        .map_err(|e| format!("failed to add tool: {e}"))?;
    println!("{}", tool.id);
    Ok(())
}

fn cmd_edit(
    storage: &Storage,
    reference: &str,
    name: Option<&str>,
    icon: Option<&str>,
    file: Option<&Path>,
) -> Result<(), String> {
    let existing: SoftwareTool = resolve(storage, reference)?;
    let content = match file {
        Some(path) => read_html(path)?,
        None => existing.content_html.clone(),
    };
    let mut tool = SoftwareTool::new(
        name.unwrap_or(&existing.name),
        icon.unwrap_or(&existing.icon),
        content,
    )
    .map_err(|e| e.to_string())?;
    tool.id = existing.id;

    storage
        .update(&tool)
        .map_err(|e| format!("failed to update tool: {e}"))?;
    eprintln!("Updated tool {}", tool.name);
    Ok(())
}

fn cmd_list(storage: &Storage) -> Result<(), String> {
    let tools = storage
        .list::<SoftwareTool>()
        .map_err(|e| format!("failed to list tools: {e}"))?;

    if tools.is_empty() {
        println!("No tools");
        return Ok(());
    }

    for t in &tools {
        println!("{}  {} {}", short_id(t.id), t.icon, t.name);
    }
    Ok(())
}

fn cmd_delete(storage: &Storage, reference: &str) -> Result<(), String> {
    let tool: SoftwareTool = resolve(storage, reference)?;
    storage
        .delete::<SoftwareTool>(tool.id)
        .map_err(|e| format!("failed to delete tool: {e}"))?;
    eprintln!("Deleted tool {}", tool.name);
    Ok(())
}

fn cmd_run(
    storage: &Storage,
    reference: &str,
    class: &str,
    out: Option<&Path>,
) -> Result<(), String> {
    let tool: SoftwareTool = resolve(storage, reference)?;
    let class: ClassData = resolve(storage, class)?;
    let page =
        render_document(&tool, &class).map_err(|e| format!("failed to render tool: {e}"))?;

    match out {
        Some(path) => {
            fs::write(path, &page)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!("Rendered {} for {} → {}", tool.name, class.name, path.display());
        }
        None => println!("{page}"),
    }
    Ok(())
}
