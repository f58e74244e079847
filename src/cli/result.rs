//! Result commands: list, show, delete.

use clap::Subcommand;

use crate::model::{ClassData, ObservationResult, ObservationSheet};
use crate::storage::Storage;

use super::class::find_student;
use super::{resolve, short_id};

#[derive(Debug, Subcommand)]
pub enum ResultCommand {
    /// List results, oldest first.
    List {
        /// Only results for this class: ID, ID prefix, or name.
        #[arg(long)]
        class: Option<String>,

        /// Only results for this student of `--class`.
        #[arg(long, requires = "class")]
        student: Option<String>,
    },

    /// Print one result as JSON.
    Show {
        /// Result: ID or ID prefix.
        result: String,
    },

    /// Delete one result.
    Delete {
        /// Result: ID or ID prefix.
        result: String,
    },
}

pub(super) fn dispatch(storage: &Storage, command: &ResultCommand) -> Result<(), String> {
    match command {
        ResultCommand::List { class, student } => {
            cmd_list(storage, class.as_deref(), student.as_deref())
        }
        ResultCommand::Show { result } => cmd_show(storage, result),
        ResultCommand::Delete { result } => cmd_delete(storage, result),
    }
}

fn cmd_list(storage: &Storage, class: Option<&str>, student: Option<&str>) -> Result<(), String> {
    let class: Option<ClassData> = class.map(|c| resolve(storage, c)).transpose()?;
    let student_id = match (&class, student) {
        (Some(class), Some(reference)) => Some(find_student(class, reference)?.id),
        _ => None,
    };

    let sheets = storage
        .list::<ObservationSheet>()
        .map_err(|e| format!("failed to list sheets: {e}"))?;
    let results: Vec<ObservationResult> = storage
        .list::<ObservationResult>()
        .map_err(|e| format!("failed to list results: {e}"))?
        .into_iter()
        .filter(|r| class.as_ref().is_none_or(|c| c.id == r.class_id))
        .filter(|r| student_id.is_none_or(|id| id == r.student_id))
        .collect();

    if results.is_empty() {
        println!("No results");
        return Ok(());
    }

    for r in &results {
        let sheet = sheets
            .iter()
            .find(|s| s.id == r.sheet_id)
            .map_or("(deleted sheet)", |s| s.title.as_str());
        let student = class
            .as_ref()
            .and_then(|c| c.student(r.student_id))
            .map_or_else(|| short_id(r.student_id), |s| s.full_name());
        let done = r.data.values().filter(|v| v.done() == Some(true)).count();
        let summary = if r.data.values().any(|v| v.done().is_some()) {
            format!("{done}/{} done", r.data.len())
        } else {
            format!("{} value(s)", r.data.len())
        };
        println!(
            "{}  {}  [{sheet}]  {student}  {summary}",
            short_id(r.id),
            r.created_at,
        );
    }
    Ok(())
}

fn cmd_show(storage: &Storage, reference: &str) -> Result<(), String> {
    let result: ObservationResult = resolve(storage, reference)?;
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| format!("failed to serialize result: {e}"))?;
    println!("{json}");
    Ok(())
}

fn cmd_delete(storage: &Storage, reference: &str) -> Result<(), String> {
    let result: ObservationResult = resolve(storage, reference)?;
    storage
        .delete::<ObservationResult>(result.id)
        .map_err(|e| format!("failed to delete result: {e}"))?;
    eprintln!("Deleted result {}", short_id(result.id));
    Ok(())
}
