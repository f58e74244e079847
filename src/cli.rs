//! CLI interface for EPS.
//!
//! Teachers manage sports, classes, sheets and tools, and read statistics.
//! Observers sign in to a class with its code and record observations.
//!
//! Every command taking a reference (`<class>`, `<sheet>`, ...) accepts a
//! full UUID, an unambiguous UUID prefix, or the exact name (any case).

mod class;
mod format;
mod record;
mod result;
mod sheet;
mod sport;
mod stats;
mod tool;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::Config;
use crate::identity::{self, Identity};
use crate::storage::{Document, Storage};

use class::ClassCommand;
use result::ResultCommand;
use sheet::SheetCommand;
use sport::SportCommand;
use tool::ToolCommand;

/// EPS: physical-education observation sheets and statistics.
#[derive(Debug, Parser)]
#[command(name = "eps", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Teacher id. Falls back to `EPS_TEACHER_ID`.
    #[arg(long, global = true)]
    teacher_id: Option<String>,

    /// Teacher password. Falls back to `EPS_TEACHER_PASSWORD`.
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: observing a class
  1. eps class new "2nde A" --code tigre
  2. eps class import "2nde A" eleves.csv --last-name Nom --first-name Prenom --gender Sexe
  3. eps sheet new --sport Basket tirs.toml
  4. eps record --class "2nde A" --code tigre --sheet "Tirs" --student Dupont
       + passes
       tap tir But
       finish
       next Martin
       ...
       quit
  5. eps stats --sport Basket --class "2nde A"

Teacher commands need --teacher-id/--password or EPS_TEACHER_ID/EPS_TEACHER_PASSWORD."#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage sports.
    Sport {
        #[command(subcommand)]
        command: SportCommand,
    },

    /// Manage classes and their rosters.
    Class {
        #[command(subcommand)]
        command: ClassCommand,
    },

    /// Manage observation sheets.
    Sheet {
        #[command(subcommand)]
        command: SheetCommand,
    },

    /// Inspect or delete recorded results.
    #[command(name = "result")]
    Results {
        #[command(subcommand)]
        command: ResultCommand,
    },

    /// Manage software tools and run them against a class.
    Tool {
        #[command(subcommand)]
        command: ToolCommand,
    },

    /// Record observations interactively, one student after another.
    ///
    /// Reads commands from stdin, one per line. Type `help` for the list.
    /// End of input abandons the current student without saving.
    Record(record::RecordArgs),

    /// Per-student statistics for one sport and one class.
    Stats(stats::StatsArgs),
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config, storage: &Storage) -> Result<(), String> {
    let cli = Cli::parse();
    let teacher = || require_teacher(config, &cli);

    match &cli.command {
        Command::Sport { command } => match command {
            SportCommand::List => sport::cmd_list(storage),
            SportCommand::Add { name, icon } => {
                teacher()?;
                sport::cmd_add(storage, name, icon)
            }
            SportCommand::Delete { sport } => {
                teacher()?;
                sport::cmd_delete(storage, sport)
            }
            SportCommand::Describe { sport, file, clear } => {
                teacher()?;
                sport::cmd_describe(storage, sport, file.as_deref(), *clear)
            }
        },
        Command::Class { command } => {
            teacher()?;
            class::dispatch(storage, command)
        }
        Command::Sheet { command } => match command {
            SheetCommand::List { sport } => sheet::cmd_list(storage, sport.as_deref()),
            SheetCommand::Show { sheet } => sheet::cmd_show(storage, sheet),
            SheetCommand::New { sport, file } => {
                teacher()?;
                sheet::cmd_new(storage, sport, file)
            }
            SheetCommand::Activate { sheet } => {
                teacher()?;
                sheet::cmd_set_active(storage, sheet, true)
            }
            SheetCommand::Deactivate { sheet } => {
                teacher()?;
                sheet::cmd_set_active(storage, sheet, false)
            }
            SheetCommand::Delete { sheet } => {
                teacher()?;
                sheet::cmd_delete(storage, sheet)
            }
        },
        Command::Results { command } => {
            teacher()?;
            result::dispatch(storage, command)
        }
        Command::Tool { command } => {
            teacher()?;
            tool::dispatch(storage, command)
        }
        Command::Record(args) => {
            let identity = match &args.code {
                Some(_) => None,
                None => Some(teacher()?),
            };
            record::cmd_record(storage, args, identity)
        }
        Command::Stats(args) => {
            teacher()?;
            stats::cmd_stats(storage, args)
        }
    }
}

/// Resolve and check teacher credentials.
fn require_teacher(config: &Config, cli: &Cli) -> Result<Identity, String> {
    let credentials =
        identity::resolve_teacher_credentials(cli.teacher_id.as_deref(), cli.password.as_deref())
            .map_err(|e| e.to_string())?;
    identity::authenticate_teacher(config, &credentials).map_err(|e| e.to_string())
}

/// Resolve a reference to a stored document.
fn resolve<T: Document + Clone>(storage: &Storage, reference: &str) -> Result<T, String> {
    let docs: Vec<T> = storage
        .list()
        .map_err(|e| format!("failed to list {}s: {e}", T::COLLECTION))?;
    let what = T::COLLECTION.to_string();
    find_one(&docs, reference, &what, T::id, T::label).cloned()
}

/// Find the single item matching `reference`.
///
/// A full UUID must match exactly. Otherwise an exact, case-insensitive
/// label match wins; failing that, the reference is an id prefix.
fn find_one<'a, T>(
    items: &'a [T],
    reference: &str,
    what: &str,
    id_of: impl Fn(&T) -> Uuid,
    label_of: impl Fn(&T) -> String,
) -> Result<&'a T, String> {
    if let Ok(id) = reference.parse::<Uuid>() {
        return items
            .iter()
            .find(|item| id_of(*item) == id)
            .ok_or_else(|| format!("{what} not found: {id}"));
    }

    let reference = reference.trim();
    let by_label: Vec<&T> = items
        .iter()
        .filter(|item| label_of(*item).to_lowercase() == reference.to_lowercase())
        .collect();
    let matches = if by_label.is_empty() {
        let prefix = reference.to_lowercase();
        items
            .iter()
            .filter(|item| !prefix.is_empty() && id_of(*item).to_string().starts_with(&prefix))
            .collect()
    } else {
        by_label
    };

    match matches.len() {
        0 => Err(format!("no {what} matching '{reference}'")),
        1 => Ok(matches[0]),
        n => {
            let ids: Vec<String> = matches.iter().map(|item| short_id(id_of(*item))).collect();
            Err(format!(
                "'{reference}' is ambiguous: matches {n} {what}s: {}",
                ids.join(", ")
            ))
        }
    }
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
