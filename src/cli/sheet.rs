//! Sheet commands: new, list, show, delete.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::model::{
    Criterion, Exercise, Observable, ObservableKind, ObservationSheet, SessionPhase, SheetDraft,
    SheetMode, Sport,
};
use crate::storage::Storage;

use super::{resolve, short_id};

#[derive(Debug, Subcommand)]
pub enum SheetCommand {
    /// Create a sheet from a TOML definition. Prints its ID.
    ///
    /// The file holds `title`, an optional `mode` ("MULTI_CRITERIA" or
    /// "SESSION"), and either `[[criteria]]` with `[[criteria.observables]]`
    /// or `[[phases]]` with `[[phases.exercises]]`. Missing ids are generated.
    New {
        /// Sport: ID, ID prefix, or name.
        #[arg(long)]
        sport: String,

        /// TOML definition file.
        file: PathBuf,
    },

    /// List sheets, optionally for one sport.
    List {
        /// Sport: ID, ID prefix, or name.
        #[arg(long)]
        sport: Option<String>,
    },

    /// Show a sheet's criteria or phases.
    Show {
        /// Sheet: ID, ID prefix, or title.
        sheet: String,
    },

    /// Make a sheet available for recording again.
    Activate {
        /// Sheet: ID, ID prefix, or title.
        sheet: String,
    },

    /// Hide a sheet from recording. Its results still count in statistics.
    Deactivate {
        /// Sheet: ID, ID prefix, or title.
        sheet: String,
    },

    /// Delete a sheet.
    ///
    /// Results recorded against it stay stored.
    Delete {
        /// Sheet: ID, ID prefix, or title.
        sheet: String,
    },
}

pub(super) fn cmd_new(storage: &Storage, sport: &str, file: &Path) -> Result<(), String> {
    let sport: Sport = resolve(storage, sport)?;
    let contents =
        fs::read_to_string(file).map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let draft: SheetDraft = toml::from_str(&contents)
        .map_err(|e| format!("invalid sheet definition at {}: {e}", file.display()))?;

    let sheet = draft.publish(sport.id).map_err(|e| e.to_string())?;
    let sheet = storage
        .append(sheet)
        .map_err(|e| format!("failed to create sheet: {e}"))?;
    println!("{}", sheet.id);
    Ok(())
}

pub(super) fn cmd_list(storage: &Storage, sport: Option<&str>) -> Result<(), String> {
    let sport: Option<Sport> = sport.map(|s| resolve(storage, s)).transpose()?;
    let sports = storage
        .list::<Sport>()
        .map_err(|e| format!("failed to list sports: {e}"))?;
    let sheets: Vec<ObservationSheet> = storage
        .list::<ObservationSheet>()
        .map_err(|e| format!("failed to list sheets: {e}"))?
        .into_iter()
        .filter(|s| sport.as_ref().is_none_or(|sp| sp.id == s.sport_id))
        .collect();

    if sheets.is_empty() {
        println!("No sheets");
        return Ok(());
    }

    for s in &sheets {
        let sport_name = sports
            .iter()
            .find(|sp| sp.id == s.sport_id)
            .map_or("(deleted sport)", |sp| sp.name.as_str());
        let mode = match s.mode {
            SheetMode::MultiCriteria => "criteria",
            SheetMode::Session => "session",
        };
        let state = if s.active { "" } else { "  [inactive]" };
        println!("{}  [{mode}] [{sport_name}]  {}{state}", short_id(s.id), s.title);
    }
    Ok(())
}

pub(super) fn cmd_show(storage: &Storage, reference: &str) -> Result<(), String> {
    let sheet: ObservationSheet = resolve(storage, reference)?;
    print!("{}", describe_sheet(&sheet));
    Ok(())
}

pub(super) fn cmd_set_active(storage: &Storage, reference: &str, active: bool) -> Result<(), String> {
    let mut sheet: ObservationSheet = resolve(storage, reference)?;
    if sheet.active == active {
        eprintln!("Sheet {} unchanged", sheet.title);
        return Ok(());
    }
    sheet.active = active;
    storage
        .update(&sheet)
        .map_err(|e| format!("failed to update sheet: {e}"))?;
    let state = if active { "activated" } else { "deactivated" };
    eprintln!("Sheet {} {state}", sheet.title);
    Ok(())
}

pub(super) fn cmd_delete(storage: &Storage, reference: &str) -> Result<(), String> {
    let sheet: ObservationSheet = resolve(storage, reference)?;
    storage
        .delete::<ObservationSheet>(sheet.id)
        .map_err(|e| format!("failed to delete sheet: {e}"))?;
    eprintln!("Deleted sheet {}", sheet.title);
    Ok(())
}

/// Multi-line outline of a sheet, ids first so observers can type them.
pub(super) fn describe_sheet(sheet: &ObservationSheet) -> String {
    let mut out = format!("{}\n", sheet.title);
    match sheet.mode {
        SheetMode::MultiCriteria => sheet
            .criteria
            .iter()
            .for_each(|c| out.push_str(&describe_criterion(c))),
        SheetMode::Session => sheet
            .phases
            .iter()
            .for_each(|p| out.push_str(&describe_phase(p))),
    }
    out
}

fn describe_criterion(criterion: &Criterion) -> String {
    let mut out = format!("  {}\n", criterion.label);
    for obs in &criterion.observables {
        out.push_str(&describe_observable(obs));
    }
    out
}

fn describe_observable(obs: &Observable) -> String {
    let options = match &obs.kind {
        ObservableKind::Categorical => format!(" [{}]", obs.options.join(" | ")),
        _ => String::new(),
    };
    format!(
        "    {}  {} ({}){options}\n",
        obs.id,
        obs.label,
        obs.kind.as_str()
    )
}

fn describe_phase(phase: &SessionPhase) -> String {
    let mut out = format!("  {}\n", phase.name);
    for ex in &phase.exercises {
        out.push_str(&describe_exercise(ex));
    }
    out
}

fn describe_exercise(ex: &Exercise) -> String {
    let load = if ex.load.is_empty() {
        String::new()
    } else {
        format!(" @ {}{}", ex.load, ex.unit)
    };
    format!("    {}  {}  {}x{}{load}\n", ex.id, ex.name, ex.sets, ex.reps)
}
