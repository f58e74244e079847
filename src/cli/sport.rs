//! Sport commands: list, add, delete, describe.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::model::Sport;
use crate::storage::Storage;

use super::{resolve, short_id};

#[derive(Debug, Subcommand)]
pub enum SportCommand {
    /// List sports.
    List,

    /// Add a sport. Prints its ID.
    Add {
        /// Sport name.
        name: String,

        /// Icon shown next to the name (an emoji).
        #[arg(long)]
        icon: String,
    },

    /// Delete a sport.
    ///
    /// Its sheets and results stay stored but no longer appear in statistics.
    Delete {
        /// Sport: ID, ID prefix, or name.
        sport: String,
    },

    /// Set or clear the HTML guide shown to observers.
    Describe {
        /// Sport: ID, ID prefix, or name.
        sport: String,

        /// HTML file with the guide.
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        file: Option<PathBuf>,

        /// Remove the guide.
        #[arg(long)]
        clear: bool,
    },
}

pub(super) fn cmd_list(storage: &Storage) -> Result<(), String> {
    let sports = storage
        .list::<Sport>()
        .map_err(|e| format!("failed to list sports: {e}"))?;

    if sports.is_empty() {
        println!("No sports");
        return Ok(());
    }

    for s in &sports {
        let guide = if s.description_html.is_some() { "  [guide]" } else { "" };
        println!("{}  {} {}{guide}", short_id(s.id), s.icon, s.name);
    }
    Ok(())
}

pub(super) fn cmd_add(storage: &Storage, name: &str, icon: &str) -> Result<(), String> {
    let sport = Sport::new(name, icon).map_err(|e| e.to_string())?;
    let sport = storage
        .append(sport)
        .map_err(|e| format!("failed to add sport: {e}"))?;
    println!("{}", sport.id);
    Ok(())
}

pub(super) fn cmd_delete(storage: &Storage, reference: &str) -> Result<(), String> {
    let sport: Sport = resolve(storage, reference)?;
    storage
        .delete::<Sport>(sport.id)
        .map_err(|e| format!("failed to delete sport: {e}"))?;
    eprintln!("Deleted sport {}", sport.name);
    Ok(())
}

pub(super) fn cmd_describe(
    storage: &Storage,
    reference: &str,
    file: Option<&Path>,
    clear: bool,
) -> Result<(), String> {
    let mut sport: Sport = resolve(storage, reference)?;
    sport.description_html = match file {
        Some(path) if !clear => {
            let html = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            Some(html).filter(|h| !h.trim().is_empty())
        }
        _ => None,
    };

    storage
        .update(&sport)
        .map_err(|e| format!("failed to update sport: {e}"))?;

    match sport.description_html {
        Some(_) => eprintln!("Guide set for {}", sport.name),
        None => eprintln!("Guide cleared for {}", sport.name),
    }
    Ok(())
}
