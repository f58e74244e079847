//! The statistics command.

use clap::Args;

use crate::model::{ClassData, ObservationResult, ObservationSheet, Sport};
use crate::stats::aggregate;
use crate::storage::Storage;

use super::format::format_stats_table;
use super::resolve;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Sport: ID, ID prefix, or name.
    #[arg(long)]
    sport: String,

    /// Class: ID, ID prefix, or name.
    #[arg(long)]
    class: String,

    /// Print the table as JSON instead of text.
    #[arg(long)]
    json: bool,
}

pub(super) fn cmd_stats(storage: &Storage, args: &StatsArgs) -> Result<(), String> {
    let sport: Sport = resolve(storage, &args.sport)?;
    let class: ClassData = resolve(storage, &args.class)?;

    let sheets = storage
        .list::<ObservationSheet>()
        .map_err(|e| format!("failed to list sheets: {e}"))?;
    let results = storage
        .list::<ObservationResult>()
        .map_err(|e| format!("failed to list results: {e}"))?;

    let table = aggregate(sport.id, Some(&class), &sheets, &results);

    if args.json {
        let json = serde_json::to_string_pretty(&table)
            .map_err(|e| format!("failed to serialize statistics: {e}"))?;
        println!("{json}");
    } else {
        println!("{} {} · {}", sport.icon, sport.name, class.name);
        print!("{}", format_stats_table(&table));
    }
    Ok(())
}
