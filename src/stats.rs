//! Class statistics: per-student summaries over all recorded results.
//!
//! The table is a pure function of (sport, class, sheets, results). Columns
//! are the observables of every multi-criteria sheet of the sport, flattened
//! in sheet, criterion, observable order. Rows are the class roster sorted by
//! last name. Each cell summarizes every result of that student for that
//! sport, read through the observable's declared kind.

mod cache;

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::model::{
    ClassData, ObservableKind, ObservationResult, ObservationSheet, SheetMode, StudentRecord,
};

pub use cache::StatsCache;

/// One observable of one sheet, as a table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub sheet_title: String,
    pub criterion_label: String,
    pub observable_label: String,
    pub observable_id: String,
    pub kind: ObservableKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Count and share of one categorical option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionShare {
    pub label: String,
    pub count: u64,
    /// Rounded independently per option; shares need not sum to 100.
    pub percent: u64,
}

/// Summary of one student for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Cell {
    Counter {
        total: u64,
    },
    Timer {
        total_seconds: u64,
        /// `None` when no result carries this timer.
        average_seconds: Option<f64>,
    },
    Categorical {
        options: Vec<OptionShare>,
        total: u64,
    },
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRow {
    pub student: StudentRecord,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsTable {
    pub columns: Vec<Column>,
    pub rows: Vec<StudentRow>,
}

/// Computes the statistics table for one sport and one class.
///
/// A missing class yields an empty table, as does an empty roster.
pub fn aggregate(
    sport_id: Uuid,
    class: Option<&ClassData>,
    sheets: &[ObservationSheet],
    results: &[ObservationResult],
) -> StatsTable {
    let columns = columns(sport_id, sheets);
    let students = class.map(|c| roster_order(&c.students)).unwrap_or_default();

    let rows: Vec<StudentRow> = students
        .into_iter()
        .map(|student| {
            let matching: Vec<&ObservationResult> = results
                .iter()
                .filter(|r| r.student_id == student.id && r.sport_id == sport_id)
                .collect();
            StudentRow {
                student: student.clone(),
                cells: columns.iter().map(|c| summarize(c, &matching)).collect(),
            }
        })
        .collect();

    debug!(
        sport = %sport_id,
        columns = columns.len(),
        rows = rows.len(),
        "statistics computed"
    );
    StatsTable { columns, rows }
}

/// Flattens the sport's multi-criteria sheets into columns.
pub fn columns(sport_id: Uuid, sheets: &[ObservationSheet]) -> Vec<Column> {
    sheets
        .iter()
        .filter(|s| s.sport_id == sport_id && s.mode == SheetMode::MultiCriteria)
        .flat_map(|sheet| {
            sheet.criteria.iter().flat_map(move |criterion| {
                criterion.observables.iter().map(move |obs| Column {
                    sheet_title: sheet.title.clone(),
                    criterion_label: criterion.label.clone(),
                    observable_label: obs.label.clone(),
                    observable_id: obs.id.clone(),
                    kind: obs.kind.clone(),
                    options: if obs.kind == ObservableKind::Categorical {
                        obs.options.clone()
                    } else {
                        Vec::new()
                    },
                })
            })
        })
        .collect()
}

/// The roster sorted by last name; students with equal names keep their order.
pub fn roster_order(students: &[StudentRecord]) -> Vec<&StudentRecord> {
    let mut sorted: Vec<&StudentRecord> = students.iter().collect();
    sorted.sort_by(|a, b| compare_names(&a.last_name, &b.last_name));
    sorted
}

fn summarize(column: &Column, results: &[&ObservationResult]) -> Cell {
    let id = column.observable_id.as_str();
    match column.kind {
        ObservableKind::Counter => Cell::Counter {
            total: results
                .iter()
                .filter_map(|r| r.value(id).and_then(|v| v.count()))
                .sum(),
        },
        ObservableKind::Timer => {
            let recorded: Vec<u64> = results
                .iter()
                .filter_map(|r| r.value(id).and_then(|v| v.seconds()))
                .collect();
            let total_seconds: u64 = recorded.iter().sum();
            Cell::Timer {
                total_seconds,
                average_seconds: average_to_tenth(total_seconds, recorded.len()),
            }
        }
        ObservableKind::Categorical => {
            let counts: Vec<u64> = column
                .options
                .iter()
                .map(|option| {
                    results
                        .iter()
                        .filter_map(|r| r.value(id).and_then(|v| v.tally()))
                        .filter_map(|tally| tally.get(option))
                        .sum()
                })
                .collect();
            let total: u64 = counts.iter().sum();
            Cell::Categorical {
                options: column
                    .options
                    .iter()
                    .zip(counts)
                    .map(|(label, count)| OptionShare {
                        label: label.clone(),
                        count,
                        percent: percent(count, total),
                    })
                    .collect(),
                total,
            }
        }
        ObservableKind::Unrecognized(_) => Cell::NoData,
    }
}

/// `round(100 * count / total)`, rounding half up; 0 when `total` is 0.
pub fn percent(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (200 * count + total) / (2 * total)
}

/// Mean rounded to one decimal place, or `None` over zero samples.
#[allow(clippy::cast_precision_loss)]
fn average_to_tenth(total: u64, samples: usize) -> Option<f64> {
    if samples == 0 {
        return None;
    }
    let samples = samples as u64;
    let tenths = (20 * total + samples) / (2 * samples);
    Some(tenths as f64 / 10.0)
}

/// Orders names the way a French-speaking reader expects: accents and case
/// are ignored first, then unaccented sorts before accented, then lowercase
/// before uppercase.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| s.chars().flat_map(fold_char).collect::<String>();
    primary(a)
        .cmp(&primary(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| {
            let case = |s: &str| s.chars().map(char::is_uppercase).collect::<Vec<_>>();
            case(a).cmp(&case(b))
        })
}

/// Lowercases and strips diacritics from one character.
fn fold_char(c: char) -> impl Iterator<Item = char> {
    let lower = c.to_lowercase().next().unwrap_or(c);
    let folded: &[char] = match lower {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => &['a'],
        'ç' => &['c'],
        'è' | 'é' | 'ê' | 'ë' => &['e'],
        'ì' | 'í' | 'î' | 'ï' => &['i'],
        'ñ' => &['n'],
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => &['o'],
        'ù' | 'ú' | 'û' | 'ü' => &['u'],
        'ý' | 'ÿ' => &['y'],
        'æ' => &['a', 'e'],
        'œ' => &['o', 'e'],
        'ß' => &['s', 's'],
        _ => return vec![lower].into_iter(),
    };
    folded.to_vec().into_iter()
}
