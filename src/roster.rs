//! Roster import from delimited text exports.
//!
//! School exports come as comma- or semicolon-separated text with a header
//! row. The teacher maps columns to last name, first name, and (optionally)
//! gender; every data row becomes one student.

use tracing::debug;
use uuid::Uuid;

use crate::model::{Gender, StudentRecord};

/// Placeholder for a mapped cell that is missing or empty.
const MISSING: &str = "?";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("the file has no header row")]
    Empty,
}

/// A parsed delimited file: one header row and the data rows beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub delimiter: char,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Zero-based column indices for each student field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub last_name: usize,
    pub first_name: usize,
    pub gender: Option<usize>,
}

/// Splits delimited text into a header and rows.
///
/// The delimiter is `;` if the text contains one anywhere, `,` otherwise.
/// Blank lines are skipped; cells are trimmed and lose one pair of
/// surrounding double quotes.
pub fn parse(text: &str) -> Result<Table, ImportError> {
    let delimiter = if text.contains(';') { ';' } else { ',' };
    let mut lines = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| line.split(delimiter).map(clean_cell).collect::<Vec<_>>());

    let headers = lines.next().ok_or(ImportError::Empty)?;
    let rows: Vec<_> = lines.collect();
    debug!(%delimiter, columns = headers.len(), rows = rows.len(), "parsed roster file");
    Ok(Table {
        delimiter,
        headers,
        rows,
    })
}

fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    let cell = cell.strip_prefix('"').unwrap_or(cell);
    let cell = cell.strip_suffix('"').unwrap_or(cell);
    cell.to_string()
}

/// Guesses gender from a free-form cell: anything starting with `f`
/// (case-insensitive) is `F`, everything else `M`.
pub fn infer_gender(raw: Option<&str>) -> Gender {
    match raw {
        Some(s) if s.trim_start().to_lowercase().starts_with('f') => Gender::F,
        _ => Gender::M,
    }
}

/// Turns each data row into a student according to `mapping`.
///
/// Missing or empty mapped cells become `"?"`, including whole columns the
/// header doesn't have.
pub fn students(table: &Table, mapping: ColumnMapping) -> Vec<StudentRecord> {
    let cell = |row: &[String], index: usize| -> String {
        row.get(index)
            .filter(|c| !c.is_empty())
            .cloned()
            .unwrap_or_else(|| MISSING.to_string())
    };

    table
        .rows
        .iter()
        .map(|row| StudentRecord {
            id: Uuid::new_v4(),
            last_name: cell(row, mapping.last_name),
            first_name: cell(row, mapping.first_name),
            gender: infer_gender(
                mapping
                    .gender
                    .and_then(|i| row.get(i))
                    .map(String::as_str),
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: ColumnMapping = ColumnMapping {
        last_name: 0,
        first_name: 1,
        gender: Some(2),
    };

    #[test]
    fn semicolon_file_with_header() {
        let table = parse("Nom;Prenom;Sexe\nDupont;Jean;M\n").unwrap();
        assert_eq!(table.delimiter, ';');
        assert_eq!(table.headers, vec!["Nom", "Prenom", "Sexe"]);

        let students = students(&table, MAPPING);
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].last_name, "Dupont");
        assert_eq!(students[0].first_name, "Jean");
        assert_eq!(students[0].gender, Gender::M);
    }

    #[test]
    fn comma_file_with_quotes_and_blank_lines() {
        let text = "\"Nom\",\"Prénom\",\"Genre\"\r\n\r\n\"Martin\", \"Léa\" ,\"Féminin\"\r\n";
        let table = parse(text).unwrap();
        assert_eq!(table.delimiter, ',');

        let students = students(&table, MAPPING);
        assert_eq!(students[0].last_name, "Martin");
        assert_eq!(students[0].first_name, "Léa");
        assert_eq!(students[0].gender, Gender::F);
    }

    #[test]
    fn short_rows_fill_with_placeholder() {
        let table = parse("Nom;Prenom;Sexe\nDurand\n;Paul;f").unwrap();
        let students = students(&table, MAPPING);

        assert_eq!(students[0].last_name, "Durand");
        assert_eq!(students[0].first_name, "?");
        assert_eq!(students[0].gender, Gender::M);
        assert_eq!(students[1].last_name, "?");
        assert_eq!(students[1].gender, Gender::F);
    }

    #[test]
    fn gender_inference() {
        assert_eq!(infer_gender(Some("F")), Gender::F);
        assert_eq!(infer_gender(Some("fille")), Gender::F);
        assert_eq!(infer_gender(Some("G")), Gender::M);
        assert_eq!(infer_gender(Some("")), Gender::M);
        assert_eq!(infer_gender(None), Gender::M);
    }

    #[test]
    fn unmapped_gender_defaults_to_m() {
        let table = parse("Nom;Prenom\nDupont;Lucie").unwrap();
        let mapping = ColumnMapping {
            last_name: 0,
            first_name: 1,
            gender: None,
        };
        let students = students(&table, mapping);
        assert_eq!(students[0].gender, Gender::M);
    }

    #[test]
    fn each_student_gets_its_own_id() {
        let table = parse("Nom;Prenom\nA;B\nA;B").unwrap();
        let mapping = ColumnMapping {
            last_name: 0,
            first_name: 1,
            gender: None,
        };
        let students = students(&table, mapping);
        assert_ne!(students[0].id, students[1].id);
    }

    #[test]
    fn mapping_past_header_fills_placeholder() {
        let table = parse("Nom;Prenom\nDupont;Jean").unwrap();
        let mapping = ColumnMapping {
            last_name: 0,
            first_name: 5,
            gender: Some(2),
        };
        let students = students(&table, mapping);

        assert_eq!(students[0].last_name, "Dupont");
        assert_eq!(students[0].first_name, "?");
        assert_eq!(students[0].gender, Gender::M);
    }

    #[test]
    fn empty_file_fails() {
        assert_eq!(parse("\n  \n").unwrap_err(), ImportError::Empty);
    }
}
