//! Class commands: roster management and CSV import.

use std::fs;
use std::path::Path;

use clap::{Subcommand, ValueEnum};

use crate::model::{ClassData, Gender, StudentRecord};
use crate::roster::{self, ColumnMapping};
use crate::stats::roster_order;
use crate::storage::Storage;

use super::{find_one, resolve, short_id};

#[derive(Debug, Subcommand)]
pub enum ClassCommand {
    /// Create a class. Prints its ID.
    New {
        /// Class name (e.g. "2nde A").
        name: String,

        /// Secret code observers sign in with. Case-sensitive.
        #[arg(long)]
        code: String,
    },

    /// List classes with their codes and roster sizes.
    List,

    /// Show a class roster, sorted by last name.
    Show {
        /// Class: ID, ID prefix, or name.
        class: String,
    },

    /// Delete a class.
    ///
    /// Results recorded for its students stay stored.
    Delete {
        /// Class: ID, ID prefix, or name.
        class: String,
    },

    /// Add one student to a class.
    AddStudent {
        /// Class: ID, ID prefix, or name.
        class: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long, value_enum, default_value_t = GenderArg::M)]
        gender: GenderArg,
    },

    /// Remove one student from a class.
    RemoveStudent {
        /// Class: ID, ID prefix, or name.
        class: String,

        /// Student: ID, ID prefix, or "Last First".
        student: String,
    },

    /// Import students from a CSV export.
    ///
    /// The delimiter is `;` if the file contains one, `,` otherwise. The
    /// first row is the header. Columns are given by header name or by
    /// 1-based position.
    Import {
        /// Class: ID, ID prefix, or name.
        class: String,

        /// CSV file to read.
        file: std::path::PathBuf,

        /// Column holding last names.
        #[arg(long)]
        last_name: String,

        /// Column holding first names.
        #[arg(long)]
        first_name: String,

        /// Column holding gender (values starting with F are female).
        #[arg(long)]
        gender: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GenderArg {
    M,
    F,
    Other,
}

impl GenderArg {
    fn to_domain(self) -> Gender {
        match self {
            Self::M => Gender::M,
            Self::F => Gender::F,
            Self::Other => Gender::Other,
        }
    }
}

pub(super) fn dispatch(storage: &Storage, command: &ClassCommand) -> Result<(), String> {
    match command {
        ClassCommand::New { name, code } => cmd_new(storage, name, code),
        ClassCommand::List => cmd_list(storage),
        ClassCommand::Show { class } => cmd_show(storage, class),
        ClassCommand::Delete { class } => cmd_delete(storage, class),
        ClassCommand::AddStudent {
            class,
            first_name,
            last_name,
            gender,
        } => cmd_add_student(storage, class, first_name, last_name, gender.to_domain()),
        ClassCommand::RemoveStudent { class, student } => {
            cmd_remove_student(storage, class, student)
        }
        ClassCommand::Import {
            class,
            file,
            last_name,
            first_name,
            gender,
        } => cmd_import(
            storage,
            class,
            file,
            last_name,
            first_name,
            gender.as_deref(),
        ),
    }
}

fn cmd_new(storage: &Storage, name: &str, code: &str) -> Result<(), String> {
    let class = ClassData::new(name, code).map_err(|e| e.to_string())?;
    let class = storage
        .append(class)
        .map_err(|e| format!("failed to create class: {e}"))?;
    println!("{}", class.id);
    Ok(())
}

fn cmd_list(storage: &Storage) -> Result<(), String> {
    let classes = storage
        .list::<ClassData>()
        .map_err(|e| format!("failed to list classes: {e}"))?;

    if classes.is_empty() {
        println!("No classes");
        return Ok(());
    }

    for c in &classes {
        println!(
            "{}  {}  [code: {}]  {} student(s)",
            short_id(c.id),
            c.name,
            c.code,
            c.students.len()
        );
    }
    Ok(())
}

fn cmd_show(storage: &Storage, reference: &str) -> Result<(), String> {
    let class: ClassData = resolve(storage, reference)?;
    println!("{} [code: {}]", class.name, class.code);
    if class.students.is_empty() {
        println!("No students");
        return Ok(());
    }
    for s in roster_order(&class.students) {
        println!("{}  {} ({})", short_id(s.id), s.full_name(), s.gender.as_str());
    }
    Ok(())
}

fn cmd_delete(storage: &Storage, reference: &str) -> Result<(), String> {
    let class: ClassData = resolve(storage, reference)?;
    storage
        .delete::<ClassData>(class.id)
        .map_err(|e| format!("failed to delete class: {e}"))?;
    eprintln!("Deleted class {}", class.name);
    Ok(())
}

fn cmd_add_student(
    storage: &Storage,
    reference: &str,
    first_name: &str,
    last_name: &str,
    gender: Gender,
) -> Result<(), String> {
    let mut class: ClassData = resolve(storage, reference)?;
    let student = StudentRecord::new(first_name, last_name, gender).map_err(|e| e.to_string())?;
    let id = student.id;
    class.add_students([student]);
    storage
        .update(&class)
        .map_err(|e| format!("failed to update class: {e}"))?;
    println!("{id}");
    Ok(())
}

fn cmd_remove_student(storage: &Storage, reference: &str, student: &str) -> Result<(), String> {
    let mut class: ClassData = resolve(storage, reference)?;
    let student = find_student(&class, student)?.clone();
    class.remove_student(student.id);
    storage
        .update(&class)
        .map_err(|e| format!("failed to update class: {e}"))?;
    eprintln!("Removed {} from {}", student.full_name(), class.name);
    Ok(())
}

fn cmd_import(
    storage: &Storage,
    reference: &str,
    file: &Path,
    last_name: &str,
    first_name: &str,
    gender: Option<&str>,
) -> Result<(), String> {
    let mut class: ClassData = resolve(storage, reference)?;
    let text =
        fs::read_to_string(file).map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let table = roster::parse(&text).map_err(|e| e.to_string())?;

    let mapping = ColumnMapping {
        last_name: column_index(&table.headers, last_name)?,
        first_name: column_index(&table.headers, first_name)?,
        gender: gender
            .map(|g| column_index(&table.headers, g))
            .transpose()?,
    };
    let students = roster::students(&table, mapping);
    let added = class.add_students(students);

    storage
        .update(&class)
        .map_err(|e| format!("failed to update class: {e}"))?;
    eprintln!(
        "Imported {added} student(s) into {} (delimiter '{}')",
        class.name, table.delimiter
    );
    Ok(())
}

/// Finds a roster student by ID, ID prefix, or "Last First" name.
pub(super) fn find_student<'a>(
    class: &'a ClassData,
    reference: &str,
) -> Result<&'a StudentRecord, String> {
    find_one(
        &class.students,
        reference,
        "student",
        |s| s.id,
        StudentRecord::full_name,
    )
    .or_else(|err| {
        // A bare last name is fine when it is unique in the class.
        let by_last: Vec<_> = class
            .students
            .iter()
            .filter(|s| s.last_name.eq_ignore_ascii_case(reference.trim()))
            .collect();
        match by_last.as_slice() {
            [one] => Ok(*one),
            _ => Err(err),
        }
    })
}

/// Resolves a column given by header name (any case) or 1-based position.
fn column_index(headers: &[String], column: &str) -> Result<usize, String> {
    let column = column.trim();
    if let Some(i) = headers.iter().position(|h| h.eq_ignore_ascii_case(column)) {
        return Ok(i);
    }
    match column.parse::<usize>() {
        Ok(n) if (1..=headers.len()).contains(&n) => Ok(n - 1),
        _ => Err(format!(
            "no column '{column}': the header is {}",
            headers.join(", ")
        )),
    }
}
