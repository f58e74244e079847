//! Classes and their student rosters.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ValidationError, require};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    M,
    F,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
            Self::Other => "Other",
        }
    }
}

/// A student. Owned by exactly one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
}

impl StudentRecord {
    pub fn new(first_name: &str, last_name: &str, gender: Gender) -> Result<Self, ValidationError> {
        require(first_name, "first name")?;
        require(last_name, "last name")?;
        Ok(Self {
            id: Uuid::new_v4(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            gender,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// A class with its secret observer code and roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassData {
    pub id: Uuid,
    pub name: String,

    /// Compared exactly (case-sensitive) when an observer signs in.
    pub code: String,

    #[serde(default)]
    pub students: Vec<StudentRecord>,
}

impl ClassData {
    /// A new empty class. The id is a placeholder until storage assigns one.
    pub fn new(name: &str, code: &str) -> Result<Self, ValidationError> {
        require(name, "class name")?;
        require(code, "class code")?;
        Ok(Self {
            id: Uuid::nil(),
            name: name.trim().to_string(),
            code: code.to_string(),
            students: Vec::new(),
        })
    }

    pub fn student(&self, id: Uuid) -> Option<&StudentRecord> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Appends students to the roster, skipping ids already present.
    ///
    /// Returns how many were added.
    pub fn add_students(&mut self, students: impl IntoIterator<Item = StudentRecord>) -> usize {
        let mut added = 0;
        for student in students {
            if self.student(student.id).is_none() {
                self.students.push(student);
                added += 1;
            }
        }
        added
    }

    /// Removes a student from the roster. Returns `false` if absent.
    pub fn remove_student(&mut self, id: Uuid) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        self.students.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_class_requires_name_and_code() {
        assert_eq!(
            ClassData::new("", "abc").unwrap_err(),
            ValidationError::Missing("class name")
        );
        assert_eq!(
            ClassData::new("2nde A", " ").unwrap_err(),
            ValidationError::Missing("class code")
        );
        let class = ClassData::new("2nde A", "Abc1").unwrap();
        assert_eq!(class.code, "Abc1");
        assert!(class.students.is_empty());
    }

    #[test]
    fn add_students_skips_duplicate_ids() {
        let mut class = ClassData::new("2nde A", "x").unwrap();
        let jean = StudentRecord::new("Jean", "Dupont", Gender::M).unwrap();

        assert_eq!(class.add_students([jean.clone(), jean.clone()]), 1);
        assert_eq!(class.add_students([jean]), 0);
        assert_eq!(class.students.len(), 1);
    }

    #[test]
    fn remove_student_reports_absence() {
        let mut class = ClassData::new("2nde A", "x").unwrap();
        let jean = StudentRecord::new("Jean", "Dupont", Gender::M).unwrap();
        let id = jean.id;
        class.add_students([jean]);

        assert!(class.remove_student(id));
        assert!(!class.remove_student(id));
    }

    #[test]
    fn student_requires_both_names() {
        let err = StudentRecord::new("Jean", "", Gender::M).unwrap_err();
        assert_eq!(err, ValidationError::Missing("last name"));
    }
}
