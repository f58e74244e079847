//! Core data model for EPS.
//!
//! Sheets describe what to observe, results record what was observed,
//! and classes, sports and tools are the teacher-managed surroundings.

mod class;
mod result;
mod sheet;
mod sport;
mod tool;

pub use class::{ClassData, Gender, StudentRecord};
pub use result::{ObservationResult, ObservedValue, ResultData};
pub use sheet::{
    Criterion, Exercise, Observable, ObservableKind, ObservationSheet, SessionPhase, SheetDraft,
    SheetMode,
};
pub use sport::{Sport, default_sports};
pub use tool::SoftwareTool;

/// A create or update was rejected before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("categorical observable '{0}' needs at least one option")]
    NoOptions(String),

    #[error("duplicate identifier '{0}'")]
    DuplicateId(String),
}

/// Rejects blank (empty or whitespace-only) required fields.
pub(crate) fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(())
}
