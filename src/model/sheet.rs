//! Observation sheets: the templates a teacher publishes for one sport.
//!
//! A sheet is either a multi-criteria observation grid (criteria holding
//! observables) or a training session (phases holding exercises). Both
//! collections may be present in storage; the mode says which one counts.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ValidationError, require};

/// Which half of a sheet is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetMode {
    /// Criteria with counters, timers and categorical tallies.
    #[default]
    MultiCriteria,

    /// Phases with exercises checked off as done.
    Session,
}

/// The declared type of an observable.
///
/// Stored as a plain string tag. Tags written by a newer version (or by hand)
/// survive a load as `Unrecognized` instead of failing the whole sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObservableKind {
    Counter,
    Timer,
    Categorical,
    Unrecognized(String),
}

impl ObservableKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Counter => "counter",
            Self::Timer => "timer",
            Self::Categorical => "categorical",
            Self::Unrecognized(tag) => tag,
        }
    }
}

impl From<String> for ObservableKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "counter" => Self::Counter,
            "timer" => Self::Timer,
            "categorical" => Self::Categorical,
            _ => Self::Unrecognized(tag),
        }
    }
}

impl From<ObservableKind> for String {
    fn from(kind: ObservableKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One measurable quantity within a criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observable {
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ObservableKind,

    /// Button labels, in display order. Only read for categorical observables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A named group of observables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub observables: Vec<Observable>,
}

/// One exercise of a training session. Every quantity is free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sets: String,
    #[serde(default)]
    pub reps: String,
    #[serde(default)]
    pub load: String,
    #[serde(default)]
    pub unit: String,
}

/// A block of exercises (warm-up, main set, cool-down...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPhase {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// A published observation template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSheet {
    pub id: Uuid,
    pub title: String,
    pub mode: SheetMode,
    pub sport_id: Uuid,
    pub active: bool,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub phases: Vec<SessionPhase>,
}

impl ObservationSheet {
    /// All observables across all criteria, in display order.
    pub fn observables(&self) -> impl Iterator<Item = &Observable> {
        self.criteria.iter().flat_map(|c| c.observables.iter())
    }

    pub fn observable(&self, id: &str) -> Option<&Observable> {
        self.observables().find(|o| o.id == id)
    }

    /// All exercises across all phases, in display order.
    pub fn exercises(&self) -> impl Iterator<Item = &Exercise> {
        self.phases.iter().flat_map(|p| p.exercises.iter())
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises().find(|e| e.id == id)
    }

    /// Checks the invariants a sheet must hold before it is published.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "title")?;

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            require(&criterion.label, "criterion label")?;
            claim(&mut seen, &criterion.id)?;
            for obs in &criterion.observables {
                require(&obs.label, "observable label")?;
                claim(&mut seen, &obs.id)?;
                if obs.kind == ObservableKind::Categorical && obs.options.is_empty() {
                    return Err(ValidationError::NoOptions(obs.label.clone()));
                }
            }
        }
        for phase in &self.phases {
            require(&phase.name, "phase name")?;
            claim(&mut seen, &phase.id)?;
            for exercise in &phase.exercises {
                require(&exercise.name, "exercise name")?;
                claim(&mut seen, &exercise.id)?;
            }
        }
        Ok(())
    }
}

fn claim<'a>(seen: &mut HashSet<&'a str>, id: &'a str) -> Result<(), ValidationError> {
    require(id, "identifier")?;
    if !seen.insert(id) {
        return Err(ValidationError::DuplicateId(id.to_string()));
    }
    Ok(())
}

/// A sheet as the teacher writes it, before it belongs to a sport.
///
/// Loaded from a TOML definition file. Identifiers may be left out
/// and are generated when the draft is published.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SheetDraft {
    pub title: String,
    #[serde(default)]
    pub mode: SheetMode,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub phases: Vec<SessionPhase>,
}

impl SheetDraft {
    /// Turns the draft into an active sheet for `sport_id`.
    ///
    /// The sheet id is a placeholder until storage assigns one on append.
    pub fn publish(self, sport_id: Uuid) -> Result<ObservationSheet, ValidationError> {
        let mut sheet = ObservationSheet {
            id: Uuid::nil(),
            title: self.title.trim().to_string(),
            mode: self.mode,
            sport_id,
            active: true,
            criteria: self.criteria,
            phases: self.phases,
        };

        for criterion in &mut sheet.criteria {
            fill_id(&mut criterion.id);
            for obs in &mut criterion.observables {
                fill_id(&mut obs.id);
                obs.options.retain(|o| !o.trim().is_empty());
            }
        }
        for phase in &mut sheet.phases {
            fill_id(&mut phase.id);
            for exercise in &mut phase.exercises {
                fill_id(&mut exercise.id);
            }
        }

        sheet.validate()?;
        Ok(sheet)
    }
}

fn fill_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = Uuid::new_v4().simple().to_string();
    }
}
