//! Recording sessions: one interactive pass over a sheet for one student.
//!
//! A [`Recorder`] is either idle or recording a sheet. While recording it
//! holds per-observable working state (counters, stopwatches, tallies) or,
//! for training-session sheets, a done flag per exercise. [`Recorder::finish`]
//! turns the working state into exactly one [`ObservationResult`] and goes
//! back to idle. Nothing is persisted until then; abandoning a session
//! simply drops the working state.

mod timer;

use std::collections::BTreeMap;
use std::time::Instant;

use jiff::Timestamp;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{
    Observable, ObservableKind, ObservationResult, ObservationSheet, ObservedValue, ResultData,
    SheetMode,
};

use timer::Stopwatch;

/// Errors from recording operations. The working state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no sheet is being recorded")]
    Idle,

    #[error("sheet '{0}' is a training session, not an observation grid")]
    SessionSheet(String),

    #[error("sheet '{0}' is an observation grid, not a training session")]
    CriteriaSheet(String),

    #[error("sheet has no observable '{0}'")]
    UnknownObservable(String),

    #[error("sheet has no exercise '{0}'")]
    UnknownExercise(String),

    #[error("observable '{id}' is a {actual}, not a {expected}")]
    WrongKind {
        id: String,
        actual: String,
        expected: &'static str,
    },

    #[error("observable '{id}' has no option '{option}'")]
    UnknownOption { id: String, option: String },
}

pub type Result<T> = core::result::Result<T, SessionError>;

/// Working value for one observable, created the first time it is touched.
#[derive(Debug, Clone)]
enum Working {
    Counter(u64),
    Timer(Stopwatch),
    Tally(BTreeMap<String, u64>),
}

#[derive(Debug, Clone)]
enum Progress {
    Criteria(BTreeMap<String, Working>),
    Exercises(BTreeMap<String, bool>),
}

#[derive(Debug, Clone)]
struct Active {
    sheet: ObservationSheet,
    student_id: Uuid,
    class_id: Uuid,
    progress: Progress,
}

/// The recording state machine.
#[derive(Debug, Default)]
pub struct Recorder {
    active: Option<Active>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// The sheet being recorded, if any.
    pub fn sheet(&self) -> Option<&ObservationSheet> {
        self.active.as_ref().map(|a| &a.sheet)
    }

    /// Starts recording `sheet` for a student of a class.
    ///
    /// A session already in progress is abandoned.
    pub fn begin(&mut self, sheet: ObservationSheet, student_id: Uuid, class_id: Uuid) {
        if self.active.is_some() {
            warn!("discarding unfinished recording session");
        }
        let progress = match sheet.mode {
            SheetMode::MultiCriteria => Progress::Criteria(BTreeMap::new()),
            SheetMode::Session => Progress::Exercises(BTreeMap::new()),
        };
        debug!(sheet = %sheet.id, student = %student_id, "recording started");
        self.active = Some(Active {
            sheet,
            student_id,
            class_id,
            progress,
        });
    }

    /// Drops the working state without emitting a result.
    pub fn abandon(&mut self) {
        if self.active.take().is_some() {
            info!("recording session abandoned");
        }
    }

    // ── Counters ──

    /// Adds one to a counter. Returns the new value.
    pub fn increment(&mut self, obs_id: &str) -> Result<u64> {
        let n = self.counter_mut(obs_id)?;
        *n = n.saturating_add(1);
        Ok(*n)
    }

    /// Subtracts one from a counter, never going below zero.
    pub fn decrement(&mut self, obs_id: &str) -> Result<u64> {
        let n = self.counter_mut(obs_id)?;
        *n = n.saturating_sub(1);
        Ok(*n)
    }

    pub fn counter(&self, obs_id: &str) -> Result<u64> {
        self.expect_kind(obs_id, &ObservableKind::Counter, "counter")?;
        Ok(match self.working(obs_id)? {
            Some(Working::Counter(n)) => *n,
            _ => 0,
        })
    }

    // ── Timers ──

    /// Starts a timer. No-op if it is already running.
    pub fn start_timer(&mut self, obs_id: &str, now: Instant) -> Result<()> {
        self.stopwatch_mut(obs_id)?.start(now);
        Ok(())
    }

    /// Flips a timer between running and paused. Returns whether it now runs.
    pub fn toggle_timer(&mut self, obs_id: &str, now: Instant) -> Result<bool> {
        Ok(self.stopwatch_mut(obs_id)?.toggle(now))
    }

    /// Stops a timer and sets it back to zero.
    pub fn reset_timer(&mut self, obs_id: &str) -> Result<()> {
        self.stopwatch_mut(obs_id)?.reset();
        Ok(())
    }

    /// Elapsed milliseconds on a timer as of `now`.
    pub fn timer_ms(&self, obs_id: &str, now: Instant) -> Result<u64> {
        self.expect_kind(obs_id, &ObservableKind::Timer, "timer")?;
        Ok(match self.working(obs_id)? {
            Some(Working::Timer(sw)) => sw.elapsed_ms(now),
            _ => 0,
        })
    }

    pub fn timer_running(&self, obs_id: &str) -> Result<bool> {
        self.expect_kind(obs_id, &ObservableKind::Timer, "timer")?;
        Ok(matches!(self.working(obs_id)?, Some(Working::Timer(sw)) if sw.is_running()))
    }

    // ── Categorical tallies ──

    /// Records one occurrence of `option`. Returns that option's new tally.
    pub fn record(&mut self, obs_id: &str, option: &str) -> Result<u64> {
        let obs = self.expect_kind(obs_id, &ObservableKind::Categorical, "categorical")?;
        if !obs.options.iter().any(|o| o == option) {
            return Err(SessionError::UnknownOption {
                id: obs_id.to_string(),
                option: option.to_string(),
            });
        }

        let slot = self
            .criteria_mut()?
            .entry(obs_id.to_string())
            .or_insert_with(|| Working::Tally(BTreeMap::new()));
        let Working::Tally(tally) = slot else {
            unreachable!("working state always matches the declared kind");
        };
        let n = tally.entry(option.to_string()).or_insert(0);
        *n = n.saturating_add(1);
        Ok(*n)
    }

    /// Tally per declared option, in declaration order. Unrecorded options read 0.
    pub fn tally(&self, obs_id: &str) -> Result<Vec<(String, u64)>> {
        let obs = self.expect_kind(obs_id, &ObservableKind::Categorical, "categorical")?;
        let recorded = match self.working(obs_id)? {
            Some(Working::Tally(t)) => Some(t),
            _ => None,
        };
        Ok(obs
            .options
            .iter()
            .map(|o| {
                let n = recorded.and_then(|t| t.get(o)).copied().unwrap_or(0);
                (o.clone(), n)
            })
            .collect())
    }

    // ── Training sessions ──

    /// Flips an exercise between done and not done. Returns the new flag.
    pub fn toggle_exercise(&mut self, exercise_id: &str) -> Result<bool> {
        let active = self.active.as_mut().ok_or(SessionError::Idle)?;
        let Progress::Exercises(done) = &mut active.progress else {
            return Err(SessionError::CriteriaSheet(active.sheet.title.clone()));
        };
        if active.sheet.exercise(exercise_id).is_none() {
            return Err(SessionError::UnknownExercise(exercise_id.to_string()));
        }
        let flag = done.entry(exercise_id.to_string()).or_insert(false);
        *flag = !*flag;
        Ok(*flag)
    }

    pub fn exercise_done(&self, exercise_id: &str) -> Result<bool> {
        let active = self.active.as_ref().ok_or(SessionError::Idle)?;
        let Progress::Exercises(done) = &active.progress else {
            return Err(SessionError::CriteriaSheet(active.sheet.title.clone()));
        };
        if active.sheet.exercise(exercise_id).is_none() {
            return Err(SessionError::UnknownExercise(exercise_id.to_string()));
        }
        Ok(done.get(exercise_id).copied().unwrap_or(false))
    }

    // ── Finalize ──

    /// Ends the session and emits its result.
    ///
    /// Only touched observables (or exercises) appear in the result's data.
    /// Timers are rounded to whole seconds as of `now`. Returns `None` when
    /// idle.
    pub fn finish(&mut self, now: Instant, at: Timestamp) -> Option<ObservationResult> {
        let active = self.active.take()?;

        let mut data = ResultData::new();
        match &active.progress {
            Progress::Criteria(working) => {
                for obs in active.sheet.observables() {
                    let Some(value) = working.get(&obs.id) else {
                        continue;
                    };
                    let value = match value {
                        Working::Counter(n) => ObservedValue::Count(*n),
                        Working::Timer(sw) => ObservedValue::Seconds(sw.whole_seconds(now)),
                        Working::Tally(t) => ObservedValue::Tally(t.clone()),
                    };
                    data.insert(obs.id.clone(), value);
                }
            }
            Progress::Exercises(done) => {
                for exercise in active.sheet.exercises() {
                    if let Some(flag) = done.get(&exercise.id) {
                        data.insert(exercise.id.clone(), ObservedValue::Done(*flag));
                    }
                }
            }
        }

        let result = ObservationResult {
            id: Uuid::new_v4(),
            student_id: active.student_id,
            class_id: active.class_id,
            sheet_id: active.sheet.id,
            sport_id: active.sheet.sport_id,
            created_at: at,
            data,
        };
        info!(
            result = %result.id,
            sheet = %result.sheet_id,
            entries = result.data.len(),
            "recording finalized"
        );
        Some(result)
    }

    // ── Helpers ──

    fn active(&self) -> Result<&Active> {
        self.active.as_ref().ok_or(SessionError::Idle)
    }

    /// Looks up an observable and checks its declared kind.
    fn expect_kind(
        &self,
        obs_id: &str,
        kind: &ObservableKind,
        expected: &'static str,
    ) -> Result<&Observable> {
        let active = self.active()?;
        if matches!(active.progress, Progress::Exercises(_)) {
            return Err(SessionError::SessionSheet(active.sheet.title.clone()));
        }
        let obs = active
            .sheet
            .observable(obs_id)
            .ok_or_else(|| SessionError::UnknownObservable(obs_id.to_string()))?;
        if &obs.kind != kind {
            return Err(SessionError::WrongKind {
                id: obs_id.to_string(),
                actual: obs.kind.as_str().to_string(),
                expected,
            });
        }
        Ok(obs)
    }

    fn working(&self, obs_id: &str) -> Result<Option<&Working>> {
        match &self.active()?.progress {
            Progress::Criteria(working) => Ok(working.get(obs_id)),
            Progress::Exercises(_) => Ok(None),
        }
    }

    fn criteria_mut(&mut self) -> Result<&mut BTreeMap<String, Working>> {
        let active = self.active.as_mut().ok_or(SessionError::Idle)?;
        match &mut active.progress {
            Progress::Criteria(working) => Ok(working),
            Progress::Exercises(_) => Err(SessionError::SessionSheet(active.sheet.title.clone())),
        }
    }

    fn counter_mut(&mut self, obs_id: &str) -> Result<&mut u64> {
        self.expect_kind(obs_id, &ObservableKind::Counter, "counter")?;
        let slot = self
            .criteria_mut()?
            .entry(obs_id.to_string())
            .or_insert(Working::Counter(0));
        let Working::Counter(n) = slot else {
            unreachable!("working state always matches the declared kind");
        };
        Ok(n)
    }

    fn stopwatch_mut(&mut self, obs_id: &str) -> Result<&mut Stopwatch> {
        self.expect_kind(obs_id, &ObservableKind::Timer, "timer")?;
        let slot = self
            .criteria_mut()?
            .entry(obs_id.to_string())
            .or_insert_with(|| Working::Timer(Stopwatch::default()));
        let Working::Timer(sw) = slot else {
            unreachable!("working state always matches the declared kind");
        };
        Ok(sw)
    }
}
