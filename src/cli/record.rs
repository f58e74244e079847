//! The interactive recording command.
//!
//! A sitting observes one sheet for one class, student after student. While
//! a student is being recorded, one line per action:
//!
//! ```text
//! + <obs>              add one to a counter
//! - <obs>              remove one from a counter
//! tap <obs> <option>   count one occurrence of a categorical option
//! toggle <obs>         start or pause a timer
//! start <obs>          start a timer (no-op if running)
//! reset <obs>          stop a timer and zero it
//! done <exercise>      check or uncheck an exercise
//! show                 print the current state
//! finish               save the result
//! abandon              drop the result
//! ```
//!
//! Between students:
//!
//! ```text
//! next <student>       record another student
//! stats                class statistics for the sheet's sport (teacher only)
//! quit                 end the sitting
//! ```

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::time::Instant;

use clap::Args;
use jiff::Timestamp;
use tracing::info;

use crate::identity::{self, Identity};
use crate::model::{
    ClassData, ObservableKind, ObservationResult, ObservationSheet, SheetMode, Sport,
    StudentRecord,
};
use crate::session::{Recorder, SessionError};
use crate::stats::{StatsCache, aggregate};
use crate::storage::{Storage, StorageError};

use super::class::find_student;
use super::format::format_stats_table;
use super::sheet::describe_sheet;
use super::{resolve, short_id};

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Class: ID, ID prefix, or name.
    #[arg(long)]
    pub(super) class: String,

    /// Class code. Without it, teacher credentials are required.
    #[arg(long)]
    pub(super) code: Option<String>,

    /// Sheet: ID, ID prefix, or title.
    #[arg(long)]
    pub(super) sheet: String,

    /// First observed student: ID, ID prefix, "Last First", or a unique last name.
    #[arg(long)]
    pub(super) student: String,
}

const HELP: &str = "commands: + <obs> | - <obs> | tap <obs> <option> | toggle <obs> | \
start <obs> | reset <obs> | done <exercise> | show | finish | abandon";

const BETWEEN_HELP: &str = "next <student> | stats | quit";

pub(super) fn cmd_record(
    storage: &Storage,
    args: &RecordArgs,
    identity: Option<Identity>,
) -> Result<(), String> {
    let class: ClassData = resolve(storage, &args.class)?;
    let identity = match (identity, &args.code) {
        (Some(identity), _) => identity,
        (None, Some(code)) => {
            identity::authenticate_observer(&class, code).map_err(|e| e.to_string())?
        }
        (None, None) => return Err("pass --code <class code> to record".to_string()),
    };
    if !identity.may_record(class.id) {
        return Err(format!("{} cannot record in {}", identity.display_name(), class.name));
    }

    let sheet: ObservationSheet = resolve(storage, &args.sheet)?;
    if !sheet.active {
        return Err(format!("sheet '{}' is not active", sheet.title));
    }
    let student = find_student(&class, &args.student)?.clone();

    // A deleted sport only loses its guide; recording still works.
    if let Ok(sport) = storage.get::<Sport>(sheet.sport_id)
        && let Some(guide) = &sport.description_html
    {
        eprintln!("{} {}\n{guide}\n", sport.icon, sport.name);
    }

    info!(
        observer = identity.id(),
        class = %class.id,
        sheet = %sheet.id,
        "sitting opened"
    );
    eprintln!("{} recording '{}'", identity.display_name(), sheet.title);
    eprint!("{}", describe_sheet(&sheet));
    eprintln!("{HELP}");

    let mut sitting = Sitting::new(storage, identity, class, sheet);
    let saved = run_sitting(
        &mut sitting,
        &student,
        io::stdin().lock(),
        io::stdout().lock(),
        Instant::now,
    )?;
    eprintln!("Sitting over, {saved} result(s) saved");
    Ok(())
}

/// One sheet observed for one class, student after student.
///
/// Statistics are memoized for the whole sitting and dropped whenever
/// storage reports a change, such as a result saved here.
struct Sitting<'a> {
    storage: &'a Storage,
    identity: Identity,
    class: ClassData,
    sheet: ObservationSheet,
    stats: StatsCache,
}

impl<'a> Sitting<'a> {
    fn new(
        storage: &'a Storage,
        identity: Identity,
        class: ClassData,
        sheet: ObservationSheet,
    ) -> Self {
        Self {
            stats: StatsCache::new(storage.subscribe()),
            storage,
            identity,
            class,
            sheet,
        }
    }

    fn save(&self, result: ObservationResult) -> Result<ObservationResult, String> {
        self.storage
            .append(result)
            .map_err(|e| format!("failed to save result: {e}"))
    }

    fn stats_text(&mut self) -> Result<String, String> {
        if !self.identity.may_read_stats() {
            return Err("statistics need teacher credentials".to_string());
        }
        let storage = self.storage;
        let sport_id = self.sheet.sport_id;
        let class = &self.class;
        let table = self
            .stats
            .get_or_try_compute(sport_id, class.id, || {
                let sheets = storage.list::<ObservationSheet>()?;
                let results = storage.list::<ObservationResult>()?;
                Ok::<_, StorageError>(aggregate(sport_id, Some(class), &sheets, &results))
            })
            .map_err(|e| format!("failed to compute statistics: {e}"))?;
        Ok(format_stats_table(table).trim_end().to_string())
    }
}

/// Records `first`, then whoever `next` names, until `quit` or end of input.
///
/// Returns how many results were saved.
fn run_sitting(
    sitting: &mut Sitting<'_>,
    first: &StudentRecord,
    input: impl BufRead,
    mut out: impl Write,
    mut clock: impl FnMut() -> Instant,
) -> Result<usize, String> {
    let mut lines = input.lines();
    let mut saved = 0;
    let mut student = Some(first.clone());

    loop {
        if let Some(current) = student.take() {
            say(&mut out, format!("-- {}", current.full_name()))?;
            let mut recorder = Recorder::new();
            recorder.begin(sitting.sheet.clone(), current.id, sitting.class.id);

            let result = run_session(&mut recorder, &mut lines, &mut out, &mut clock)
                .map_err(|e| format!("failed to read input: {e}"))?;
            match result {
                Some(result) => {
                    let result = sitting.save(result)?;
                    saved += 1;
                    say(&mut out, format!("saved {}", short_id(result.id)))?;
                }
                None => say(&mut out, "abandoned, nothing saved")?,
            }
            say(&mut out, BETWEEN_HELP)?;
        }

        let Some(line) = lines.next() else { break };
        let line = line.map_err(|e| format!("failed to read input: {e}"))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(Input::Next(reference)) => match find_student(&sitting.class, reference) {
                Ok(next) => student = Some(next.clone()),
                Err(e) => say(&mut out, format!("error: {e}"))?,
            },
            Ok(Input::Stats) => match sitting.stats_text() {
                Ok(text) => say(&mut out, text)?,
                Err(e) => say(&mut out, format!("error: {e}"))?,
            },
            Ok(Input::Quit) => break,
            Ok(Input::Help) => say(&mut out, BETWEEN_HELP)?,
            Ok(_) => say(
                &mut out,
                "error: no student is being recorded, use next <student>",
            )?,
            Err(e) => say(&mut out, format!("error: {e}"))?,
        }
    }
    Ok(saved)
}

fn say(out: &mut impl Write, text: impl Display) -> Result<(), String> {
    writeln!(out, "{text}").map_err(|e| format!("failed to write output: {e}"))
}

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Increment(&'a str),
    Decrement(&'a str),
    Tap(&'a str, &'a str),
    Toggle(&'a str),
    Start(&'a str),
    Reset(&'a str),
    Done(&'a str),
    Show,
    Help,
    Finish,
    Abandon,
    Next(&'a str),
    Stats,
    Quit,
}

fn parse_line<'a>(line: &'a str) -> Result<Input<'a>, String> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(v, r)| (v, r.trim()));

    let one = |input: fn(&'a str) -> Input<'a>| {
        if rest.is_empty() {
            Err(format!("'{verb}' needs an id"))
        } else {
            Ok(input(rest))
        }
    };

    match verb {
        "+" => one(Input::Increment),
        "-" => one(Input::Decrement),
        "toggle" => one(Input::Toggle),
        "start" => one(Input::Start),
        "reset" => one(Input::Reset),
        "done" => one(Input::Done),
        "next" => one(Input::Next),
        "tap" => match rest.split_once(char::is_whitespace) {
            Some((obs, option)) => Ok(Input::Tap(obs, option.trim())),
            None => Err("'tap' needs an id and an option".to_string()),
        },
        "show" => Ok(Input::Show),
        "help" | "?" => Ok(Input::Help),
        "finish" => Ok(Input::Finish),
        "abandon" => Ok(Input::Abandon),
        "stats" => Ok(Input::Stats),
        "quit" => Ok(Input::Quit),
        _ => Err(format!("unknown command '{verb}'")),
    }
}

/// Drive `recorder` from line input until finish, abandon, or end of input.
///
/// `clock` is read once per line. Returns the finished result, or `None`
/// if the session was abandoned.
fn run_session(
    recorder: &mut Recorder,
    lines: &mut impl Iterator<Item = io::Result<String>>,
    out: &mut impl Write,
    clock: &mut impl FnMut() -> Instant,
) -> io::Result<Option<ObservationResult>> {
    if !recorder.is_recording() {
        return Ok(None);
    }
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let now = clock();

        let input = match parse_line(&line) {
            Ok(input) => input,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };

        let outcome: Result<String, SessionError> = match input {
            Input::Increment(obs) => recorder.increment(obs).map(|n| format!("{obs} = {n}")),
            Input::Decrement(obs) => recorder.decrement(obs).map(|n| format!("{obs} = {n}")),
            Input::Tap(obs, option) => recorder
                .record(obs, option)
                .map(|n| format!("{obs}: {option} = {n}")),
            Input::Toggle(obs) => recorder.toggle_timer(obs, now).and_then(|running| {
                let ms = recorder.timer_ms(obs, now)?;
                let state = if running { "running" } else { "paused" };
                Ok(format!("{obs} {state} at {}", format_ms(ms)))
            }),
            Input::Start(obs) => recorder
                .start_timer(obs, now)
                .map(|()| format!("{obs} running")),
            Input::Reset(obs) => recorder.reset_timer(obs).map(|()| format!("{obs} = 0.0s")),
            Input::Done(ex) => recorder.toggle_exercise(ex).map(|done| {
                let state = if done { "done" } else { "not done" };
                format!("{ex} {state}")
            }),
            Input::Show => snapshot(recorder, now),
            Input::Help => Ok(HELP.to_string()),
            Input::Finish => return Ok(recorder.finish(now, Timestamp::now())),
            Input::Abandon => {
                recorder.abandon();
                return Ok(None);
            }
            Input::Next(_) | Input::Stats | Input::Quit => {
                writeln!(out, "error: finish or abandon the current student first")?;
                continue;
            }
        };

        match outcome {
            Ok(message) => writeln!(out, "{message}")?,
            Err(e) => writeln!(out, "error: {e}")?,
        }
    }

    recorder.abandon();
    Ok(None)
}

fn format_ms(ms: u64) -> String {
    format!("{}.{}s", ms / 1000, (ms % 1000) / 100)
}

/// Current working state of every observable or exercise on the sheet.
fn snapshot(recorder: &Recorder, now: Instant) -> Result<String, SessionError> {
    let sheet = recorder.sheet().ok_or(SessionError::Idle)?;
    let mut lines = Vec::new();

    match sheet.mode {
        SheetMode::MultiCriteria => {
            for obs in sheet.observables() {
                let id = obs.id.as_str();
                let value = match &obs.kind {
                    ObservableKind::Counter => recorder.counter(id)?.to_string(),
                    ObservableKind::Timer => {
                        let ms = recorder.timer_ms(id, now)?;
                        let running = if recorder.timer_running(id)? {
                            " (running)"
                        } else {
                            ""
                        };
                        format!("{}{running}", format_ms(ms))
                    }
                    ObservableKind::Categorical => recorder
                        .tally(id)?
                        .iter()
                        .map(|(option, n)| format!("{option} {n}"))
                        .collect::<Vec<_>>()
                        .join(", "),
                    ObservableKind::Unrecognized(tag) => format!("({tag}: not recordable)"),
                };
                lines.push(format!("{id}: {value}"));
            }
        }
        SheetMode::Session => {
            for ex in sheet.exercises() {
                let mark = if recorder.exercise_done(&ex.id)? { "x" } else { " " };
                lines.push(format!("[{mark}] {} {}", ex.id, ex.name));
            }
        }
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::model::{Gender, ObservedValue, SheetDraft};

    const GRID: &str = r#"
title = "Match"

[[criteria]]
label = "Jeu"

[[criteria.observables]]
id = "passes"
label = "Passes"
type = "counter"

[[criteria.observables]]
id = "chrono"
label = "Possession"
type = "timer"

[[criteria.observables]]
id = "tir"
label = "Tir"
type = "categorical"
options = ["Raté", "Pas cadré", "But"]
"#;

    const TRAINING: &str = r#"
title = "Séance"
mode = "SESSION"

[[phases]]
name = "Échauffement"

[[phases.exercises]]
id = "squat"
name = "Squat"
"#;

    fn recorder_for(definition: &str) -> Recorder {
        let draft: SheetDraft = toml::from_str(definition).unwrap();
        let sheet = draft.publish(Uuid::new_v4()).unwrap();
        let mut recorder = Recorder::new();
        recorder.begin(sheet, Uuid::new_v4(), Uuid::new_v4());
        recorder
    }

    /// A clock that advances one second per reading.
    fn ticking_clock() -> impl FnMut() -> Instant {
        let base = Instant::now();
        let mut ticks = 0;
        move || {
            ticks += 1;
            base + Duration::from_secs(ticks)
        }
    }

    fn run(recorder: &mut Recorder, script: &str) -> (Option<ObservationResult>, String) {
        let mut out = Vec::new();
        let mut lines = script.as_bytes().lines();
        let result = run_session(recorder, &mut lines, &mut out, &mut ticking_clock()).unwrap();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("+ passes"), Ok(Input::Increment("passes")));
        assert_eq!(parse_line("  -   passes "), Ok(Input::Decrement("passes")));
        assert_eq!(parse_line("tap tir Pas cadré"), Ok(Input::Tap("tir", "Pas cadré")));
        assert_eq!(parse_line("done squat"), Ok(Input::Done("squat")));
        assert_eq!(parse_line("finish"), Ok(Input::Finish));
        assert!(parse_line("tap tir").is_err());
        assert!(parse_line("+").is_err());
        assert!(parse_line("jump").is_err());
    }

    #[test]
    fn scripted_session_produces_result() {
        let mut recorder = recorder_for(GRID);
        let script = "toggle chrono\n+ passes\n+ passes\n- passes\ntoggle chrono\n\
                      tap tir But\ntap tir Pas cadré\ntap tir But\nfinish\n";

        let (result, out) = run(&mut recorder, script);
        let result = result.unwrap();

        assert_eq!(result.value("passes"), Some(&ObservedValue::Count(1)));
        // Started at the 1st reading, paused at the 5th.
        assert_eq!(result.value("chrono"), Some(&ObservedValue::Seconds(4)));
        let tally = result.value("tir").and_then(ObservedValue::tally).unwrap();
        assert_eq!(tally.get("But"), Some(&2));
        assert_eq!(tally.get("Pas cadré"), Some(&1));

        assert!(out.contains("chrono paused at 4.0s"));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn errors_are_reported_and_recording_continues() {
        let mut recorder = recorder_for(GRID);
        let script = "tap tir Poteau\n+ tir\n+ nope\nfly away\n+ passes\nfinish\n";

        let (result, out) = run(&mut recorder, script);

        assert!(out.contains("error: observable 'tir' has no option 'Poteau'"));
        assert!(out.contains("error: observable 'tir' is a categorical, not a counter"));
        assert!(out.contains("error: sheet has no observable 'nope'"));
        assert!(out.contains("error: unknown command 'fly'"));
        let result = result.unwrap();
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.value("passes"), Some(&ObservedValue::Count(1)));
    }

    #[test]
    fn end_of_input_abandons() {
        let mut recorder = recorder_for(GRID);
        let (result, _) = run(&mut recorder, "+ passes\n");
        assert!(result.is_none());
        assert!(!recorder.is_recording());
    }

    #[test]
    fn explicit_abandon() {
        let mut recorder = recorder_for(GRID);
        let (result, _) = run(&mut recorder, "+ passes\nabandon\n+ passes\n");
        assert!(result.is_none());
    }

    #[test]
    fn show_lists_every_observable() {
        let mut recorder = recorder_for(GRID);
        let (_, out) = run(&mut recorder, "+ passes\nstart chrono\ntap tir Raté\nshow\n");

        assert!(out.contains("passes: 1\n"));
        assert!(out.contains("chrono: 2.0s (running)\n"));
        assert!(out.contains("tir: Raté 1, Pas cadré 0, But 0\n"));
    }

    #[test]
    fn training_session_checks_exercises() {
        let mut recorder = recorder_for(TRAINING);
        let (result, out) = run(&mut recorder, "done squat\nshow\n+ passes\nfinish\n");

        assert!(out.contains("squat done"));
        assert!(out.contains("[x] squat Squat"));
        assert!(out.contains("error: sheet 'Séance' is a training session"));
        assert_eq!(
            result.unwrap().value("squat"),
            Some(&ObservedValue::Done(true))
        );
    }

    #[test]
    fn formats_tenths() {
        assert_eq!(format_ms(0), "0.0s");
        assert_eq!(format_ms(11_549), "11.5s");
    }

    struct Fixture {
        _dir: TempDir,
        storage: Storage,
        class: ClassData,
        sheet: ObservationSheet,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("eps")).unwrap();
        let mut class = ClassData::new("2nde A", "tigre").unwrap();
        class.add_students([
            StudentRecord::new("Jean", "Dupont", Gender::M).unwrap(),
            StudentRecord::new("Léa", "Martin", Gender::F).unwrap(),
        ]);
        let class = storage.append(class).unwrap();
        let draft: SheetDraft = toml::from_str(GRID).unwrap();
        let sheet = storage
            .append(draft.publish(Uuid::new_v4()).unwrap())
            .unwrap();
        Fixture {
            _dir: dir,
            storage,
            class,
            sheet,
        }
    }

    fn sit(f: &Fixture, identity: Identity, script: &str) -> (usize, String) {
        let mut sitting = Sitting::new(&f.storage, identity, f.class.clone(), f.sheet.clone());
        let first = find_student(&f.class, "Dupont").unwrap().clone();
        let mut out = Vec::new();
        let saved = run_sitting(
            &mut sitting,
            &first,
            script.as_bytes(),
            &mut out,
            ticking_clock(),
        )
        .unwrap();
        (saved, String::from_utf8(out).unwrap())
    }

    /// The pass count printed for `name` in each statistics table, in order.
    fn passes_column(out: &str, name: &str) -> Vec<String> {
        out.lines()
            .filter(|line| line.starts_with(name))
            .map(|line| line[name.len()..].split_whitespace().next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn statistics_follow_results_saved_in_the_sitting() {
        let f = fixture();
        let script = "+ passes\nfinish\nstats\nstats\nnext Martin\n\
                      + passes\n+ passes\nfinish\nstats\nquit\n";

        let (saved, out) = sit(&f, Identity::Teacher, script);

        assert_eq!(saved, 2);
        assert_eq!(passes_column(&out, "Dupont Jean"), ["1", "1", "1"]);
        // The last table is recomputed after Léa's result is saved.
        assert_eq!(passes_column(&out, "Martin Léa"), ["0", "0", "2"]);

        let results = f.storage.list::<ObservationResult>().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].student_id, f.class.students[1].id);
        assert_eq!(results[1].value("passes"), Some(&ObservedValue::Count(2)));
    }

    #[test]
    fn observers_record_without_statistics() {
        let f = fixture();
        let observer = identity::authenticate_observer(&f.class, "tigre").unwrap();
        let script = "stats\nabandon\nstats\n+ passes\nnext Martin\ntap tir But\nfinish\nquit\n";

        let (saved, out) = sit(&f, observer, script);

        assert_eq!(saved, 1);
        assert!(out.contains("error: finish or abandon the current student first"));
        assert!(out.contains("abandoned, nothing saved"));
        assert!(out.contains("error: statistics need teacher credentials"));
        assert!(out.contains("error: no student is being recorded, use next <student>"));
        assert!(out.contains("-- Martin Léa"));
    }

    #[test]
    fn unknown_student_keeps_the_sitting_open() {
        let f = fixture();
        let (saved, out) = sit(&f, Identity::Teacher, "finish\nnext Nobody\nnext Martin\n");

        // End of input abandons Léa's unfinished recording.
        assert_eq!(saved, 1);
        assert!(out.contains("error: no student matching 'Nobody'"));
        assert!(out.contains("-- Martin Léa"));
        assert!(out.ends_with("abandoned, nothing saved\nnext <student> | stats | quit\n"));
    }
}
