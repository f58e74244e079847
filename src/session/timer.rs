//! Stopwatch state for timer observables.

use std::time::Instant;

/// A pausable stopwatch.
///
/// Elapsed time is recomputed from the running anchor on every read.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    /// Time accumulated over earlier running windows.
    baseline_ms: u64,
    /// Set while running: when the current window started.
    running_anchor: Option<Instant>,
}

impl Stopwatch {
    pub fn is_running(&self) -> bool {
        self.running_anchor.is_some()
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        match self.running_anchor {
            Some(anchor) => self.baseline_ms.saturating_add(millis_between(anchor, now)),
            None => self.baseline_ms,
        }
    }

    /// Starts the stopwatch. No-op if already running.
    pub fn start(&mut self, now: Instant) {
        if self.running_anchor.is_none() {
            self.running_anchor = Some(now);
        }
    }

    /// Pauses the stopwatch, folding the current window into the baseline.
    pub fn pause(&mut self, now: Instant) {
        if let Some(anchor) = self.running_anchor.take() {
            self.baseline_ms = self.baseline_ms.saturating_add(millis_between(anchor, now));
        }
    }

    /// Flips between running and paused. Returns whether it is now running.
    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.is_running() {
            self.pause(now);
        } else {
            self.start(now);
        }
        self.is_running()
    }

    /// Stops the stopwatch and zeroes it.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn whole_seconds(&self, now: Instant) -> u64 {
        round_to_seconds(self.elapsed_ms(now))
    }
}

/// Milliseconds to whole seconds, rounding half up (4500 ms is 5 s).
pub fn round_to_seconds(ms: u64) -> u64 {
    ms.saturating_add(500) / 1000
}

fn millis_between(from: Instant, to: Instant) -> u64 {
    u64::try_from(to.saturating_duration_since(from).as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn rounds_half_up_at_the_boundary() {
        assert_eq!(round_to_seconds(4500), 5);
        assert_eq!(round_to_seconds(4499), 4);
        assert_eq!(round_to_seconds(1500), 2);
        assert_eq!(round_to_seconds(499), 0);
        assert_eq!(round_to_seconds(0), 0);
    }

    #[test]
    fn elapsed_advances_only_while_running() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();

        sw.start(t0);
        assert_eq!(sw.elapsed_ms(at(t0, 1200)), 1200);

        sw.pause(at(t0, 2000));
        assert_eq!(sw.elapsed_ms(at(t0, 9000)), 2000);
        assert!(!sw.is_running());
    }

    #[test]
    fn start_while_running_keeps_the_original_anchor() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();

        sw.start(t0);
        sw.start(at(t0, 500));
        assert_eq!(sw.elapsed_ms(at(t0, 1000)), 1000);
    }

    #[test]
    fn toggle_cycles_sum_independent_of_pause_count() {
        let t0 = Instant::now();
        let mut one = Stopwatch::default();
        one.toggle(t0);
        one.toggle(at(t0, 3000));

        let mut many = Stopwatch::default();
        let mut cursor = 0;
        for _ in 0..6 {
            assert!(many.toggle(at(t0, cursor)));
            cursor += 500;
            assert!(!many.toggle(at(t0, cursor)));
            cursor += 10_000;
        }

        assert_eq!(one.elapsed_ms(at(t0, 99_000)), 3000);
        assert_eq!(many.elapsed_ms(at(t0, 99_000)), 3000);
    }

    #[test]
    fn reset_stops_and_zeroes() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.start(t0);
        sw.reset();

        assert!(!sw.is_running());
        assert_eq!(sw.elapsed_ms(at(t0, 5000)), 0);
    }
}
