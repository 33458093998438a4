//! The single active stopwatch.
//!
//! Elapsed time is kept in milliseconds accumulated over finished run
//! segments, plus the start marker of the segment currently running. Whole
//! seconds are only taken when the time is read, so partial seconds carry
//! over from one segment to the next. The shown time is derived on every
//! read and never written back, so a caller that observes it once a second
//! cannot make it drift.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{millis_between, whole_secs};
use crate::queue::QueuedProject;
use crate::refusal::{Command, Refusal};
use crate::types::{Selection, SessionIdentity};

/// Whether the stopwatch is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
}

impl TimerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stopwatch state.
///
/// Running exactly when `segment_started_at` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwatch {
    /// Milliseconds accumulated before the current segment.
    #[serde(default)]
    elapsed_ms: u64,
    /// Start of the segment currently running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    segment_started_at: Option<DateTime<Utc>>,
    /// When the session first started, kept across pause/resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_started_at: Option<DateTime<Utc>>,
    /// The project the session was started or resumed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<Selection>,
}

/// The result of stopping a stopwatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedTimer {
    pub duration_secs: u64,
    pub session_started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Absent only for state saved without a session.
    pub session: Option<Selection>,
}

/// Read-only view of the stopwatch at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub is_running: bool,
    pub elapsed_secs: u64,
    pub display_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_started_at: Option<DateTime<Utc>>,
    /// Project and subproject the time counts towards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionIdentity>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> TimerState {
        if self.segment_started_at.is_some() {
            TimerState::Running
        } else {
            TimerState::Idle
        }
    }

    pub const fn is_running(&self) -> bool {
        self.segment_started_at.is_some()
    }

    /// Whole seconds accumulated before the current segment.
    pub const fn elapsed_secs(&self) -> u64 {
        whole_secs(self.elapsed_ms)
    }

    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.segment_started_at
    }

    pub const fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }

    pub const fn session(&self) -> Option<&Selection> {
        self.session.as_ref()
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.session.as_ref().map(Selection::identity)
    }

    /// Milliseconds counted at `now`: accumulated time plus the running
    /// segment.
    pub fn display_ms(&self, now: DateTime<Utc>) -> u64 {
        let current = self
            .segment_started_at
            .map_or(0, |started| millis_between(started, now));
        self.elapsed_ms.saturating_add(current)
    }

    /// Whole seconds to show at `now`.
    pub fn display_secs(&self, now: DateTime<Utc>) -> u64 {
        whole_secs(self.display_ms(now))
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        TimerSnapshot {
            is_running: self.is_running(),
            elapsed_secs: self.elapsed_secs(),
            display_secs: self.display_secs(now),
            start_time: self.segment_started_at,
            session_started_at: self.session_started_at,
            session: self.identity(),
        }
    }

    /// Starts counting for `session`.
    ///
    /// Time left over from a pause is kept, and so is the session it belongs
    /// to.
    pub fn start(&mut self, now: DateTime<Utc>, session: &Selection) -> Result<(), Refusal> {
        self.require_idle(Command::Start)?;
        self.segment_started_at = Some(now);
        self.session_started_at.get_or_insert(now);
        self.session.get_or_insert_with(|| session.clone());
        Ok(())
    }

    /// Stops counting and folds the running segment into the accumulated
    /// time. Returns the accumulated milliseconds.
    ///
    /// The session is kept until [`reset`](Self::reset).
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<u64, Refusal> {
        let Some(started) = self.segment_started_at else {
            return Err(self.refuse(Command::Pause));
        };
        self.elapsed_ms = self
            .elapsed_ms
            .saturating_add(millis_between(started, now));
        self.segment_started_at = None;
        Ok(self.elapsed_ms)
    }

    /// Continues a paused session: its frozen time and project carry over and
    /// a new segment starts at `now`.
    pub fn resume(&mut self, queued: &QueuedProject, now: DateTime<Utc>) -> Result<(), Refusal> {
        self.require_idle(Command::Resume)?;
        self.elapsed_ms = queued.elapsed_ms;
        self.segment_started_at = Some(now);
        self.session_started_at = Some(queued.start_time);
        self.session = Some(queued.selection());
        Ok(())
    }

    /// Finishes the session and resets to idle.
    ///
    /// Valid while running, or while idle with time left over from a pause.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<StoppedTimer, Refusal> {
        if !self.is_running() && self.elapsed_ms == 0 {
            return Err(self.refuse(Command::Stop));
        }
        let duration_secs = self.display_secs(now);
        let session_started_at = self.session_started_at.unwrap_or_else(|| {
            now - Duration::seconds(i64::try_from(duration_secs).unwrap_or(i64::MAX))
        });
        let session = self.session.take();
        self.reset();
        Ok(StoppedTimer {
            duration_secs,
            session_started_at,
            ended_at: now.max(session_started_at),
            session,
        })
    }

    /// Back to idle with nothing accumulated. Idempotent.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn require_idle(&self, command: Command) -> Result<(), Refusal> {
        if self.is_running() {
            return Err(self.refuse(command));
        }
        Ok(())
    }

    const fn refuse(&self, command: Command) -> Refusal {
        Refusal::InvalidTransition {
            command,
            state: self.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use crate::types::{ProjectId, QueueId, SubprojectId};

    fn acme() -> Selection {
        Selection::new("acme", "dev", Some("Acme".into()), None).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn queued(elapsed_ms: u64, start_time: DateTime<Utc>) -> QueuedProject {
        QueuedProject {
            id: QueueId::new("q-1").unwrap(),
            project_id: ProjectId::new("p1").unwrap(),
            subproject_id: SubprojectId::new("s1").unwrap(),
            project_name: "Acme".into(),
            subproject_name: "Backend".into(),
            elapsed_ms,
            start_time,
        }
    }

    #[test]
    fn fresh_stopwatch_is_idle_at_zero() {
        let sw = Stopwatch::new();
        assert_eq!(sw.state(), TimerState::Idle);
        assert_eq!(sw.display_secs(at(100)), 0);
        assert_eq!(sw.start_time(), None);
    }

    #[test]
    fn start_sets_markers() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        assert!(sw.is_running());
        assert_eq!(sw.start_time(), Some(t0()));
        assert_eq!(sw.session_started_at(), Some(t0()));
        assert_eq!(sw.elapsed_secs(), 0);
    }

    #[test]
    fn start_while_running_is_refused_and_changes_nothing() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        let before = sw.clone();

        let err = sw.start(at(3), &acme()).unwrap_err();
        assert_eq!(
            err,
            Refusal::InvalidTransition {
                command: Command::Start,
                state: TimerState::Running
            }
        );
        assert_eq!(sw, before);
    }

    #[test]
    fn pause_while_idle_is_a_no_op() {
        let mut sw = Stopwatch::new();
        let before = sw.clone();
        assert!(sw.pause(at(5)).is_err());
        assert_eq!(sw, before);
    }

    #[test]
    fn pause_folds_running_segment() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        assert_eq!(sw.pause(at(5)).unwrap(), 5_000);
        assert!(!sw.is_running());
        assert_eq!(sw.start_time(), None);
        assert_eq!(sw.display_secs(at(60)), 5);
    }

    #[test]
    fn display_is_monotonic_while_running() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        let mut last = 0;
        for ms in (0..10_000).step_by(250) {
            let shown = sw.display_secs(t0() + Duration::milliseconds(ms));
            assert!(shown >= last);
            assert!(shown >= sw.elapsed_secs());
            last = shown;
        }
        assert_eq!(last, 9);
    }

    #[test]
    fn observing_never_mutates() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        let before = sw.clone();
        for secs in 0..5 {
            let _ = sw.snapshot(at(secs));
        }
        assert_eq!(sw, before);
    }

    #[test]
    fn resume_carries_elapsed_and_keeps_original_start() {
        let original_start = t0();
        let mut sw = Stopwatch::new();
        sw.resume(&queued(5_000, original_start), at(10)).unwrap();

        assert!(sw.is_running());
        assert_eq!(sw.elapsed_secs(), 5);
        assert_eq!(sw.start_time(), Some(at(10)));
        assert_eq!(sw.session_started_at(), Some(original_start));
        assert_eq!(sw.display_secs(at(13)), 8);
    }

    #[test]
    fn resume_while_running_is_refused() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        let before = sw.clone();
        assert!(sw.resume(&queued(5_000, t0()), at(1)).is_err());
        assert_eq!(sw, before);
    }

    #[test]
    fn stop_returns_duration_and_resets() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        let stopped = sw.stop(at(42)).unwrap();

        assert_eq!(stopped.duration_secs, 42);
        assert_eq!(stopped.session_started_at, t0());
        assert_eq!(stopped.ended_at, at(42));
        assert_eq!(sw, Stopwatch::default());
    }

    #[test]
    fn stop_at_start_instant_has_zero_duration() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        let stopped = sw.stop(t0()).unwrap();
        assert_eq!(stopped.duration_secs, 0);
        assert_eq!(sw.state(), TimerState::Idle);
    }

    #[test]
    fn stop_from_idle_with_leftover_time() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        sw.pause(at(7)).unwrap();

        let stopped = sw.stop(at(100)).unwrap();
        assert_eq!(stopped.duration_secs, 7);
        assert_eq!(stopped.session_started_at, t0());
    }

    #[test]
    fn stop_from_clean_idle_is_refused() {
        let mut sw = Stopwatch::new();
        assert_eq!(
            sw.stop(t0()).unwrap_err(),
            Refusal::InvalidTransition {
                command: Command::Stop,
                state: TimerState::Idle
            }
        );
    }

    #[test]
    fn segments_sum_exactly_across_cycles() {
        let mut sw = Stopwatch::new();
        let mut now = t0();
        sw.start(now, &acme()).unwrap();
        let mut expected = 0;
        for run in [4, 1, 17, 3, 60, 9] {
            now += Duration::seconds(run);
            expected += run.unsigned_abs();
            let frozen = sw.pause(now).unwrap();
            assert_eq!(frozen, expected * 1000);
            // idle gap must not count
            now += Duration::seconds(30);
            sw.start(now, &acme()).unwrap();
        }
        now += Duration::seconds(2);
        assert_eq!(sw.stop(now).unwrap().duration_secs, expected + 2);
    }

    #[test]
    fn backwards_clock_never_goes_negative() {
        let mut sw = Stopwatch::new();
        sw.start(at(10), &acme()).unwrap();
        assert_eq!(sw.display_secs(at(5)), 0);
        assert_eq!(sw.pause(at(5)).unwrap(), 0);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        sw.reset();
        let once = sw.clone();
        sw.reset();
        assert_eq!(sw, once);
        assert_eq!(sw, Stopwatch::default());
    }

    #[test]
    fn partial_seconds_carry_across_cycles() {
        let mut sw = Stopwatch::new();
        let mut now = t0();
        for _ in 0..10 {
            sw.start(now, &acme()).unwrap();
            now += Duration::milliseconds(4_900);
            sw.pause(now).unwrap();
            now += Duration::seconds(3);
        }
        assert_eq!(sw.elapsed_secs(), 49);
        assert_eq!(sw.stop(now).unwrap().duration_secs, 49);
    }

    #[test]
    fn display_floors_only_at_read() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        let paused_at = t0() + Duration::milliseconds(1_600);
        assert_eq!(sw.pause(paused_at).unwrap(), 1_600);
        assert_eq!(sw.elapsed_secs(), 1);

        sw.start(at(10), &acme()).unwrap();
        let now = at(10) + Duration::milliseconds(500);
        assert_eq!(sw.display_ms(now), 2_100);
        assert_eq!(sw.display_secs(now), 2);
    }

    #[test]
    fn start_remembers_session() {
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();

        let snapshot = sw.snapshot(at(1));
        assert_eq!(snapshot.session, Some(acme().identity()));
        assert_eq!(sw.session(), Some(&acme()));
    }

    #[test]
    fn restart_after_pause_keeps_original_session() {
        let other = Selection::new("globex", "ops", None, None).unwrap();
        let mut sw = Stopwatch::new();
        sw.start(t0(), &acme()).unwrap();
        sw.pause(at(4)).unwrap();
        sw.start(at(5), &other).unwrap();

        let stopped = sw.stop(at(6)).unwrap();
        assert_eq!(stopped.duration_secs, 5);
        assert_eq!(stopped.session, Some(acme()));
    }

    #[test]
    fn resume_takes_session_from_queue() {
        let entry = queued(5_000, t0());
        let mut sw = Stopwatch::new();
        sw.resume(&entry, at(10)).unwrap();

        assert_eq!(sw.identity(), Some(entry.identity()));
        assert_eq!(sw.snapshot(at(11)).session, Some(entry.identity()));
    }
}
