//! The timer façade over the active stopwatch, the paused-session queue,
//! and the stopped timer waiting to be logged.
//!
//! Commands run to completion and return immediately. A command that does
//! not fit the current state is refused with a [`Refusal`] and changes
//! nothing. The coordinator never owns the caller's selection; commands that
//! need one take it as an argument. The running timer does remember which
//! session it counts for, so changing the selection mid-run never moves time
//! to another project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::entry::{EntrySink, LoggedTimeEntry, PendingEntry, emit};
use crate::queue::{PausedQueue, QueuedProject};
use crate::refusal::{Command, Refusal};
use crate::stopwatch::{Stopwatch, TimerSnapshot};
use crate::types::{QueueId, Selection};

/// Everything the coordinator needs to pick up where it left off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub stopwatch: Stopwatch,
    #[serde(default)]
    pub queue: PausedQueue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingEntry>,
}

/// Failure to log time: either the command was refused or the sink failed.
#[derive(Debug, Error)]
pub enum LogError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Refused(#[from] Refusal),
    #[error("failed to record time entry")]
    Sink(#[source] E),
}

/// The commands an external controller may trigger directly.
pub trait TimerCommands {
    type SinkError;

    fn start(&mut self, selection: Option<&Selection>) -> Result<TimerSnapshot, Refusal>;
    fn pause(&mut self, selection: Option<&Selection>) -> Result<QueuedProject, Refusal>;
    fn stop(&mut self, selection: Option<&Selection>) -> Result<Option<PendingEntry>, Refusal>;
    fn log_pending(
        &mut self,
        description: Option<&str>,
    ) -> Result<Option<LoggedTimeEntry>, Self::SinkError>;
}

pub struct TimerCoordinator<C> {
    clock: C,
    stopwatch: Stopwatch,
    queue: PausedQueue,
    pending: Option<PendingEntry>,
}

impl<C: Clock> TimerCoordinator<C> {
    pub fn new(clock: C) -> Self {
        Self::from_state(EngineState::default(), clock)
    }

    pub fn from_state(state: EngineState, clock: C) -> Self {
        Self {
            clock,
            stopwatch: state.stopwatch,
            queue: state.queue,
            pending: state.pending,
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            stopwatch: self.stopwatch.clone(),
            queue: self.queue.clone(),
            pending: self.pending.clone(),
        }
    }

    pub fn into_state(self) -> EngineState {
        EngineState {
            stopwatch: self.stopwatch,
            queue: self.queue,
            pending: self.pending,
        }
    }

    /// Snapshot of the active timer at the clock's current time.
    pub fn observe(&self) -> TimerSnapshot {
        self.snapshot_at(self.clock.now())
    }

    /// Snapshot at an explicit instant. Never mutates.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> TimerSnapshot {
        self.stopwatch.snapshot(now)
    }

    pub const fn queue(&self) -> &PausedQueue {
        &self.queue
    }

    pub const fn pending(&self) -> Option<&PendingEntry> {
        self.pending.as_ref()
    }

    pub const fn is_running(&self) -> bool {
        self.stopwatch.is_running()
    }

    /// Starts the timer for the selection.
    ///
    /// Starting again after a pause left time on the clock keeps counting
    /// for the session that time belongs to.
    pub fn start(&mut self, selection: Option<&Selection>) -> Result<TimerSnapshot, Refusal> {
        self.try_start(selection)
            .inspect_err(|r| refused(Command::Start, r))
    }

    /// Freezes the running session into the queue and resets the timer.
    ///
    /// The queued entry belongs to the running session, whatever the
    /// selection is now, and takes its elapsed time from the display time at
    /// this instant.
    pub fn pause(&mut self, selection: Option<&Selection>) -> Result<QueuedProject, Refusal> {
        self.try_pause(selection)
            .inspect_err(|r| refused(Command::Pause, r))
    }

    /// Takes a session off the queue and makes it the active timer.
    ///
    /// Refused while another timer runs, so at most one session counts at a
    /// time. Resuming an id that is gone is a no-op. The caller should
    /// switch its selection to the returned entry.
    pub fn resume(&mut self, id: &QueueId) -> Result<QueuedProject, Refusal> {
        self.try_resume(id)
            .inspect_err(|r| refused(Command::Resume, r))
    }

    /// Stops the timer and resets it.
    ///
    /// With a positive duration the stopped timer is staged as the pending
    /// entry (replacing any earlier one) and returned; a zero duration
    /// resets without staging anything. The entry is attributed to the
    /// session the timer was started or resumed for.
    pub fn stop(&mut self, selection: Option<&Selection>) -> Result<Option<PendingEntry>, Refusal> {
        self.try_stop(selection)
            .inspect_err(|r| refused(Command::Stop, r))
    }

    fn try_start(&mut self, selection: Option<&Selection>) -> Result<TimerSnapshot, Refusal> {
        let selection = selection.ok_or(Refusal::MissingSelection)?;
        let now = self.clock.now();
        self.stopwatch.start(now, selection)?;
        tracing::debug!(
            project = %selection.project_id,
            subproject = %selection.subproject_id,
            "timer started"
        );
        Ok(self.stopwatch.snapshot(now))
    }

    fn try_pause(&mut self, selection: Option<&Selection>) -> Result<QueuedProject, Refusal> {
        let selection = selection.ok_or(Refusal::MissingSelection)?;
        let now = self.clock.now();
        let start_time = match self.stopwatch.session_started_at() {
            Some(started) if self.stopwatch.is_running() => started,
            _ => {
                return Err(Refusal::InvalidTransition {
                    command: Command::Pause,
                    state: self.stopwatch.state(),
                });
            }
        };

        // State saved before sessions were tracked falls back to the selection.
        let session = self.stopwatch.session().unwrap_or(selection);
        let entry = QueuedProject {
            id: self.queue.next_id(now),
            project_id: session.project_id.clone(),
            subproject_id: session.subproject_id.clone(),
            project_name: session.project_name.clone(),
            subproject_name: session.subproject_name.clone(),
            elapsed_ms: self.stopwatch.display_ms(now),
            start_time,
        };
        self.queue.enqueue(entry.clone())?;
        self.stopwatch.pause(now)?;
        self.stopwatch.reset();
        tracing::debug!(id = %entry.id, elapsed_ms = entry.elapsed_ms, "timer paused");
        Ok(entry)
    }

    fn try_resume(&mut self, id: &QueueId) -> Result<QueuedProject, Refusal> {
        if self.stopwatch.is_running() {
            return Err(Refusal::InvalidTransition {
                command: Command::Resume,
                state: self.stopwatch.state(),
            });
        }
        let entry = self
            .queue
            .remove(id)
            .ok_or_else(|| Refusal::StaleQueueReference(id.clone()))?;
        self.stopwatch.reset();
        self.stopwatch.resume(&entry, self.clock.now())?;
        tracing::debug!(id = %entry.id, elapsed_ms = entry.elapsed_ms, "timer resumed");
        Ok(entry)
    }

    fn try_stop(&mut self, selection: Option<&Selection>) -> Result<Option<PendingEntry>, Refusal> {
        let selection = selection.ok_or(Refusal::MissingSelection)?;
        let stopped = self.stopwatch.stop(self.clock.now())?;
        if stopped.duration_secs == 0 {
            tracing::debug!("timer stopped with nothing to log");
            return Ok(None);
        }
        let pending = PendingEntry {
            duration_secs: stopped.duration_secs,
            started_at: stopped.session_started_at,
            ended_at: stopped.ended_at,
            selection: stopped.session.unwrap_or_else(|| selection.clone()),
        };
        tracing::debug!(
            project = %pending.selection.project_id,
            duration_secs = pending.duration_secs,
            "timer stopped"
        );
        self.pending = Some(pending.clone());
        Ok(Some(pending))
    }

    /// Starts when idle, stops when running.
    pub fn toggle(&mut self, selection: Option<&Selection>) -> Result<Toggled, Refusal> {
        if self.stopwatch.is_running() {
            self.stop(selection).map(Toggled::Stopped)
        } else {
            self.start(selection).map(Toggled::Started)
        }
    }

    /// Logs the pending entry with a description.
    ///
    /// Returns `Ok(None)` when nothing is pending. If the sink fails the
    /// entry stays pending.
    pub fn log_pending<S: EntrySink + ?Sized>(
        &mut self,
        description: Option<&str>,
        sink: &mut S,
    ) -> Result<Option<LoggedTimeEntry>, S::Error> {
        let Some(pending) = self.pending.clone() else {
            return Ok(None);
        };
        let entry = pending.into_entry(description);
        if let Some(entry) = &entry {
            emit(entry, sink)?;
        }
        self.pending = None;
        Ok(entry)
    }

    /// Drops the pending entry without logging it.
    pub fn cancel_pending(&mut self) -> Option<PendingEntry> {
        self.pending.take()
    }

    /// Finishes a paused session straight from the queue.
    ///
    /// Sessions with accumulated time are logged from their original start
    /// until now. If the sink fails the session stays queued.
    pub fn stop_queued<S: EntrySink + ?Sized>(
        &mut self,
        id: &QueueId,
        description: Option<&str>,
        sink: &mut S,
    ) -> Result<Option<LoggedTimeEntry>, LogError<S::Error>> {
        let queued = self
            .queue
            .get(id)
            .ok_or_else(|| Refusal::StaleQueueReference(id.clone()))
            .inspect_err(|r| refused(Command::Stop, r))?;
        let now = self.clock.now();
        let entry = LoggedTimeEntry::new(
            queued.elapsed_secs(),
            description,
            queued.start_time,
            now.max(queued.start_time),
            queued.project_id.clone(),
            queued.subproject_id.clone(),
        );
        if let Some(entry) = &entry {
            emit(entry, sink).map_err(LogError::Sink)?;
        }
        self.queue.remove(id);
        Ok(entry)
    }

    /// Removes a paused session without logging it.
    pub fn discard_queued(&mut self, id: &QueueId) -> Result<QueuedProject, Refusal> {
        let entry = self
            .queue
            .remove(id)
            .ok_or_else(|| Refusal::StaleQueueReference(id.clone()))?;
        tracing::debug!(id = %entry.id, "paused session discarded");
        Ok(entry)
    }

    /// Resets the active timer. The queue and pending entry are kept.
    pub fn reset_timer(&mut self) {
        self.stopwatch.reset();
        tracing::debug!("timer reset");
    }

    /// Pairs the coordinator with a sink as a [`TimerCommands`] handle.
    pub fn commands<'a, S: EntrySink>(
        &'a mut self,
        sink: &'a mut S,
    ) -> CommandHandle<'a, C, S> {
        CommandHandle {
            coordinator: self,
            sink,
        }
    }
}

/// What [`TimerCoordinator::toggle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggled {
    Started(TimerSnapshot),
    Stopped(Option<PendingEntry>),
}

/// A coordinator borrowed together with the log store.
pub struct CommandHandle<'a, C, S> {
    coordinator: &'a mut TimerCoordinator<C>,
    sink: &'a mut S,
}

impl<C: Clock, S: EntrySink> TimerCommands for CommandHandle<'_, C, S> {
    type SinkError = S::Error;

    fn start(&mut self, selection: Option<&Selection>) -> Result<TimerSnapshot, Refusal> {
        self.coordinator.start(selection)
    }

    fn pause(&mut self, selection: Option<&Selection>) -> Result<QueuedProject, Refusal> {
        self.coordinator.pause(selection)
    }

    fn stop(&mut self, selection: Option<&Selection>) -> Result<Option<PendingEntry>, Refusal> {
        self.coordinator.stop(selection)
    }

    fn log_pending(
        &mut self,
        description: Option<&str>,
    ) -> Result<Option<LoggedTimeEntry>, Self::SinkError> {
        self.coordinator.log_pending(description, &mut *self.sink)
    }
}

fn refused(command: Command, refusal: &Refusal) {
    tracing::debug!(%command, %refusal, "command refused");
}
