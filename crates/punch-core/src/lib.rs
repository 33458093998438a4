//! Stopwatch engine for the punch time tracker.
//!
//! This crate contains:
//! - Stopwatch: elapsed-time accounting for the one active timer
//! - Paused queue: sessions frozen with their accumulated time
//! - Coordinator: start/pause/resume/stop commands over both
//! - Entries: the logged time handed to a log store
//!
//! The engine is single-threaded and holds no timer of its own. Callers tick
//! by calling [`TimerCoordinator::observe`].

pub mod clock;
mod coordinator;
mod entry;
pub mod format;
mod queue;
mod refusal;
mod stopwatch;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{
    CommandHandle, EngineState, LogError, TimerCommands, TimerCoordinator, Toggled,
};
pub use entry::{EntrySink, InvalidEntry, LoggedTimeEntry, PendingEntry, emit};
pub use queue::{PausedQueue, QueuedProject};
pub use refusal::{Command, Refusal};
pub use stopwatch::{Stopwatch, StoppedTimer, TimerSnapshot, TimerState};
pub use types::{ProjectId, QueueId, Selection, SessionIdentity, SubprojectId, ValidationError};
