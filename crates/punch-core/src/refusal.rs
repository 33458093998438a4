//! Why a command was not applied.
//!
//! The engine never fails a misordered command; it refuses it and leaves its
//! state exactly as it was. Callers are free to ignore a [`Refusal`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stopwatch::TimerState;
use crate::types::QueueId;

/// A timer command, as named in refusals and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
}

impl Command {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command the engine declined to apply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The command is not valid in the timer's current state.
    #[error("cannot {command} while the timer is {state}")]
    InvalidTransition { command: Command, state: TimerState },

    /// No project and subproject were selected.
    #[error("no project and subproject selected")]
    MissingSelection,

    /// The queue holds no paused session with this id.
    #[error("no paused session with id {0}")]
    StaleQueueReference(QueueId),

    /// A paused session with this id is already queued.
    #[error("paused session {0} is already queued")]
    DuplicateQueueId(QueueId),
}
