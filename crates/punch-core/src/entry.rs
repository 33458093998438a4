//! Logged time entries and the sink they are handed to.

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ProjectId, Selection, SubprojectId};

/// A finished piece of tracked time.
///
/// Only built through [`LoggedTimeEntry::new`], so the duration is always
/// positive and the end never precedes the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct LoggedTimeEntry {
    project_id: ProjectId,
    subproject_id: SubprojectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_secs: u64,
}

/// Why a stored entry could not be accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidEntry {
    #[error("duration must be positive")]
    ZeroDuration,
    #[error("entry ends at {ended_at} before it starts at {started_at}")]
    EndsBeforeStart {
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
}

impl LoggedTimeEntry {
    /// Builds an entry, or `None` when the duration is zero or the end
    /// precedes the start.
    ///
    /// A blank description is stored as no description.
    pub fn new(
        duration_secs: u64,
        description: Option<&str>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        project_id: ProjectId,
        subproject_id: SubprojectId,
    ) -> Option<Self> {
        Self::validate(duration_secs, started_at, ended_at).ok()?;
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);
        Some(Self {
            project_id,
            subproject_id,
            description,
            started_at,
            ended_at,
            duration_secs,
        })
    }

    fn validate(
        duration_secs: u64,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Result<(), InvalidEntry> {
        if duration_secs == 0 {
            return Err(InvalidEntry::ZeroDuration);
        }
        if ended_at < started_at {
            return Err(InvalidEntry::EndsBeforeStart {
                started_at,
                ended_at,
            });
        }
        Ok(())
    }

    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub const fn subproject_id(&self) -> &SubprojectId {
        &self.subproject_id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub const fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    pub const fn duration_secs(&self) -> u64 {
        self.duration_secs
    }
}

#[derive(Deserialize)]
struct RawEntry {
    project_id: ProjectId,
    subproject_id: SubprojectId,
    #[serde(default)]
    description: Option<String>,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_secs: u64,
}

impl TryFrom<RawEntry> for LoggedTimeEntry {
    type Error = InvalidEntry;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Self::validate(raw.duration_secs, raw.started_at, raw.ended_at)?;
        Ok(Self {
            project_id: raw.project_id,
            subproject_id: raw.subproject_id,
            description: raw.description,
            started_at: raw.started_at,
            ended_at: raw.ended_at,
            duration_secs: raw.duration_secs,
        })
    }
}

/// A stopped timer waiting for the user to confirm it with a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub duration_secs: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub selection: Selection,
}

impl PendingEntry {
    pub fn into_entry(self, description: Option<&str>) -> Option<LoggedTimeEntry> {
        LoggedTimeEntry::new(
            self.duration_secs,
            description,
            self.started_at,
            self.ended_at,
            self.selection.project_id,
            self.selection.subproject_id,
        )
    }
}

/// Where logged entries go: the log store.
pub trait EntrySink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn record(&mut self, entry: &LoggedTimeEntry) -> Result<(), Self::Error>;
}

/// Keeps entries in memory.
impl EntrySink for Vec<LoggedTimeEntry> {
    type Error = Infallible;

    fn record(&mut self, entry: &LoggedTimeEntry) -> Result<(), Self::Error> {
        self.push(entry.clone());
        Ok(())
    }
}

impl<S: EntrySink + ?Sized> EntrySink for &mut S {
    type Error = S::Error;

    fn record(&mut self, entry: &LoggedTimeEntry) -> Result<(), Self::Error> {
        (**self).record(entry)
    }
}

/// Hands an entry to the sink.
pub fn emit<S: EntrySink + ?Sized>(entry: &LoggedTimeEntry, sink: &mut S) -> Result<(), S::Error> {
    sink.record(entry)?;
    tracing::info!(
        project = %entry.project_id,
        subproject = %entry.subproject_id,
        duration_secs = entry.duration_secs,
        "time entry logged"
    );
    Ok(())
}
