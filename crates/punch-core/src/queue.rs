//! Sessions that were running and got paused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::whole_secs;
use crate::refusal::Refusal;
use crate::types::{ProjectId, QueueId, Selection, SessionIdentity, SubprojectId};

/// A paused session waiting to be resumed.
///
/// Labels are copied when the session is paused and are not refreshed if the
/// project is renamed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedProject {
    pub id: QueueId,
    pub project_id: ProjectId,
    pub subproject_id: SubprojectId,
    pub project_name: String,
    pub subproject_name: String,
    /// Milliseconds accumulated up to the pause. Frozen while queued.
    pub elapsed_ms: u64,
    /// When the session originally started.
    pub start_time: DateTime<Utc>,
}

impl QueuedProject {
    /// Whole seconds accumulated up to the pause.
    pub const fn elapsed_secs(&self) -> u64 {
        whole_secs(self.elapsed_ms)
    }

    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            project_id: self.project_id.clone(),
            subproject_id: self.subproject_id.clone(),
        }
    }

    /// The selection a caller should switch to when this session resumes.
    pub fn selection(&self) -> Selection {
        Selection {
            project_id: self.project_id.clone(),
            subproject_id: self.subproject_id.clone(),
            project_name: self.project_name.clone(),
            subproject_name: self.subproject_name.clone(),
        }
    }
}

/// Last id handed out by [`PausedQueue::next_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct IssuedStamp {
    millis: i64,
    seq: u32,
}

/// Paused sessions in insertion order.
///
/// Entries stay until they are resumed or discarded; there is no eviction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PausedQueue {
    #[serde(default)]
    entries: Vec<QueuedProject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_issued: Option<IssuedStamp>,
}

impl PausedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues an id for a session paused at `now`.
    ///
    /// Ids never go backwards, even if the clock does, and never collide
    /// with an id already queued.
    pub fn next_id(&mut self, now: DateTime<Utc>) -> QueueId {
        let mut stamp = match self.last_issued {
            Some(last) if now.timestamp_millis() <= last.millis => IssuedStamp {
                millis: last.millis,
                seq: last.seq + 1,
            },
            _ => IssuedStamp {
                millis: now.timestamp_millis(),
                seq: 0,
            },
        };
        let mut id = QueueId::from_stamp(stamp.millis, stamp.seq);
        while self.contains(&id) {
            stamp.seq += 1;
            id = QueueId::from_stamp(stamp.millis, stamp.seq);
        }
        self.last_issued = Some(stamp);
        id
    }

    /// Appends a paused session.
    pub fn enqueue(&mut self, entry: QueuedProject) -> Result<(), Refusal> {
        if self.contains(&entry.id) {
            return Err(Refusal::DuplicateQueueId(entry.id));
        }
        tracing::debug!(id = %entry.id, elapsed_ms = entry.elapsed_ms, "session queued");
        self.entries.push(entry);
        Ok(())
    }

    /// Removes a session by id. An unknown id is a no-op.
    pub fn remove(&mut self, id: &QueueId) -> Option<QueuedProject> {
        let index = self.entries.iter().position(|e| &e.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, id: &QueueId) -> Option<&QueuedProject> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &QueueId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueuedProject> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[QueuedProject] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a PausedQueue {
    type Item = &'a QueuedProject;
    type IntoIter = std::slice::Iter<'a, QueuedProject>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
