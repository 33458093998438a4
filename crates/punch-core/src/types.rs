//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated project identifier.
    ///
    /// Opaque to the engine; only non-emptiness is checked.
    ProjectId, "project ID"
);

define_string_id!(
    /// A validated subproject identifier.
    SubprojectId, "subproject ID"
);

define_string_id!(
    /// Identifier of a paused session in the queue.
    ///
    /// Issued by [`PausedQueue::next_id`](crate::PausedQueue::next_id) and unique
    /// within the queue at insertion time.
    QueueId, "queue ID"
);

impl QueueId {
    /// Formats a generated id: Unix milliseconds, plus `-seq` when more than
    /// one id falls in the same millisecond.
    pub(crate) fn from_stamp(millis: i64, seq: u32) -> Self {
        if seq == 0 {
            Self(millis.to_string())
        } else {
            Self(format!("{millis}-{seq}"))
        }
    }
}

/// The (project, subproject) pair a timer runs for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub project_id: ProjectId,
    pub subproject_id: SubprojectId,
}

/// The caller's current selection: identity plus display labels.
///
/// The engine never stores the selection as its own state; commands receive
/// it as context and copy what they need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub project_id: ProjectId,
    pub subproject_id: SubprojectId,
    pub project_name: String,
    pub subproject_name: String,
}

impl Selection {
    /// Builds a selection from raw strings, rejecting empty identifiers.
    ///
    /// Blank display names fall back to the identifier.
    pub fn new(
        project_id: impl Into<String>,
        subproject_id: impl Into<String>,
        project_name: Option<String>,
        subproject_name: Option<String>,
    ) -> Result<Self, ValidationError> {
        let project_id = ProjectId::new(project_id)?;
        let subproject_id = SubprojectId::new(subproject_id)?;
        let project_name = project_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| project_id.to_string());
        let subproject_name = subproject_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| subproject_id.to_string());
        Ok(Self {
            project_id,
            subproject_id,
            project_name,
            subproject_name,
        })
    }

    /// Returns the identity part of the selection.
    #[must_use]
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            project_id: self.project_id.clone(),
            subproject_id: self.subproject_id.clone(),
        }
    }
}
