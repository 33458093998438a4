//! Engine state kept between invocations.
//!
//! Each `punch` run loads the state file, applies one command, and writes it
//! back, all while holding an exclusive lock on a sibling `.lock` file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use punch_core::{Clock, EngineState, Selection, TimerCoordinator};
use serde::{Deserialize, Serialize};

/// What is written to the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default)]
    pub engine: EngineState,
    /// The current selection. Owned by the front end, not the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

/// The engine plus the selection commands run against.
pub struct Tracker<C> {
    pub coordinator: TimerCoordinator<C>,
    pub selection: Option<Selection>,
}

impl<C: Clock> Tracker<C> {
    pub fn new(saved: SavedState, clock: C) -> Self {
        Self {
            coordinator: TimerCoordinator::from_state(saved.engine, clock),
            selection: saved.selection,
        }
    }

    pub fn into_saved(self) -> SavedState {
        SavedState {
            engine: self.coordinator.into_state(),
            selection: self.selection,
        }
    }
}

/// An exclusively locked state file.
///
/// The lock is released when this is dropped.
pub struct StateFile {
    path: PathBuf,
    _lock: File,
}

impl StateFile {
    /// Locks the state file at `path`, creating its directory if needed.
    pub fn lock(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create state directory")?;
        }
        let lock = File::create(lock_path(path)).context("failed to create lock file")?;
        lock.lock_exclusive().context("failed to acquire lock")?;
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    /// Reads the saved state. A missing file is a fresh start.
    pub fn load(&self) -> Result<SavedState> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no state file, starting fresh");
                Ok(SavedState::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }

    /// Writes the state through a temporary file so a crash never leaves it
    /// half written.
    pub fn save(&self, state: &SavedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("failed to serialize state")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context("failed to write state file")?;
        fs::rename(&tmp, &self.path).context("failed to replace state file")?;
        Ok(())
    }
}

fn lock_path(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lock");
    state_path.with_file_name(name)
}
