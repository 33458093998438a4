//! Storage layer for logged time entries.
//!
//! Provides the log store the timer engine hands finished entries to, using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with second precision
//! (e.g., `2024-01-15T10:30:00Z`). This ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Durations
//!
//! `duration_secs` is the tracked time, which is usually shorter than
//! `ended_at - started_at` because paused time between the two is not counted.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use punch_core::{EntrySink, LoggedTimeEntry, ProjectId, SubprojectId};
use rusqlite::{Connection, Row, params};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for entry {entry_id}: {timestamp}")]
    TimestampParse {
        entry_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row does not describe a valid time entry.
    #[error("invalid time entry {entry_id}: {message}")]
    InvalidEntry { entry_id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A logged entry together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: String,
    pub entry: LoggedTimeEntry,
}

/// Tracked seconds summed per project and subproject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTotal {
    pub project_id: String,
    pub subproject_id: String,
    pub total_secs: u64,
    pub entry_count: u64,
}

const ENTRY_COLUMNS: &str =
    "id, project_id, subproject_id, description, started_at, ended_at, duration_secs";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Time entries: finished, logged stopwatch sessions
            -- started_at/ended_at: RFC 3339 UTC (e.g., '2024-01-15T10:30:00Z')
            -- duration_secs: tracked seconds, always positive
            CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                subproject_id TEXT NOT NULL,
                description TEXT,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                duration_secs INTEGER NOT NULL CHECK (duration_secs > 0)
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_started ON time_entries(started_at);
            CREATE INDEX IF NOT EXISTS idx_time_entries_project
                ON time_entries(project_id, subproject_id);
            ",
        )?;
        Ok(())
    }

    /// Stores an entry under a fresh id, which is returned.
    pub fn insert_entry(&mut self, entry: &LoggedTimeEntry) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        let duration = i64::try_from(entry.duration_secs()).unwrap_or(i64::MAX);
        self.conn.execute(
            "
            INSERT INTO time_entries
            (id, project_id, subproject_id, description, started_at, ended_at, duration_secs)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id,
                entry.project_id().as_str(),
                entry.subproject_id().as_str(),
                entry.description(),
                format_timestamp(entry.started_at()),
                format_timestamp(entry.ended_at()),
                duration,
            ],
        )?;
        tracing::debug!(%id, "time entry stored");
        Ok(id)
    }

    /// Lists all entries ordered by start time then ID.
    pub fn list_entries(&self) -> Result<Vec<StoredEntry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM time_entries
            ORDER BY started_at ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([], RawRow::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_stored()?);
        }
        Ok(entries)
    }

    /// Lists entries that started within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn list_entries_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredEntry>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let start = format_timestamp(start);
        let end = format_timestamp(end);
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM time_entries
            WHERE started_at >= ? AND started_at < ?
            ORDER BY started_at ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([start, end], RawRow::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_stored()?);
        }
        Ok(entries)
    }

    /// Sums tracked time per project and subproject, largest first.
    pub fn total_duration_by_project(&self) -> Result<Vec<ProjectTotal>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT project_id, subproject_id, SUM(duration_secs) AS total, COUNT(*)
            FROM time_entries
            GROUP BY project_id, subproject_id
            ORDER BY total DESC, project_id ASC, subproject_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let total: i64 = row.get(2)?;
            let count: i64 = row.get(3)?;
            Ok(ProjectTotal {
                project_id: row.get(0)?,
                subproject_id: row.get(1)?,
                total_secs: u64::try_from(total).unwrap_or(0),
                entry_count: u64::try_from(count).unwrap_or(0),
            })
        })?;
        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }
}

impl EntrySink for Database {
    type Error = DbError;

    fn record(&mut self, entry: &LoggedTimeEntry) -> Result<(), Self::Error> {
        self.insert_entry(entry).map(|_| ())
    }
}

/// A `time_entries` row before validation.
struct RawRow {
    id: String,
    project_id: String,
    subproject_id: String,
    description: Option<String>,
    started_at: String,
    ended_at: String,
    duration_secs: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            subproject_id: row.get(2)?,
            description: row.get(3)?,
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
            duration_secs: row.get(6)?,
        })
    }

    fn into_stored(self) -> Result<StoredEntry, DbError> {
        let invalid = |message: String| DbError::InvalidEntry {
            entry_id: self.id.clone(),
            message,
        };
        let started_at = parse_timestamp(&self.started_at, &self.id)?;
        let ended_at = parse_timestamp(&self.ended_at, &self.id)?;
        let duration_secs = u64::try_from(self.duration_secs)
            .map_err(|_| invalid(format!("negative duration {}", self.duration_secs)))?;
        let project_id =
            ProjectId::new(self.project_id.as_str()).map_err(|e| invalid(e.to_string()))?;
        let subproject_id =
            SubprojectId::new(self.subproject_id.as_str()).map_err(|e| invalid(e.to_string()))?;
        let entry = LoggedTimeEntry::new(
            duration_secs,
            self.description.as_deref(),
            started_at,
            ended_at,
            project_id,
            subproject_id,
        )
        .ok_or_else(|| invalid("zero duration or end before start".to_string()))?;
        Ok(StoredEntry { id: self.id, entry })
    }
}

fn parse_timestamp(timestamp: &str, entry_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            entry_id: entry_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn entry(
        project: &str,
        start_offset: i64,
        duration: u64,
        description: Option<&str>,
    ) -> LoggedTimeEntry {
        let started_at = t0() + Duration::seconds(start_offset);
        LoggedTimeEntry::new(
            duration,
            description,
            started_at,
            started_at + Duration::seconds(i64::try_from(duration).unwrap()),
            ProjectId::new(project).unwrap(),
            SubprojectId::new("dev").unwrap(),
        )
        .unwrap()
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "time_entries"),
            vec![
                "id",
                "project_id",
                "subproject_id",
                "description",
                "started_at",
                "ended_at",
                "duration_secs",
            ]
        );

        let indexes = index_names(&db.conn, "time_entries");
        assert!(indexes.contains("idx_time_entries_started"));
        assert!(indexes.contains("idx_time_entries_project"));
    }

    #[test]
    fn open_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("punch.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_entry(&entry("acme", 0, 60, None)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_entries().unwrap().len(), 1);
    }

    #[test]
    fn insert_and_list_roundtrip() {
        let mut db = Database::open_in_memory().unwrap();
        let logged = entry("acme", 0, 480, Some("api review"));
        let id = db.insert_entry(&logged).unwrap();
        Uuid::parse_str(&id).unwrap();

        let stored = db.list_entries().unwrap();
        assert_eq!(stored, vec![StoredEntry { id, entry: logged }]);
    }

    #[test]
    fn list_entries_returns_ordered_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(&entry("late", 600, 10, None)).unwrap();
        db.insert_entry(&entry("early", 0, 10, None)).unwrap();
        db.insert_entry(&entry("middle", 300, 10, None)).unwrap();

        let projects: Vec<String> = db
            .list_entries()
            .unwrap()
            .into_iter()
            .map(|s| s.entry.project_id().to_string())
            .collect();
        assert_eq!(projects, ["early", "middle", "late"]);
    }

    #[test]
    fn list_entries_in_range_is_half_open() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(&entry("a", 0, 10, None)).unwrap();
        db.insert_entry(&entry("b", 60, 10, None)).unwrap();
        db.insert_entry(&entry("c", 120, 10, None)).unwrap();

        let in_range = db
            .list_entries_in_range(t0(), t0() + Duration::seconds(120))
            .unwrap();
        assert_eq!(in_range.len(), 2);

        let empty = db.list_entries_in_range(t0(), t0()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn totals_group_by_project_and_subproject() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(&entry("acme", 0, 100, None)).unwrap();
        db.insert_entry(&entry("acme", 200, 50, None)).unwrap();
        db.insert_entry(&entry("globex", 400, 300, None)).unwrap();

        let totals = db.total_duration_by_project().unwrap();
        assert_eq!(
            totals,
            vec![
                ProjectTotal {
                    project_id: "globex".into(),
                    subproject_id: "dev".into(),
                    total_secs: 300,
                    entry_count: 1,
                },
                ProjectTotal {
                    project_id: "acme".into(),
                    subproject_id: "dev".into(),
                    total_secs: 150,
                    entry_count: 2,
                },
            ]
        );
    }

    #[test]
    fn database_is_an_entry_sink() {
        let mut db = Database::open_in_memory().unwrap();
        punch_core::emit(&entry("acme", 0, 5, None), &mut db).unwrap();
        assert_eq!(db.list_entries().unwrap().len(), 1);
    }

    #[test]
    fn schema_rejects_zero_duration_rows() {
        let db = Database::open_in_memory().unwrap();
        let result = db.conn.execute(
            "INSERT INTO time_entries VALUES ('x', 'p', 's', NULL, '2025-03-01T09:00:00Z', '2025-03-01T09:00:00Z', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO time_entries VALUES ('bad', 'p', 's', NULL, 'yesterday', '2025-03-01T09:00:00Z', 5)",
                [],
            )
            .unwrap();
        let err = db.list_entries().unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { ref entry_id, .. } if entry_id == "bad"));
    }
}
