//! Entries command for listing logged time.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use punch_core::LoggedTimeEntry;
use punch_core::format::{format_hms, format_hours};
use punch_db::{Database, StoredEntry};
use serde::Serialize;

use super::util::{label, parse_datetime};
use crate::color::paint;

/// Which entries to show and how.
#[derive(Debug, Default)]
pub struct EntriesOptions<'a> {
    pub json: bool,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
    pub by_project: bool,
    pub color: bool,
}

#[derive(Serialize)]
struct EntryJson<'a> {
    id: &'a str,
    #[serde(flatten)]
    entry: &'a LoggedTimeEntry,
}

#[derive(Serialize)]
struct TotalJson<'a> {
    project_id: &'a str,
    subproject_id: &'a str,
    total_secs: u64,
    entry_count: u64,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    options: &EntriesOptions<'_>,
    now: DateTime<Utc>,
) -> Result<()> {
    if options.by_project {
        return write_totals(writer, db, options);
    }

    let entries = if options.start.is_none() && options.end.is_none() {
        db.list_entries().context("failed to list entries")?
    } else {
        let start = options
            .start
            .map(|s| parse_datetime(s, now))
            .transpose()?
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        // Open-ended ranges run to a day past now.
        let end = options
            .end
            .map(|s| parse_datetime(s, now))
            .transpose()?
            .unwrap_or(now + Duration::days(1));
        tracing::debug!(%start, %end, "listing entries in range");
        db.list_entries_in_range(start, end)
            .context("failed to list entries")?
    };

    if options.json {
        let rows: Vec<EntryJson<'_>> = entries
            .iter()
            .map(|stored| EntryJson {
                id: &stored.id,
                entry: &stored.entry,
            })
            .collect();
        let json = serde_json::to_string_pretty(&rows).context("failed to serialize entries")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "No time entries.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<20} {:>8} {:>6}  {:<24} DESCRIPTION",
        "STARTED", "DURATION", "HOURS", "PROJECT"
    )?;
    let mut total_secs = 0u64;
    for StoredEntry { entry, .. } in &entries {
        total_secs += entry.duration_secs();
        let project = format!(
            "{:<24}",
            label(entry.project_id().as_str(), entry.subproject_id().as_str())
        );
        writeln!(
            writer,
            "{:<20} {:>8} {:>6}  {} {}",
            entry.started_at().to_rfc3339_opts(SecondsFormat::Secs, true),
            format_hms(entry.duration_secs()),
            format_hours(entry.duration_secs()),
            paint(&project, entry.project_id().as_str(), options.color),
            entry.description().unwrap_or("-")
        )?;
    }
    writeln!(
        writer,
        "Total: {} ({} h) in {} entries",
        format_hms(total_secs),
        format_hours(total_secs),
        entries.len()
    )?;

    Ok(())
}

fn write_totals<W: Write>(
    writer: &mut W,
    db: &Database,
    options: &EntriesOptions<'_>,
) -> Result<()> {
    let totals = db
        .total_duration_by_project()
        .context("failed to sum entries")?;

    if options.json {
        let rows: Vec<TotalJson<'_>> = totals
            .iter()
            .map(|t| TotalJson {
                project_id: &t.project_id,
                subproject_id: &t.subproject_id,
                total_secs: t.total_secs,
                entry_count: t.entry_count,
            })
            .collect();
        let json = serde_json::to_string_pretty(&rows).context("failed to serialize totals")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }

    if totals.is_empty() {
        writeln!(writer, "No time entries.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<24} {:>8} {:>6} {:>7}",
        "PROJECT", "TIME", "HOURS", "ENTRIES"
    )?;
    for total in &totals {
        let project = format!(
            "{:<24}",
            label(&total.project_id, &total.subproject_id)
        );
        writeln!(
            writer,
            "{} {:>8} {:>6} {:>7}",
            paint(&project, &total.project_id, options.color),
            format_hms(total.total_secs),
            format_hours(total.total_secs),
            total.entry_count
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;
    use punch_core::{ProjectId, SubprojectId};

    use crate::commands::testing::output;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    fn entry(
        project: &str,
        start: DateTime<Utc>,
        secs: u64,
        desc: Option<&str>,
    ) -> LoggedTimeEntry {
        LoggedTimeEntry::new(
            secs,
            desc,
            start,
            start + Duration::seconds(i64::try_from(secs).unwrap()),
            ProjectId::new(project).unwrap(),
            SubprojectId::new("dev").unwrap(),
        )
        .unwrap()
    }

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(&entry("acme", at(9, 0), 1800, Some("standup")))
            .unwrap();
        db.insert_entry(&entry("globex", at(10, 0), 5400, None))
            .unwrap();
        db.insert_entry(&entry("acme", at(13, 0), 900, Some("review")))
            .unwrap();
        db
    }

    #[test]
    fn lists_entries_with_total() {
        let db = seeded();
        let mut out = Vec::new();
        run(&mut out, &db, &EntriesOptions::default(), at(18, 0)).unwrap();

        assert_snapshot!(output(out), @r"
        STARTED              DURATION  HOURS  PROJECT                  DESCRIPTION
        2025-03-01T09:00:00Z 00:30:00   0.50  acme / dev               standup
        2025-03-01T10:00:00Z 01:30:00   1.50  globex / dev             -
        2025-03-01T13:00:00Z 00:15:00   0.25  acme / dev               review
        Total: 02:15:00 (2.25 h) in 3 entries
        ");
    }

    #[test]
    fn range_filters_by_start_time() {
        let db = seeded();
        let options = EntriesOptions {
            json: true,
            start: Some("2025-03-01T10:00:00Z"),
            end: Some("2025-03-01T13:00:00Z"),
            ..EntriesOptions::default()
        };
        let mut out = Vec::new();
        run(&mut out, &db, &options, at(18, 0)).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output(out)).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["project_id"], "globex");
        assert_eq!(rows[0]["duration_secs"], 5400);
        assert!(rows[0]["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[test]
    fn relative_start_is_resolved_against_now() {
        let db = seeded();
        let options = EntriesOptions {
            start: Some("6 hours ago"),
            ..EntriesOptions::default()
        };
        let mut out = Vec::new();
        run(&mut out, &db, &options, at(18, 0)).unwrap();

        let text = output(out);
        assert!(text.contains("review"));
        assert!(!text.contains("standup"));
    }

    #[test]
    fn invalid_bound_is_an_error() {
        let db = seeded();
        let options = EntriesOptions {
            end: Some("yesterday-ish"),
            ..EntriesOptions::default()
        };
        let mut out = Vec::new();
        assert!(run(&mut out, &db, &options, at(18, 0)).is_err());
    }

    #[test]
    fn empty_database() {
        let db = Database::open_in_memory().unwrap();
        let mut out = Vec::new();
        run(&mut out, &db, &EntriesOptions::default(), at(18, 0)).unwrap();
        assert_snapshot!(output(out), @"No time entries.");
    }

    #[test]
    fn totals_by_project() {
        let db = seeded();
        let options = EntriesOptions {
            by_project: true,
            ..EntriesOptions::default()
        };
        let mut out = Vec::new();
        run(&mut out, &db, &options, at(18, 0)).unwrap();

        assert_snapshot!(output(out), @r"
        PROJECT                      TIME  HOURS ENTRIES
        globex / dev             01:30:00   1.50       1
        acme / dev               00:45:00   0.75       2
        ");
    }
}
