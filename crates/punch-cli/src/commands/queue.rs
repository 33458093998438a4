//! Commands over the paused-session queue.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use punch_core::format::{format_hms, format_hours};
use punch_core::{Clock, EntrySink, LogError, QueueId};

use super::Outcome;
use super::util::label;
use crate::color::paint;
use crate::state::Tracker;

const LABEL_WIDTH: usize = 28;

/// Lists paused sessions, oldest first.
pub fn list<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C>,
    json: bool,
    color: bool,
) -> Result<()> {
    let queue = tracker.coordinator.queue();

    if json {
        let json =
            serde_json::to_string_pretty(queue.as_slice()).context("failed to serialize queue")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }

    if queue.is_empty() {
        writeln!(writer, "No paused sessions.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<20} {:<LABEL_WIDTH$} {:>8} {:>6}  STARTED",
        "ID", "PROJECT", "ELAPSED", "HOURS"
    )?;
    for entry in queue {
        let project = format!(
            "{:<LABEL_WIDTH$}",
            label(&entry.project_name, &entry.subproject_name)
        );
        writeln!(
            writer,
            "{:<20} {} {:>8} {:>6}  {}",
            entry.id,
            paint(&project, entry.project_id.as_str(), color),
            format_hms(entry.elapsed_secs()),
            format_hours(entry.elapsed_secs()),
            entry.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
    }

    Ok(())
}

/// Stops a paused session and logs its frozen time.
pub fn finish<C: Clock, W: Write, S: EntrySink>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    sink: &mut S,
    id: &str,
    description: Option<&str>,
) -> Result<Outcome> {
    let id = QueueId::new(id).context("invalid queue id")?;
    let name = tracker
        .coordinator
        .queue()
        .get(&id)
        .map(|entry| label(&entry.project_name, &entry.subproject_name));

    let logged = match tracker.coordinator.stop_queued(&id, description, sink) {
        Ok(logged) => logged,
        Err(LogError::Refused(refusal)) => return Ok(Err(refusal)),
        Err(LogError::Sink(e)) => return Err(e).context("failed to record time entry"),
    };

    let name = name.unwrap_or_else(|| id.to_string());
    match logged {
        Some(entry) => writeln!(
            writer,
            "Logged {} ({} h) to {name}",
            format_hms(entry.duration_secs()),
            format_hours(entry.duration_secs())
        )?,
        None => writeln!(writer, "Finished {name} with no time to log.")?,
    }
    Ok(Ok(()))
}

/// Removes a paused session without logging it.
pub fn discard<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    id: &str,
) -> Result<Outcome> {
    let id = QueueId::new(id).context("invalid queue id")?;
    let removed = applied!(tracker.coordinator.discard_queued(&id));
    writeln!(
        writer,
        "Discarded {} ({} not logged).",
        label(&removed.project_name, &removed.subproject_name),
        format_hms(removed.elapsed_secs())
    )?;
    Ok(Ok(()))
}
