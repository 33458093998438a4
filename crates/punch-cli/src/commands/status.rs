//! Status command for showing the active timer.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use punch_core::format::{format_hms, format_hours};
use punch_core::{Clock, PendingEntry, Selection, TimerSnapshot};
use serde::Serialize;

use super::util::label;
use crate::color::paint;
use crate::state::Tracker;

#[derive(Serialize)]
struct StatusJson<'a> {
    #[serde(flatten)]
    timer: TimerSnapshot,
    selection: Option<&'a Selection>,
    paused_sessions: usize,
    pending: Option<&'a PendingEntry>,
}

pub fn run<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C>,
    json: bool,
    color: bool,
) -> Result<()> {
    let snapshot = tracker.coordinator.observe();
    let paused_sessions = tracker.coordinator.queue().len();
    let pending = tracker.coordinator.pending();

    if json {
        let status = StatusJson {
            timer: snapshot,
            selection: tracker.selection.as_ref(),
            paused_sessions,
            pending,
        };
        let json = serde_json::to_string_pretty(&status).context("failed to serialize status")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }

    let state = if snapshot.is_running { "running" } else { "idle" };
    writeln!(writer, "Timer: {state}")?;
    match &tracker.selection {
        Some(s) => writeln!(
            writer,
            "Selected: {}",
            paint(
                &label(&s.project_name, &s.subproject_name),
                s.project_id.as_str(),
                color
            )
        )?,
        None => writeln!(writer, "Selected: (none)")?,
    }
    let selected = tracker.selection.as_ref().map(Selection::identity);
    if let Some(session) = snapshot.session.as_ref().filter(|s| selected.as_ref() != Some(*s)) {
        writeln!(
            writer,
            "Tracking: {}",
            paint(
                &label(session.project_id.as_str(), session.subproject_id.as_str()),
                session.project_id.as_str(),
                color
            )
        )?;
    }
    writeln!(
        writer,
        "Elapsed: {} ({} h)",
        format_hms(snapshot.display_secs),
        format_hours(snapshot.display_secs)
    )?;
    if let Some(started) = snapshot.session_started_at {
        writeln!(
            writer,
            "Session started: {}",
            started.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
    }
    writeln!(writer, "Paused sessions: {paused_sessions}")?;
    if let Some(pending) = pending {
        writeln!(
            writer,
            "Pending: {} for {} (run `punch log` or `punch cancel`)",
            format_hms(pending.duration_secs),
            label(
                &pending.selection.project_name,
                &pending.selection.subproject_name
            )
        )?;
    }

    Ok(())
}
