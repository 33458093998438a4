//! Commands that drive the active timer.

use std::io::Write;

use anyhow::{Context, Result};
use punch_core::format::{format_hms, format_hours};
use punch_core::{Clock, EntrySink, PendingEntry, QueueId, Selection, Toggled};

use super::Outcome;
use super::util::label;
use crate::color::paint;
use crate::state::Tracker;

/// Label for the current selection, colored when enabled.
fn selected_label<C>(tracker: &Tracker<C>, color: bool) -> String {
    tracker.selection.as_ref().map_or_else(
        || "(no selection)".to_string(),
        |s| selection_label(s, color),
    )
}

fn selection_label(selection: &Selection, color: bool) -> String {
    paint(
        &label(&selection.project_name, &selection.subproject_name),
        selection.project_id.as_str(),
        color,
    )
}

pub fn select<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    project: &str,
    subproject: &str,
    project_name: Option<String>,
    subproject_name: Option<String>,
) -> Result<Outcome> {
    let selection = Selection::new(project, subproject, project_name, subproject_name)
        .context("invalid selection")?;
    writeln!(writer, "Selected {}", label(&selection.project_name, &selection.subproject_name))?;
    tracker.selection = Some(selection);
    Ok(Ok(()))
}

pub fn start<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    color: bool,
) -> Result<Outcome> {
    let snapshot = applied!(tracker.coordinator.start(tracker.selection.as_ref()));
    writeln!(
        writer,
        "Started {} at {}",
        selected_label(tracker, color),
        format_hms(snapshot.display_secs)
    )?;
    Ok(Ok(()))
}

pub fn pause<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    color: bool,
) -> Result<Outcome> {
    let queued = applied!(tracker.coordinator.pause(tracker.selection.as_ref()));
    writeln!(
        writer,
        "Paused {} at {} (queue id {})",
        selection_label(&queued.selection(), color),
        format_hms(queued.elapsed_secs()),
        queued.id
    )?;
    Ok(Ok(()))
}

/// Resumes a paused session and switches the selection to it.
pub fn resume<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    id: &str,
    color: bool,
) -> Result<Outcome> {
    let id = QueueId::new(id).context("invalid queue id")?;
    let resumed = applied!(tracker.coordinator.resume(&id));
    tracker.selection = Some(resumed.selection());
    writeln!(
        writer,
        "Resumed {} from {}",
        selected_label(tracker, color),
        format_hms(resumed.elapsed_secs())
    )?;
    Ok(Ok(()))
}

/// Stops the timer and leaves the time pending for `punch log`.
pub fn stop_and_hold<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    color: bool,
) -> Result<Outcome> {
    match applied!(tracker.coordinator.stop(tracker.selection.as_ref())) {
        Some(pending) => writeln!(
            writer,
            "Stopped {} at {}. Run `punch log` to record it or `punch cancel` to discard it.",
            selection_label(&pending.selection, color),
            format_hms(pending.duration_secs)
        )?,
        None => write_nothing_to_log(writer)?,
    }
    Ok(Ok(()))
}

/// Stops the timer and logs the time right away.
pub fn stop_and_log<C: Clock, W: Write, S: EntrySink>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    sink: &mut S,
    description: Option<&str>,
    color: bool,
) -> Result<Outcome> {
    match applied!(tracker.coordinator.stop(tracker.selection.as_ref())) {
        Some(pending) => log_staged(writer, tracker, sink, &pending, description, color)?,
        None => write_nothing_to_log(writer)?,
    }
    Ok(Ok(()))
}

/// Starts the timer when idle; stops and logs it when running.
pub fn toggle<C: Clock, W: Write, S: EntrySink>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    sink: &mut S,
    color: bool,
) -> Result<Outcome> {
    match applied!(tracker.coordinator.toggle(tracker.selection.as_ref())) {
        Toggled::Started(snapshot) => writeln!(
            writer,
            "Started {} at {}",
            selected_label(tracker, color),
            format_hms(snapshot.display_secs)
        )?,
        Toggled::Stopped(Some(pending)) => {
            log_staged(writer, tracker, sink, &pending, None, color)?;
        }
        Toggled::Stopped(None) => write_nothing_to_log(writer)?,
    }
    Ok(Ok(()))
}

/// Logs the pending stopped time.
pub fn log<C: Clock, W: Write, S: EntrySink>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    sink: &mut S,
    description: Option<&str>,
    color: bool,
) -> Result<Outcome> {
    let Some(pending) = tracker.coordinator.pending().cloned() else {
        writeln!(writer, "Nothing pending to log.")?;
        return Ok(Ok(()));
    };
    log_staged(writer, tracker, sink, &pending, description, color)?;
    Ok(Ok(()))
}

/// Drops the pending stopped time.
pub fn cancel<C: Clock, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    color: bool,
) -> Result<Outcome> {
    match tracker.coordinator.cancel_pending() {
        Some(pending) => writeln!(
            writer,
            "Discarded {} for {}.",
            format_hms(pending.duration_secs),
            selection_label(&pending.selection, color)
        )?,
        None => writeln!(writer, "Nothing pending to discard.")?,
    }
    Ok(Ok(()))
}

/// Zeroes the active timer. Paused sessions and pending time are kept.
pub fn reset<C: Clock, W: Write>(writer: &mut W, tracker: &mut Tracker<C>) -> Result<Outcome> {
    tracker.coordinator.reset_timer();
    writeln!(writer, "Timer reset.")?;
    Ok(Ok(()))
}

fn log_staged<C: Clock, W: Write, S: EntrySink>(
    writer: &mut W,
    tracker: &mut Tracker<C>,
    sink: &mut S,
    pending: &PendingEntry,
    description: Option<&str>,
    color: bool,
) -> Result<()> {
    let logged = tracker
        .coordinator
        .log_pending(description, sink)
        .context("failed to record time entry")?;
    if let Some(entry) = logged {
        writeln!(
            writer,
            "Logged {} ({} h) to {}",
            format_hms(entry.duration_secs()),
            format_hours(entry.duration_secs()),
            selection_label(&pending.selection, color)
        )?;
    }
    Ok(())
}

fn write_nothing_to_log<W: Write>(writer: &mut W) -> Result<()> {
    writeln!(writer, "Stopped at 00:00:00, nothing to log.")?;
    Ok(())
}
