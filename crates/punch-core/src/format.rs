//! Display formatting for second counts.

/// Formats seconds as `HH:MM:SS`. Hours grow past two digits if needed.
pub fn format_hms(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Formats seconds as decimal hours rounded to two places (e.g. `1.25`).
#[expect(
    clippy::cast_precision_loss,
    reason = "second counts stay far below 2^52"
)]
pub fn format_hours(secs: u64) -> String {
    format!("{:.2}", secs as f64 / 3600.0)
}
