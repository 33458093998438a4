//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stopwatch time tracker.
///
/// Select a project, start the timer, pause sessions into a queue, resume
/// them later, and log the time when you stop.
#[derive(Debug, Parser)]
#[command(name = "punch", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Choose the project and subproject to track.
    Select {
        /// Project ID.
        #[arg(long)]
        project: String,

        /// Subproject ID.
        #[arg(long)]
        subproject: String,

        /// Project display name (defaults to the ID).
        #[arg(long)]
        project_name: Option<String>,

        /// Subproject display name (defaults to the ID).
        #[arg(long)]
        subproject_name: Option<String>,
    },

    /// Start the timer for the selected project.
    Start,

    /// Pause the running timer into the queue.
    Pause,

    /// Resume a paused session by its queue ID.
    Resume {
        /// Queue ID, as shown by `punch queue`.
        id: String,
    },

    /// Stop the timer and log the time.
    Stop {
        /// What you worked on. Held time takes its description from `punch log`.
        #[arg(short, long, conflicts_with = "hold")]
        description: Option<String>,

        /// Keep the stopped time pending instead of logging it now.
        #[arg(long)]
        hold: bool,
    },

    /// Start the timer if idle, stop and log it if running.
    Toggle,

    /// Log the pending stopped time.
    Log {
        /// What you worked on.
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Discard the pending stopped time.
    Cancel,

    /// List paused sessions.
    Queue {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Stop a paused session and log its time.
    Finish {
        /// Queue ID, as shown by `punch queue`.
        id: String,

        /// What you worked on.
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a paused session without logging it.
    Discard {
        /// Queue ID, as shown by `punch queue`.
        id: String,
    },

    /// Reset the active timer to zero.
    Reset,

    /// Show the active timer.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List logged time entries.
    Entries {
        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Only entries starting at or after this time (ISO 8601 or "2 days ago").
        #[arg(long)]
        start: Option<String>,

        /// Only entries starting before this time (ISO 8601 or "1 hour ago").
        #[arg(long)]
        end: Option<String>,

        /// Show tracked time summed per project instead of single entries.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        by_project: bool,
    },
}
