use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use punch_core::{Clock, SystemClock};
use punch_db::Database;
use tracing_subscriber::EnvFilter;

use punch_cli::commands::entries::{self, EntriesOptions};
use punch_cli::commands::{Outcome, queue, status, timer};
use punch_cli::state::{StateFile, Tracker};
use punch_cli::{Cli, Commands, Config};

/// Open the log store, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

fn dispatch<W: Write>(
    writer: &mut W,
    command: &Commands,
    tracker: &mut Tracker<SystemClock>,
    config: &Config,
) -> Result<Outcome> {
    let color = config.color_coded_projects;
    match command {
        Commands::Select {
            project,
            subproject,
            project_name,
            subproject_name,
        } => timer::select(
            writer,
            tracker,
            project,
            subproject,
            project_name.clone(),
            subproject_name.clone(),
        ),
        Commands::Start => timer::start(writer, tracker, color),
        Commands::Pause => timer::pause(writer, tracker, color),
        Commands::Resume { id } => timer::resume(writer, tracker, id, color),
        Commands::Stop { hold: true, .. } => timer::stop_and_hold(writer, tracker, color),
        Commands::Stop { description, .. } => {
            let mut db = open_database(config)?;
            timer::stop_and_log(writer, tracker, &mut db, description.as_deref(), color)
        }
        Commands::Toggle => {
            let mut db = open_database(config)?;
            timer::toggle(writer, tracker, &mut db, color)
        }
        Commands::Log { description } => {
            let mut db = open_database(config)?;
            timer::log(writer, tracker, &mut db, description.as_deref(), color)
        }
        Commands::Cancel => timer::cancel(writer, tracker, color),
        Commands::Reset => timer::reset(writer, tracker),
        Commands::Queue { json } => queue::list(writer, tracker, *json, color).map(Ok),
        Commands::Finish { id, description } => {
            let mut db = open_database(config)?;
            queue::finish(writer, tracker, &mut db, id, description.as_deref())
        }
        Commands::Discard { id } => queue::discard(writer, tracker, id),
        Commands::Status { json } => status::run(writer, tracker, *json, color).map(Ok),
        Commands::Entries {
            json,
            start,
            end,
            by_project,
        } => {
            let db = open_database(config)?;
            let options = EntriesOptions {
                json: *json,
                start: start.as_deref(),
                end: end.as_deref(),
                by_project: *by_project,
                color,
            };
            entries::run(writer, &db, &options, SystemClock.now()).map(Ok)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let state_file = StateFile::lock(&config.state_path)?;
    let mut tracker = Tracker::new(state_file.load()?, SystemClock);

    let mut stdout = std::io::stdout().lock();
    let result = dispatch(&mut stdout, command, &mut tracker, &config);
    // Saved even when the command failed: a failed log keeps its time pending.
    state_file.save(&tracker.into_saved())?;

    if let Err(refusal) = result? {
        eprintln!("punch: {refusal}");
    }
    Ok(())
}
