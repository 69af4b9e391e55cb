#[macro_use] extern crate prettytable;

use structopt::StructOpt;
use anyhow::anyhow;
use std::path::PathBuf;
use directories::ProjectDirs;
use chrono::Local;
use tracing_subscriber::EnvFilter;

mod cli;
mod interface;
use rusqlite::{Connection};
use sedeplan::store::{init_journal};
use sedeplan::{model, time};

use cli::{Command::*, CommandLineArgs};

fn find_default_journal_file() -> Option<PathBuf> {
    let base_dirs = ProjectDirs::from("com", "sedeplan", "sedeplan")?;
    let root_dir = base_dirs.data_dir();
    if !root_dir.exists() {
        if let Err(err) = std::fs::create_dir_all(root_dir) {
            tracing::error!(dir = %root_dir.display(), %err, "failed to create data directory");
            return None;
        }
    }
    let mut path = PathBuf::from(root_dir);
    path.push("journal.sqlite");
    Some(path)
}

/// Get a connection to the journal database, creating its tables if they
/// do not exist.
pub fn get_journal_db(journal_path: PathBuf) -> anyhow::Result<Connection> {
    let db = Connection::open(&journal_path)?;
    init_journal(&db)?;
    Ok(db)
}


fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Get the command-line arguments.
    let CommandLineArgs {
        action,
        journal_file,
        sede,
    } = CommandLineArgs::from_args();

    // Unpack the journal file.
    let journal_file = journal_file
        .or_else(find_default_journal_file)
        .ok_or(anyhow!("Failed to find journal file."))?;
    tracing::debug!(journal = %journal_file.display(), %sede, "opening journal");

    let mut database = get_journal_db(journal_file)?;
    let db = &mut database;

    // Perform the action.
    match action {
        Add {
            property,
            address,
            date,
            start,
            duration,
            end,
            kind,
            cleaner,
            cost_cents,
            payment,
            supervisor,
            notes,
        } => {
            let interval = match (duration, end) {
                (_, Some(end)) => time::Interval::new(start, end)?,
                (Some(duration), None) => time::Interval::starting_at(start, duration)?,
                (None, None) => return Err(anyhow!("Either --duration or --end is required.")),
            };
            if cost_cents < 0 {
                return Err(anyhow!("The cost cannot be negative."));
            }
            let mut task = model::NewTask::new(property, address, date, interval, kind);
            task.cleaner_id = cleaner;
            task.cost_cents = cost_cents;
            task.payment = payment;
            task.supervisor = supervisor;
            task.notes = notes;
            interface::add_task(db, &sede, task)
        },
        Import { file } => interface::import(db, &sede, &file),
        Board { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            interface::board(db, &sede, date)
        },
        Assign { task, cleaner, slot } => interface::assign(db, &sede, task, cleaner, slot),
        Unassign { task } => interface::unassign(db, &sede, task),
        Status { task, status } => interface::set_status(db, &sede, task, status),
        Rm { tasks } => interface::remove_tasks(db, &sede, &tasks),
        CleanerAdd { name, rate_cents } => interface::add_cleaner(db, &sede, &name, rate_cents),
        Cleaners => interface::list_cleaners(db, &sede),
        CleanerOff { cleaner } => interface::deactivate_cleaner(db, &sede, cleaner),
        Availability { cleaner, weekday, start, end, off } => {
            let hours = match (off, start, end) {
                (true, _, _) => None,
                (false, Some(start), Some(end)) => Some((start, end)),
                _ => return Err(anyhow!("Give both start and end, or --off.")),
            };
            interface::set_availability(db, &sede, cleaner, weekday, hours)
        },
        Check { cleaner, date, start, end } => {
            interface::check(db, &sede, cleaner, date, start, end)
        }
        Workload { from, to } => interface::workload(db, &sede, from, to),
    }?;
    Ok(())
}
