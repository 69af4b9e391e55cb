use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use humantime::format_duration;
use prettytable::Table;
use rusqlite::Connection;
use tracing::debug;

use sedeplan::assign::{DragPayload, DragSession, DropOutcome, Position};
use sedeplan::availability::{self, Availability};
use sedeplan::collision;
use sedeplan::import;
use sedeplan::model::{
    window_for, AvailabilityWindow, DayAvailability, NewTask, Task, TaskStatus,
};
use sedeplan::store::{self, JournalSink};
use sedeplan::time::{Interval, TimeOfDay};
use sedeplan::workload;

/// Check a cleaner's stored week against a proposed interval.
fn availability_of(
    db: &Connection,
    cleaner_id: u32,
    date: NaiveDate,
    interval: &Interval,
) -> Result<Availability> {
    let week = store::availability(db, cleaner_id)?;
    Ok(availability::check(date.weekday(), window_for(&week, date), interval))
}

/// The warnings a freshly placed task raises. They never undo the change.
fn flags(db: &Connection, sede: &str, task: &Task) -> Result<Vec<String>> {
    let cleaner_id = match task.cleaner_id {
        Some(cleaner_id) => cleaner_id,
        None => return Ok(Vec::new()),
    };

    let mut warnings = Vec::new();
    let day = store::tasks_on(db, sede, task.date)?;
    if let Some(collision) = collision::involving(&day, task.id) {
        warnings.push(format!(
            "Warning: task {} overlaps {} other task(s) of cleaner {}.",
            task.id,
            collision.count - 1,
            cleaner_id
        ));
    }
    let availability = availability_of(db, cleaner_id, task.date, &task.interval)?;
    if let Availability::Unavailable { reason } = availability {
        warnings.push(format!(
            "Warning: cleaner {} is not available: {}",
            cleaner_id, reason
        ));
    }
    Ok(warnings)
}

fn report_flags(db: &Connection, sede: &str, task: &Task) -> Result<()> {
    for warning in flags(db, sede, task)? {
        println!("{}", warning);
    }
    Ok(())
}

fn fmt_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, cents.abs() / 100, cents.abs() % 100)
}

fn fmt_minutes(minutes: u32) -> String {
    if minutes == 0 {
        return "0m".to_string();
    }
    format_duration(std::time::Duration::from_secs(u64::from(minutes) * 60)).to_string()
}

pub fn add_task(db: &Connection, sede: &str, task: NewTask) -> Result<()> {
    let id = store::add_task(db, sede, &task)?;
    let stored = store::existing_task(db, sede, id)?;
    println!(
        "{}. {} {} {} ({})",
        id,
        stored.date,
        stored.interval,
        stored.property,
        format_duration(stored.interval.duration())
    );
    report_flags(db, sede, &stored)
}

/// Store a whole batch, then collect the warnings of every imported task.
fn import_tasks(db: &mut Connection, sede: &str, json: &str) -> Result<(usize, Vec<String>)> {
    let tasks = import::parse(json)?;
    let ids = store::add_tasks(db, sede, &tasks)?;
    let mut warnings = Vec::new();
    for id in &ids {
        let stored = store::existing_task(db, sede, *id)?;
        warnings.extend(flags(db, sede, &stored)?);
    }
    Ok((ids.len(), warnings))
}

pub fn import(db: &mut Connection, sede: &str, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file {}.", file.display()))?;
    let (imported, warnings) = import_tasks(db, sede, &json)?;
    println!("Imported {} task(s).", imported);
    for warning in warnings {
        println!("{}", warning);
    }
    Ok(())
}

pub fn board(db: &Connection, sede: &str, date: NaiveDate) -> Result<()> {
    let tasks = store::tasks_on(db, sede, date)?;
    if tasks.is_empty() {
        println!("No tasks on {}.", date);
        return Ok(());
    }

    let names: HashMap<u32, String> = store::cleaners(db, sede)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let collisions = collision::board(&tasks);

    let mut table = Table::new();
    table.add_row(row![
        "id", "time", "duration", "cleaner", "property", "type", "status", "overlap", "notes"
    ]);
    for task in &tasks {
        let cleaner = task
            .cleaner_id
            .map(|id| names.get(&id).cloned().unwrap_or_else(|| format!("#{}", id)))
            .unwrap_or_else(|| "-".to_string());
        let badge = collisions
            .get(&task.id)
            .map(|c| c.badge())
            .unwrap_or_default();
        let notes = task
            .notes
            .as_deref()
            .map(|n| textwrap::fill(n, 30))
            .unwrap_or_default();
        table.add_row(row![
            task.id,
            task.interval,
            format_duration(task.interval.duration()),
            cleaner,
            task.property,
            task.kind,
            task.status,
            badge,
            notes
        ]);
    }
    table.printstd();

    let flagged = collisions.values().filter(|c| c.is_colliding).count();
    if flagged > 0 {
        println!("{} task(s) overlap another task of the same cleaner.", flagged);
    }
    Ok(())
}

/// Move a task the way a drop on the board does: same cell is a no-op,
/// anything else goes through the journal.
pub fn assign(
    db: &Connection,
    sede: &str,
    task_id: u32,
    cleaner_id: u32,
    slot: TimeOfDay,
) -> Result<()> {
    let task = store::existing_task(db, sede, task_id)?;

    let mut session = DragSession::new();
    session.drag_start(DragPayload {
        task_id: task_id.to_string(),
        origin: task.position(),
    });
    let target = Position { cleaner_id, slot };
    debug!(task_id, cell = %target, "dropping task");

    match session.drop(target, &mut JournalSink::new(db, sede))? {
        DropOutcome::Unchanged => println!("Task {} is already at {}.", task_id, target),
        DropOutcome::Ignored => println!("Nothing to assign."),
        DropOutcome::Assigned(_) => {
            let moved = store::existing_task(db, sede, task_id)?;
            println!("Task {} assigned to {}, {}.", task_id, target, moved.interval);
            report_flags(db, sede, &moved)?;
        }
    }
    Ok(())
}

pub fn unassign(db: &Connection, sede: &str, task_id: u32) -> Result<()> {
    store::unassign_task(db, sede, task_id)?;
    println!("Task {} is unassigned.", task_id);
    Ok(())
}

pub fn set_status(db: &Connection, sede: &str, task_id: u32, status: TaskStatus) -> Result<()> {
    store::set_status(db, sede, task_id, status)?;
    println!("Task {} is {}.", task_id, status);
    Ok(())
}

/// Remove each distinct id once. Returns how many were removed and how
/// many were not there.
fn removal(db: &mut Connection, sede: &str, ids: &[u32]) -> Result<(usize, usize)> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    let removed = store::remove_tasks(db, sede, &unique)?;
    Ok((removed, unique.len() - removed))
}

pub fn remove_tasks(db: &mut Connection, sede: &str, ids: &[u32]) -> Result<()> {
    match removal(db, sede, ids)? {
        (removed, 0) => println!("Removed {} task(s).", removed),
        (removed, missing) => {
            println!("Removed {} task(s), {} did not exist.", removed, missing)
        }
    }
    Ok(())
}

pub fn add_cleaner(db: &Connection, sede: &str, name: &str, rate_cents: i64) -> Result<()> {
    if rate_cents < 0 {
        return Err(anyhow!("The hourly rate cannot be negative."));
    }
    let id = store::add_cleaner(db, sede, name, rate_cents)?;
    println!("{}. {} ({}/h)", id, name, fmt_cents(rate_cents));
    Ok(())
}

fn fmt_week(week: &[AvailabilityWindow]) -> String {
    week.iter()
        .map(|w| match w.day {
            DayAvailability::Off => format!("{} off", w.weekday),
            DayAvailability::Hours(hours) => format!("{} {}", w.weekday, hours),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn list_cleaners(db: &Connection, sede: &str) -> Result<()> {
    let cleaners = store::cleaners(db, sede)?;
    if cleaners.is_empty() {
        println!("No cleaners in sede '{}'. Use 'sedeplan cleaner-add' to add one.", sede);
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["id", "name", "active", "rate/h", "availability"]);
    for cleaner in cleaners {
        let week = store::availability(db, cleaner.id)?;
        table.add_row(row![
            cleaner.id,
            cleaner.name,
            if cleaner.active { "yes" } else { "no" },
            fmt_cents(cleaner.hourly_rate_cents),
            fmt_week(&week)
        ]);
    }
    table.printstd();
    Ok(())
}

pub fn deactivate_cleaner(db: &Connection, sede: &str, cleaner_id: u32) -> Result<()> {
    store::deactivate_cleaner(db, sede, cleaner_id)?;
    println!("Cleaner {} is inactive.", cleaner_id);
    Ok(())
}

pub fn set_availability(
    db: &Connection,
    sede: &str,
    cleaner_id: u32,
    weekday: Weekday,
    hours: Option<(TimeOfDay, TimeOfDay)>,
) -> Result<()> {
    store::existing_cleaner(db, sede, cleaner_id)?;
    let day = match hours {
        Some((start, end)) => DayAvailability::Hours(Interval::new(start, end)?),
        None => DayAvailability::Off,
    };
    let window = AvailabilityWindow {
        cleaner_id,
        weekday,
        day,
    };
    store::set_availability(db, &window)?;
    println!("Cleaner {}: {}", cleaner_id, fmt_week(&[window]));
    Ok(())
}

pub fn check(
    db: &Connection,
    sede: &str,
    cleaner_id: u32,
    date: NaiveDate,
    start: TimeOfDay,
    end: TimeOfDay,
) -> Result<()> {
    store::existing_cleaner(db, sede, cleaner_id)?;
    let interval = Interval::new(start, end)?;
    match availability_of(db, cleaner_id, date, &interval)? {
        Availability::Available => {
            println!("Cleaner {} is available on {} {}.", cleaner_id, date, interval)
        }
        Availability::Unavailable { reason } => {
            println!("Cleaner {} is not available: {}", cleaner_id, reason)
        }
    }
    Ok(())
}

pub fn workload(db: &Connection, sede: &str, from: NaiveDate, to: NaiveDate) -> Result<()> {
    if to < from {
        return Err(anyhow!("The period ends ({}) before it starts ({}).", to, from));
    }
    let cleaners = store::cleaners(db, sede)?;
    let tasks = store::tasks_between(db, sede, from, to)?;
    let report = workload::report(&cleaners, &tasks);

    let mut table = Table::new();
    table.add_row(row!["id", "name", "tasks", "scheduled", "completed", "estimated pay"]);
    for row in &report.cleaners {
        let name = if row.active {
            row.name.clone()
        } else {
            format!("{} (inactive)", row.name)
        };
        table.add_row(row![
            row.cleaner_id,
            name,
            row.tasks,
            fmt_minutes(row.scheduled_minutes),
            fmt_minutes(row.completed_minutes),
            fmt_cents(row.estimated_pay_cents)
        ]);
    }
    table.printstd();

    println!("Total estimated pay: {}", fmt_cents(report.total_pay_cents()));
    if report.unassigned.tasks > 0 {
        println!(
            "Unassigned: {} task(s), {}.",
            report.unassigned.tasks,
            fmt_minutes(report.unassigned.minutes)
        );
    }
    Ok(())
}
