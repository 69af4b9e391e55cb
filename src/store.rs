use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Weekday};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use crate::assign::AssignmentSink;
use crate::model::{
    AvailabilityWindow, Cleaner, DayAvailability, NewTask, Task, TaskStatus,
};
use crate::time::{Interval, TimeOfDay};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const TASK_COLUMNS: &str = "id, sede, property, address, day, start_time, end_time, kind, status,
                            cleaner_id, cost_cents, payment, supervisor, notes";

const CLEANER_COLUMNS: &str = "id, sede, name, active, hourly_rate_cents";

/// Initialize the journal database.
pub fn init_journal(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE if not exists cleaner (
                  id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                  sede               TEXT NOT NULL,
                  name               TEXT NOT NULL,
                  active             INTEGER NOT NULL DEFAULT 1,
                  hourly_rate_cents  INTEGER NOT NULL DEFAULT 0
                  )",
        [],
    )
    .context("Failed to create cleaner table.")?;

    db.execute(
        "CREATE TABLE if not exists availability (
                  cleaner_id  INTEGER NOT NULL REFERENCES cleaner(id),
                  weekday     INTEGER NOT NULL,
                  available   INTEGER NOT NULL,
                  start_time  TEXT,
                  end_time    TEXT,
                  PRIMARY KEY (cleaner_id, weekday)
                  )",
        [],
    )
    .context("Failed to create availability table.")?;

    db.execute(
        "CREATE TABLE if not exists task (
                  id          INTEGER PRIMARY KEY AUTOINCREMENT,
                  sede        TEXT NOT NULL,
                  property    TEXT NOT NULL,
                  address     TEXT NOT NULL,
                  day         TEXT NOT NULL,
                  start_time  TEXT NOT NULL,
                  end_time    TEXT NOT NULL,
                  kind        TEXT NOT NULL,
                  status      TEXT NOT NULL,
                  cleaner_id  INTEGER REFERENCES cleaner(id),
                  cost_cents  INTEGER NOT NULL,
                  payment     TEXT NOT NULL,
                  supervisor  TEXT,
                  notes       TEXT
                  )",
        [],
    )
    .context("Failed to create task table.")?;

    db.execute(
        "CREATE INDEX if not exists sede_day ON task (sede, day)",
        [],
    )
    .context("Failed to create index on task table.")?;

    Ok(())
}

/// Add a cleaner to the sede and return its id.
pub fn add_cleaner(
    db: &Connection,
    sede: &str,
    name: &str,
    hourly_rate_cents: i64,
) -> Result<u32> {
    db.execute(
        "INSERT INTO cleaner (sede, name, active, hourly_rate_cents) VALUES (?1, ?2, 1, ?3)",
        params![sede, name, hourly_rate_cents],
    )
    .context("Failed to insert cleaner to database.")?;
    Ok(db.last_insert_rowid() as u32)
}

/// All the cleaners of the sede, active or not, by id.
pub fn cleaners(db: &Connection, sede: &str) -> Result<Vec<Cleaner>> {
    let sql = format!(
        "SELECT {} FROM cleaner WHERE sede = ?1 ORDER BY id",
        CLEANER_COLUMNS
    );
    let mut stmt = db
        .prepare(&sql)
        .context("Failed to fetch cleaners from database.")?;
    let rows = stmt.query_map(params![sede], cleaner_from_row)?;

    let mut cleaners = Vec::new();
    for cleaner in rows {
        cleaners.push(cleaner?);
    }
    Ok(cleaners)
}

pub fn cleaner(db: &Connection, sede: &str, id: u32) -> Result<Option<Cleaner>> {
    let sql = format!(
        "SELECT {} FROM cleaner WHERE sede = ?1 AND id = ?2",
        CLEANER_COLUMNS
    );
    let cleaner = db
        .query_row(
            &sql,
            params![sede, id],
            cleaner_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to get cleaner {} from database.", id))?;
    Ok(cleaner)
}

/// Like `cleaner`, but a missing cleaner is an error.
pub fn existing_cleaner(db: &Connection, sede: &str, id: u32) -> Result<Cleaner> {
    cleaner(db, sede, id)?.ok_or_else(|| anyhow!("No cleaner {} in sede '{}'.", id, sede))
}

/// Mark a cleaner as inactive. Their tasks are kept.
pub fn deactivate_cleaner(db: &Connection, sede: &str, id: u32) -> Result<()> {
    let changed = db
        .execute(
            "UPDATE cleaner SET active = 0 WHERE sede = ?1 AND id = ?2",
            params![sede, id],
        )
        .context("Failed to deactivate cleaner in database.")?;
    if changed == 0 {
        return Err(anyhow!("No cleaner {} in sede '{}'.", id, sede));
    }
    Ok(())
}

/// Store the window of one weekday, replacing any previous one.
pub fn set_availability(db: &Connection, window: &AvailabilityWindow) -> Result<()> {
    let (available, start, end) = match window.day {
        DayAvailability::Off => (false, None, None),
        DayAvailability::Hours(hours) => (
            true,
            Some(hours.start().to_string()),
            Some(hours.end().to_string()),
        ),
    };
    db.execute(
        "INSERT OR REPLACE INTO availability (cleaner_id, weekday, available, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            window.cleaner_id,
            window.weekday.num_days_from_monday(),
            available,
            start,
            end
        ],
    )
    .context("Failed to store availability in database.")?;
    Ok(())
}

/// The week of a cleaner, from Monday on.
pub fn availability(db: &Connection, cleaner_id: u32) -> Result<Vec<AvailabilityWindow>> {
    let mut stmt = db
        .prepare(
            "SELECT cleaner_id, weekday, available, start_time, end_time FROM availability
             WHERE cleaner_id = ?1 ORDER BY weekday",
        )
        .context("Failed to fetch availability from database.")?;
    let rows = stmt.query_map(params![cleaner_id], window_from_row)?;

    let mut windows = Vec::new();
    for window in rows {
        windows.push(window?);
    }
    Ok(windows)
}

fn insert_task(db: &Connection, sede: &str, task: &NewTask) -> Result<u32> {
    db.execute(
        "INSERT INTO task (sede, property, address, day, start_time, end_time, kind, status,
                           cleaner_id, cost_cents, payment, supervisor, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            sede,
            task.property,
            task.address,
            task.date,
            task.interval.start().to_string(),
            task.interval.end().to_string(),
            task.kind.as_str(),
            TaskStatus::Pending.as_str(),
            task.cleaner_id,
            task.cost_cents,
            task.payment.as_str(),
            task.supervisor,
            task.notes
        ],
    )
    .context("Failed to insert task to database.")?;
    Ok(db.last_insert_rowid() as u32)
}

/// Add a task to the sede and return its id. An assigned cleaner must
/// belong to the same sede.
pub fn add_task(db: &Connection, sede: &str, task: &NewTask) -> Result<u32> {
    if let Some(cleaner_id) = task.cleaner_id {
        existing_cleaner(db, sede, cleaner_id)?;
    }
    insert_task(db, sede, task)
}

/// Add several tasks at once. Either all of them are stored or none is.
pub fn add_tasks(db: &mut Connection, sede: &str, tasks: &[NewTask]) -> Result<Vec<u32>> {
    let tx = db.transaction().context("Failed to open transaction.")?;
    let mut ids = Vec::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        let id = add_task(&tx, sede, task)
            .with_context(|| format!("Task #{} was rejected.", index))?;
        ids.push(id);
    }
    tx.commit().context("Failed to commit imported tasks.")?;
    Ok(ids)
}

/// The tasks of one day, by start time.
pub fn tasks_on(db: &Connection, sede: &str, day: NaiveDate) -> Result<Vec<Task>> {
    tasks_between(db, sede, day, day)
}

/// The tasks between two days, both included.
pub fn tasks_between(
    db: &Connection,
    sede: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Task>> {
    let sql = format!(
        "SELECT {} FROM task WHERE sede = ?1 AND day >= ?2 AND day <= ?3
         ORDER BY day, start_time, id",
        TASK_COLUMNS
    );
    let mut stmt = db.prepare(&sql).context("Failed to fetch tasks from database.")?;
    let rows = stmt.query_map(params![sede, from, to], task_from_row)?;

    let mut tasks = Vec::new();
    for task in rows {
        tasks.push(task?);
    }
    Ok(tasks)
}

pub fn task(db: &Connection, sede: &str, id: u32) -> Result<Option<Task>> {
    let sql = format!("SELECT {} FROM task WHERE sede = ?1 AND id = ?2", TASK_COLUMNS);
    let task = db
        .query_row(&sql, params![sede, id], task_from_row)
        .optional()
        .with_context(|| format!("Failed to get task {} from database.", id))?;
    Ok(task)
}

pub fn existing_task(db: &Connection, sede: &str, id: u32) -> Result<Task> {
    task(db, sede, id)?.ok_or_else(|| anyhow!("No task {} in sede '{}'.", id, sede))
}

/// Give a task to a cleaner and move it to start at `slot`, keeping its
/// duration. Overlaps with the cleaner's other tasks are allowed.
pub fn move_task(
    db: &Connection,
    sede: &str,
    id: u32,
    cleaner_id: u32,
    slot: TimeOfDay,
) -> Result<Task> {
    let mut task = existing_task(db, sede, id)?;
    let cleaner = existing_cleaner(db, sede, cleaner_id)?;
    if !cleaner.active {
        warn!(cleaner_id, task_id = id, "assigning a task to an inactive cleaner");
    }

    let interval = task
        .interval
        .moved_to(slot)
        .with_context(|| format!("Task {} cannot start at {}.", id, slot))?;
    db.execute(
        "UPDATE task SET cleaner_id = ?1, start_time = ?2, end_time = ?3
         WHERE sede = ?4 AND id = ?5",
        params![
            cleaner_id,
            interval.start().to_string(),
            interval.end().to_string(),
            sede,
            id
        ],
    )
    .context("Failed to assign task in database.")?;
    info!(task_id = id, cleaner_id, %interval, "task moved");

    task.cleaner_id = Some(cleaner_id);
    task.interval = interval;
    Ok(task)
}

pub fn unassign_task(db: &Connection, sede: &str, id: u32) -> Result<()> {
    let changed = db
        .execute(
            "UPDATE task SET cleaner_id = NULL WHERE sede = ?1 AND id = ?2",
            params![sede, id],
        )
        .context("Failed to unassign task in database.")?;
    if changed == 0 {
        return Err(anyhow!("No task {} in sede '{}'.", id, sede));
    }
    Ok(())
}

pub fn set_status(db: &Connection, sede: &str, id: u32, status: TaskStatus) -> Result<()> {
    let changed = db
        .execute(
            "UPDATE task SET status = ?1 WHERE sede = ?2 AND id = ?3",
            params![status.as_str(), sede, id],
        )
        .context("Failed to update task status in database.")?;
    if changed == 0 {
        return Err(anyhow!("No task {} in sede '{}'.", id, sede));
    }
    Ok(())
}

/// Remove tasks by id and return how many existed.
pub fn remove_tasks(db: &mut Connection, sede: &str, ids: &[u32]) -> Result<usize> {
    let tx = db.transaction().context("Failed to open transaction.")?;
    let mut removed = 0;
    for id in ids {
        removed += tx
            .execute("DELETE FROM task WHERE sede = ?1 AND id = ?2", params![sede, id])
            .context("Failed to remove task from database.")?;
    }
    tx.commit().context("Failed to commit task removal.")?;
    Ok(removed)
}

/// Persists drops made on a sede's board.
pub struct JournalSink<'a> {
    db: &'a Connection,
    sede: &'a str,
}

impl<'a> JournalSink<'a> {
    pub fn new(db: &'a Connection, sede: &'a str) -> Self {
        JournalSink { db, sede }
    }
}

impl AssignmentSink for JournalSink<'_> {
    type Error = anyhow::Error;

    fn on_task_assign(&mut self, task_id: u32, cleaner_id: u32, slot: TimeOfDay) -> Result<()> {
        move_task(self.db, self.sede, task_id, cleaner_id, slot).map(|_| ())
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read a text column through `FromStr`.
fn parsed<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|err| conversion_error(idx, err))
}

fn interval_from_row(row: &Row, start_idx: usize, end_idx: usize) -> rusqlite::Result<Interval> {
    let start: TimeOfDay = parsed(row, start_idx)?;
    let end: TimeOfDay = parsed(row, end_idx)?;
    Interval::new(start, end).map_err(|err| conversion_error(end_idx, err))
}

fn cleaner_from_row(row: &Row) -> rusqlite::Result<Cleaner> {
    Ok(Cleaner {
        id: row.get(0)?,
        sede: row.get(1)?,
        name: row.get(2)?,
        active: row.get(3)?,
        hourly_rate_cents: row.get(4)?,
    })
}

fn window_from_row(row: &Row) -> rusqlite::Result<AvailabilityWindow> {
    let index: usize = row.get(1)?;
    let weekday = WEEKDAYS.get(index).copied().ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(1, index as i64)
    })?;
    let available: bool = row.get(2)?;
    let day = if available {
        DayAvailability::Hours(interval_from_row(row, 3, 4)?)
    } else {
        DayAvailability::Off
    };
    Ok(AvailabilityWindow {
        cleaner_id: row.get(0)?,
        weekday,
        day,
    })
}

/// Return a task from a row in `TASK_COLUMNS` order.
fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        sede: row.get(1)?,
        property: row.get(2)?,
        address: row.get(3)?,
        date: row.get(4)?,
        interval: interval_from_row(row, 5, 6)?,
        kind: parsed(row, 7)?,
        status: parsed(row, 8)?,
        cleaner_id: row.get(9)?,
        cost_cents: row.get(10)?,
        payment: parsed(row, 11)?,
        supervisor: row.get(12)?,
        notes: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::{DragPayload, DragSession, DropOutcome, Position};
    use crate::model::TaskType;

    const SEDE: &str = "norte";

    fn journal() -> Connection {
        let db = Connection::open_in_memory().unwrap();
        init_journal(&db).unwrap();
        db
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn draft(d: u32, start: &str, end: &str) -> NewTask {
        let interval = Interval::new(start.parse().unwrap(), end.parse().unwrap()).unwrap();
        NewTask::new("Flat 3B", "Calle Mayor 1", day(d), interval, TaskType::Deep)
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let db = journal();
        init_journal(&db).unwrap();
    }

    #[test]
    fn test_task_round_trip() {
        let db = journal();
        let cleaner_id = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        let mut new = draft(4, "09:00", "11:30").with_cleaner(cleaner_id);
        new.notes = Some("Keys at reception".to_string());
        let id = add_task(&db, SEDE, &new).unwrap();

        let stored = existing_task(&db, SEDE, id).unwrap();
        assert_eq!(stored.interval, new.interval);
        assert_eq!(stored.kind, TaskType::Deep);
        assert_eq!(stored.status, TaskStatus::Pending);
        assert_eq!(stored.cleaner_id, Some(cleaner_id));
        assert_eq!(stored.notes.as_deref(), Some("Keys at reception"));
    }

    #[test]
    fn test_sede_scoping() {
        let db = journal();
        let id = add_task(&db, SEDE, &draft(4, "09:00", "10:00")).unwrap();
        assert!(task(&db, "sur", id).unwrap().is_none());
        assert!(tasks_on(&db, "sur", day(4)).unwrap().is_empty());

        let foreign = add_cleaner(&db, "sur", "Luis", 1000).unwrap();
        assert!(add_task(&db, SEDE, &draft(4, "09:00", "10:00").with_cleaner(foreign)).is_err());
    }

    #[test]
    fn test_tasks_between_orders_by_day_and_start() {
        let db = journal();
        add_task(&db, SEDE, &draft(5, "08:00", "09:00")).unwrap();
        add_task(&db, SEDE, &draft(4, "12:00", "13:00")).unwrap();
        add_task(&db, SEDE, &draft(4, "09:00", "10:00")).unwrap();
        add_task(&db, SEDE, &draft(7, "09:00", "10:00")).unwrap();

        let starts: Vec<String> = tasks_between(&db, SEDE, day(4), day(5))
            .unwrap()
            .iter()
            .map(|t| format!("{} {}", t.date, t.interval.start()))
            .collect();
        assert_eq!(starts, vec!["2024-03-04 09:00", "2024-03-04 12:00", "2024-03-05 08:00"]);
    }

    #[test]
    fn test_move_keeps_duration_and_allows_overlap() {
        let db = journal();
        let ana = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        add_task(&db, SEDE, &draft(4, "09:00", "11:00").with_cleaner(ana)).unwrap();
        let second = add_task(&db, SEDE, &draft(4, "14:00", "15:30")).unwrap();

        let moved = move_task(&db, SEDE, second, ana, "10:00".parse().unwrap()).unwrap();
        assert_eq!(moved.interval.to_string(), "10:00-11:30");
        assert_eq!(existing_task(&db, SEDE, second).unwrap().cleaner_id, Some(ana));
    }

    #[test]
    fn test_move_past_midnight_is_rejected() {
        let db = journal();
        let ana = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        let id = add_task(&db, SEDE, &draft(4, "09:00", "11:00")).unwrap();
        assert!(move_task(&db, SEDE, id, ana, "23:00".parse().unwrap()).is_err());
        assert_eq!(existing_task(&db, SEDE, id).unwrap().cleaner_id, None);
    }

    #[test]
    fn test_drag_session_through_journal() {
        let db = journal();
        let ana = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        let luis = add_cleaner(&db, SEDE, "Luis", 1200).unwrap();
        let id = add_task(&db, SEDE, &draft(4, "09:00", "10:00").with_cleaner(ana)).unwrap();
        let origin = Position {
            cleaner_id: ana,
            slot: "09:00".parse().unwrap(),
        };
        let payload = DragPayload {
            task_id: id.to_string(),
            origin: Some(origin),
        };

        let mut session = DragSession::new();
        let mut sink = JournalSink::new(&db, SEDE);
        session.drag_start(payload.clone());
        assert_eq!(session.drop(origin, &mut sink).unwrap(), DropOutcome::Unchanged);

        session.drag_start(payload);
        let target = Position {
            cleaner_id: luis,
            slot: "13:00".parse().unwrap(),
        };
        assert!(matches!(
            session.drop(target, &mut sink).unwrap(),
            DropOutcome::Assigned(_)
        ));
        let stored = existing_task(&db, SEDE, id).unwrap();
        assert_eq!(stored.position(), Some(target));
    }

    #[test]
    fn test_availability_upsert_replaces_weekday() {
        let db = journal();
        let ana = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        let hours = Interval::new("09:00".parse().unwrap(), "17:00".parse().unwrap()).unwrap();
        let window = |weekday, day| AvailabilityWindow {
            cleaner_id: ana,
            weekday,
            day,
        };
        set_availability(&db, &window(Weekday::Mon, DayAvailability::Hours(hours))).unwrap();
        set_availability(&db, &window(Weekday::Fri, DayAvailability::Hours(hours))).unwrap();
        set_availability(&db, &window(Weekday::Mon, DayAvailability::Off)).unwrap();

        let week = availability(&db, ana).unwrap();
        assert_eq!(week.len(), 2);
        assert_eq!(week[0].weekday, Weekday::Mon);
        assert_eq!(week[0].day, DayAvailability::Off);
        assert_eq!(week[1].day, DayAvailability::Hours(hours));
    }

    #[test]
    fn test_midnight_end_round_trip() {
        let db = journal();
        let ana = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        let evening = Interval::new("18:00".parse().unwrap(), "24:00".parse().unwrap()).unwrap();
        set_availability(
            &db,
            &AvailabilityWindow {
                cleaner_id: ana,
                weekday: Weekday::Sat,
                day: DayAvailability::Hours(evening),
            },
        )
        .unwrap();
        assert_eq!(availability(&db, ana).unwrap()[0].day, DayAvailability::Hours(evening));

        let id = add_task(&db, SEDE, &draft(4, "21:00", "22:00").with_cleaner(ana)).unwrap();
        let moved = move_task(&db, SEDE, id, ana, "23:00".parse().unwrap()).unwrap();
        assert_eq!(moved.interval.to_string(), "23:00-24:00");
        assert_eq!(existing_task(&db, SEDE, id).unwrap().interval, moved.interval);
    }

    #[test]
    fn test_status_unassign_and_bulk_remove() {
        let mut db = journal();
        let ana = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        let a = add_task(&db, SEDE, &draft(4, "09:00", "10:00").with_cleaner(ana)).unwrap();
        let b = add_task(&db, SEDE, &draft(4, "10:00", "11:00")).unwrap();

        set_status(&db, SEDE, a, TaskStatus::Completed).unwrap();
        assert!(existing_task(&db, SEDE, a).unwrap().is_done());
        unassign_task(&db, SEDE, a).unwrap();
        assert_eq!(existing_task(&db, SEDE, a).unwrap().cleaner_id, None);
        assert!(set_status(&db, SEDE, 99, TaskStatus::Pending).is_err());

        assert_eq!(remove_tasks(&mut db, SEDE, &[a, b, 99]).unwrap(), 2);
        assert!(tasks_on(&db, SEDE, day(4)).unwrap().is_empty());
    }

    #[test]
    fn test_add_tasks_is_all_or_nothing() {
        let mut db = journal();
        let good = draft(4, "09:00", "10:00");
        let bad = draft(4, "10:00", "11:00").with_cleaner(42);
        assert!(add_tasks(&mut db, SEDE, &[good.clone(), bad]).is_err());
        assert!(tasks_on(&db, SEDE, day(4)).unwrap().is_empty());

        assert_eq!(add_tasks(&mut db, SEDE, &[good]).unwrap().len(), 1);
    }

    #[test]
    fn test_deactivate_cleaner() {
        let db = journal();
        let ana = add_cleaner(&db, SEDE, "Ana", 1200).unwrap();
        deactivate_cleaner(&db, SEDE, ana).unwrap();
        assert!(!existing_cleaner(&db, SEDE, ana).unwrap().active);
        assert!(deactivate_cleaner(&db, "sur", ana).is_err());
    }
}
