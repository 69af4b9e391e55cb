use std::collections::BTreeMap;

use crate::model::{Cleaner, Task};

/// Hours and pay of one cleaner over a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub cleaner_id: u32,
    pub name: String,
    pub active: bool,
    pub tasks: usize,
    pub scheduled_minutes: u32,
    pub completed_minutes: u32,
    pub estimated_pay_cents: i64,
}

/// Totals of the tasks nobody has been given yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unassigned {
    pub tasks: usize,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub cleaners: Vec<Workload>,
    pub unassigned: Unassigned,
}

impl Report {
    pub fn total_pay_cents(&self) -> i64 {
        self.cleaners.iter().map(|w| w.estimated_pay_cents).sum()
    }
}

/// Pay for `minutes` of work at an hourly rate, rounded down to the cent.
pub fn pay_for(minutes: u32, hourly_rate_cents: i64) -> i64 {
    i64::from(minutes) * hourly_rate_cents / 60
}

/// Aggregate `tasks` per cleaner. Active cleaners always appear, inactive
/// ones only when they still have tasks. Tasks pointing at cleaners not in
/// `cleaners` are counted as unassigned.
pub fn report(cleaners: &[Cleaner], tasks: &[Task]) -> Report {
    let mut rows: BTreeMap<u32, Workload> = cleaners
        .iter()
        .map(|c| {
            (
                c.id,
                Workload {
                    cleaner_id: c.id,
                    name: c.name.clone(),
                    active: c.active,
                    tasks: 0,
                    scheduled_minutes: 0,
                    completed_minutes: 0,
                    estimated_pay_cents: 0,
                },
            )
        })
        .collect();
    let mut unassigned = Unassigned::default();

    for task in tasks {
        let minutes = u32::from(task.interval.duration_minutes());
        match task.cleaner_id.and_then(|id| rows.get_mut(&id)) {
            Some(row) => {
                row.tasks += 1;
                row.scheduled_minutes += minutes;
                if task.is_done() {
                    row.completed_minutes += minutes;
                }
            }
            None => {
                unassigned.tasks += 1;
                unassigned.minutes += minutes;
            }
        }
    }

    let rates: BTreeMap<u32, i64> = cleaners.iter().map(|c| (c.id, c.hourly_rate_cents)).collect();
    let cleaners = rows
        .into_iter()
        .map(|(id, mut row)| {
            row.estimated_pay_cents = pay_for(row.scheduled_minutes, rates[&id]);
            row
        })
        .filter(|row| row.active || row.tasks > 0)
        .collect();

    Report {
        cleaners,
        unassigned,
    }
}
