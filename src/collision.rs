use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::Task;
use crate::time::Interval;

/// One entry of a cleaner-day: the task and when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub task_id: u32,
    pub interval: Interval,
}

/// Overlap information for one task. Overlaps are reported for display
/// only, they never prevent an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub task_id: u32,
    pub is_colliding: bool,
    /// Tasks running concurrently with this one, itself included. It is 1
    /// for a task that overlaps nothing.
    pub count: usize,
}

/// How loudly a collision should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Clear,
    Stacked,
    Critical,
}

impl Collision {
    pub fn severity(&self) -> Severity {
        match self.count {
            0 | 1 => Severity::Clear,
            2 => Severity::Stacked,
            _ => Severity::Critical,
        }
    }

    /// Short marker for tables: empty, `x2`, or `x3!` and up.
    pub fn badge(&self) -> String {
        match self.severity() {
            Severity::Clear => String::new(),
            Severity::Stacked => format!("x{}", self.count),
            Severity::Critical => format!("x{}!", self.count),
        }
    }
}

/// Compute which slots of a single cleaner-day overlap. The result follows
/// the order of `slots`.
pub fn detect(slots: &[Slot]) -> Vec<Collision> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let others = slots
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && slot.interval.overlaps(&other.interval))
                .count();
            Collision {
                task_id: slot.task_id,
                is_colliding: others > 0,
                count: others + 1,
            }
        })
        .collect()
}

/// Group assigned tasks by cleaner and day and run `detect` on each group.
/// Unassigned tasks are left out, they cannot collide.
pub fn board(tasks: &[Task]) -> HashMap<u32, Collision> {
    let mut groups: HashMap<(u32, NaiveDate), Vec<Slot>> = HashMap::new();
    for task in tasks {
        if let Some(cleaner_id) = task.cleaner_id {
            groups.entry((cleaner_id, task.date)).or_default().push(Slot {
                task_id: task.id,
                interval: task.interval,
            });
        }
    }

    groups
        .values()
        .flat_map(|slots| detect(slots))
        .map(|collision| (collision.task_id, collision))
        .collect()
}

/// Collisions that involve `task_id`, looked up on a freshly computed board.
pub fn involving(tasks: &[Task], task_id: u32) -> Option<Collision> {
    board(tasks)
        .remove(&task_id)
        .filter(|collision| collision.is_colliding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PaymentMethod, TaskStatus, TaskType};

    fn slot(task_id: u32, start: &str, end: &str) -> Slot {
        Slot {
            task_id,
            interval: Interval::new(start.parse().unwrap(), end.parse().unwrap()).unwrap(),
        }
    }

    fn task(id: u32, cleaner_id: Option<u32>, day: u32, start: &str, end: &str) -> Task {
        Task {
            id,
            sede: "default".to_string(),
            property: format!("P{}", id),
            address: "Calle 1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            interval: Interval::new(start.parse().unwrap(), end.parse().unwrap()).unwrap(),
            kind: TaskType::Regular,
            status: TaskStatus::Pending,
            cleaner_id,
            cost_cents: 0,
            payment: PaymentMethod::Cash,
            supervisor: None,
            notes: None,
        }
    }

    #[test]
    fn test_two_overlapping_tasks() {
        let result = detect(&[slot(1, "09:00", "11:00"), slot(2, "10:00", "12:00")]);
        assert_eq!(
            result,
            vec![
                Collision {
                    task_id: 1,
                    is_colliding: true,
                    count: 2,
                },
                Collision {
                    task_id: 2,
                    is_colliding: true,
                    count: 2,
                },
            ]
        );
        assert_eq!(result[0].severity(), Severity::Stacked);
        assert_eq!(result[0].badge(), "x2");
    }

    #[test]
    fn test_touching_tasks_do_not_collide() {
        let result = detect(&[slot(1, "09:00", "10:00"), slot(2, "10:00", "11:00")]);
        assert!(result.iter().all(|c| !c.is_colliding && c.count == 1));
        assert_eq!(result[0].badge(), "");
    }

    #[test]
    fn test_count_is_per_task() {
        // 1 overlaps 2 and 3, but 2 and 3 do not overlap each other.
        let result = detect(&[
            slot(1, "09:00", "12:00"),
            slot(2, "09:30", "10:00"),
            slot(3, "11:00", "11:30"),
        ]);
        assert_eq!(result[0].count, 3);
        assert_eq!(result[0].severity(), Severity::Critical);
        assert_eq!(result[0].badge(), "x3!");
        assert_eq!(result[1].count, 2);
        assert_eq!(result[2].count, 2);
    }

    #[test]
    fn test_board_groups_by_cleaner_and_day() {
        let tasks = vec![
            task(1, Some(7), 4, "09:00", "11:00"),
            task(2, Some(7), 4, "10:00", "12:00"),
            task(3, Some(8), 4, "10:00", "12:00"),
            task(4, Some(7), 5, "10:00", "12:00"),
            task(5, None, 4, "10:00", "12:00"),
        ];
        let board = board(&tasks);
        assert!(board[&1].is_colliding);
        assert!(board[&2].is_colliding);
        assert!(!board[&3].is_colliding);
        assert!(!board[&4].is_colliding);
        assert!(!board.contains_key(&5));
    }

    #[test]
    fn test_involving_only_reports_real_collisions() {
        let tasks = vec![
            task(1, Some(7), 4, "09:00", "11:00"),
            task(2, Some(7), 4, "10:00", "12:00"),
            task(3, Some(7), 4, "13:00", "14:00"),
        ];
        assert_eq!(involving(&tasks, 2).map(|c| c.count), Some(2));
        assert_eq!(involving(&tasks, 3), None);
    }
}
