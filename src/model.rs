use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Deserialize;

use crate::assign::Position;
use crate::time::Interval;

/// Service categories a task can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    Regular,
    Deep,
    MoveOut,
    PostConstruction,
    Office,
    Windows,
}

/// The state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Invoice,
}

/// Error returned when parsing one of the keyword enums above.
#[derive(Debug, thiserror::Error)]
#[error("Unknown {kind} '{value}', expected one of: {expected}.")]
pub struct UnknownKeyword {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

macro_rules! keyword_enum {
    ($ty:ident, $kind:expr, { $($variant:ident => $word:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $word),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownKeyword;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($word => Ok($ty::$variant),)+
                    _ => Err(UnknownKeyword {
                        kind: $kind,
                        value: s.to_string(),
                        expected: concat!($($word, " "),+).trim_end(),
                    }),
                }
            }
        }
    };
}

keyword_enum!(TaskType, "task type", {
    Regular => "regular",
    Deep => "deep",
    MoveOut => "move-out",
    PostConstruction => "post-construction",
    Office => "office",
    Windows => "windows",
});

keyword_enum!(TaskStatus, "status", {
    Pending => "pending",
    InProgress => "in-progress",
    Completed => "completed",
});

keyword_enum!(PaymentMethod, "payment method", {
    Cash => "cash",
    Card => "card",
    Transfer => "transfer",
    Invoice => "invoice",
});

/// A single cleaning task, saved as an entry in the task table.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u32,
    pub sede: String,
    pub property: String,
    pub address: String,
    pub date: NaiveDate,
    pub interval: Interval,
    pub kind: TaskType,
    pub status: TaskStatus,
    pub cleaner_id: Option<u32>,
    pub cost_cents: i64,
    pub payment: PaymentMethod,
    pub supervisor: Option<String>,
    pub notes: Option<String>,
}

impl Task {
    /// Where the task currently sits on the board: its cleaner and its
    /// start slot.
    /// `None` while the task is unassigned.
    pub fn position(&self) -> Option<Position> {
        self.cleaner_id.map(|cleaner_id| Position {
            cleaner_id,
            slot: self.interval.start(),
        })
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// A task that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub property: String,
    pub address: String,
    pub date: NaiveDate,
    pub interval: Interval,
    pub kind: TaskType,
    pub cleaner_id: Option<u32>,
    pub cost_cents: i64,
    pub payment: PaymentMethod,
    pub supervisor: Option<String>,
    pub notes: Option<String>,
}

impl NewTask {
    pub fn new(
        property: impl Into<String>,
        address: impl Into<String>,
        date: NaiveDate,
        interval: Interval,
        kind: TaskType,
    ) -> Self {
        NewTask {
            property: property.into(),
            address: address.into(),
            date,
            interval,
            kind,
            cleaner_id: None,
            cost_cents: 0,
            payment: PaymentMethod::Cash,
            supervisor: None,
            notes: None,
        }
    }

    pub fn with_cleaner(mut self, cleaner_id: u32) -> Self {
        self.cleaner_id = Some(cleaner_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cleaner {
    pub id: u32,
    pub sede: String,
    pub name: String,
    pub active: bool,
    pub hourly_rate_cents: i64,
}

/// What a cleaner declared for one day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayAvailability {
    Off,
    Hours(Interval),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityWindow {
    pub cleaner_id: u32,
    pub weekday: Weekday,
    pub day: DayAvailability,
}

/// Find the window configured for the weekday of `date`, if any.
pub fn window_for(
    windows: &[AvailabilityWindow],
    date: NaiveDate,
) -> Option<&AvailabilityWindow> {
    let weekday = date.weekday();
    windows.iter().find(|w| w.weekday == weekday)
}
