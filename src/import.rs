//! Batch import of tasks from a JSON array.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{NewTask, PaymentMethod, TaskType};
use crate::time::{Interval, TimeError, TimeOfDay};

/// One task as written in an import file. The end is given either as
/// `end` or as `duration_minutes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDraft {
    pub date: String,
    pub start: String,
    pub end: Option<String>,
    pub duration_minutes: Option<u64>,
    pub property: String,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
    #[serde(default)]
    pub cost_cents: i64,
    pub payment: Option<PaymentMethod>,
    pub supervisor: Option<String>,
    pub notes: Option<String>,
    pub cleaner_id: Option<u32>,
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("either 'end' or 'duration_minutes' is required")]
    MissingEnd,

    #[error("'end' and 'duration_minutes' are mutually exclusive")]
    AmbiguousEnd,

    #[error("cost cannot be negative")]
    NegativeCost,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Malformed import file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task #{index} is invalid: {source}")]
    Draft {
        index: usize,
        #[source]
        source: DraftError,
    },
}

impl TaskDraft {
    pub fn validate(&self) -> Result<NewTask, DraftError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| DraftError::Date(self.date.clone()))?;
        let start: TimeOfDay = self.start.parse()?;
        let interval = match (&self.end, self.duration_minutes) {
            (Some(end), None) => Interval::new(start, end.parse()?)?,
            (None, Some(minutes)) => {
                Interval::starting_at(start, Duration::from_secs(minutes.saturating_mul(60)))?
            }
            (None, None) => return Err(DraftError::MissingEnd),
            (Some(_), Some(_)) => return Err(DraftError::AmbiguousEnd),
        };
        if self.cost_cents < 0 {
            return Err(DraftError::NegativeCost);
        }

        let mut task = NewTask::new(
            self.property.clone(),
            self.address.clone(),
            date,
            interval,
            self.kind,
        );
        task.cleaner_id = self.cleaner_id;
        task.cost_cents = self.cost_cents;
        if let Some(payment) = self.payment {
            task.payment = payment;
        }
        task.supervisor = self.supervisor.clone();
        task.notes = self.notes.clone();
        Ok(task)
    }
}

/// Parse and validate a whole file. Fails on the first invalid draft so
/// that nothing is stored from a partly broken file.
pub fn parse(json: &str) -> Result<Vec<NewTask>, ImportError> {
    let drafts: Vec<TaskDraft> = serde_json::from_str(json)?;
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            draft
                .validate()
                .map_err(|source| ImportError::Draft { index, source })
        })
        .collect()
}
