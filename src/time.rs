use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum TimeError {
    #[error("Invalid time '{0}', expected HH:MM.")]
    Malformed(String),

    #[error("Time '{0}' is out of range.")]
    OutOfRange(String),

    #[error("Interval {start}-{end} is empty or reversed.")]
    EmptyInterval { start: TimeOfDay, end: TimeOfDay },

    #[error("A task starting at {start} lasting {minutes} minutes runs past midnight.")]
    PastMidnight { start: TimeOfDay, minutes: u64 },
}

/// A wall clock time, stored as minutes from midnight. `24:00` is a valid
/// value and closes the day, so a task or a shift can end at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn hm(hours: u16, minutes: u16) -> Result<Self, TimeError> {
        let total = u32::from(hours) * 60 + u32::from(minutes);
        if minutes >= 60 || total > u32::from(MINUTES_PER_DAY) {
            return Err(TimeError::OutOfRange(format!("{:02}:{:02}", hours, minutes)));
        }
        Ok(TimeOfDay(hours * 60 + minutes))
    }

    /// The time `minutes` later on the same day, if there is one. Midnight
    /// at the end of the day counts.
    fn add_minutes(self, minutes: u64) -> Option<TimeOfDay> {
        let end = u64::from(self.0).saturating_add(minutes);
        if end > u64::from(MINUTES_PER_DAY) {
            None
        } else {
            Some(TimeOfDay(end as u16))
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (hours, minutes) = trimmed
            .split_once(':')
            .ok_or_else(|| TimeError::Malformed(s.to_string()))?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
            return Err(TimeError::Malformed(s.to_string()));
        }
        if !digits(hours) || !digits(minutes) {
            return Err(TimeError::Malformed(s.to_string()));
        }
        let hours: u16 = hours
            .parse()
            .map_err(|_| TimeError::Malformed(s.to_string()))?;
        let minutes: u16 = minutes
            .parse()
            .map_err(|_| TimeError::Malformed(s.to_string()))?;
        TimeOfDay::hm(hours, minutes).map_err(|_| TimeError::OutOfRange(s.to_string()))
    }
}

/// A half-open range of minutes within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    start: u16,
    end: u16,
}

impl Interval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, TimeError> {
        if start >= end {
            return Err(TimeError::EmptyInterval { start, end });
        }
        Ok(Interval {
            start: start.0,
            end: end.0,
        })
    }

    /// Build the interval of a task from its start and duration, so the end
    /// is always derivable from the start.
    pub fn starting_at(start: TimeOfDay, duration: Duration) -> Result<Self, TimeError> {
        let minutes = duration.as_secs() / 60;
        if minutes == 0 {
            return Err(TimeError::EmptyInterval { start, end: start });
        }
        let end = start
            .add_minutes(minutes)
            .ok_or(TimeError::PastMidnight { start, minutes })?;
        Ok(Interval {
            start: start.0,
            end: end.0,
        })
    }

    pub fn start(&self) -> TimeOfDay {
        TimeOfDay(self.start)
    }

    pub fn end(&self) -> TimeOfDay {
        TimeOfDay(self.end)
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end - self.start
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_minutes()) * 60)
    }

    /// Same length, moved to start at `slot`.
    pub fn moved_to(&self, slot: TimeOfDay) -> Result<Self, TimeError> {
        Interval::starting_at(slot, self.duration())
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `self` lies completely inside `outer`, bounds included.
    pub fn within(&self, outer: &Interval) -> bool {
        outer.start <= self.start && self.end <= outer.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start(), self.end())
    }
}
