//! Reassignment of tasks between cleaners and slots.
//!
//! A drag on the board is modelled as a `DragSession` moving through
//! `Idle -> Dragging -> Idle`. Dropping produces an `AssignmentRequest`
//! which is handed to an `AssignmentSink` unless the task would land
//! where it already is.

use std::fmt;

use tracing::{debug, warn};

use crate::time::TimeOfDay;

/// Receives the assignments produced by drops.
pub trait AssignmentSink {
    type Error;

    fn on_task_assign(
        &mut self,
        task_id: u32,
        cleaner_id: u32,
        slot: TimeOfDay,
    ) -> Result<(), Self::Error>;
}

/// What a drag carries: the task id as it came from the board, and where
/// the task was when the drag started, if it was assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub task_id: String,
    pub origin: Option<Position>,
}

/// A (cleaner, slot) cell of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub cleaner_id: u32,
    pub slot: TimeOfDay,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cleaner {} at {}", self.cleaner_id, self.slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentRequest {
    pub task_id: u32,
    pub target: Position,
}

impl AssignmentRequest {
    /// Hand the request to `sink`, unless `origin` is already the target.
    pub fn process<S: AssignmentSink>(
        self,
        origin: Option<Position>,
        sink: &mut S,
    ) -> Result<DropOutcome, S::Error> {
        if origin == Some(self.target) {
            debug!(task_id = self.task_id, "task dropped on its own position");
            return Ok(DropOutcome::Unchanged);
        }
        sink.on_task_assign(self.task_id, self.target.cleaner_id, self.target.slot)?;
        debug!(task_id = self.task_id, cell = %self.target, "task assigned");
        Ok(DropOutcome::Assigned(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Assigned(AssignmentRequest),
    /// Dropped where it already was.
    Unchanged,
    /// There was no drag in progress.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging {
        task_id: u32,
        origin: Option<Position>,
    },
}

#[derive(Debug)]
pub struct DragSession {
    state: DragState,
}

impl Default for DragSession {
    fn default() -> Self {
        DragSession::new()
    }
}

impl DragSession {
    pub fn new() -> Self {
        DragSession {
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Begin dragging. A payload without a usable task id is logged and
    /// dropped, and the session keeps whatever state it had.
    pub fn drag_start(&mut self, payload: DragPayload) -> bool {
        let task_id = payload.task_id.trim();
        match task_id.parse::<u32>() {
            Ok(task_id) => {
                self.state = DragState::Dragging {
                    task_id,
                    origin: payload.origin,
                };
                true
            }
            Err(_) => {
                warn!(payload = ?payload, "drag payload without a valid task id, ignoring");
                false
            }
        }
    }

    /// Every cell accepts drops.
    pub fn drag_over(&self, _target: Position) -> bool {
        true
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Finish the drag on `target`. The session is idle afterwards whatever
    /// the outcome.
    pub fn drop<S: AssignmentSink>(
        &mut self,
        target: Position,
        sink: &mut S,
    ) -> Result<DropOutcome, S::Error> {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        match state {
            DragState::Idle => {
                warn!(cell = %target, "drop without an active drag, ignoring");
                Ok(DropOutcome::Ignored)
            }
            DragState::Dragging { task_id, origin } => {
                AssignmentRequest { task_id, target }.process(origin, sink)
            }
        }
    }
}
