//! Sede-scoped cleaning task planning.
//!
//! The pure parts (`collision`, `availability`, `assign`, `workload`) work
//! on tasks and cleaners already loaded in memory. `store` keeps them in a
//! SQLite journal and persists assignments.

pub mod assign;
pub mod availability;
pub mod collision;
pub mod import;
pub mod model;
pub mod store;
pub mod time;
pub mod workload;
