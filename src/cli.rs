use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, Weekday};
use humantime::parse_duration;
use structopt::StructOpt;

use sedeplan::model::{PaymentMethod, TaskStatus, TaskType};
use sedeplan::time::TimeOfDay;

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Add a task to the sede.
    Add {
        /// Property reference.
        #[structopt()]
        property: String,

        #[structopt()]
        address: String,

        /// Day of the task (YYYY-MM-DD).
        #[structopt()]
        date: NaiveDate,

        /// Start time (HH:MM).
        #[structopt()]
        start: TimeOfDay,

        /// How long the task takes (parse_duration), e.g. "1h 30m".
        #[structopt(short, long, parse(try_from_str=parse_duration), required_unless = "end")]
        duration: Option<Duration>,

        /// End time (HH:MM), instead of a duration.
        #[structopt(short, long, conflicts_with = "duration")]
        end: Option<TimeOfDay>,

        #[structopt(short = "t", long = "type", default_value = "regular")]
        kind: TaskType,

        /// Assign the task to this cleaner right away.
        #[structopt(short, long)]
        cleaner: Option<u32>,

        #[structopt(long, default_value = "0")]
        cost_cents: i64,

        #[structopt(short, long, default_value = "cash")]
        payment: PaymentMethod,

        #[structopt(short, long)]
        supervisor: Option<String>,

        #[structopt(short, long)]
        notes: Option<String>,
    },
    /// Add the tasks listed in a JSON file, all or none.
    Import {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
    /// Show the tasks of a day with their collisions (today by default).
    Board {
        #[structopt()]
        date: Option<NaiveDate>,
    },
    /// Move a task to a cleaner and a start slot.
    Assign {
        #[structopt()]
        task: u32,

        #[structopt()]
        cleaner: u32,

        /// New start time (HH:MM). The task keeps its duration.
        #[structopt()]
        slot: TimeOfDay,
    },
    /// Take a task away from its cleaner.
    Unassign {
        #[structopt()]
        task: u32,
    },
    /// Change the status of a task.
    Status {
        #[structopt()]
        task: u32,

        /// pending, in-progress or completed.
        #[structopt()]
        status: TaskStatus,
    },
    /// Remove one or more tasks.
    Rm {
        #[structopt(required = true)]
        tasks: Vec<u32>,
    },
    /// Add a cleaner to the sede.
    CleanerAdd {
        #[structopt()]
        name: String,

        #[structopt(long, default_value = "0")]
        rate_cents: i64,
    },
    /// List the cleaners of the sede.
    Cleaners,
    /// Mark a cleaner as inactive.
    CleanerOff {
        #[structopt()]
        cleaner: u32,
    },
    /// Set the working hours of a cleaner for a weekday.
    Availability {
        #[structopt()]
        cleaner: u32,

        /// Mon, Tue, ...
        #[structopt()]
        weekday: Weekday,

        #[structopt(required_unless = "off")]
        start: Option<TimeOfDay>,

        #[structopt(required_unless = "off")]
        end: Option<TimeOfDay>,

        /// The cleaner does not work that day.
        #[structopt(long, conflicts_with_all = &["start", "end"])]
        off: bool,
    },
    /// Check whether a cleaner can take a task at the given time.
    Check {
        #[structopt()]
        cleaner: u32,

        #[structopt()]
        date: NaiveDate,

        #[structopt()]
        start: TimeOfDay,

        #[structopt()]
        end: TimeOfDay,
    },
    /// Hours and estimated pay per cleaner between two days.
    Workload {
        #[structopt()]
        from: NaiveDate,

        #[structopt()]
        to: NaiveDate,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sedeplan",
    about = "Cleaning task planner: collisions, availability and assignment."
)]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different journal file.
    #[structopt(parse(from_os_str), short, long)]
    pub journal_file: Option<PathBuf>,

    /// The sede whose data is read and written.
    #[structopt(long, env = "SEDEPLAN_SEDE", default_value = "default")]
    pub sede: String,
}
