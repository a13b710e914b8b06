//! Feature services built on the core: the flows whose behaviour needed more than
//! a plain pass-through to the API.

pub mod admin;
pub mod habit_logs;

pub use admin::{AdminService, FeedbackItem, LoadState, NewFeedback};
pub use habit_logs::{BulkDeleteReport, HabitLogService};
