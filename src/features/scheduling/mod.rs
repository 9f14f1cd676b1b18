//! # Scheduling Feature
//!
//! Occurrence math and the periodic tick loop that drives delivery.
//!
//! - **Version**: 1.4.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod occurrence;
pub mod scheduler;

pub use occurrence::{current_occurrence, due_targets, lead_due_instant};
pub use scheduler::{ReminderScheduler, TickSummary};
