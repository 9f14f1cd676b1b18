//! # Core Module
//!
//! Domain model, configuration, and the clock abstraction for the reminder bot.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Clock abstraction for deterministic scheduling
//! - 1.1.0: Reminder model gains recurring cycle tracking
//! - 1.0.0: Initial creation with config and reminder model

pub mod clock;
pub mod config;
pub mod reminder;

// Re-export commonly used items
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use reminder::{
    DayOfWeek, DeliveryStatus, LeadTag, RecurringStatus, Reminder, ReminderKind, Schedule,
    Target, ValidationError,
};
