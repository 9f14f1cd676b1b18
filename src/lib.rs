// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Messaging layer - outbound client abstraction
pub mod messaging;

// Storage layer - per-owner reminder records
pub mod storage;

// Re-export core config
pub use crate::core::Config;

// Re-export feature items
pub use features::{
    // Delivery
    DeliveryError, Dispatcher, StaticTemplates, TemplateKind, TemplateSource,
    // Scheduling
    ReminderScheduler, TickSummary,
};

// Re-export messaging and storage entry points
pub use messaging::{ConsoleClient, MessagingClient, Recipient};
pub use storage::{JsonStore, MemoryStore, RecordStore};
