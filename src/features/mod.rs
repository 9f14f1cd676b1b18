//! Feature registry
//!
//! Each feature lives in its own module with a versioned doc header; this
//! registry surfaces those versions for startup logging and diagnostics.

pub mod delivery;
pub mod scheduling;

pub use delivery::{DeliveryError, Dispatcher, StaticTemplates, TemplateKind, TemplateSource};
pub use scheduling::{ReminderScheduler, TickSummary};

/// Name/version pair for one feature module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// Every registered feature. Versions track the module doc headers.
pub fn get_features() -> Vec<FeatureInfo> {
    vec![
        FeatureInfo {
            name: "Scheduling",
            version: "1.4.0",
        },
        FeatureInfo {
            name: "Delivery",
            version: "1.3.0",
        },
    ]
}

pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
