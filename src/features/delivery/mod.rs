//! # Delivery Feature
//!
//! Everything between a due reminder and an outgoing message: identity
//! resolution, template formatting, and the dispatcher (automatic and
//! manual paths).
//!
//! - **Version**: 1.3.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod dispatcher;
pub mod identity;
pub mod template;

pub use dispatcher::{DeliveryError, Dispatcher};
pub use identity::{digits_only, phone_matches, resolve};
pub use template::{format_template, StaticTemplates, TemplateKind, TemplateSource, TemplateValues};
