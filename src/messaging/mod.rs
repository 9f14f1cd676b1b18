//! # Messaging Layer
//!
//! Narrow capability contract over the messaging session library. The core
//! never touches connection, login, or QR lifecycle — it only probes
//! readiness, enumerates conversations, queries the directory, and sends.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Typed send errors so the dispatcher can retry the alternate suffix
//! - 1.0.0: Initial trait with console transport

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod console;
#[cfg(test)]
pub mod mock;

pub use console::ConsoleClient;

/// Conventional suffix for phone-derived recipient addresses.
pub const DEFAULT_ADDRESS_SUFFIX: &str = "@c.us";

/// Alternate suffix for recipients addressed by an internal identifier.
pub const ALTERNATE_ADDRESS_SUFFIX: &str = "@lid";

/// A known conversation. The id carries the recipient's digit prefix; when
/// the session library knows the true routing address it is carried here too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
}

/// Where a message goes: a full conversation object when one was found, or a
/// bare address string otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Conversation(Endpoint),
    Address(String),
}

impl Recipient {
    /// The concrete address a transport should deliver to.
    pub fn address(&self) -> &str {
        match self {
            Recipient::Conversation(endpoint) => endpoint
                .delivery_address
                .as_deref()
                .unwrap_or(&endpoint.id),
            Recipient::Address(address) => address,
        }
    }
}

/// Directory lookup result: some recipients are addressed internally (`lid`)
/// rather than by their phone number (`pn`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("messaging client is not ready")]
    NotReady,
    #[error("address type is structurally wrong for this recipient")]
    InvalidAddressType,
    #[error("send rejected: {0}")]
    Rejected(String),
}

/// Capability contract the scheduler and dispatcher depend on.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Must be probed before any dispatch; an unready client is a retryable
    /// condition, never fatal.
    async fn is_ready(&self) -> bool;

    async fn list_conversations(&self) -> anyhow::Result<Vec<Endpoint>>;

    async fn lookup_directory(&self, ids: &[String]) -> anyhow::Result<Vec<DirectoryEntry>>;

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), SendError>;
}
