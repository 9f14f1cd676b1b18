//! Console transport
//!
//! A dry-run [`MessagingClient`] that logs every send instead of talking to a
//! real session. Lets the bot run end to end without a linked device.

use async_trait::async_trait;
use log::info;

use crate::messaging::{DirectoryEntry, Endpoint, MessagingClient, Recipient, SendError};

/// Always-ready transport that prints deliveries to the log.
#[derive(Debug, Default)]
pub struct ConsoleClient;

impl ConsoleClient {
    pub fn new() -> Self {
        ConsoleClient
    }
}

#[async_trait]
impl MessagingClient for ConsoleClient {
    async fn is_ready(&self) -> bool {
        true
    }

    async fn list_conversations(&self) -> anyhow::Result<Vec<Endpoint>> {
        Ok(Vec::new())
    }

    async fn lookup_directory(&self, ids: &[String]) -> anyhow::Result<Vec<DirectoryEntry>> {
        Ok(ids.iter().map(|_| DirectoryEntry::default()).collect())
    }

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), SendError> {
        info!("[dry-run] -> {}: {}", recipient.address(), text);
        Ok(())
    }
}
