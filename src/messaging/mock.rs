//! Scriptable in-memory [`MessagingClient`] for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::messaging::{DirectoryEntry, Endpoint, MessagingClient, Recipient, SendError};

#[derive(Default)]
pub struct MockClient {
    ready: AtomicBool,
    reject_sends: AtomicBool,
    conversations: Mutex<Vec<Endpoint>>,
    directory: Mutex<HashMap<String, DirectoryEntry>>,
    invalid_addresses: Mutex<HashSet<String>>,
    send_delay: Mutex<Option<Duration>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockClient {
    pub fn new() -> Self {
        let client = MockClient::default();
        client.ready.store(true, Ordering::SeqCst);
        client
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn reject_sends(&self, reject: bool) {
        self.reject_sends.store(reject, Ordering::SeqCst);
    }

    pub fn add_conversation(&self, endpoint: Endpoint) {
        self.conversations.lock().expect("mock lock").push(endpoint);
    }

    pub fn set_directory_entry(&self, id: &str, entry: DirectoryEntry) {
        self.directory
            .lock()
            .expect("mock lock")
            .insert(id.to_string(), entry);
    }

    /// Sends to this exact address fail with `InvalidAddressType`.
    pub fn mark_address_invalid(&self, address: &str) {
        self.invalid_addresses
            .lock()
            .expect("mock lock")
            .insert(address.to_string());
    }

    /// Every send sleeps this long first, to exercise the dispatch timeout.
    pub fn set_send_delay(&self, delay: Option<Duration>) {
        *self.send_delay.lock().expect("mock lock") = delay;
    }

    /// Everything delivered so far, as (address, text) pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl MessagingClient for MockClient {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn list_conversations(&self) -> anyhow::Result<Vec<Endpoint>> {
        Ok(self.conversations.lock().expect("mock lock").clone())
    }

    async fn lookup_directory(&self, ids: &[String]) -> anyhow::Result<Vec<DirectoryEntry>> {
        let directory = self.directory.lock().expect("mock lock");
        Ok(ids
            .iter()
            .map(|id| directory.get(id).cloned().unwrap_or_default())
            .collect())
    }

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), SendError> {
        let delay = *self.send_delay.lock().expect("mock lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if !self.ready.load(Ordering::SeqCst) {
            return Err(SendError::NotReady);
        }
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(SendError::Rejected("scripted failure".to_string()));
        }
        let address = recipient.address().to_string();
        if self
            .invalid_addresses
            .lock()
            .expect("mock lock")
            .contains(&address)
        {
            return Err(SendError::InvalidAddressType);
        }
        self.sent
            .lock()
            .expect("mock lock")
            .push((address, text.to_string()));
        Ok(())
    }
}
