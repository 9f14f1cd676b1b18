//! In-memory record store
//!
//! Backs tests and makes a useful scratch store. Each owner's reminder list
//! sits behind its own async mutex so writers to the same owner serialize
//! while different owners proceed independently.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::reminder::Reminder;
use crate::storage::{apply_patch, apply_save, Mutation, RecordStore};

#[derive(Default)]
pub struct MemoryStore {
    owners: DashMap<String, Arc<Mutex<Vec<Reminder>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn records_for(&self, owner: &str) -> Arc<Mutex<Vec<Reminder>>> {
        self.owners
            .entry(owner.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn owners(&self) -> Result<Vec<String>> {
        Ok(self.owners.iter().map(|e| e.key().clone()).collect())
    }

    async fn load(&self, owner: &str) -> Result<Vec<Reminder>> {
        let records = self.records_for(owner);
        let guard = records.lock().await;
        Ok(guard.clone())
    }

    async fn save(&self, owner: &str, reminders: Vec<Reminder>) -> Result<Vec<Reminder>> {
        let records = self.records_for(owner);
        let mut guard = records.lock().await;
        let saved = apply_save(&guard, reminders)?;
        *guard = saved.clone();
        Ok(saved)
    }

    async fn patch_one(&self, owner: &str, id: &str, patch: Value) -> Result<Option<Reminder>> {
        let records = self.records_for(owner);
        let mut guard = records.lock().await;
        let Some(slot) = guard.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        let patched = apply_patch(slot, patch)?;
        *slot = patched.clone();
        Ok(Some(patched))
    }

    async fn update_one(
        &self,
        owner: &str,
        id: &str,
        mutate: Mutation,
    ) -> Result<Option<Reminder>> {
        let records = self.records_for(owner);
        let mut guard = records.lock().await;
        let Some(slot) = guard.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        mutate(slot);
        Ok(Some(slot.clone()))
    }
}
