//! # Record Storage
//!
//! Key-value-ish record store: a list of reminders per owner key (phone
//! digits, or a manual/no-phone pseudo-owner). Every write for a given owner
//! serializes on that owner's lock, so the tick and a manual dispatch can
//! never interleave and silently drop each other's status update.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: JSON file-backed store with atomic tmp-file writes
//! - 1.0.0: Trait plus in-memory store

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::core::reminder::Reminder;

pub mod json;
pub mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// An atomic read-modify-write applied under the owner's lock.
pub type Mutation = Box<dyn FnOnce(&mut Reminder) + Send>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every owner key currently holding reminders.
    async fn owners(&self) -> Result<Vec<String>>;

    async fn load(&self, owner: &str) -> Result<Vec<Reminder>>;

    /// Replaces the owner's reminder list. Assigns ids to new records,
    /// validates every record, and applies the edit-reset rule against the
    /// records already stored under the same id.
    async fn save(&self, owner: &str, reminders: Vec<Reminder>) -> Result<Vec<Reminder>>;

    /// Out-of-band field patch (notes and the like). Status fields are not
    /// disturbed unless the patch names them explicitly. Returns `None` when
    /// the reminder does not exist.
    async fn patch_one(&self, owner: &str, id: &str, patch: Value) -> Result<Option<Reminder>>;

    /// Applies `mutate` to one reminder atomically and persists the result.
    /// Returns the updated record, or `None` when it does not exist.
    async fn update_one(&self, owner: &str, id: &str, mutate: Mutation)
        -> Result<Option<Reminder>>;
}

/// Save semantics shared by both store implementations.
pub(crate) fn apply_save(existing: &[Reminder], incoming: Vec<Reminder>) -> Result<Vec<Reminder>> {
    let mut out = Vec::with_capacity(incoming.len());
    for mut reminder in incoming {
        if reminder.id.is_empty() {
            reminder.id = Uuid::new_v4().to_string();
        }
        reminder.validate()?;
        let merged = match existing.iter().find(|e| e.id == reminder.id) {
            Some(previous) => Reminder::merge_edit(previous, reminder),
            None => {
                // First save: statuses start untouched no matter what the
                // client payload carried.
                reminder.reset_statuses();
                reminder
            }
        };
        out.push(merged);
    }
    Ok(out)
}

/// Patch semantics shared by both store implementations: shallow merge of
/// the patch object over the record's JSON shape.
pub(crate) fn apply_patch(reminder: &Reminder, patch: Value) -> Result<Reminder> {
    let Value::Object(patch) = patch else {
        bail!("patch must be a JSON object");
    };
    let mut value = serde_json::to_value(reminder)?;
    let Value::Object(base) = &mut value else {
        bail!("reminder did not serialize to an object");
    };
    for (key, entry) in patch {
        base.insert(key, entry);
    }
    let patched: Reminder = serde_json::from_value(value)?;
    patched.validate()?;
    Ok(patched)
}
