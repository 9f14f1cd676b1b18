//! JSON file-backed record store
//!
//! One pretty-printed JSON file per owner under the configured data
//! directory. Writes go through a temp file and rename so a crash mid-write
//! never truncates a record file. The same per-owner lock discipline as the
//! in-memory store applies; the lock covers the whole read-modify-write.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::reminder::Reminder;
use crate::storage::{apply_patch, apply_save, Mutation, RecordStore};

pub struct JsonStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
        Ok(JsonStore {
            dir,
            locks: DashMap::new(),
        })
    }

    fn lock_for(&self, owner: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(owner.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn path_for(&self, owner: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_owner(owner)))
    }

    async fn read_owner(&self, path: &Path) -> Result<Vec<Reminder>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn write_owner(&self, path: &Path, reminders: &[Reminder]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(reminders)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        debug!("Persisted {} reminder(s) to {}", reminders.len(), path.display());
        Ok(())
    }
}

/// Owner keys are phone digit strings or the manual pseudo-owner, so this is
/// normally the identity; anything else is flattened to a safe filename.
fn sanitize_owner(owner: &str) -> String {
    owner
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn owners(&self) -> Result<Vec<String>> {
        let mut owners = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("listing {}", self.dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    owners.push(stem.to_string());
                }
            }
        }
        Ok(owners)
    }

    async fn load(&self, owner: &str) -> Result<Vec<Reminder>> {
        let lock = self.lock_for(owner);
        let _guard = lock.lock().await;
        self.read_owner(&self.path_for(owner)).await
    }

    async fn save(&self, owner: &str, reminders: Vec<Reminder>) -> Result<Vec<Reminder>> {
        let lock = self.lock_for(owner);
        let _guard = lock.lock().await;
        let path = self.path_for(owner);
        let existing = self.read_owner(&path).await?;
        let saved = apply_save(&existing, reminders)?;
        self.write_owner(&path, &saved).await?;
        Ok(saved)
    }

    async fn patch_one(&self, owner: &str, id: &str, patch: Value) -> Result<Option<Reminder>> {
        let lock = self.lock_for(owner);
        let _guard = lock.lock().await;
        let path = self.path_for(owner);
        let mut records = self.read_owner(&path).await?;
        let Some(slot) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        let patched = apply_patch(slot, patch)?;
        *slot = patched.clone();
        self.write_owner(&path, &records).await?;
        Ok(Some(patched))
    }

    async fn update_one(
        &self,
        owner: &str,
        id: &str,
        mutate: Mutation,
    ) -> Result<Option<Reminder>> {
        let lock = self.lock_for(owner);
        let _guard = lock.lock().await;
        let path = self.path_for(owner);
        let mut records = self.read_owner(&path).await?;
        let Some(slot) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        mutate(slot);
        let updated = slot.clone();
        self.write_owner(&path, &records).await?;
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reminder::{DayOfWeek, ReminderKind, Schedule, Target};
    use chrono::{NaiveTime, TimeZone, Utc};

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("nudge-store-{}", uuid::Uuid::new_v4()))
    }

    fn sample() -> Reminder {
        Reminder::new(
            Schedule::DayOfWeek {
                day: DayOfWeek::Friday,
            },
            NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
            ReminderKind::OneTime,
        )
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = scratch_dir();
        let id;
        {
            let store = JsonStore::new(&dir).unwrap();
            let saved = store.save("15551234567", vec![sample()]).await.unwrap();
            id = saved[0].id.clone();
            store
                .update_one(
                    "15551234567",
                    &id,
                    Box::new(|r| {
                        r.mark_target_sent(
                            Target::Main,
                            Utc.with_ymd_and_hms(2025, 2, 7, 16, 30, 0).unwrap(),
                        )
                    }),
                )
                .await
                .unwrap();
        }

        let reopened = JsonStore::new(&dir).unwrap();
        assert_eq!(reopened.owners().await.unwrap(), vec!["15551234567"]);
        let loaded = reopened.load("15551234567").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, id);
        assert!(loaded[0].main_reminder_status.sent);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_owner_loads_empty() {
        let dir = scratch_dir();
        let store = JsonStore::new(&dir).unwrap();
        assert!(store.load("nobody").await.unwrap().is_empty());
        assert!(store.owners().await.unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_sanitize_owner() {
        assert_eq!(sanitize_owner("15551234567"), "15551234567");
        assert_eq!(sanitize_owner("manual"), "manual");
        assert_eq!(sanitize_owner("../evil"), "___evil");
    }
}
