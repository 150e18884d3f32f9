use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{MoodRepository, SettingsRepository, StorageError, StorageResult};
use crate::models::mood::{MoodEntry, MoodValue};
use crate::models::settings::UserSettings;

/// In-process storage with the same upsert semantics as `PgStore`.
///
/// Reads and writes can be made to fail on demand, and writes are counted, so
/// callers can observe exactly how many upserts were issued.
#[derive(Clone, Default)]
pub struct MemoryStore {
    moods: Arc<Mutex<HashMap<(Uuid, NaiveDate), MoodEntry>>>,
    settings: Arc<Mutex<HashMap<Uuid, UserSettings>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful mood upserts.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn entries_for(&self, user_id: Uuid) -> Vec<MoodEntry> {
        let moods = self.moods.lock().await;
        let mut entries: Vec<_> = moods
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.mood_date);
        entries
    }

    fn check_read(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("read failure injected".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("write failure injected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MoodRepository for MemoryStore {
    async fn find_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StorageResult<Option<MoodEntry>> {
        self.check_read()?;
        Ok(self.moods.lock().await.get(&(user_id, date)).cloned())
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        mood: MoodValue,
    ) -> StorageResult<MoodEntry> {
        self.check_write()?;
        let now = Utc::now();
        let mut moods = self.moods.lock().await;
        let entry = moods
            .entry((user_id, date))
            .and_modify(|e| {
                e.mood_value = mood.get();
                e.updated_at = now;
            })
            .or_insert_with(|| MoodEntry {
                user_id,
                mood_date: date,
                mood_value: mood.get(),
                created_at: now,
                updated_at: now,
            })
            .clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(entry)
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<MoodEntry>> {
        self.check_read()?;
        let mut entries: Vec<_> = self
            .entries_for(user_id)
            .await
            .into_iter()
            .filter(|e| e.mood_date >= start && e.mood_date <= end)
            .collect();
        entries.reverse();
        Ok(entries)
    }

    async fn ping(&self) -> StorageResult<()> {
        self.check_read()
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_settings(&self, user_id: Uuid) -> StorageResult<Option<UserSettings>> {
        self.check_read()?;
        Ok(self.settings.lock().await.get(&user_id).cloned())
    }

    async fn save_settings(
        &self,
        user_id: Uuid,
        settings: &UserSettings,
    ) -> StorageResult<UserSettings> {
        self.check_write()?;
        self.settings
            .lock()
            .await
            .insert(user_id, settings.clone());
        Ok(settings.clone())
    }
}
