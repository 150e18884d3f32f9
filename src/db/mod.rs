use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::mood::{MoodEntry, MoodValue};
use crate::models::settings::UserSettings;

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod retention;

pub use memory::MemoryStore;
pub use pool::create_pool;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Row store for daily moods, keyed by (user, date).
#[async_trait]
pub trait MoodRepository: Send + Sync + 'static {
    /// At most one entry for the user on `date`.
    async fn find_for_date(&self, user_id: Uuid, date: NaiveDate)
        -> StorageResult<Option<MoodEntry>>;

    /// Insert, or overwrite the existing entry for (user, date).
    async fn upsert(&self, user_id: Uuid, date: NaiveDate, mood: MoodValue)
        -> StorageResult<MoodEntry>;

    /// Entries with `start <= mood_date <= end`, newest first.
    async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<MoodEntry>>;

    async fn ping(&self) -> StorageResult<()>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync + 'static {
    async fn get_settings(&self, user_id: Uuid) -> StorageResult<Option<UserSettings>>;

    async fn save_settings(&self, user_id: Uuid, settings: &UserSettings)
        -> StorageResult<UserSettings>;
}
