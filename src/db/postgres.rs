use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{MoodRepository, SettingsRepository, StorageResult};
use crate::models::mood::{MoodEntry, MoodValue};
use crate::models::settings::UserSettings;

/// Postgres-backed storage for moods and settings.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MoodRepository for PgStore {
    async fn find_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StorageResult<Option<MoodEntry>> {
        let entry = sqlx::query_as::<_, MoodEntry>(
            r#"
            SELECT user_id, mood_date, mood_value, created_at, updated_at
            FROM daily_moods
            WHERE user_id = $1 AND mood_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        Ok(entry)
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        mood: MoodValue,
    ) -> StorageResult<MoodEntry> {
        let entry = sqlx::query_as::<_, MoodEntry>(
            r#"
            INSERT INTO daily_moods (user_id, mood_date, mood_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, mood_date) DO UPDATE SET
                mood_value = EXCLUDED.mood_value,
                updated_at = NOW()
            RETURNING user_id, mood_date, mood_value, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(mood.get())
        .fetch_one(&self.db)
        .await?;

        Ok(entry)
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<MoodEntry>> {
        let entries = sqlx::query_as::<_, MoodEntry>(
            r#"
            SELECT user_id, mood_date, mood_value, created_at, updated_at
            FROM daily_moods
            WHERE user_id = $1 AND mood_date BETWEEN $2 AND $3
            ORDER BY mood_date DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for PgStore {
    async fn get_settings(&self, user_id: Uuid) -> StorageResult<Option<UserSettings>> {
        let settings = sqlx::query_as::<_, UserSettings>(
            r#"
            SELECT daily_reminders, mood_alerts, weekly_reports, emergency_contacts,
                   share_with_therapist, anonymous_data, data_retention
            FROM user_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(settings)
    }

    async fn save_settings(
        &self,
        user_id: Uuid,
        settings: &UserSettings,
    ) -> StorageResult<UserSettings> {
        let n = &settings.notifications;
        let p = &settings.privacy;

        let saved = sqlx::query_as::<_, UserSettings>(
            r#"
            INSERT INTO user_settings (
                user_id, daily_reminders, mood_alerts, weekly_reports, emergency_contacts,
                share_with_therapist, anonymous_data, data_retention
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                daily_reminders = EXCLUDED.daily_reminders,
                mood_alerts = EXCLUDED.mood_alerts,
                weekly_reports = EXCLUDED.weekly_reports,
                emergency_contacts = EXCLUDED.emergency_contacts,
                share_with_therapist = EXCLUDED.share_with_therapist,
                anonymous_data = EXCLUDED.anonymous_data,
                data_retention = EXCLUDED.data_retention,
                updated_at = NOW()
            RETURNING daily_reminders, mood_alerts, weekly_reports, emergency_contacts,
                      share_with_therapist, anonymous_data, data_retention
            "#,
        )
        .bind(user_id)
        .bind(n.daily_reminders)
        .bind(n.mood_alerts)
        .bind(n.weekly_reports)
        .bind(n.emergency_contacts)
        .bind(p.share_with_therapist)
        .bind(p.anonymous_data)
        .bind(p.data_retention)
        .fetch_one(&self.db)
        .await?;

        Ok(saved)
    }
}
