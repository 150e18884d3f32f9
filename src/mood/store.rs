use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::clock::Clock;
use super::theme::ThemeSynchronizer;
use crate::db::{MoodRepository, StorageError};
use crate::models::mood::{MoodEntry, MoodValue};
use crate::models::theme::ThemeTag;

#[derive(Debug, thiserror::Error)]
pub enum MoodError {
    #[error("mood value {0} is outside 1..=5")]
    InvalidMood(i32),

    #[error("no signed-in identity")]
    Unauthenticated,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default)]
struct StoreState {
    identity: Option<Uuid>,
    today_mood: Option<MoodValue>,
}

/// Today's mood for the signed-in identity.
///
/// The only writer of mood entries. Every successful load or save pushes the
/// derived theme into the [`ThemeSynchronizer`]; failures leave both the
/// in-memory mood and the theme at their last-known-good values.
pub struct DailyMoodStore {
    repo: Arc<dyn MoodRepository>,
    theme: ThemeSynchronizer,
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState>,
}

impl DailyMoodStore {
    pub fn new(
        repo: Arc<dyn MoodRepository>,
        theme: ThemeSynchronizer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            theme,
            clock,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub async fn identity(&self) -> Option<Uuid> {
        self.state.read().await.identity
    }

    pub async fn today_mood(&self) -> Option<MoodValue> {
        self.state.read().await.today_mood
    }

    pub fn theme(&self) -> &ThemeSynchronizer {
        &self.theme
    }

    /// Identity became authenticated. Switching identity drops the previous
    /// identity's mood.
    pub async fn sign_in(&self, user_id: Uuid) {
        let mut state = self.state.write().await;
        if state.identity != Some(user_id) {
            state.identity = Some(user_id);
            state.today_mood = None;
            self.theme.reset();
        }
    }

    /// Identity became unauthenticated: forget the mood, theme back to default.
    pub async fn sign_out(&self) {
        let mut state = self.state.write().await;
        if let Some(user_id) = state.identity.take() {
            tracing::debug!(user_id = %user_id, "Mood store signed out");
        }
        state.today_mood = None;
        self.theme.reset();
    }

    /// Fetch today's entry. No entry is not an error: mood becomes `None`
    /// and the theme `default`.
    pub async fn load_today(&self) -> Result<Option<MoodValue>, MoodError> {
        let Some(user_id) = self.identity().await else {
            self.sign_out().await;
            return Ok(None);
        };
        let today = self.clock.today();

        let entry = self
            .repo
            .find_for_date(user_id, today)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Error loading mood");
                e
            })?;
        let mood = entry.as_ref().and_then(MoodEntry::mood);

        self.apply(user_id, mood).await;
        Ok(mood)
    }

    /// Upsert today's entry for the signed-in identity.
    pub async fn save(&self, mood_value: i32) -> Result<MoodEntry, MoodError> {
        let mood = MoodValue::try_from(mood_value).map_err(MoodError::InvalidMood)?;
        let user_id = self.identity().await.ok_or(MoodError::Unauthenticated)?;
        let today = self.clock.today();

        let entry = self
            .repo
            .upsert(user_id, today, mood)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Error saving mood");
                e
            })?;

        tracing::debug!(user_id = %user_id, mood = %mood, date = %today, "Mood saved");
        self.apply(user_id, Some(mood)).await;
        Ok(entry)
    }

    async fn apply(&self, user_id: Uuid, mood: Option<MoodValue>) {
        let mut state = self.state.write().await;
        // Signed out (or switched identity) while the request was in flight.
        if state.identity != Some(user_id) {
            return;
        }
        state.today_mood = mood;
        self.theme.set_theme(ThemeTag::from_raw(mood.map(i32::from)));
    }
}
