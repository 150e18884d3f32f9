use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A validated mood score: 1 (struggling) through 5 (great).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct MoodValue(u8);

impl MoodValue {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn get(self) -> i32 {
        i32::from(self.0)
    }

    pub fn label(self) -> &'static str {
        mood_label(f64::from(self.0))
    }

    /// Every valid value, best first (the order the picker shows them).
    pub fn all() -> impl Iterator<Item = MoodValue> {
        (Self::MIN..=Self::MAX).rev().map(|v| MoodValue(v as u8))
    }
}

impl TryFrom<i32> for MoodValue {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(MoodValue(value as u8))
        } else {
            Err(value)
        }
    }
}

impl From<MoodValue> for i32 {
    fn from(value: MoodValue) -> Self {
        value.get()
    }
}

impl std::fmt::Display for MoodValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display label for a mood score or an average of scores.
pub fn mood_label(value: f64) -> &'static str {
    if value >= 5.0 {
        "Great"
    } else if value >= 4.0 {
        "Good"
    } else if value >= 3.0 {
        "Okay"
    } else if value >= 2.0 {
        "Low"
    } else {
        "Struggling"
    }
}

/// One user's mood for one calendar day. Unique on (user_id, mood_date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MoodEntry {
    pub user_id: Uuid,
    pub mood_date: NaiveDate,
    pub mood_value: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MoodEntry {
    pub fn mood(&self) -> Option<MoodValue> {
        MoodValue::try_from(self.mood_value).ok()
    }
}
