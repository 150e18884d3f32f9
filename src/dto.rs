//! # EmotionSync: Request/Response DTOs
//!
//! API contract types shared by the handlers.
//!
//! Conventions:
//! - `*Request` / `*Query` → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Field validation via `validator` derive macros; mood range is checked by
//!   the mood store itself so every caller gets the same rule

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::mood::MoodValue;
use crate::models::theme::ThemeTag;

// ============================================================================
// Common
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Moods
// ============================================================================

/// PUT /api/moods/today
#[derive(Debug, Deserialize)]
pub struct SaveMoodRequest {
    pub mood_value: i32,
}

/// GET|PUT /api/moods/today
#[derive(Debug, Serialize)]
pub struct TodayMoodResponse {
    pub mood_date: NaiveDate,
    pub mood_value: Option<i32>,
    pub label: Option<&'static str>,
    pub theme: ThemeTag,
}

impl TodayMoodResponse {
    pub fn new(mood_date: NaiveDate, mood: Option<MoodValue>, theme: ThemeTag) -> Self {
        Self {
            mood_date,
            mood_value: mood.map(MoodValue::get),
            label: mood.map(MoodValue::label),
            theme,
        }
    }
}

/// GET /api/moods
#[derive(Debug, Deserialize)]
pub struct MoodHistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// GET /api/moods/trend
#[derive(Debug, Deserialize, Validate)]
pub struct MoodTrendQuery {
    #[validate(range(min = 1, max = 90, message = "days must be 1-90"))]
    pub days: Option<u32>,
}

/// GET /api/theme
#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub theme: ThemeTag,
}

// ============================================================================
// Coping
// ============================================================================

/// GET /api/coping/affirmations
#[derive(Debug, Deserialize)]
pub struct AffirmationQuery {
    pub index: Option<i64>,
}

/// GET /api/coping/inspiration
#[derive(Debug, Serialize)]
pub struct InspirationResponse {
    pub date: NaiveDate,
    pub message: &'static str,
}

/// GET /api/coping/journal-prompts
#[derive(Debug, Serialize)]
pub struct JournalPromptsResponse {
    pub prompts: Vec<&'static str>,
}

// ============================================================================
// Companion
// ============================================================================

/// POST /api/companion/chat
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
}
