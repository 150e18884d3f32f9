use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Duration;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{
    MoodHistoryQuery, MoodTrendQuery, SaveMoodRequest, ThemeResponse, TodayMoodResponse,
};
use crate::error::{AppError, AppResult};
use crate::models::mood::MoodEntry;
use crate::mood::trend::{mood_trend, window_start, MoodTrend};
use crate::AppState;

const DEFAULT_HISTORY_DAYS: i64 = 30;
const MAX_HISTORY_DAYS: i64 = 366;
const DEFAULT_TREND_DAYS: u32 = 7;

pub async fn get_today(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<TodayMoodResponse>> {
    let session = state.sessions.session(auth_user.id).await;
    let mood = session.mood.load_today().await?;

    Ok(Json(TodayMoodResponse::new(
        state.sessions.clock().today(),
        mood,
        session.theme.current(),
    )))
}

pub async fn save_today(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<SaveMoodRequest>,
) -> AppResult<Json<TodayMoodResponse>> {
    let session = state.sessions.session(auth_user.id).await;
    let entry = session.mood.save(body.mood_value).await?;

    Ok(Json(TodayMoodResponse::new(
        entry.mood_date,
        entry.mood(),
        session.theme.current(),
    )))
}

pub async fn list_moods(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MoodHistoryQuery>,
) -> AppResult<Json<Vec<MoodEntry>>> {
    let today = state.sessions.clock().today();
    let end = query.end_date.unwrap_or(today);
    let start = match query.start_date {
        Some(start) => start,
        None => end
            .checked_sub_signed(Duration::days(DEFAULT_HISTORY_DAYS))
            .ok_or_else(|| AppError::Validation("end_date is out of range".into()))?,
    };

    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }
    if end.signed_duration_since(start).num_days() > MAX_HISTORY_DAYS {
        return Err(AppError::Validation(format!(
            "date range must not exceed {} days",
            MAX_HISTORY_DAYS
        )));
    }

    let entries = state.moods.list_range(auth_user.id, start, end).await?;
    Ok(Json(entries))
}

pub async fn get_trend(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MoodTrendQuery>,
) -> AppResult<Json<MoodTrend>> {
    query.validate()?;
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);
    let end = state.sessions.clock().today();

    let entries = state
        .moods
        .list_range(auth_user.id, window_start(end, days), end)
        .await?;

    Ok(Json(mood_trend(&entries, end, days)))
}

pub async fn get_theme(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Json<ThemeResponse> {
    let session = state.sessions.session(auth_user.id).await;
    Json(ThemeResponse {
        theme: session.theme.current(),
    })
}
