use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::settings::{SettingsPatch, UserSettings};
use crate::AppState;

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserSettings>> {
    let settings = state
        .settings
        .get_settings(auth_user.id)
        .await?
        .unwrap_or_default();
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(patch): Json<SettingsPatch>,
) -> AppResult<Json<UserSettings>> {
    let current = state
        .settings
        .get_settings(auth_user.id)
        .await?
        .unwrap_or_default();

    let saved = state
        .settings
        .save_settings(auth_user.id, &current.apply(patch))
        .await?;

    tracing::info!(user_id = %auth_user.id, "Settings updated");
    Ok(Json(saved))
}
