use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::coping::breathing::BreathingStatus;
use crate::AppState;

pub async fn get_breathing(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Json<BreathingStatus> {
    let session = state.sessions.session(auth_user.id).await;
    Json(session.breathing.status())
}

pub async fn start_breathing(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Json<BreathingStatus> {
    let session = state.sessions.session(auth_user.id).await;
    Json(session.breathing.start())
}

pub async fn stop_breathing(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Json<BreathingStatus> {
    let session = state.sessions.session(auth_user.id).await;
    Json(session.breathing.stop())
}
