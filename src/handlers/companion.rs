use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::companion::{respond, CompanionReply};
use crate::dto::ChatRequest;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub async fn chat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<CompanionReply>> {
    body.validate()?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("Message must not be blank".into()));
    }

    let reply = respond(state.chat.as_ref(), message).await;
    tracing::debug!(
        user_id = %auth_user.id,
        source = ?reply.source,
        emotion = ?reply.user_emotion,
        "Companion replied"
    );
    Ok(Json(reply))
}
