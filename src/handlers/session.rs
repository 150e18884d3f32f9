use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::dto::MessageResponse;
use crate::AppState;

/// Sign-out event from the identity provider's client.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Json<MessageResponse> {
    let had_session = state.sessions.sign_out(auth_user.id).await;
    if !had_session {
        tracing::debug!(user_id = %auth_user.id, "Sign-out without active session");
    }
    Json(MessageResponse {
        message: "Signed out".into(),
    })
}
