use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::models::theme::ThemeTag;
use crate::mood::session::{MoodSession, ServerEvent};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    // Browsers cannot set headers on the upgrade request; token comes as a query param.
    let user_id = match authenticate_ws(&state, query.token.as_deref()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("WebSocket auth failed: {}", e);
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

fn authenticate_ws(state: &AppState, token: Option<&str>) -> Result<Uuid, &'static str> {
    let token = token.ok_or("Missing token query parameter")?;

    let token_data = verify_token(token, &state.config).map_err(|_| "Invalid or expired token")?;

    Ok(token_data.claims.sub)
}

/// Whether a broadcast payload is meant for `user_id`. Messages without a
/// `user_id` field go to everyone.
fn is_for_user(payload: &str, user_id: Uuid) -> bool {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| v.get("user_id").and_then(|u| u.as_str()).map(String::from))
        .map_or(true, |target| target == user_id.to_string())
}

/// First frames on a new socket: current theme, then breathing status.
fn greeting(session: &MoodSession) -> [String; 2] {
    [
        ServerEvent::Theme {
            theme: session.theme.current(),
        }
        .to_json(),
        ServerEvent::Breathing {
            user_id: session.user_id,
            status: session.breathing.status(),
        }
        .to_json(),
    ]
}

/// Next frame for `user_id`'s socket, `None` once the session is gone.
async fn next_payload(
    theme_rx: &mut watch::Receiver<ThemeTag>,
    events_rx: &mut broadcast::Receiver<String>,
    user_id: Uuid,
) -> Option<String> {
    loop {
        tokio::select! {
            changed = theme_rx.changed() => {
                // Sender gone: the identity signed out or was evicted.
                if changed.is_err() {
                    return None;
                }
                let theme = *theme_rx.borrow_and_update();
                return Some(ServerEvent::Theme { theme }.to_json());
            }
            event = events_rx.recv() => match event {
                Ok(payload) if is_for_user(&payload, user_id) => return Some(payload),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(user_id = %user_id, skipped = skipped, "WebSocket client lagging");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            },
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let session = state.sessions.session(user_id).await;
    let connection = session.connect();
    let mut theme_rx = session.theme.subscribe();
    theme_rx.borrow_and_update();
    let mut events_rx = state.sessions.events().subscribe();
    let greeting = greeting(&session);
    // The session is looked up again on reconnect; don't pin it to this socket.
    drop(session);

    let mut send_task = tokio::spawn(async move {
        for payload in greeting {
            if sender.send(Message::Text(payload)).await.is_err() {
                return;
            }
        }

        while let Some(payload) = next_payload(&mut theme_rx, &mut events_rx, user_id).await {
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    tracing::debug!(user_id = %user_id, message = %text, "WebSocket message received");
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    drop(connection);
    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}
