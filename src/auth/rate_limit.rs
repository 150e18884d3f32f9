use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::AppState;

const CHAT_WINDOW_SECS: u64 = 60;

/// In-memory fixed-window rate limit state (single-instance deployments).
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ok(remaining) when allowed, Err(retry_after) when limited.
    pub async fn check_with_limits(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= max_requests {
            let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    /// Drop entries whose window ended more than one window ago.
    pub async fn cleanup(&self, window_secs: u64) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let keep_for = Duration::from_secs(window_secs * 2);

        entries.retain(|_, entry| now.duration_since(entry.window_start) < keep_for);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Start the background task that evicts stale limiter entries.
pub fn spawn_rate_limit_cleanup(limiter: RateLimitState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CHAT_WINDOW_SECS * 5));
        loop {
            interval.tick().await;
            limiter.cleanup(CHAT_WINDOW_SECS).await;
        }
    });
}

/// Per-user limit on companion chat (each call may hit the remote model).
/// Must run inside `require_auth`.
pub async fn rate_limit_chat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("chat:{}", auth_user.id);
    let max = state.config.chat_rate_limit_per_min;

    match state
        .rate_limiter
        .check_with_limits(&key, max, CHAT_WINDOW_SECS)
        .await
    {
        Ok(remaining) => {
            tracing::debug!(user_id = %auth_user.id, remaining = remaining, "Chat rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                user_id = %auth_user.id,
                retry_after_secs = retry_after.as_secs(),
                "Chat rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}
