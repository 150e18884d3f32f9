//! Router-level tests: real handlers and middleware over in-process storage.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::jwt::issue_access_token;
use crate::auth::rate_limit::RateLimitState;
use crate::companion::tests::MockChatClient;
use crate::config::Config;
use crate::coping::scheduler::ManualScheduler;
use crate::db::{MemoryStore, MoodRepository};
use crate::models::mood::MoodValue;
use crate::mood::clock::FixedClock;
use crate::mood::session::SessionRegistry;
use crate::{build_router, AppState};

struct TestApp {
    router: Router,
    store: MemoryStore,
    scheduler: ManualScheduler,
    state: AppState,
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

fn test_app_with_chat(chat: MockChatClient) -> TestApp {
    let store = MemoryStore::new();
    let scheduler = ManualScheduler::new();
    let (events_tx, _) = broadcast::channel(64);

    let state = AppState {
        config: Arc::new(Config::for_tests()),
        moods: Arc::new(store.clone()),
        settings: Arc::new(store.clone()),
        sessions: SessionRegistry::new(
            Arc::new(store.clone()),
            Arc::new(scheduler.clone()),
            Arc::new(FixedClock(today())),
            events_tx,
        ),
        chat: Arc::new(chat),
        rate_limiter: RateLimitState::new(),
    };

    TestApp {
        router: build_router(state.clone()),
        store,
        scheduler,
        state,
    }
}

fn test_app() -> TestApp {
    test_app_with_chat(MockChatClient::replying("I'm listening."))
}

fn token_for(user: Uuid) -> String {
    issue_access_token(user, Some("user@example.com"), 3600, &Config::for_tests()).unwrap()
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

// ── health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "emotionsync-api");

    let (status, _) = app.send(Method::GET, "/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);

    app.store.set_fail_reads(true);
    let (status, body) = app.send(Method::GET, "/readyz", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["database"], "failed");
}

// ── auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app();
    let (status, body) = app.send(Method::GET, "/api/moods/today", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 401);

    let (status, _) = app
        .send(Method::GET, "/api/moods/today", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── daily mood & theme ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_mood_page_scenario() {
    let app = test_app();
    let user = Uuid::new_v4();
    let token = token_for(user);

    // No entry yet today.
    let (status, body) = app
        .send(Method::GET, "/api/moods/today", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["mood_value"].is_null());
    assert_eq!(body["theme"], "default");
    assert_eq!(body["mood_date"], "2026-10-16");

    // Select "Good".
    let (status, body) = app
        .send(
            Method::PUT,
            "/api/moods/today",
            Some(&token),
            Some(json!({ "mood_value": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mood_value"], 4);
    assert_eq!(body["label"], "Good");
    assert_eq!(body["theme"], "good");
    assert_eq!(app.store.write_count(), 1);

    // Reload: theme re-derived without another write.
    app.state.sessions.sign_out(user).await;
    let (_, body) = app
        .send(Method::GET, "/api/moods/today", Some(&token), None)
        .await;
    assert_eq!(body["mood_value"], 4);
    assert_eq!(body["theme"], "good");
    assert_eq!(app.store.write_count(), 1);

    let (_, body) = app.send(Method::GET, "/api/theme", Some(&token), None).await;
    assert_eq!(body["theme"], "good");
}

#[tokio::test]
async fn test_save_twice_same_day_keeps_one_entry() {
    let app = test_app();
    let user = Uuid::new_v4();
    let token = token_for(user);

    for v in [2, 5] {
        app.send(
            Method::PUT,
            "/api/moods/today",
            Some(&token),
            Some(json!({ "mood_value": v })),
        )
        .await;
    }

    let entries = app.store.entries_for(user).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mood_value, 5);

    let (_, body) = app.send(Method::GET, "/api/theme", Some(&token), None).await;
    assert_eq!(body["theme"], "great");
}

#[tokio::test]
async fn test_invalid_mood_is_rejected_without_write() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    for bad in [0, 6, 100] {
        let (status, body) = app
            .send(
                Method::PUT,
                "/api/moods/today",
                Some(&token),
                Some(json!({ "mood_value": bad })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], 422);
    }
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_storage_failure_surfaces_and_keeps_theme() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    app.send(
        Method::PUT,
        "/api/moods/today",
        Some(&token),
        Some(json!({ "mood_value": 3 })),
    )
    .await;

    app.store.set_fail_writes(true);
    let (status, body) = app
        .send(
            Method::PUT,
            "/api/moods/today",
            Some(&token),
            Some(json!({ "mood_value": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Internal server error");

    let (_, body) = app.send(Method::GET, "/api/theme", Some(&token), None).await;
    assert_eq!(body["theme"], "okay");
}

#[tokio::test]
async fn test_sign_out_resets_theme() {
    let app = test_app();
    let user = Uuid::new_v4();
    let token = token_for(user);

    app.send(
        Method::PUT,
        "/api/moods/today",
        Some(&token),
        Some(json!({ "mood_value": 1 })),
    )
    .await;
    let session = app.state.sessions.get(user).await.unwrap();
    assert_eq!(session.theme.current().as_str(), "struggling");

    let (status, _) = app
        .send(Method::POST, "/api/session/sign-out", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session.theme.current().as_str(), "default");
    assert!(app.state.sessions.get(user).await.is_none());
}

#[tokio::test]
async fn test_history_and_trend() {
    let app = test_app();
    let user = Uuid::new_v4();
    let token = token_for(user);

    for (offset, mood) in [(0, 4), (1, 2), (3, 5), (40, 1)] {
        app.store
            .upsert(
                user,
                today() - chrono::Duration::days(offset),
                MoodValue::try_from(mood).unwrap(),
            )
            .await
            .unwrap();
    }

    let (status, body) = app.send(Method::GET, "/api/moods", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["mood_date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, ["2026-10-16", "2026-10-15", "2026-10-13"]);

    let (status, body) = app
        .send(Method::GET, "/api/moods/trend?days=7", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points"].as_array().unwrap().len(), 7);
    assert_eq!(body["recorded_days"], 3);
    assert_eq!(body["average"], 3.7);
    assert_eq!(body["average_label"], "Okay");

    let (status, _) = app
        .send(Method::GET, "/api/moods/trend?days=0", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(
            Method::GET,
            "/api/moods?start_date=2026-10-16&end_date=2026-10-01",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_history_rejects_extreme_ranges() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    // Default window would start before the earliest representable date.
    let (status, body) = app
        .send(
            Method::GET,
            "/api/moods?end_date=-262143-01-01",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], 422);

    let (status, _) = app
        .send(
            Method::GET,
            "/api/moods?start_date=2020-01-01&end_date=2026-10-16",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(
            Method::GET,
            "/api/moods?start_date=2025-10-16&end_date=2026-10-16",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

// ── breathing ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_breathing_start_tick_stop() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    let (_, body) = app
        .send(Method::GET, "/api/breathing", Some(&token), None)
        .await;
    assert_eq!(body["active"], false);
    assert_eq!(body["cue"], "Ready?");

    let (_, body) = app
        .send(Method::POST, "/api/breathing/start", Some(&token), None)
        .await;
    assert_eq!(body["active"], true);
    assert_eq!(body["phase"], "inhale");
    assert_eq!(body["seconds_remaining"], 4);

    app.scheduler.advance(Duration::from_secs(4));
    let (_, body) = app
        .send(Method::GET, "/api/breathing", Some(&token), None)
        .await;
    assert_eq!(body["phase"], "hold");
    assert_eq!(body["seconds_remaining"], 4);

    // Second start is a no-op.
    app.send(Method::POST, "/api/breathing/start", Some(&token), None)
        .await;
    assert_eq!(app.scheduler.active_count(), 1);

    let (_, body) = app
        .send(Method::POST, "/api/breathing/stop", Some(&token), None)
        .await;
    assert_eq!(body["active"], false);
    assert_eq!(body["phase"], "inhale");
    assert_eq!(body["seconds_remaining"], 4);
    assert_eq!(app.scheduler.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_breathing_session_is_released() {
    let app = test_app();
    let user = Uuid::new_v4();
    let token = token_for(user);

    app.send(Method::POST, "/api/breathing/start", Some(&token), None)
        .await;
    assert_eq!(app.scheduler.active_count(), 1);

    // Client goes away without signing out.
    tokio::time::advance(Duration::from_secs(3600)).await;
    app.scheduler.advance(Duration::from_secs(3600));

    let idle = Duration::from_secs(app.state.config.session_idle_secs);
    assert_eq!(app.state.sessions.evict_idle(idle).await, 1);
    assert!(app.state.sessions.is_empty().await);
    assert_eq!(app.scheduler.active_count(), 0);

    // Coming back starts a fresh idle session.
    let (_, body) = app
        .send(Method::GET, "/api/breathing", Some(&token), None)
        .await;
    assert_eq!(body["active"], false);
}

// ── coping content ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_affirmations_wrap() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    let (_, body) = app
        .send(Method::GET, "/api/coping/affirmations?index=7", Some(&token), None)
        .await;
    assert_eq!(body["index"], 7);
    assert_eq!(body["next"], 0);
    assert_eq!(body["total"], 8);

    let (_, body) = app
        .send(Method::GET, "/api/coping/inspiration", Some(&token), None)
        .await;
    assert_eq!(body["date"], "2026-10-16");
    assert!(body["message"].as_str().is_some());

    let (status, body) = app
        .send(Method::GET, "/api/coping/journal-prompts", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompts"].as_array().unwrap().len(), 4);
    assert_eq!(
        body["prompts"][1],
        "What are three things I'm grateful for today?"
    );
}

// ── companion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_reply_and_emotion() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/companion/chat",
            Some(&token),
            Some(json!({ "message": "I'm really worried about work" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "I'm listening.");
    assert_eq!(body["source"], "companion");
    assert_eq!(body["user_emotion"], "anxious");
}

#[tokio::test]
async fn test_chat_fallback_on_upstream_failure() {
    let app = test_app_with_chat(MockChatClient::failing());
    let token = token_for(Uuid::new_v4());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/companion/chat",
            Some(&token),
            Some(json!({ "message": "hello" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
}

#[tokio::test]
async fn test_chat_rejects_blank_and_rate_limits() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/companion/chat",
            Some(&token),
            Some(json!({ "message": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Test config allows 3 per minute; the blank message above used one.
    for _ in 0..2 {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/companion/chat",
                Some(&token),
                Some(json!({ "message": "hi" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app
        .send(
            Method::POST,
            "/api/companion/chat",
            Some(&token),
            Some(json!({ "message": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

// ── settings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_settings_defaults_and_partial_update() {
    let app = test_app();
    let token = token_for(Uuid::new_v4());

    let (status, body) = app
        .send(Method::GET, "/api/settings", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["privacy"]["data_retention"], "1year");
    assert_eq!(body["notifications"]["daily_reminders"], true);

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/settings",
            Some(&token),
            Some(json!({ "privacy": { "share_with_therapist": true } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["privacy"]["share_with_therapist"], true);
    assert_eq!(body["privacy"]["anonymous_data"], true);

    let (_, body) = app
        .send(Method::GET, "/api/settings", Some(&token), None)
        .await;
    assert_eq!(body["privacy"]["share_with_therapist"], true);

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/settings",
            Some(&token),
            Some(json!({ "privacy": { "data_retention": "forever" } })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
