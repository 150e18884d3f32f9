use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod companion;
pub mod config;
pub mod coping;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod mood;

#[cfg(test)]
mod api_tests;

use auth::rate_limit::RateLimitState;
use companion::ChatClient;
use config::Config;
use db::{MoodRepository, SettingsRepository};
use mood::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub moods: Arc<dyn MoodRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub sessions: SessionRegistry,
    pub chat: Arc<dyn ChatClient>,
    pub rate_limiter: RateLimitState,
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler));

    let chat_routes = Router::new()
        .route("/api/companion/chat", post(handlers::companion::chat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_chat,
        ));

    let protected_routes = Router::new()
        // Daily mood
        .route(
            "/api/moods/today",
            get(handlers::moods::get_today).put(handlers::moods::save_today),
        )
        .route("/api/moods", get(handlers::moods::list_moods))
        .route("/api/moods/trend", get(handlers::moods::get_trend))
        .route("/api/theme", get(handlers::moods::get_theme))
        // Identity lifecycle
        .route("/api/session/sign-out", post(handlers::session::sign_out))
        // Breathing
        .route("/api/breathing", get(handlers::breathing::get_breathing))
        .route(
            "/api/breathing/start",
            post(handlers::breathing::start_breathing),
        )
        .route(
            "/api/breathing/stop",
            post(handlers::breathing::stop_breathing),
        )
        // Coping content
        .route(
            "/api/coping/affirmations",
            get(handlers::coping::get_affirmation),
        )
        .route(
            "/api/coping/inspiration",
            get(handlers::coping::get_inspiration),
        )
        .route(
            "/api/coping/journal-prompts",
            get(handlers::coping::get_journal_prompts),
        )
        // Settings
        .route(
            "/api/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .merge(chat_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(config.frontend_url.clone())
        .chain(Config::extra_cors_origins())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
