use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;

use emotionsync_api::{
    auth::rate_limit::{spawn_rate_limit_cleanup, RateLimitState},
    build_router,
    companion::HttpChatClient,
    config::Config,
    coping::scheduler::TokioScheduler,
    db::{self, retention::spawn_retention_worker, PgStore},
    mood::{
        clock::SystemClock,
        session::{spawn_session_sweeper, SessionRegistry},
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emotionsync_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    // Database
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool.clone()));

    // WebSocket broadcast channel
    let (events_tx, _) = broadcast::channel::<String>(256);

    let sessions = SessionRegistry::new(
        store.clone(),
        Arc::new(TokioScheduler::current()),
        Arc::new(SystemClock),
        events_tx,
    );

    let chat = HttpChatClient::new(config.chat_api_url.clone(), config.chat_timeout_secs)
        .context("Failed to build chat client")?;
    if config.chat_api_url.is_none() {
        tracing::warn!("CHAT_API_URL not set; companion chat will answer with the fallback reply");
    }

    let rate_limiter = RateLimitState::new();

    let state = AppState {
        config: config.clone(),
        moods: store.clone(),
        settings: store,
        sessions: sessions.clone(),
        chat: Arc::new(chat),
        rate_limiter: rate_limiter.clone(),
    };

    spawn_retention_worker(pool, config.retention_sweep_secs);
    spawn_rate_limit_cleanup(rate_limiter);
    spawn_session_sweeper(sessions, config.session_idle_secs);

    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
