use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,
    pub jwt_audience: Option<String>,

    // Companion chat
    pub chat_api_url: Option<String>,
    pub chat_timeout_secs: u64,
    pub chat_rate_limit_per_min: u32,

    pub retention_sweep_secs: u64,
    pub session_idle_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_audience: env::var("JWT_AUDIENCE").ok().filter(|s| !s.is_empty()),

            chat_api_url: env::var("CHAT_API_URL").ok().filter(|s| !s.is_empty()),
            chat_timeout_secs: env::var("CHAT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .context("CHAT_TIMEOUT_SECS must be a number")?,
            chat_rate_limit_per_min: env::var("CHAT_RATE_LIMIT_PER_MIN")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .unwrap_or(20),

            retention_sweep_secs: positive_secs(
                "RETENTION_SWEEP_SECS",
                env::var("RETENTION_SWEEP_SECS").ok(),
                3600, // hourly
            )?,
            session_idle_secs: positive_secs(
                "SESSION_IDLE_SECS",
                env::var("SESSION_IDLE_SECS").ok(),
                1800,
            )?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Extra CORS origins from `CORS_EXTRA_ORIGINS` (comma separated), e.g. LAN
    /// addresses used while testing from another device.
    pub fn extra_cors_origins() -> Vec<String> {
        env::var("CORS_EXTRA_ORIGINS")
            .map(|extra| {
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Period setting in seconds; must be non-zero since it drives an interval.
fn positive_secs(name: &str, raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    let secs = match raw {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a number", name))?,
        None => default,
    };
    anyhow::ensure!(secs > 0, "{} must be greater than zero", name);
    Ok(secs)
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret-that-is-long-enough".into(),
            jwt_audience: None,
            chat_api_url: None,
            chat_timeout_secs: 5,
            chat_rate_limit_per_min: 3,
            retention_sweep_secs: 3600,
            session_idle_secs: 1800,
        }
    }
}
