//! AI companion chat: proxy to the remote chat endpoint with a local fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REPLY: &str = "I'm here to listen and support you.";
pub const FALLBACK_REPLY: &str =
    "Sorry, something went wrong with EmotionSync AI. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat endpoint not configured")]
    NotConfigured,

    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat endpoint returned {0}")]
    Status(u16),
}

#[async_trait]
pub trait ChatClient: Send + Sync + 'static {
    /// Reply text from the upstream model, `None` if it sent no reply.
    async fn reply(&self, message: &str) -> Result<Option<String>, ChatError>;
}

#[derive(Debug, Serialize)]
struct UpstreamRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    reply: Option<String>,
}

/// `POST {url}` with `{"message": ...}`, expecting `{"reply": ...}`.
pub struct HttpChatClient {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpChatClient {
    pub fn new(url: Option<String>, timeout_secs: u64) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn reply(&self, message: &str) -> Result<Option<String>, ChatError> {
        let url = self.url.as_deref().ok_or(ChatError::NotConfigured)?;

        let response = self
            .client
            .post(url)
            .json(&UpstreamRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Status(response.status().as_u16()));
        }

        let body: UpstreamResponse = response.json().await?;
        Ok(body.reply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Calm,
    Anxious,
    Sad,
    Happy,
    Angry,
}

const EMOTION_KEYWORDS: [(Emotion, [&str; 3]); 4] = [
    (Emotion::Anxious, ["anxious", "worried", "nervous"]),
    (Emotion::Sad, ["sad", "depressed", "down"]),
    (Emotion::Angry, ["angry", "frustrated", "mad"]),
    (Emotion::Happy, ["happy", "excited", "great"]),
];

/// Keyword match, first listed emotion wins; `Calm` when nothing matches.
pub fn detect_emotion(text: &str) -> Emotion {
    let lower = text.to_lowercase();
    EMOTION_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(emotion, _)| *emotion)
        .unwrap_or(Emotion::Calm)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Companion,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanionReply {
    pub reply: String,
    pub source: ReplySource,
    pub user_emotion: Emotion,
    pub reply_emotion: Emotion,
}

/// Ask the upstream model; any failure degrades to the fallback reply.
pub async fn respond(client: &dyn ChatClient, message: &str) -> CompanionReply {
    let user_emotion = detect_emotion(message);

    let (reply, source) = match client.reply(message).await {
        Ok(Some(reply)) if !reply.trim().is_empty() => (reply, ReplySource::Companion),
        Ok(_) => (DEFAULT_REPLY.to_string(), ReplySource::Companion),
        Err(e) => {
            tracing::warn!(error = %e, "Chat endpoint unavailable, using fallback reply");
            (FALLBACK_REPLY.to_string(), ReplySource::Fallback)
        }
    };

    CompanionReply {
        reply,
        source,
        user_emotion,
        reply_emotion: Emotion::Calm,
    }
}
