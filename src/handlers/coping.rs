use axum::{
    extract::{Query, State},
    Json,
};

use crate::coping::affirmations::{affirmation, daily_inspiration, journal_prompts, Affirmation};
use crate::dto::{AffirmationQuery, InspirationResponse, JournalPromptsResponse};
use crate::AppState;

pub async fn get_affirmation(Query(query): Query<AffirmationQuery>) -> Json<Affirmation> {
    Json(affirmation(query.index.unwrap_or(0)))
}

pub async fn get_inspiration(State(state): State<AppState>) -> Json<InspirationResponse> {
    let date = state.sessions.clock().today();
    Json(InspirationResponse {
        date,
        message: daily_inspiration(date),
    })
}

pub async fn get_journal_prompts() -> Json<JournalPromptsResponse> {
    Json(JournalPromptsResponse {
        prompts: journal_prompts(),
    })
}
