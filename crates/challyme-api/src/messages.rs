use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::debug;

use challyme_core::challenge;
use challyme_db::queries;
use challyme_types::api::{Ack, ChallengeQuery, Claims, SendChallengeMessageRequest};
use challyme_types::models::ChallengeMessage;

use crate::{
    AppState, blocking,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    middleware::ensure_actor,
};

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendChallengeMessageRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let challenge_id = req.challenge_id;
    blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let mut c = queries::load_challenge(tx, req.challenge_id)?
                .ok_or_else(ApiError::challenge_not_found)?;
            challenge::post_message(&mut c, &req.username, &req.content, Utc::now())?;
            queries::save_challenge(tx, &c)?;
            Ok(())
        })
    })
    .await?;

    debug!("{} posted in challenge {}", claims.username, challenge_id);
    Ok(Json(Ack::new("Message sent")))
}

/// GET /challenge-messages?challengeId=: chat history, oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ChallengeQuery>,
) -> Result<Json<Vec<ChallengeMessage>>, ApiError> {
    let messages = blocking(&state, move |s| {
        let c = s
            .db
            .get_challenge(q.challenge_id)?
            .ok_or_else(ApiError::challenge_not_found)?;
        Ok(c.messages)
    })
    .await?;
    Ok(Json(messages))
}
