use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;

use challyme_core::{challenge::{self, Departure}, poke as poke_rules, streak};
use challyme_db::queries;
use challyme_types::api::{
    Ack, Claims, ConfirmRequest, ConfirmResponse, CreateChallengeRequest,
    CreateChallengeResponse, DeleteChallengeRequest, PokeRequest, UsernameQuery,
};
use challyme_types::models::Challenge;

use crate::{
    AppState, blocking,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    middleware::ensure_actor,
};

pub async fn create_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateChallengeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let created = challenge::create(
        &req.title,
        req.duration,
        &req.start_date,
        &req.username,
        Utc::now(),
    )?;

    let created = blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            queries::insert_challenge(tx, &created)?;
            Ok(())
        })?;
        Ok(created)
    })
    .await?;

    info!("{} created challenge {} ({} days)", created.creator, created.id, created.duration);
    Ok((
        StatusCode::CREATED,
        Json(CreateChallengeResponse {
            message: "Challenge created".into(),
            challenge: created,
        }),
    ))
}

/// GET /challenges?username=: every challenge the user takes part in.
pub async fn list_challenges(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(q): ApiQuery<UsernameQuery>,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    ensure_actor(&claims, &q.username)?;
    let challenges = blocking(&state, move |s| Ok(s.db.challenges_for_user(&q.username)?)).await?;
    Ok(Json(challenges))
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let now = Utc::now();
    let who = req.username.clone();
    let challenge_id = req.challenge_id;
    let outcome = blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let mut c = queries::load_challenge(tx, req.challenge_id)?
                .ok_or_else(ApiError::challenge_not_found)?;
            let outcome = streak::confirm(&mut c, &req.username, now)?;
            queries::save_challenge(tx, &c)?;
            Ok(outcome)
        })
    })
    .await?;

    info!(
        "{} confirmed {} (streak {}, completed {})",
        who, challenge_id, outcome.days, outcome.completed
    );

    let message = if outcome.completed {
        "Confirmed! Challenge complete"
    } else {
        "Confirmed for today"
    };
    Ok(Json(ConfirmResponse {
        message: message.into(),
        days: outcome.days,
        completed: outcome.completed,
        points: outcome.points,
    }))
}

pub async fn poke(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<PokeRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let friend = req.friend.clone();
    blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let mut c = queries::load_challenge(tx, req.challenge_id)?
                .ok_or_else(ApiError::challenge_not_found)?;
            poke_rules::poke(&mut c, &req.username, &req.friend, Utc::now())?;
            queries::save_challenge(tx, &c)?;
            Ok(())
        })
    })
    .await?;

    info!("{} poked {}", claims.username, friend);
    Ok(Json(Ack::new(format!("You poked {}", friend))))
}

/// DELETE /delete-challenge: the creator deletes the challenge, anyone else
/// leaves it. A challenge left without participants is deleted as well.
pub async fn delete_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<DeleteChallengeRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let challenge_id = req.challenge_id;
    let (message, orphaned) = blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let c = queries::load_challenge(tx, req.challenge_id)?
                .ok_or_else(ApiError::challenge_not_found)?;
            let was_creator = c.creator == req.username;

            match challenge::depart(c, &req.username)? {
                Departure::Deleted { orphaned_files } => {
                    queries::delete_challenge(tx, req.challenge_id)?;
                    let declined = queries::decline_invites_for_challenge(tx, req.challenge_id)?;
                    info!(
                        "Challenge {} deleted by {} ({} pending invites declined)",
                        req.challenge_id, req.username, declined
                    );
                    let message = if was_creator {
                        "Challenge deleted"
                    } else {
                        "You left the challenge; it had no participants left and was deleted"
                    };
                    Ok((message, orphaned_files))
                }
                Departure::Left {
                    challenge,
                    orphaned_files,
                } => {
                    queries::save_challenge(tx, &challenge)?;
                    info!("{} left challenge {}", req.username, req.challenge_id);
                    Ok(("You left the challenge", orphaned_files))
                }
            }
        })
    })
    .await?;

    if !orphaned.is_empty() {
        info!("Removing {} images of challenge {}", orphaned.len(), challenge_id);
        state.storage.delete_all(&orphaned).await;
    }

    Ok(Json(Ack::new(message)))
}
