use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use challyme_core::invite::{self, InviteAction};
use challyme_db::queries;
use challyme_types::api::{Ack, Claims, InviteActionRequest, SendInviteRequest};
use challyme_types::models::{Invite, InviteKind, InviteStatus};

use crate::{AppState, blocking, error::ApiError, extract::ApiJson, middleware::ensure_actor};

pub async fn send_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendInviteRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.invited_by)?;

    let invited = req.invited_user.clone();
    let challenge_id = req.challenge_id;
    blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let c = queries::load_challenge(tx, req.challenge_id)?
                .ok_or_else(ApiError::challenge_not_found)?;
            if !queries::user_exists(tx, &req.invited_user)? {
                return Err(ApiError::user_not_found());
            }
            invite::check_invitable(&c, &req.invited_by, &req.invited_user)?;
            let already_pending =
                queries::find_pending_challenge_invite(tx, &req.invited_user, req.challenge_id)?;
            if already_pending.is_some() {
                return Err(ApiError::Conflict(format!(
                    "{} already has a pending invite to this challenge",
                    req.invited_user
                )));
            }

            queries::insert_invite(
                tx,
                &Invite {
                    id: Uuid::new_v4(),
                    invited_by: req.invited_by.clone(),
                    invited_user: req.invited_user.clone(),
                    kind: InviteKind::ChallengeInvite {
                        challenge_id: req.challenge_id,
                    },
                    status: InviteStatus::Pending,
                    token: invite::new_token(),
                    created_at: Utc::now(),
                },
            )?;
            Ok(())
        })
    })
    .await?;

    info!("{} invited {} to challenge {}", claims.username, invited, challenge_id);
    Ok(Json(Ack::new(format!("Invite sent to {}", invited))))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<InviteActionRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let challenge_id = req.challenge_id;
    blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let pending =
                queries::find_pending_challenge_invite(tx, &req.username, req.challenge_id)?
                    .ok_or_else(|| ApiError::NotFound("invite not found".into()))?;
            let mut c = queries::load_challenge(tx, req.challenge_id)?
                .ok_or_else(ApiError::challenge_not_found)?;

            let status = invite::transition(pending.status, InviteAction::Accept)?;
            invite::admit(&mut c, &req.username);
            queries::save_challenge(tx, &c)?;
            queries::set_invite_status(tx, pending.id, status)?;
            Ok(())
        })
    })
    .await?;

    info!("{} joined challenge {}", claims.username, challenge_id);
    Ok(Json(Ack::new("Invite accepted")))
}

/// Serves both `/decline-invite` and its `/reject-invite` alias.
pub async fn decline_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<InviteActionRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let challenge_id = req.challenge_id;
    blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let pending =
                queries::find_pending_challenge_invite(tx, &req.username, req.challenge_id)?
                    .ok_or_else(|| ApiError::NotFound("invite not found".into()))?;
            let status = invite::transition(pending.status, InviteAction::Decline)?;
            queries::set_invite_status(tx, pending.id, status)?;
            Ok(())
        })
    })
    .await?;

    info!("{} declined the invite to challenge {}", claims.username, challenge_id);
    Ok(Json(Ack::new("Invite declined")))
}
