use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use challyme_core::invite::{self, InviteAction};
use challyme_db::queries;
use challyme_types::api::{
    Ack, Claims, FriendActionRequest, FriendsResponse, SendFriendRequest, UsernameQuery,
};
use challyme_types::models::{Invite, InviteKind, InviteStatus};

use crate::{
    AppState, blocking,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    middleware::ensure_actor,
};

pub async fn send_friend_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendFriendRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.from_user)?;
    if req.from_user == req.to_user {
        return Err(ApiError::Validation("cannot send a friend request to yourself".into()));
    }

    let to = req.to_user.clone();
    blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            if !queries::user_exists(tx, &req.to_user)? {
                return Err(ApiError::user_not_found());
            }
            if queries::are_friends(tx, &req.from_user, &req.to_user)? {
                return Err(ApiError::Conflict(format!("already friends with {}", req.to_user)));
            }
            // A request in either direction blocks a new one.
            if queries::find_pending_friend_request(tx, &req.from_user, &req.to_user)?.is_some()
                || queries::find_pending_friend_request(tx, &req.to_user, &req.from_user)?.is_some()
            {
                return Err(ApiError::Conflict("a friend request is already pending".into()));
            }

            queries::insert_invite(
                tx,
                &Invite {
                    id: Uuid::new_v4(),
                    invited_by: req.from_user.clone(),
                    invited_user: req.to_user.clone(),
                    kind: InviteKind::FriendRequest,
                    status: InviteStatus::Pending,
                    token: invite::new_token(),
                    created_at: Utc::now(),
                },
            )?;
            Ok(())
        })
    })
    .await?;

    info!("{} sent a friend request to {}", claims.username, to);
    Ok(Json(Ack::new(format!("Friend request sent to {}", to))))
}

pub async fn accept_friend_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FriendActionRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.username)?;
    let friend = req.friend.clone();
    answer(&state, req, InviteAction::Accept).await?;

    info!("{} and {} are now friends", claims.username, friend);
    Ok(Json(Ack::new(format!("You are now friends with {}", friend))))
}

pub async fn decline_friend_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FriendActionRequest>,
) -> Result<Json<Ack>, ApiError> {
    ensure_actor(&claims, &req.username)?;
    let friend = req.friend.clone();
    answer(&state, req, InviteAction::Decline).await?;

    info!("{} declined the friend request from {}", claims.username, friend);
    Ok(Json(Ack::new(format!("Declined friend request from {}", friend))))
}

/// Resolve the pending request `req.friend` sent to `req.username`.
async fn answer(
    state: &AppState,
    req: FriendActionRequest,
    action: InviteAction,
) -> Result<(), ApiError> {
    blocking(state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let pending = queries::find_pending_friend_request(tx, &req.friend, &req.username)?
                .ok_or_else(|| ApiError::NotFound("friend request not found".into()))?;

            let status = invite::transition(pending.status, action)?;
            queries::set_invite_status(tx, pending.id, status)?;
            if status == InviteStatus::Accepted {
                queries::add_friendship(tx, &req.username, &req.friend)?;
            }
            Ok(())
        })
    })
    .await
}

/// GET /friends?username=: accepted friends plus the senders of pending
/// requests addressed to the user.
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(q): ApiQuery<UsernameQuery>,
) -> Result<Json<FriendsResponse>, ApiError> {
    ensure_actor(&claims, &q.username)?;

    let response = blocking(&state, move |s| {
        let user = s.db.get_user(&q.username)?.ok_or_else(ApiError::user_not_found)?;
        let friend_requests = s
            .db
            .pending_invites_for(&q.username)?
            .into_iter()
            .filter(|i| i.kind == InviteKind::FriendRequest)
            .map(|i| i.invited_by)
            .collect();
        Ok(FriendsResponse {
            friends: user.friends,
            friend_requests,
        })
    })
    .await?;

    Ok(Json(response))
}
