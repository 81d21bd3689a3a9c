use axum::{Extension, Json, extract::State};
use chrono::Utc;

use challyme_core::notifications;
use challyme_types::api::{Claims, MissedDayResponse, NotifyMissedDayRequest, UsernameQuery};
use challyme_types::models::Notification;

use crate::{
    AppState, blocking,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    middleware::ensure_actor,
};

/// GET /notifications?username=: derived on every call, nothing is stored.
pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(q): ApiQuery<UsernameQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    ensure_actor(&claims, &q.username)?;

    let now = Utc::now();
    let notices = blocking(&state, move |s| {
        let invites = s.db.pending_invites_for(&q.username)?;
        let challenges = s.db.challenges_for_user(&q.username)?;
        Ok(notifications::project(&q.username, &invites, &challenges, now))
    })
    .await?;

    Ok(Json(notices))
}

/// POST /notify-missed-day: the missed-day notice for one challenge, if any.
pub async fn notify_missed_day(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<NotifyMissedDayRequest>,
) -> Result<Json<MissedDayResponse>, ApiError> {
    ensure_actor(&claims, &req.username)?;

    let now = Utc::now();
    let notice = blocking(&state, move |s| {
        let c = s
            .db
            .get_challenge(req.challenge_id)?
            .ok_or_else(ApiError::challenge_not_found)?;
        Ok(notifications::missed_day(&c, &req.username, now))
    })
    .await?;

    Ok(Json(match notice {
        Some(notification) => MissedDayResponse {
            notification: Some(notification),
            message: None,
        },
        None => MissedDayResponse {
            notification: None,
            message: Some("Nothing missed today".into()),
        },
    }))
}
