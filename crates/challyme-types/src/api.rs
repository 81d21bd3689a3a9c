use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Challenge, Notification};

// -- JWT Claims --

/// JWT claims issued at login and checked by the API middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
}

// -- Query strings --

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeQuery {
    pub challenge_id: Uuid,
}

// -- Challenges --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateChallengeRequest {
    pub title: String,
    pub duration: u32,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD` date.
    pub start_date: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChallengeResponse {
    pub message: String,
    pub challenge: Challenge,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfirmRequest {
    pub username: String,
    pub challenge_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub message: String,
    pub days: u32,
    pub completed: bool,
    pub points: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PokeRequest {
    pub username: String,
    pub friend: String,
    pub challenge_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteChallengeRequest {
    pub challenge_id: Uuid,
    pub username: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendChallengeMessageRequest {
    pub challenge_id: Uuid,
    pub username: String,
    pub content: String,
}

// -- Images --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    pub message: String,
    pub file_ref: String,
}

// -- Friends --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendFriendRequest {
    pub from_user: String,
    pub to_user: String,
}

/// Body of accept/decline friend request: `username` answers the request
/// that `friend` sent.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendActionRequest {
    pub username: String,
    pub friend: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsResponse {
    pub friends: Vec<String>,
    pub friend_requests: Vec<String>,
}

// -- Challenge invites --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendInviteRequest {
    pub challenge_id: Uuid,
    pub invited_by: String,
    pub invited_user: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InviteActionRequest {
    pub username: String,
    pub challenge_id: Uuid,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotifyMissedDayRequest {
    pub username: String,
    pub challenge_id: Uuid,
}

/// Either the missed-day notice for one challenge or a message saying there
/// is nothing to report.
#[derive(Debug, Serialize, Deserialize)]
pub struct MissedDayResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
