use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub friends: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// -- Invites --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            // older rows used "rejected" for declined challenge invites
            "declined" | "rejected" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// What an invite asks for. A friend request carries no payload, a challenge
/// invite names the challenge to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InviteKind {
    FriendRequest,
    #[serde(rename_all = "camelCase")]
    ChallengeInvite { challenge_id: Uuid },
}

impl InviteKind {
    pub fn challenge_id(&self) -> Option<Uuid> {
        match self {
            Self::FriendRequest => None,
            Self::ChallengeInvite { challenge_id } => Some(*challenge_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: Uuid,
    pub invited_by: String,
    pub invited_user: String,
    #[serde(flatten)]
    pub kind: InviteKind,
    pub status: InviteStatus,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

// -- Challenges --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub user: String,
    pub days: u32,
    /// UTC calendar dates the user confirmed, oldest first, no duplicates.
    pub last_confirmed: Vec<NaiveDate>,
}

impl Streak {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            days: 0,
            last_confirmed: Vec::new(),
        }
    }

    pub fn confirmed_on(&self, date: NaiveDate) -> bool {
        self.last_confirmed.contains(&date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeMessage {
    pub user: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeImage {
    pub user: String,
    /// File name under the upload directory, served at `/uploads/{file_ref}`.
    pub file_ref: String,
    pub timestamp: DateTime<Utc>,
    pub day: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poke {
    pub poker: String,
    pub poked: String,
    pub timestamp: DateTime<Utc>,
}

/// The challenge aggregate. Streaks, messages, images and pokes have no life
/// of their own and are stored inside the challenge document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub duration: u32,
    pub start_date: DateTime<Utc>,
    pub participants: Vec<String>,
    pub creator: String,
    pub streaks: Vec<Streak>,
    pub completed: bool,
    #[serde(default)]
    pub messages: Vec<ChallengeMessage>,
    #[serde(default)]
    pub images: Vec<ChallengeImage>,
    #[serde(default)]
    pub pokes: Vec<Poke>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_participant(&self, username: &str) -> bool {
        self.participants.iter().any(|p| p == username)
    }

    pub fn streak(&self, username: &str) -> Option<&Streak> {
        self.streaks.iter().find(|s| s.user == username)
    }

    pub fn has_confirmed(&self, username: &str, date: NaiveDate) -> bool {
        self.streak(username).is_some_and(|s| s.confirmed_on(date))
    }
}

// -- Notifications --

/// User-facing notice derived from the invite ledger and challenge state.
/// Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    Invite {
        invite_id: Uuid,
        challenge_id: Uuid,
        from: String,
        message: String,
        seen: bool,
    },
    #[serde(rename_all = "camelCase")]
    FriendRequest {
        invite_id: Uuid,
        friend: String,
        message: String,
        seen: bool,
    },
    #[serde(rename_all = "camelCase")]
    MissedDay {
        challenge_id: Uuid,
        day: i64,
        message: String,
        seen: bool,
    },
}
