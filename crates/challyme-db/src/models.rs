//! Database row types. These map directly to SQLite rows.
//! Distinct from challyme-types models to keep the DB layer independent.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};

use challyme_types::models::{Invite, InviteKind, InviteStatus};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct InviteRow {
    pub id: String,
    pub invited_by: String,
    pub invited_user: String,
    pub challenge_id: Option<String>,
    pub status: String,
    pub token: String,
    pub created_at: String,
}

impl TryFrom<InviteRow> for Invite {
    type Error = anyhow::Error;

    fn try_from(row: InviteRow) -> Result<Self> {
        let kind = match row.challenge_id {
            Some(cid) => InviteKind::ChallengeInvite {
                challenge_id: cid
                    .parse()
                    .with_context(|| {
                        format!("Corrupt challenge_id '{}' on invite '{}'", cid, row.id)
                    })?,
            },
            None => InviteKind::FriendRequest,
        };

        Ok(Invite {
            id: row
                .id
                .parse()
                .with_context(|| format!("Corrupt invite id '{}'", row.id))?,
            invited_by: row.invited_by,
            invited_user: row.invited_user,
            kind,
            status: InviteStatus::parse(&row.status)
                .ok_or_else(|| anyhow!("Unknown invite status '{}'", row.status))?,
            token: row.token,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; it is UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}
