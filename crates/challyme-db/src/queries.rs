//! Typed queries. Free functions take a `&Connection` so they compose inside
//! [`Database::write_txn`]; the `Database` methods are one-shot reads.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use challyme_types::models::{Challenge, Invite, InviteStatus, User};

use crate::Database;
use crate::models::{InviteRow, UserRow, parse_timestamp};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| insert_user(conn, id, username, password_hash))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// The user with its friend set, or `None` if unknown.
    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let Some(row) = query_user_by_username(conn, username)? else {
                return Ok(None);
            };
            Ok(Some(User {
                id: row.id.parse().with_context(|| format!("Corrupt user id '{}'", row.id))?,
                friends: friends_of(conn, &row.username)?,
                created_at: parse_timestamp(&row.created_at)?,
                username: row.username,
            }))
        })
    }

    // -- Invites --

    pub fn pending_invites_for(&self, username: &str) -> Result<Vec<Invite>> {
        self.with_conn(|conn| pending_invites_for(conn, username))
    }

    // -- Challenges --

    pub fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        self.with_conn(|conn| load_challenge(conn, id))
    }

    pub fn challenges_for_user(&self, username: &str) -> Result<Vec<Challenge>> {
        self.with_conn(|conn| challenges_for_user(conn, username))
    }
}

// -- Users --

pub fn insert_user(conn: &Connection, id: &str, username: &str, password_hash: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
        (id, username, password_hash, Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

pub fn user_exists(conn: &Connection, username: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [username],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

// -- Friends --

pub fn are_friends(conn: &Connection, a: &str, b: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM friendships WHERE username = ?1 AND friend = ?2)",
        [a, b],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Inserts the edge in both directions. Existing edges are left alone.
pub fn add_friendship(conn: &Connection, a: &str, b: &str) -> Result<()> {
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO friendships (username, friend) VALUES (?1, ?2)")?;
    stmt.execute([a, b])?;
    stmt.execute([b, a])?;
    Ok(())
}

pub fn friends_of(conn: &Connection, username: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT friend FROM friendships WHERE username = ?1 ORDER BY friend")?;
    let rows = stmt
        .query_map([username], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(rows)
}

// -- Invites --

const INVITE_COLUMNS: &str =
    "id, invited_by, invited_user, challenge_id, status, token, created_at";

fn read_invite_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InviteRow> {
    Ok(InviteRow {
        id: row.get(0)?,
        invited_by: row.get(1)?,
        invited_user: row.get(2)?,
        challenge_id: row.get(3)?,
        status: row.get(4)?,
        token: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_invite(conn: &Connection, invite: &Invite) -> Result<()> {
    conn.execute(
        "INSERT INTO invites (id, invited_by, invited_user, challenge_id, status, token, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            invite.id.to_string(),
            invite.invited_by,
            invite.invited_user,
            invite.kind.challenge_id().map(|c| c.to_string()),
            invite.status.as_str(),
            invite.token,
            invite.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn set_invite_status(conn: &Connection, id: Uuid, status: InviteStatus) -> Result<()> {
    conn.execute(
        "UPDATE invites SET status = ?1 WHERE id = ?2",
        (status.as_str(), id.to_string()),
    )?;
    Ok(())
}

/// The pending friend request `from` sent to `to`, if any.
pub fn find_pending_friend_request(
    conn: &Connection,
    from: &str,
    to: &str,
) -> Result<Option<Invite>> {
    let sql = format!(
        "SELECT {INVITE_COLUMNS} FROM invites
         WHERE invited_by = ?1 AND invited_user = ?2 AND challenge_id IS NULL AND status = 'pending'
         ORDER BY rowid LIMIT 1"
    );
    let row = conn.query_row(&sql, [from, to], read_invite_row).optional()?;
    row.map(Invite::try_from).transpose()
}

pub fn find_pending_challenge_invite(
    conn: &Connection,
    invited_user: &str,
    challenge_id: Uuid,
) -> Result<Option<Invite>> {
    let sql = format!(
        "SELECT {INVITE_COLUMNS} FROM invites
         WHERE invited_user = ?1 AND challenge_id = ?2 AND status = 'pending'
         ORDER BY rowid LIMIT 1"
    );
    let row = conn
        .query_row(&sql, (invited_user, challenge_id.to_string()), read_invite_row)
        .optional()?;
    row.map(Invite::try_from).transpose()
}

/// Pending invites addressed to `username`, oldest first.
pub fn pending_invites_for(conn: &Connection, username: &str) -> Result<Vec<Invite>> {
    let sql = format!(
        "SELECT {INVITE_COLUMNS} FROM invites
         WHERE invited_user = ?1 AND status = 'pending'
         ORDER BY rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([username], read_invite_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(Invite::try_from).collect()
}

/// Declines every pending invite into a challenge that no longer exists.
pub fn decline_invites_for_challenge(conn: &Connection, challenge_id: Uuid) -> Result<usize> {
    let n = conn.execute(
        "UPDATE invites SET status = 'declined' WHERE challenge_id = ?1 AND status = 'pending'",
        [challenge_id.to_string()],
    )?;
    Ok(n)
}

// -- Challenges --

pub fn insert_challenge(conn: &Connection, challenge: &Challenge) -> Result<()> {
    let doc = serde_json::to_string(challenge)?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO challenges (id, creator, doc, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        (challenge.id.to_string(), &challenge.creator, doc, now),
    )?;
    Ok(())
}

pub fn load_challenge(conn: &Connection, id: Uuid) -> Result<Option<Challenge>> {
    let doc: Option<String> = conn
        .query_row(
            "SELECT doc FROM challenges WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    doc.map(|d| parse_challenge(&d)).transpose()
}

/// Overwrites the stored document. Returns false if the challenge is gone.
pub fn save_challenge(conn: &Connection, challenge: &Challenge) -> Result<bool> {
    let doc = serde_json::to_string(challenge)?;
    let n = conn.execute(
        "UPDATE challenges SET doc = ?1, updated_at = ?2 WHERE id = ?3",
        (doc, Utc::now().to_rfc3339(), challenge.id.to_string()),
    )?;
    Ok(n == 1)
}

pub fn delete_challenge(conn: &Connection, id: Uuid) -> Result<bool> {
    let n = conn.execute("DELETE FROM challenges WHERE id = ?1", [id.to_string()])?;
    Ok(n == 1)
}

/// Challenges whose participant list contains `username`, oldest first.
pub fn challenges_for_user(conn: &Connection, username: &str) -> Result<Vec<Challenge>> {
    let mut stmt = conn.prepare(
        "SELECT doc FROM challenges
         WHERE EXISTS (
             SELECT 1 FROM json_each(challenges.doc, '$.participants') WHERE json_each.value = ?1
         )
         ORDER BY rowid",
    )?;

    let docs = stmt
        .query_map([username], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    docs.iter().map(|d| parse_challenge(d)).collect()
}

fn parse_challenge(doc: &str) -> Result<Challenge> {
    serde_json::from_str(doc).context("Corrupt challenge document")
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
