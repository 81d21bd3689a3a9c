use chrono::{DateTime, Utc};
use uuid::Uuid;

use challyme_types::models::{Challenge, ChallengeImage, ChallengeMessage, Streak};

use crate::calendar::parse_start_date;
use crate::error::ChallengeError;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DURATION_DAYS: u32 = 365;
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Builds a new challenge with `creator` as its only participant.
pub fn create(
    title: &str,
    duration: u32,
    start_date: &str,
    creator: &str,
    now: DateTime<Utc>,
) -> Result<Challenge, ChallengeError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(ChallengeError::InvalidTitle);
    }
    if duration == 0 || duration > MAX_DURATION_DAYS {
        return Err(ChallengeError::InvalidDuration);
    }
    let start_date = parse_start_date(start_date)?;

    Ok(Challenge {
        id: Uuid::new_v4(),
        title: title.to_string(),
        duration,
        start_date,
        participants: vec![creator.to_string()],
        creator: creator.to_string(),
        streaks: vec![Streak::new(creator)],
        completed: false,
        messages: Vec::new(),
        images: Vec::new(),
        pokes: Vec::new(),
        created_at: now,
    })
}

pub fn ensure_participant(challenge: &Challenge, username: &str) -> Result<(), ChallengeError> {
    if challenge.is_participant(username) {
        Ok(())
    } else {
        Err(ChallengeError::NotParticipant(username.to_string()))
    }
}

/// Result of a user walking away from a challenge.
#[derive(Debug)]
pub enum Departure {
    /// The challenge is gone: the creator deleted it, or the last participant left.
    Deleted { orphaned_files: Vec<String> },
    /// Only the user's own entries were removed.
    Left {
        challenge: Challenge,
        orphaned_files: Vec<String>,
    },
}

/// Creator deletes the whole challenge; anyone else leaves it, taking their
/// streak, pokes, messages and images with them.
pub fn depart(mut challenge: Challenge, username: &str) -> Result<Departure, ChallengeError> {
    ensure_participant(&challenge, username)?;

    if challenge.creator == username {
        let orphaned_files = challenge.images.into_iter().map(|i| i.file_ref).collect();
        return Ok(Departure::Deleted { orphaned_files });
    }

    let (gone, kept): (Vec<_>, Vec<_>) =
        challenge.images.into_iter().partition(|i| i.user == username);
    challenge.images = kept;
    let orphaned_files = gone.into_iter().map(|i| i.file_ref).collect();

    challenge.participants.retain(|p| p != username);
    challenge.streaks.retain(|s| s.user != username);
    challenge.pokes.retain(|p| p.poker != username && p.poked != username);
    challenge.messages.retain(|m| m.user != username);

    if challenge.participants.is_empty() {
        Ok(Departure::Deleted { orphaned_files })
    } else {
        Ok(Departure::Left {
            challenge,
            orphaned_files,
        })
    }
}

pub fn post_message(
    challenge: &mut Challenge,
    username: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<ChallengeMessage, ChallengeError> {
    ensure_participant(challenge, username)?;

    let content = content.trim();
    if content.is_empty() || content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ChallengeError::InvalidContent);
    }

    let message = ChallengeMessage {
        user: username.to_string(),
        content: content.to_string(),
        timestamp: now,
    };
    challenge.messages.push(message.clone());
    Ok(message)
}

pub fn attach_image(
    challenge: &mut Challenge,
    username: &str,
    file_ref: &str,
    day: u32,
    now: DateTime<Utc>,
) -> Result<(), ChallengeError> {
    ensure_participant(challenge, username)?;

    challenge.images.push(ChallengeImage {
        user: username.to_string(),
        file_ref: file_ref.to_string(),
        timestamp: now,
        day,
    });
    Ok(())
}
