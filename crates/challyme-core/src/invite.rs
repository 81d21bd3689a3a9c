use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use challyme_types::models::{Challenge, InviteStatus, Streak};

use crate::error::ChallengeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteAction {
    Accept,
    Decline,
}

/// `pending -> accepted | declined`. Anything else is terminal.
pub fn transition(
    status: InviteStatus,
    action: InviteAction,
) -> Result<InviteStatus, ChallengeError> {
    match (status, action) {
        (InviteStatus::Pending, InviteAction::Accept) => Ok(InviteStatus::Accepted),
        (InviteStatus::Pending, InviteAction::Decline) => Ok(InviteStatus::Declined),
        _ => Err(ChallengeError::InviteNotPending),
    }
}

/// Random URL-safe token stored alongside each invite.
pub fn new_token() -> String {
    let bytes: [u8; 18] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Checks that `invited_by` may bring `invited_user` into `challenge`.
pub fn check_invitable(
    challenge: &Challenge,
    invited_by: &str,
    invited_user: &str,
) -> Result<(), ChallengeError> {
    if invited_by == invited_user {
        return Err(ChallengeError::SelfAction("invite"));
    }
    if !challenge.is_participant(invited_by) {
        return Err(ChallengeError::NotParticipant(invited_by.to_string()));
    }
    if challenge.is_participant(invited_user) {
        return Err(ChallengeError::AlreadyParticipant(invited_user.to_string()));
    }
    Ok(())
}

/// Adds `username` to the challenge with a zero streak. Safe to call twice:
/// neither the participant nor the streak entry is ever duplicated.
/// Returns whether the user was newly added.
pub fn admit(challenge: &mut Challenge, username: &str) -> bool {
    let added = !challenge.is_participant(username);
    if added {
        challenge.participants.push(username.to_string());
    }
    if challenge.streak(username).is_none() {
        challenge.streaks.push(Streak::new(username));
    }
    added
}
