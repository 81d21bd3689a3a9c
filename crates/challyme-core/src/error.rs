use thiserror::Error;

use crate::challenge::{MAX_DURATION_DAYS, MAX_MESSAGE_LEN, MAX_TITLE_LEN};

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("{0} is not a participant of this challenge")]
    NotParticipant(String),

    #[error("already confirmed today")]
    AlreadyConfirmedToday,

    #[error("you have to confirm today before you can poke")]
    MustConfirmFirst,

    #[error("{0} has already confirmed today")]
    TargetAlreadyConfirmed(String),

    #[error("{0} is already a participant")]
    AlreadyParticipant(String),

    #[error("invite is no longer pending")]
    InviteNotPending,

    #[error("you cannot {0} yourself")]
    SelfAction(&'static str),

    #[error("title must be between 1 and {} characters", MAX_TITLE_LEN)]
    InvalidTitle,

    #[error("duration must be between 1 and {} days", MAX_DURATION_DAYS)]
    InvalidDuration,

    #[error("invalid start date '{0}'")]
    InvalidStartDate(String),

    #[error("message must be between 1 and {} characters", MAX_MESSAGE_LEN)]
    InvalidContent,
}

impl ChallengeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotParticipant(_) | Self::MustConfirmFirst | Self::TargetAlreadyConfirmed(_) => {
                ErrorKind::Forbidden
            }
            Self::AlreadyConfirmedToday | Self::AlreadyParticipant(_) => ErrorKind::Conflict,
            Self::InviteNotPending => ErrorKind::NotFound,
            Self::SelfAction(_)
            | Self::InvalidTitle
            | Self::InvalidDuration
            | Self::InvalidStartDate(_)
            | Self::InvalidContent => ErrorKind::Validation,
        }
    }
}
