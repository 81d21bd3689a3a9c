use chrono::{DateTime, Utc};

use challyme_types::models::{Challenge, Streak};

use crate::calendar::{current_day, utc_date};
use crate::error::ChallengeError;

pub const POINTS_PER_DAY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOutcome {
    pub days: u32,
    pub completed: bool,
    pub points: u32,
}

pub fn points(days: u32) -> u32 {
    days.saturating_mul(POINTS_PER_DAY)
}

/// Record that `username` did the challenge today.
///
/// Days are cumulative: every new calendar day confirmed adds one, and a
/// skipped day never resets the count. The challenge completes once the
/// current day reaches its duration, and stays completed.
pub fn confirm(
    challenge: &mut Challenge,
    username: &str,
    now: DateTime<Utc>,
) -> Result<ConfirmOutcome, ChallengeError> {
    if !challenge.is_participant(username) {
        return Err(ChallengeError::NotParticipant(username.to_string()));
    }

    let today = utc_date(now);
    if challenge.has_confirmed(username, today) {
        return Err(ChallengeError::AlreadyConfirmedToday);
    }

    let idx = match challenge.streaks.iter().position(|s| s.user == username) {
        Some(idx) => idx,
        None => {
            challenge.streaks.push(Streak::new(username));
            challenge.streaks.len() - 1
        }
    };

    let streak = &mut challenge.streaks[idx];
    streak.last_confirmed.push(today);
    streak.days += 1;
    let days = streak.days;

    if current_day(challenge.start_date, now) >= i64::from(challenge.duration) {
        challenge.completed = true;
    }

    Ok(ConfirmOutcome {
        days,
        completed: challenge.completed,
        points: points(days),
    })
}
