use chrono::{DateTime, Utc};

use challyme_types::models::{Challenge, Poke};

use crate::calendar::utc_date;
use crate::error::ChallengeError;

/// Nudge a participant who has not confirmed today. Only someone who already
/// confirmed today may poke. Repeated pokes simply accumulate.
pub fn poke(
    challenge: &mut Challenge,
    poker: &str,
    poked: &str,
    now: DateTime<Utc>,
) -> Result<(), ChallengeError> {
    if poker == poked {
        return Err(ChallengeError::SelfAction("poke"));
    }
    for user in [poker, poked] {
        if !challenge.is_participant(user) {
            return Err(ChallengeError::NotParticipant(user.to_string()));
        }
    }

    let today = utc_date(now);
    if !challenge.has_confirmed(poker, today) {
        return Err(ChallengeError::MustConfirmFirst);
    }
    if challenge.has_confirmed(poked, today) {
        return Err(ChallengeError::TargetAlreadyConfirmed(poked.to_string()));
    }

    challenge.pokes.push(Poke {
        poker: poker.to_string(),
        poked: poked.to_string(),
        timestamp: now,
    });
    Ok(())
}
