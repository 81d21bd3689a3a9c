use chrono::{DateTime, Utc};

use challyme_types::models::{Challenge, Invite, InviteKind, InviteStatus, Notification};

use crate::calendar::{current_day, utc_date};

/// Derive the notice list for `username` from its pending invites and the
/// challenges it takes part in. Invites come first in ledger order, then
/// missed days in challenge order.
pub fn project(
    username: &str,
    invites: &[Invite],
    challenges: &[Challenge],
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let pending = invites
        .iter()
        .filter(|i| i.invited_user == username && i.status == InviteStatus::Pending)
        .map(invite_notice);

    let missed = challenges.iter().filter_map(|c| missed_day(c, username, now));

    pending.chain(missed).collect()
}

fn invite_notice(invite: &Invite) -> Notification {
    match invite.kind {
        InviteKind::ChallengeInvite { challenge_id } => Notification::Invite {
            invite_id: invite.id,
            challenge_id,
            from: invite.invited_by.clone(),
            message: format!("{} invited you to a challenge!", invite.invited_by),
            seen: false,
        },
        InviteKind::FriendRequest => Notification::FriendRequest {
            invite_id: invite.id,
            friend: invite.invited_by.clone(),
            message: format!("{} wants to be your friend!", invite.invited_by),
            seen: false,
        },
    }
}

/// A running, unfinished challenge the user has not confirmed today.
pub fn missed_day(
    challenge: &Challenge,
    username: &str,
    now: DateTime<Utc>,
) -> Option<Notification> {
    if challenge.completed || !challenge.is_participant(username) {
        return None;
    }
    if challenge.has_confirmed(username, utc_date(now)) {
        return None;
    }

    let day = current_day(challenge.start_date, now);
    if day < 1 || day > i64::from(challenge.duration) {
        return None;
    }

    Some(Notification::MissedDay {
        challenge_id: challenge.id,
        day,
        message: format!("You missed day {} in \"{}\"!", day, challenge.title),
        seen: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::create;
    use crate::streak::confirm;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn invite(from: &str, to: &str, kind: InviteKind, status: InviteStatus) -> Invite {
        Invite {
            id: Uuid::new_v4(),
            invited_by: from.into(),
            invited_user: to.into(),
            kind,
            status,
            token: "t".into(),
            created_at: Utc::now(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap()
    }

    #[test]
    fn pending_invites_become_notices_in_order() {
        let cid = Uuid::new_v4();
        let invites = vec![
            invite("bob", "alice", InviteKind::FriendRequest, InviteStatus::Pending),
            invite(
                "carol",
                "alice",
                InviteKind::ChallengeInvite { challenge_id: cid },
                InviteStatus::Pending,
            ),
            invite("dave", "alice", InviteKind::FriendRequest, InviteStatus::Declined),
            invite("alice", "bob", InviteKind::FriendRequest, InviteStatus::Pending),
        ];

        let notices = project("alice", &invites, &[], now());
        assert_eq!(notices.len(), 2);
        assert!(matches!(
            &notices[0],
            Notification::FriendRequest { friend, .. } if friend == "bob"
        ));
        assert!(matches!(
            &notices[1],
            Notification::Invite { challenge_id, from, .. }
                if *challenge_id == cid && from == "carol"
        ));
    }

    #[test]
    fn missed_day_until_confirmed() {
        let mut c = create("Plank", 10, "2024-03-08", "alice", now()).unwrap();

        let notices = project("alice", &[], std::slice::from_ref(&c), now());
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0], Notification::MissedDay { day: 3, .. }));

        confirm(&mut c, "alice", now()).unwrap();
        assert!(project("alice", &[], &[c], now()).is_empty());
    }

    #[test]
    fn no_missed_day_outside_the_window() {
        let upcoming = create("Later", 5, "2024-03-20", "alice", now()).unwrap();
        assert!(missed_day(&upcoming, "alice", now()).is_none());

        let over = create("Over", 2, "2024-03-01", "alice", now()).unwrap();
        assert!(missed_day(&over, "alice", now()).is_none());

        let mut done = create("Done", 30, "2024-03-01", "alice", now()).unwrap();
        done.completed = true;
        assert!(missed_day(&done, "alice", now()).is_none());

        let running = create("Running", 30, "2024-03-01", "alice", now()).unwrap();
        assert!(missed_day(&running, "bob", now()).is_none());
    }

    #[test]
    fn first_day_counts() {
        let c = create("Today", 3, "2024-03-10", "alice", now() - Duration::hours(1)).unwrap();
        assert!(matches!(
            missed_day(&c, "alice", now()),
            Some(Notification::MissedDay { day: 1, .. })
        ));
    }
}
