//! Business-rule gates for cancelling and rescheduling.
//
//  Pure: callers pass `now` in.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionStatus};

/// Notice windows and the reschedule cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeRules {
    pub standard_notice_hours: u32,
    pub emergency_notice_hours: u32,
    pub max_reschedules: u8,
}

impl Default for NoticeRules {
    fn default() -> Self {
        Self {
            standard_notice_hours: 24,
            emergency_notice_hours: 2,
            max_reschedules: 3,
        }
    }
}

impl NoticeRules {
    pub fn minimum_notice(&self, session: &Session) -> Duration {
        let hours = if session.is_emergency() {
            self.emergency_notice_hours
        } else {
            self.standard_notice_hours
        };
        Duration::hours(i64::from(hours))
    }

    pub fn has_notice(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.schedule.scheduled_start - now >= self.minimum_notice(session)
    }
}

/// Result of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    AlreadyTerminal(SessionStatus),
    NoticeTooShort,
    RescheduleLimitReached,
    NotReschedulable(SessionStatus),
    Unassigned,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn describe(&self) -> String {
        match self {
            Eligibility::Eligible => "eligible".into(),
            Eligibility::AlreadyTerminal(s) => format!("session is already {s}"),
            Eligibility::NoticeTooShort => "minimum notice period has passed".into(),
            Eligibility::RescheduleLimitReached => "reschedule limit reached".into(),
            Eligibility::NotReschedulable(s) => format!("a {s} session cannot be rescheduled"),
            Eligibility::Unassigned => "session has no interpreter assigned".into(),
        }
    }
}

/// `skip_notice` is set for admin actors.
pub fn check_cancellation(
    session: &Session,
    rules: &NoticeRules,
    now: DateTime<Utc>,
    skip_notice: bool,
) -> Eligibility {
    if session.status.is_terminal() {
        return Eligibility::AlreadyTerminal(session.status);
    }

    if !skip_notice && !rules.has_notice(session, now) {
        return Eligibility::NoticeTooShort;
    }

    Eligibility::Eligible
}

pub fn check_reschedule(
    session: &Session,
    rules: &NoticeRules,
    now: DateTime<Utc>,
    skip_notice: bool,
) -> Eligibility {
    if session.status.is_terminal() {
        return Eligibility::AlreadyTerminal(session.status);
    }

    if !matches!(
        session.status,
        SessionStatus::Requested | SessionStatus::Confirmed | SessionStatus::Rescheduled
    ) {
        return Eligibility::NotReschedulable(session.status);
    }

    if session.interpreter_id.is_none() {
        return Eligibility::Unassigned;
    }

    if session.reschedule.rescheduled_count >= rules.max_reschedules {
        return Eligibility::RescheduleLimitReached;
    }

    if !skip_notice && !rules.has_notice(session, now) {
        return Eligibility::NoticeTooShort;
    }

    Eligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::tests::mk_session;
    use crate::types::UrgencyLevel;

    fn hours_before(session: &Session, h: i64) -> DateTime<Utc> {
        session.schedule.scheduled_start - Duration::hours(h)
    }

    #[test]
    fn standard_needs_24_hours() {
        let rules = NoticeRules::default();
        let s = mk_session(SessionStatus::Confirmed);

        assert_eq!(
            check_cancellation(&s, &rules, hours_before(&s, 25), false),
            Eligibility::Eligible
        );
        assert_eq!(
            check_cancellation(&s, &rules, hours_before(&s, 24), false),
            Eligibility::Eligible
        );
        assert_eq!(
            check_cancellation(&s, &rules, hours_before(&s, 10), false),
            Eligibility::NoticeTooShort
        );
    }

    #[test]
    fn emergency_needs_2_hours() {
        let rules = NoticeRules::default();
        let mut s = mk_session(SessionStatus::Confirmed);
        s.urgency = UrgencyLevel::Emergency;

        assert!(check_cancellation(&s, &rules, hours_before(&s, 3), false).is_eligible());
        assert_eq!(
            check_cancellation(&s, &rules, hours_before(&s, 1), false),
            Eligibility::NoticeTooShort
        );
    }

    #[test]
    fn skip_notice_still_respects_terminal_states() {
        let rules = NoticeRules::default();
        let s = mk_session(SessionStatus::Requested);
        assert!(check_cancellation(&s, &rules, hours_before(&s, 0), true).is_eligible());

        for status in [
            SessionStatus::Completed,
            SessionStatus::Cancelled,
            SessionStatus::NoShow,
        ] {
            let s = mk_session(status);
            assert_eq!(
                check_cancellation(&s, &rules, hours_before(&s, 48), true),
                Eligibility::AlreadyTerminal(status)
            );
        }
    }

    #[test]
    fn reschedule_is_capped() {
        let rules = NoticeRules::default();
        let mut s = mk_session(SessionStatus::Confirmed);

        s.reschedule.rescheduled_count = 2;
        assert!(check_reschedule(&s, &rules, hours_before(&s, 48), false).is_eligible());

        s.reschedule.rescheduled_count = 3;
        assert_eq!(
            check_reschedule(&s, &rules, hours_before(&s, 48), false),
            Eligibility::RescheduleLimitReached
        );
    }

    #[test]
    fn reschedule_needs_notice_and_a_live_status() {
        let rules = NoticeRules::default();

        let s = mk_session(SessionStatus::Confirmed);
        assert_eq!(
            check_reschedule(&s, &rules, hours_before(&s, 5), false),
            Eligibility::NoticeTooShort
        );

        let s = mk_session(SessionStatus::InProgress);
        assert_eq!(
            check_reschedule(&s, &rules, hours_before(&s, 48), false),
            Eligibility::NotReschedulable(SessionStatus::InProgress)
        );
    }

    #[test]
    fn reschedule_needs_an_interpreter() {
        let rules = NoticeRules::default();
        let mut s = mk_session(SessionStatus::Requested);
        s.interpreter_id = None;
        assert_eq!(
            check_reschedule(&s, &rules, hours_before(&s, 48), false),
            Eligibility::Unassigned
        );
    }
}
