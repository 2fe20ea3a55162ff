//! Who may do what to a session.
//!
//! One function per operation. Every call site in the engine goes through
//! these; nothing else inspects roles.

use thiserror::Error;

use crate::session::{Session, SessionStatus};
use crate::types::{Actor, InterpreterId, RaterRole, Role};

/// An actor together with the interpreter record it resolves to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext {
    pub actor: Actor,
    pub interpreter_id: Option<InterpreterId>,
}

impl ActorContext {
    pub fn new(actor: Actor, interpreter_id: Option<InterpreterId>) -> Self {
        Self {
            actor,
            interpreter_id,
        }
    }

    pub fn is_owning_client(&self, session: &Session) -> bool {
        self.actor.role == Role::Client && self.actor.user_id == session.client_id
    }

    pub fn is_assigned_interpreter(&self, session: &Session) -> bool {
        self.actor.role == Role::Interpreter
            && self.interpreter_id.is_some()
            && self.interpreter_id == session.interpreter_id
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("only the assigned interpreter may move a session to {0}")]
    AssignedInterpreterOnly(SessionStatus),

    #[error("clients may only cancel their own session while it is REQUESTED or CONFIRMED")]
    ClientCancelWindow,

    #[error("clients may only move a session the interpreter has CONFIRMED")]
    ClientRescheduleWindow,

    #[error("actor is neither the owning client nor the assigned interpreter")]
    NotAParticipant,

    #[error("only an admin may move a session to {0}")]
    AdminOnly(SessionStatus),

    #[error("actor may not submit a {0} rating for this session")]
    WrongRater(RaterRole),
}

pub fn authorize_transition(
    ctx: &ActorContext,
    session: &Session,
    target: SessionStatus,
) -> Result<(), Denial> {
    if ctx.actor.is_admin() {
        return Ok(());
    }

    match target {
        SessionStatus::Confirmed | SessionStatus::InProgress | SessionStatus::Completed => {
            if ctx.is_assigned_interpreter(session) {
                Ok(())
            } else {
                Err(Denial::AssignedInterpreterOnly(target))
            }
        }
        SessionStatus::Cancelled => authorize_cancel(ctx, session),
        SessionStatus::Rescheduled => authorize_reschedule(ctx, session),
        SessionStatus::Requested | SessionStatus::NoShow => Err(Denial::AdminOnly(target)),
    }
}

pub fn authorize_cancel(ctx: &ActorContext, session: &Session) -> Result<(), Denial> {
    if ctx.actor.is_admin() || ctx.is_assigned_interpreter(session) {
        return Ok(());
    }

    if ctx.is_owning_client(session) {
        return match session.status {
            SessionStatus::Requested | SessionStatus::Confirmed => Ok(()),
            _ => Err(Denial::ClientCancelWindow),
        };
    }

    Err(Denial::NotAParticipant)
}

/// A reschedule always lands in CONFIRMED, so a client may only move a
/// session that is already CONFIRMED.
pub fn authorize_reschedule(ctx: &ActorContext, session: &Session) -> Result<(), Denial> {
    if ctx.actor.is_admin() || ctx.is_assigned_interpreter(session) {
        return Ok(());
    }

    if ctx.is_owning_client(session) {
        return match session.status {
            SessionStatus::Confirmed => Ok(()),
            _ => Err(Denial::ClientRescheduleWindow),
        };
    }

    Err(Denial::NotAParticipant)
}

pub fn authorize_rating(
    ctx: &ActorContext,
    session: &Session,
    rater: RaterRole,
) -> Result<(), Denial> {
    if ctx.actor.is_admin() {
        return Ok(());
    }

    let allowed = match rater {
        RaterRole::Client => ctx.is_owning_client(session),
        RaterRole::Interpreter => ctx.is_assigned_interpreter(session),
    };

    if allowed {
        Ok(())
    } else {
        Err(Denial::WrongRater(rater))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::session::{RescheduleInfo, SessionBilling, SessionSchedule};
    use crate::types::{SessionType, Specialization, UrgencyLevel};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    pub(crate) fn mk_session(status: SessionStatus) -> Session {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        Session {
            session_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            interpreter_id: Some(Uuid::new_v4()),
            source_language: "en".into(),
            target_language: "es".into(),
            session_type: SessionType::Video,
            specialization: Specialization::General,
            urgency: UrgencyLevel::Standard,
            schedule: SessionSchedule::new(start, 60),
            status,
            billing: SessionBilling {
                hourly_rate: Decimal::new(80, 0),
                additional_fees: Decimal::ZERO,
                total_cost: Decimal::new(80, 0),
                pricing_version: 1,
            },
            client_rating: None,
            interpreter_rating: None,
            reschedule: RescheduleInfo::default(),
            cancellation: None,
            confirmed_at: None,
            created_at: start,
            updated_at: start,
            version: 0,
        }
    }

    fn client_of(s: &Session) -> ActorContext {
        ActorContext::new(Actor::client(s.client_id), None)
    }

    fn interpreter_of(s: &Session) -> ActorContext {
        ActorContext::new(Actor::interpreter(Uuid::new_v4()), s.interpreter_id)
    }

    fn stranger_interpreter() -> ActorContext {
        ActorContext::new(Actor::interpreter(Uuid::new_v4()), Some(Uuid::new_v4()))
    }

    fn admin() -> ActorContext {
        ActorContext::new(Actor::admin(Uuid::new_v4()), None)
    }

    #[test]
    fn progress_states_need_the_assigned_interpreter() {
        let s = mk_session(SessionStatus::Requested);

        for target in [
            SessionStatus::Confirmed,
            SessionStatus::InProgress,
            SessionStatus::Completed,
        ] {
            assert!(authorize_transition(&interpreter_of(&s), &s, target).is_ok());
            assert_eq!(
                authorize_transition(&client_of(&s), &s, target),
                Err(Denial::AssignedInterpreterOnly(target))
            );
            assert!(authorize_transition(&stranger_interpreter(), &s, target).is_err());
        }
    }

    #[test]
    fn interpreter_without_record_is_not_assigned() {
        let mut s = mk_session(SessionStatus::Requested);
        s.interpreter_id = None;
        let ctx = ActorContext::new(Actor::interpreter(Uuid::new_v4()), None);
        assert!(!ctx.is_assigned_interpreter(&s));
    }

    #[test]
    fn client_cancels_only_before_start() {
        for (status, ok) in [
            (SessionStatus::Requested, true),
            (SessionStatus::Confirmed, true),
            (SessionStatus::InProgress, false),
            (SessionStatus::Rescheduled, false),
        ] {
            let s = mk_session(status);
            assert_eq!(authorize_cancel(&client_of(&s), &s).is_ok(), ok, "{status}");
        }
    }

    #[test]
    fn other_clients_cannot_cancel() {
        let s = mk_session(SessionStatus::Requested);
        let other = ActorContext::new(Actor::client(Uuid::new_v4()), None);
        assert_eq!(authorize_cancel(&other, &s), Err(Denial::NotAParticipant));
    }

    #[test]
    fn assigned_interpreter_cancels_from_any_live_state() {
        for status in [
            SessionStatus::Requested,
            SessionStatus::Confirmed,
            SessionStatus::InProgress,
            SessionStatus::Rescheduled,
        ] {
            let s = mk_session(status);
            assert!(authorize_cancel(&interpreter_of(&s), &s).is_ok());
        }
    }

    #[test]
    fn reschedule_open_to_both_participants() {
        let s = mk_session(SessionStatus::Confirmed);
        assert!(authorize_reschedule(&client_of(&s), &s).is_ok());
        assert!(authorize_reschedule(&interpreter_of(&s), &s).is_ok());
        assert!(authorize_reschedule(&stranger_interpreter(), &s).is_err());
    }

    #[test]
    fn clients_cannot_move_an_unconfirmed_session() {
        for status in [SessionStatus::Requested, SessionStatus::Rescheduled] {
            let s = mk_session(status);
            assert_eq!(
                authorize_reschedule(&client_of(&s), &s),
                Err(Denial::ClientRescheduleWindow),
                "{status}"
            );
            assert!(authorize_reschedule(&interpreter_of(&s), &s).is_ok());
            assert!(authorize_reschedule(&admin(), &s).is_ok());
        }
    }

    #[test]
    fn admin_bypasses_everything() {
        let s = mk_session(SessionStatus::InProgress);
        for target in SessionStatus::ALL {
            assert!(authorize_transition(&admin(), &s, *target).is_ok());
        }
        assert!(authorize_rating(&admin(), &s, RaterRole::Client).is_ok());
    }

    #[test]
    fn ratings_are_tied_to_the_rater_role() {
        let s = mk_session(SessionStatus::Completed);

        assert!(authorize_rating(&client_of(&s), &s, RaterRole::Client).is_ok());
        assert!(authorize_rating(&interpreter_of(&s), &s, RaterRole::Interpreter).is_ok());

        assert_eq!(
            authorize_rating(&client_of(&s), &s, RaterRole::Interpreter),
            Err(Denial::WrongRater(RaterRole::Interpreter))
        );
        assert!(authorize_rating(&interpreter_of(&s), &s, RaterRole::Client).is_err());
    }
}
