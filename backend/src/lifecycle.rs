//! Session booking and status lifecycle.
//!
//! Every mutation follows the same unit of work: resolve the actor, load the
//! session (under the interpreter's lock when interpreter state is touched),
//! check legality, permission and eligibility, apply side effects to a copy,
//! then hand the copy to a single conditional commit.

use std::sync::Arc;

use anyhow::Context;
use booking_core::availability::is_available_at;
use booking_core::eligibility::{Eligibility, check_cancellation, check_reschedule};
use booking_core::error::ValidationError;
use booking_core::interpreter::Interpreter;
use booking_core::policy::{authorize_cancel, authorize_reschedule, authorize_transition};
use booking_core::pricing::{
    SessionPriceInput, cost_for_minutes, price_session, validate_duration, validate_language_pair,
};
use booking_core::session::{
    Cancellation, CancellationCategory, RescheduleInfo, Session, SessionBilling, SessionSchedule,
    SessionStatus,
};
use booking_core::transitions::can_transition;
use booking_core::types::{
    Actor, InterpreterId, SessionId, SessionType, Specialization, UrgencyLevel, UserId,
    normalize_language,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, field, info, instrument};
use uuid::Uuid;

use crate::context::EngineContext;
use crate::error::{BookingError, BookingResult};
use crate::logger::{annotate_span, warn_if_slow};
use crate::matching::{MatchCriteria, MatchingEngine};
use crate::metrics::counters::bump;
use crate::session::repository::{AggregateEffect, SessionCommit, SlotGuard};

/// A client's request for a new session.
///
/// With no `interpreter_id` the best-ranked free candidate is assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    pub client_id: UserId,
    pub interpreter_id: Option<InterpreterId>,
    pub source_language: String,
    pub target_language: String,
    pub session_type: SessionType,
    pub specialization: Specialization,
    pub urgency: UrgencyLevel,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub additional_fees: Decimal,
}

impl BookingRequest {
    fn criteria(&self) -> MatchCriteria {
        MatchCriteria {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            session_type: self.session_type,
            specialization: self.specialization,
            scheduled_start: self.scheduled_start,
            duration_minutes: self.duration_minutes,
        }
    }

    fn price_input(&self) -> SessionPriceInput {
        SessionPriceInput {
            session_type: self.session_type,
            specialization: self.specialization,
            urgency: self.urgency,
            duration_minutes: self.duration_minutes,
            additional_fees: self.additional_fees,
        }
    }
}

pub struct SessionLifecycle {
    ctx: Arc<EngineContext>,
    matching: Arc<MatchingEngine>,
}

impl SessionLifecycle {
    pub(crate) fn new(ctx: Arc<EngineContext>, matching: Arc<MatchingEngine>) -> Self {
        Self { ctx, matching }
    }

    #[instrument(
        skip(self, req),
        target = "lifecycle",
        fields(client_id = %req.client_id, session_id = field::Empty, interpreter_id = field::Empty)
    )]
    pub async fn create_session(&self, req: BookingRequest) -> BookingResult<Session> {
        validate_language_pair(&req.source_language, &req.target_language, &self.ctx.pricing)?;
        if req.duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration.into());
        }
        if req.additional_fees < Decimal::ZERO {
            return Err(ValidationError::NegativeFees.into());
        }
        let now = self.ctx.clock.now();
        if req.scheduled_start <= now {
            return Err(ValidationError::StartInPast.into());
        }

        let criteria = req.criteria();

        if let Some(id) = req.interpreter_id {
            let interpreter = self.ctx.load_interpreter(&id).await?;
            if !criteria.filter().matches(&interpreter) {
                return Err(BookingError::NotEligible(format!(
                    "interpreter {id} cannot serve this request"
                )));
            }
            if !is_available_at(&interpreter.schedule, req.scheduled_start) {
                return Err(BookingError::NotEligible(format!(
                    "interpreter {id} is not available at the requested time"
                )));
            }
            return self.book_with(&interpreter, &req, now).await;
        }

        let ranked = self.matching.find_candidates(&criteria).await?;
        if ranked.is_empty() {
            return Err(BookingError::not_found("interpreter", "matching the request"));
        }

        // Walk down the ranking; a candidate may be busy or reject the
        // duration on its own rate card.
        let mut last_err = None;
        for candidate in &ranked {
            match self.book_with(candidate, &req, now).await {
                Ok(s) => return Ok(s),
                Err(e @ (BookingError::Conflict(_) | BookingError::Validation(_))) => {
                    debug!(interpreter_id = %candidate.interpreter_id, error = %e, "candidate skipped");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| BookingError::not_found("interpreter", "matching the request")))
    }

    async fn book_with(
        &self,
        interpreter: &Interpreter,
        req: &BookingRequest,
        now: DateTime<Utc>,
    ) -> BookingResult<Session> {
        let price = price_session(&interpreter.rates, &req.price_input(), &self.ctx.pricing)?;

        let session = Session {
            session_id: Uuid::new_v4(),
            client_id: req.client_id,
            interpreter_id: Some(interpreter.interpreter_id),
            source_language: normalize_language(&req.source_language),
            target_language: normalize_language(&req.target_language),
            session_type: req.session_type,
            specialization: req.specialization,
            urgency: req.urgency,
            schedule: SessionSchedule::new(req.scheduled_start, req.duration_minutes),
            status: SessionStatus::Requested,
            billing: SessionBilling {
                hourly_rate: price.hourly_rate,
                additional_fees: req.additional_fees,
                total_cost: price.total_cost,
                pricing_version: price.config_version,
            },
            client_rating: None,
            interpreter_rating: None,
            reschedule: RescheduleInfo::default(),
            cancellation: None,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let guard = SlotGuard {
            interpreter_id: interpreter.interpreter_id,
            slot: session.slot(),
        };

        let _lock = self.ctx.locks.acquire(interpreter.interpreter_id).await;
        self.ctx.ensure_slot_free(&guard, None).await?;

        let outcome = warn_if_slow("db_insert_session", self.ctx.slow_after, async {
            self.ctx.sessions.insert(&session, Some(&guard)).await
        })
        .await
        .with_context(|| format!("insert session {}", session.session_id))?;
        self.ctx.expect_applied(&session.session_id, outcome)?;

        annotate_span(Some(&session.session_id), Some(&interpreter.interpreter_id));
        bump(&self.ctx.counters.sessions_created);
        info!(total_cost = %session.billing.total_cost, "session requested");

        Ok(session)
    }

    #[instrument(
        skip(self, actor),
        target = "lifecycle",
        fields(session_id = %session_id, interpreter_id = field::Empty, role = %actor.role)
    )]
    pub async fn transition_status(
        &self,
        session_id: SessionId,
        target: SessionStatus,
        actor: Actor,
    ) -> BookingResult<Session> {
        let actor_ctx = self.ctx.resolve_actor(actor).await?;
        let (mut session, _lock) = self.ctx.load_locked(&session_id).await?;
        annotate_span(None, session.interpreter_id.as_ref());

        let from = session.status;
        if !can_transition(from, target) {
            return Err(BookingError::IllegalTransition { from, to: target });
        }
        authorize_transition(&actor_ctx, &session, target)?;

        let now = self.ctx.clock.now();
        let mut guard = None;

        match target {
            // A cancellation records who, why and under which category.
            SessionStatus::Cancelled => {
                return Err(ValidationError::MissingCancelReason.into());
            }
            SessionStatus::Confirmed => {
                let interpreter_id = session
                    .interpreter_id
                    .ok_or_else(|| BookingError::NotEligible(Eligibility::Unassigned.describe()))?;
                let g = SlotGuard {
                    interpreter_id,
                    slot: session.slot(),
                };
                self.ctx.ensure_slot_free(&g, Some(&session_id)).await?;
                guard = Some(g);
            }
            _ => {}
        }

        let expected_version = session.version;
        let effect = enter_status(&mut session, target, now, None);
        let commit = SessionCommit {
            session,
            expected_version,
            guard,
            effect,
        };
        self.ctx.commit(&commit).await?;

        self.count(target);
        info!(from = %from, to = %target, "session transitioned");
        Ok(commit.session)
    }

    #[instrument(
        skip(self, reason, actor),
        target = "lifecycle",
        fields(session_id = %session_id, interpreter_id = field::Empty, %category)
    )]
    pub async fn cancel(
        &self,
        session_id: SessionId,
        reason: &str,
        category: CancellationCategory,
        actor: Actor,
    ) -> BookingResult<Session> {
        if reason.trim().is_empty() {
            return Err(ValidationError::MissingCancelReason.into());
        }

        let actor_ctx = self.ctx.resolve_actor(actor).await?;
        let mut session = self.ctx.load_session(&session_id).await?;
        annotate_span(None, session.interpreter_id.as_ref());

        authorize_cancel(&actor_ctx, &session)?;

        let now = self.ctx.clock.now();
        ensure_eligible(check_cancellation(
            &session,
            &self.ctx.notice,
            now,
            actor.is_admin(),
        ))?;

        let from = session.status;
        if !can_transition(from, SessionStatus::Cancelled) {
            return Err(BookingError::IllegalTransition {
                from,
                to: SessionStatus::Cancelled,
            });
        }

        let expected_version = session.version;
        enter_status(
            &mut session,
            SessionStatus::Cancelled,
            now,
            Some(Cancellation {
                reason: reason.to_string(),
                category,
                cancelled_at: now,
                cancelled_by: actor.user_id,
            }),
        );
        let commit = SessionCommit {
            session,
            expected_version,
            guard: None,
            effect: None,
        };
        self.ctx.commit(&commit).await?;

        bump(&self.ctx.counters.sessions_cancelled);
        info!(from = %from, "session cancelled");
        Ok(commit.session)
    }

    /// Moves a session to a new start (and optionally a new duration).
    ///
    /// The same interpreter stays assigned, so the result is CONFIRMED. Clients
    /// may therefore only move sessions that are already CONFIRMED.
    #[instrument(
        skip(self, reason, actor),
        target = "lifecycle",
        fields(session_id = %session_id, interpreter_id = field::Empty, %new_start)
    )]
    pub async fn reschedule(
        &self,
        session_id: SessionId,
        new_start: DateTime<Utc>,
        new_duration_minutes: Option<u32>,
        reason: &str,
        actor: Actor,
    ) -> BookingResult<Session> {
        let actor_ctx = self.ctx.resolve_actor(actor).await?;
        let (mut session, _lock) = self.ctx.load_locked(&session_id).await?;
        annotate_span(None, session.interpreter_id.as_ref());

        authorize_reschedule(&actor_ctx, &session)?;

        let duration = new_duration_minutes.unwrap_or(session.schedule.duration_minutes);
        if new_start == session.schedule.scheduled_start
            && duration == session.schedule.duration_minutes
        {
            return Err(ValidationError::UnchangedSchedule.into());
        }

        let now = self.ctx.clock.now();
        ensure_eligible(check_reschedule(
            &session,
            &self.ctx.notice,
            now,
            actor.is_admin(),
        ))?;
        if new_start <= now {
            return Err(ValidationError::StartInPast.into());
        }

        let interpreter_id = session
            .interpreter_id
            .ok_or_else(|| BookingError::NotEligible(Eligibility::Unassigned.describe()))?;
        let interpreter = self.ctx.load_interpreter(&interpreter_id).await?;
        if !interpreter.is_bookable() {
            return Err(BookingError::NotEligible(format!(
                "interpreter {interpreter_id} is not accepting bookings"
            )));
        }
        if !is_available_at(&interpreter.schedule, new_start) {
            return Err(BookingError::NotEligible(format!(
                "interpreter {interpreter_id} is not available at the new time"
            )));
        }

        validate_duration(
            &interpreter.rates,
            session.session_type,
            duration,
            &self.ctx.pricing,
        )?;

        let guard = SlotGuard {
            interpreter_id,
            slot: SessionSchedule::new(new_start, duration).slot(),
        };
        self.ctx.ensure_slot_free(&guard, Some(&session_id)).await?;

        let expected_version = session.version;
        let previous_start = session.schedule.scheduled_start;
        apply_reschedule(&mut session, new_start, duration, reason, now);
        let commit = SessionCommit {
            session,
            expected_version,
            guard: Some(guard),
            effect: None,
        };
        self.ctx.commit(&commit).await?;

        bump(&self.ctx.counters.reschedules);
        info!(
            %previous_start,
            count = commit.session.reschedule.rescheduled_count,
            "session rescheduled"
        );
        Ok(commit.session)
    }

    fn count(&self, target: SessionStatus) {
        let c = &self.ctx.counters;
        match target {
            SessionStatus::Confirmed => bump(&c.sessions_confirmed),
            SessionStatus::Completed => bump(&c.sessions_completed),
            SessionStatus::Cancelled => bump(&c.sessions_cancelled),
            _ => {}
        }
    }
}

fn ensure_eligible(verdict: Eligibility) -> BookingResult<()> {
    if verdict.is_eligible() {
        Ok(())
    } else {
        Err(BookingError::NotEligible(verdict.describe()))
    }
}

/// Whole minutes between two instants, rounded half up; never negative.
pub fn rounded_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let secs = (end - start).num_seconds().max(0);
    u32::try_from((secs + 30) / 60).unwrap_or(u32::MAX)
}

/// Applies the side effects of entering `target` and bumps the version.
///
/// Returns the interpreter aggregate change the commit must carry.
pub fn enter_status(
    session: &mut Session,
    target: SessionStatus,
    now: DateTime<Utc>,
    cancellation: Option<Cancellation>,
) -> Option<AggregateEffect> {
    let mut effect = None;

    match target {
        SessionStatus::Confirmed => {
            session.confirmed_at = Some(now);
        }
        SessionStatus::InProgress => {
            session.schedule.actual_start.get_or_insert(now);
        }
        SessionStatus::Completed => {
            let end = *session.schedule.actual_end.get_or_insert(now);
            let start = session
                .schedule
                .actual_start
                .unwrap_or(session.schedule.scheduled_start);
            let minutes = rounded_minutes(start, end);

            session.schedule.actual_duration_minutes = Some(minutes);
            session.billing.total_cost = cost_for_minutes(
                minutes,
                session.billing.hourly_rate,
                session.billing.additional_fees,
            );

            effect = session
                .interpreter_id
                .map(|interpreter_id| AggregateEffect::CompletionCredit {
                    interpreter_id,
                    earnings: session.billing.total_cost,
                });
        }
        SessionStatus::Cancelled => {
            session.cancellation = cancellation;
        }
        SessionStatus::Requested | SessionStatus::NoShow | SessionStatus::Rescheduled => {}
    }

    session.status = target;
    session.updated_at = now;
    session.version += 1;
    effect
}

pub fn apply_reschedule(
    session: &mut Session,
    new_start: DateTime<Utc>,
    duration_minutes: u32,
    reason: &str,
    now: DateTime<Utc>,
) {
    let old = session.schedule.clone();

    session
        .reschedule
        .original_start
        .get_or_insert(old.scheduled_start);
    session.reschedule.is_rescheduled = true;
    session.reschedule.rescheduled_count = session.reschedule.rescheduled_count.saturating_add(1);
    session.reschedule.last_reason = Some(reason.to_string()).filter(|r| !r.is_empty());

    session.schedule = SessionSchedule::new(new_start, duration_minutes);
    if duration_minutes != old.duration_minutes {
        session.billing.total_cost = cost_for_minutes(
            duration_minutes,
            session.billing.hourly_rate,
            session.billing.additional_fees,
        );
    }

    if session.status != SessionStatus::Confirmed {
        session.confirmed_at = Some(now);
    }
    session.status = SessionStatus::Confirmed;
    session.updated_at = now;
    session.version += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, mk_session};
    use chrono::Duration;

    #[test]
    fn minutes_round_half_up() {
        assert_eq!(rounded_minutes(at(10, 0), at(11, 0)), 60);
        assert_eq!(rounded_minutes(at(10, 0), at(10, 0) + Duration::seconds(89)), 1);
        assert_eq!(rounded_minutes(at(10, 0), at(10, 0) + Duration::seconds(90)), 2);
        assert_eq!(rounded_minutes(at(11, 0), at(10, 0)), 0);
    }

    #[test]
    fn completion_recomputes_cost_and_credits_earnings() {
        let iid = Uuid::new_v4();
        let mut s = mk_session(iid, SessionStatus::InProgress, at(10, 0), 60);
        s.schedule.actual_start = Some(at(10, 0));

        let effect = enter_status(&mut s, SessionStatus::Completed, at(11, 30), None);

        assert_eq!(s.schedule.actual_end, Some(at(11, 30)));
        assert_eq!(s.schedule.actual_duration_minutes, Some(90));
        assert_eq!(s.billing.total_cost, Decimal::new(12000, 2));
        assert_eq!(
            effect,
            Some(AggregateEffect::CompletionCredit {
                interpreter_id: iid,
                earnings: Decimal::new(12000, 2),
            })
        );
        assert_eq!(s.version, 1);
    }

    #[test]
    fn in_progress_keeps_an_existing_actual_start() {
        let mut s = mk_session(Uuid::new_v4(), SessionStatus::Confirmed, at(10, 0), 60);
        s.schedule.actual_start = Some(at(9, 58));

        assert!(enter_status(&mut s, SessionStatus::InProgress, at(10, 2), None).is_none());
        assert_eq!(s.schedule.actual_start, Some(at(9, 58)));
        assert_eq!(s.updated_at, at(10, 2));
    }

    #[test]
    fn cancellation_is_recorded() {
        let mut s = mk_session(Uuid::new_v4(), SessionStatus::Confirmed, at(10, 0), 60);
        let by = Uuid::new_v4();
        let c = Cancellation {
            reason: "double booked".into(),
            category: CancellationCategory::Other,
            cancelled_at: at(8, 0),
            cancelled_by: by,
        };

        assert!(enter_status(&mut s, SessionStatus::Cancelled, at(8, 0), Some(c.clone())).is_none());
        assert_eq!(s.status, SessionStatus::Cancelled);
        assert_eq!(s.cancellation, Some(c));
    }

    #[test]
    fn reschedule_tracks_lineage_and_reprices_on_new_duration() {
        let mut s = mk_session(Uuid::new_v4(), SessionStatus::Requested, at(10, 0), 60);

        apply_reschedule(&mut s, at(14, 0), 60, "client asked", at(8, 0));
        assert_eq!(s.status, SessionStatus::Confirmed);
        assert_eq!(s.confirmed_at, Some(at(8, 0)));
        assert_eq!(s.billing.total_cost, Decimal::new(80, 0));

        apply_reschedule(&mut s, at(16, 0), 90, "", at(9, 0));
        assert_eq!(s.reschedule.original_start, Some(at(10, 0)));
        assert_eq!(s.reschedule.rescheduled_count, 2);
        assert!(s.reschedule.is_rescheduled);
        assert_eq!(s.reschedule.last_reason, None);
        assert_eq!(s.schedule.scheduled_end, at(17, 30));
        assert_eq!(s.billing.total_cost, Decimal::new(12000, 2));
        // confirmed_at keeps the first confirmation
        assert_eq!(s.confirmed_at, Some(at(8, 0)));
        assert_eq!(s.version, 2);
    }
}
