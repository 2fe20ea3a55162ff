mod common;

use booking_backend::BookingError;
use booking_backend::matching::MatchCriteria;
use booking_core::error::ValidationError;
use booking_core::interpreter::InterpreterStatus;
use booking_core::pricing::{QuoteBasis, QuoteRequest};
use booking_core::session::{CancellationCategory, RatingScores, SessionStatus};
use booking_core::types::{
    Actor, ContentType, RaterRole, SessionType, Specialization, UrgencyLevel,
};
use chrono::Duration;
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{at, clock, interpreter, memory_engine, request, sqlite_engine, t0};

fn dollars(v: i64) -> Decimal {
    Decimal::new(v, 0)
}

/* =========================
Pricing
========================= */

#[tokio::test]
async fn standard_general_hour_costs_the_base_rate() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();

    let s = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    assert_eq!(s.status, SessionStatus::Requested);
    assert_eq!(s.billing.hourly_rate, dollars(80));
    assert_eq!(s.billing.total_cost, Decimal::new(8000, 2));
    assert_eq!(s.billing.pricing_version, 1);
    assert_eq!(s.schedule.scheduled_end, at(11, 0));
}

#[tokio::test]
async fn urgent_legal_composes_multiplicatively() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();

    let mut req = request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60);
    req.urgency = UrgencyLevel::Urgent;
    req.specialization = Specialization::Legal;

    let s = engine.create_session(req).await.unwrap();
    // 80 × 1.6 × 2.0
    assert_eq!(s.billing.hourly_rate, dollars(256));
    assert_eq!(s.billing.total_cost, Decimal::new(25600, 2));
}

#[tokio::test]
async fn quote_is_deterministic() {
    let engine = memory_engine(clock());
    let req = QuoteRequest {
        source_language: "en".into(),
        target_language: "ja".into(),
        basis: QuoteBasis::Words(1_000),
        urgency: UrgencyLevel::Rush,
        content_type: ContentType::Legal,
        certified: true,
    };

    let a = engine.quote(&req).unwrap();
    let b = engine.quote(&req).unwrap();
    assert_eq!(a, b);
    assert!(a.total > Decimal::ZERO);

    let mut same = req.clone();
    same.target_language = "EN".into();
    assert!(matches!(
        engine.quote(&same),
        Err(BookingError::Validation(ValidationError::SameLanguage(_)))
    ));
}

/* =========================
Booking & matching
========================= */

#[tokio::test]
async fn auto_assignment_takes_the_best_ranked_candidate() {
    let engine = memory_engine(clock());
    engine.register_interpreter(interpreter()).await.unwrap();

    let mut v = interpreter();
    v.verification.identity_verified = true;
    let verified = engine.register_interpreter(v).await.unwrap();

    let s = engine
        .create_session(request(Uuid::new_v4(), None, at(10, 0), 60))
        .await
        .unwrap();
    assert_eq!(s.interpreter_id, Some(verified.interpreter_id));
}

#[tokio::test]
async fn auto_assignment_skips_booked_candidates() {
    let clock = clock();
    let engine = memory_engine(clock.clone());

    let mut v = interpreter();
    v.verification.identity_verified = true;
    let busy = engine.register_interpreter(v).await.unwrap();
    let free = engine.register_interpreter(interpreter()).await.unwrap();

    let first = engine
        .create_session(request(Uuid::new_v4(), Some(busy.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();
    engine
        .transition_status(
            first.session_id,
            SessionStatus::Confirmed,
            Actor::interpreter(busy.user_id),
        )
        .await
        .unwrap();

    let s = engine
        .create_session(request(Uuid::new_v4(), None, at(10, 30), 60))
        .await
        .unwrap();
    assert_eq!(s.interpreter_id, Some(free.interpreter_id));
}

#[tokio::test]
async fn no_candidate_is_not_found() {
    let engine = memory_engine(clock());

    let err = engine
        .create_session(request(Uuid::new_v4(), None, at(10, 0), 60))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { entity: "interpreter", .. }));

    let none = engine
        .find_candidates(&MatchCriteria {
            source_language: "en".into(),
            target_language: "es".into(),
            session_type: SessionType::InPerson,
            specialization: Specialization::General,
            scheduled_start: at(10, 0),
            duration_minutes: 60,
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn explicit_interpreter_must_be_bookable() {
    let engine = memory_engine(clock());
    let mut pending = interpreter();
    pending.status = InterpreterStatus::PendingApproval;
    let pending = engine.register_interpreter(pending).await.unwrap();

    let err = engine
        .create_session(request(Uuid::new_v4(), Some(pending.interpreter_id), at(10, 0), 60))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));

    let err = engine
        .create_session(request(Uuid::new_v4(), Some(Uuid::new_v4()), at(10, 0), 60))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { .. }));
}

#[tokio::test]
async fn booking_rejects_bad_input_before_touching_the_store() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let past = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0) - Duration::days(2), 60))
        .await
        .unwrap_err();
    assert!(matches!(past, BookingError::Validation(ValidationError::StartInPast)));

    let too_long = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 600))
        .await
        .unwrap_err();
    assert!(matches!(
        too_long,
        BookingError::Validation(ValidationError::DurationOutOfBounds { .. })
    ));

    let mut unknown = request(client, Some(i.interpreter_id), at(10, 0), 60);
    unknown.source_language = "xx".into();
    assert!(matches!(
        engine.create_session(unknown).await.unwrap_err(),
        BookingError::Validation(ValidationError::UnknownLanguage(_))
    ));

    assert_eq!(engine.counters().snapshot().sessions_created, 0);
}

#[tokio::test]
async fn booking_over_a_confirmed_session_conflicts() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();

    let s = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();
    engine
        .transition_status(s.session_id, SessionStatus::Confirmed, Actor::interpreter(i.user_id))
        .await
        .unwrap();

    let err = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 59), 30))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    // back-to-back is fine
    engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(11, 0), 30))
        .await
        .unwrap();
}

/* =========================
Transitions
========================= */

#[tokio::test]
async fn full_lifecycle_credits_the_interpreter() {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let me = Actor::interpreter(i.user_id);

    let s = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    let s = engine
        .transition_status(s.session_id, SessionStatus::Confirmed, me)
        .await
        .unwrap();
    assert_eq!(s.confirmed_at, Some(t0()));

    clock.set(at(10, 5));
    let s = engine
        .transition_status(s.session_id, SessionStatus::InProgress, me)
        .await
        .unwrap();
    assert_eq!(s.schedule.actual_start, Some(at(10, 5)));

    clock.set(at(11, 35));
    let s = engine
        .transition_status(s.session_id, SessionStatus::Completed, me)
        .await
        .unwrap();
    assert_eq!(s.schedule.actual_duration_minutes, Some(90));
    assert_eq!(s.billing.total_cost, Decimal::new(12000, 2));
    assert_eq!(s.version, 3);

    let stored = engine.get_session(s.session_id).await.unwrap();
    assert_eq!(stored, s);

    let snap = engine.counters().snapshot();
    assert_eq!(snap.sessions_confirmed, 1);
    assert_eq!(snap.sessions_completed, 1);
}

#[tokio::test]
async fn illegal_and_forbidden_transitions() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    let err = engine
        .transition_status(s.session_id, SessionStatus::Completed, Actor::admin(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::IllegalTransition {
            from: SessionStatus::Requested,
            to: SessionStatus::Completed
        }
    ));

    let err = engine
        .transition_status(s.session_id, SessionStatus::Confirmed, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    // someone else's interpreter profile
    let other = engine.register_interpreter(interpreter()).await.unwrap();
    let err = engine
        .transition_status(s.session_id, SessionStatus::Confirmed, Actor::interpreter(other.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    // nothing was written
    assert_eq!(engine.get_session(s.session_id).await.unwrap().version, 0);
}

#[tokio::test]
async fn terminal_sessions_stay_terminal() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let admin = Actor::admin(Uuid::new_v4());

    let s = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();
    engine
        .cancel(s.session_id, "plans changed", CancellationCategory::ClientRequest, admin)
        .await
        .unwrap();

    for target in [SessionStatus::Confirmed, SessionStatus::Cancelled] {
        let err = engine
            .transition_status(s.session_id, target, admin)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::IllegalTransition { .. }), "{target}");
    }

    let err = engine
        .cancel(s.session_id, "again", CancellationCategory::Other, admin)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let engine = memory_engine(clock());
    let err = engine
        .transition_status(Uuid::new_v4(), SessionStatus::Confirmed, Actor::admin(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { entity: "session", .. }));
}

/* =========================
Cancellation windows
========================= */

async fn cancel_at_notice(urgency: UrgencyLevel, hours_before: i64) -> Result<(), BookingError> {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let mut req = request(client, Some(i.interpreter_id), at(10, 0), 60);
    req.urgency = urgency;
    let s = engine.create_session(req).await.unwrap();

    clock.set(at(10, 0) - Duration::hours(hours_before));
    engine
        .cancel(
            s.session_id,
            "no longer needed",
            CancellationCategory::ClientRequest,
            Actor::client(client),
        )
        .await
        .map(|s| {
            assert_eq!(s.status, SessionStatus::Cancelled);
            let c = s.cancellation.unwrap();
            assert_eq!(c.cancelled_by, client);
            assert_eq!(c.reason, "no longer needed");
        })
}

#[tokio::test]
async fn standard_notice_window() {
    assert!(cancel_at_notice(UrgencyLevel::Standard, 25).await.is_ok());
    assert!(matches!(
        cancel_at_notice(UrgencyLevel::Standard, 10).await,
        Err(BookingError::NotEligible(_))
    ));
}

#[tokio::test]
async fn emergency_notice_window() {
    assert!(cancel_at_notice(UrgencyLevel::Emergency, 3).await.is_ok());
    assert!(matches!(
        cancel_at_notice(UrgencyLevel::Emergency, 1).await,
        Err(BookingError::NotEligible(_))
    ));
}

#[tokio::test]
async fn cancelling_requires_a_reason() {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    for actor in [Actor::interpreter(i.user_id), Actor::admin(Uuid::new_v4())] {
        let err = engine
            .transition_status(s.session_id, SessionStatus::Cancelled, actor)
            .await
            .unwrap_err();
        assert!(
            matches!(err, BookingError::Validation(ValidationError::MissingCancelReason)),
            "{err}"
        );
    }

    let err = engine
        .cancel(s.session_id, "   ", CancellationCategory::ClientRequest, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(ValidationError::MissingCancelReason)));

    let stored = engine.get_session(s.session_id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Requested);
    assert!(stored.cancellation.is_none());
}

#[tokio::test]
async fn admins_skip_the_notice_window() {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    clock.set(at(9, 0));
    let err = engine
        .cancel(s.session_id, "overslept", CancellationCategory::ClientRequest, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));

    let cancelled = engine
        .cancel(
            s.session_id,
            "venue closed",
            CancellationCategory::Emergency,
            Actor::admin(Uuid::new_v4()),
        )
        .await
        .unwrap();
    let c = cancelled.cancellation.unwrap();
    assert_eq!(c.reason, "venue closed");
    assert_eq!(c.category, CancellationCategory::Emergency);
}

#[tokio::test]
async fn clients_cannot_cancel_a_running_session() {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();
    let me = Actor::interpreter(i.user_id);

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();
    engine
        .transition_status(s.session_id, SessionStatus::Confirmed, me)
        .await
        .unwrap();
    engine
        .transition_status(s.session_id, SessionStatus::InProgress, me)
        .await
        .unwrap();

    let err = engine
        .cancel(s.session_id, "running late", CancellationCategory::ClientRequest, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
}

/* =========================
Reschedule
========================= */

#[tokio::test]
async fn client_moves_a_confirmed_session() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();
    let confirmed = engine
        .transition_status(s.session_id, SessionStatus::Confirmed, Actor::interpreter(i.user_id))
        .await
        .unwrap();

    let moved = engine
        .reschedule(s.session_id, at(14, 0), Some(90), "traffic", Actor::client(client))
        .await
        .unwrap();

    assert_eq!(moved.status, SessionStatus::Confirmed);
    assert_eq!(moved.confirmed_at, confirmed.confirmed_at);
    assert_eq!(moved.schedule.scheduled_start, at(14, 0));
    assert_eq!(moved.schedule.scheduled_end, at(15, 30));
    assert_eq!(moved.reschedule.rescheduled_count, 1);
    assert_eq!(moved.reschedule.original_start, Some(at(10, 0)));
    assert_eq!(moved.reschedule.last_reason.as_deref(), Some("traffic"));
    assert_eq!(moved.billing.total_cost, Decimal::new(12000, 2));
}

#[tokio::test]
async fn clients_never_confirm_a_session() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();
    let me = Actor::client(client);

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    let err = engine
        .transition_status(s.session_id, SessionStatus::Confirmed, me)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    // neither a same-slot nor a real move confirms a REQUESTED session
    for (start, minutes) in [(at(10, 0), None), (at(14, 0), None), (at(10, 0), Some(90))] {
        let err = engine
            .reschedule(s.session_id, start, minutes, "", me)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)), "{err}");
    }

    let stored = engine.get_session(s.session_id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Requested);
    assert_eq!(stored.confirmed_at, None);
    assert_eq!(stored.version, 0);

    // the interpreter may move it, which confirms it
    let moved = engine
        .reschedule(s.session_id, at(14, 0), None, "", Actor::interpreter(i.user_id))
        .await
        .unwrap();
    assert_eq!(moved.status, SessionStatus::Confirmed);
}

#[tokio::test]
async fn reschedule_to_the_same_slot_is_rejected() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let admin = Actor::admin(Uuid::new_v4());

    let s = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    for minutes in [None, Some(60)] {
        let err = engine
            .reschedule(s.session_id, at(10, 0), minutes, "", admin)
            .await
            .unwrap_err();
        assert!(
            matches!(err, BookingError::Validation(ValidationError::UnchangedSchedule)),
            "{err}"
        );
    }

    let stored = engine.get_session(s.session_id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Requested);
    assert_eq!(stored.reschedule.rescheduled_count, 0);
}

#[tokio::test]
async fn reschedule_into_a_held_slot_conflicts() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let me = Actor::interpreter(i.user_id);

    let held = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(14, 0), 60))
        .await
        .unwrap();
    engine
        .transition_status(held.session_id, SessionStatus::Confirmed, me)
        .await
        .unwrap();

    let s = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    let err = engine
        .reschedule(s.session_id, at(14, 30), None, "", me)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Conflict(_)));

    // moving within its own slot is not a conflict with itself
    let held_again = engine
        .reschedule(held.session_id, at(14, 15), None, "", me)
        .await
        .unwrap();
    assert_eq!(held_again.schedule.scheduled_start, at(14, 15));
}

#[tokio::test]
async fn reschedule_cap_applies_even_to_admins() {
    let engine = memory_engine(clock());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let admin = Actor::admin(Uuid::new_v4());

    let s = engine
        .create_session(request(Uuid::new_v4(), Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    for h in [11, 12, 13] {
        engine
            .reschedule(s.session_id, at(h, 0), None, "", admin)
            .await
            .unwrap();
    }

    let err = engine
        .reschedule(s.session_id, at(15, 0), None, "", admin)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));
}

#[tokio::test]
async fn reschedule_requires_notice_and_participation() {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();
    engine
        .transition_status(s.session_id, SessionStatus::Confirmed, Actor::interpreter(i.user_id))
        .await
        .unwrap();

    let err = engine
        .reschedule(s.session_id, at(14, 0), None, "", Actor::client(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    clock.set(at(2, 0));
    let err = engine
        .reschedule(s.session_id, at(14, 0), None, "", Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));
}

/* =========================
Ratings
========================= */

async fn completed_session(
    engine: &booking_backend::BookingEngine,
    clock: &booking_backend::time::ManualClock,
    interpreter_user: Uuid,
    interpreter_id: Uuid,
    client: Uuid,
    hour: u32,
) -> Uuid {
    let me = Actor::interpreter(interpreter_user);
    let s = engine
        .create_session(request(client, Some(interpreter_id), at(hour, 0), 60))
        .await
        .unwrap();
    for target in [SessionStatus::Confirmed, SessionStatus::InProgress] {
        engine.transition_status(s.session_id, target, me).await.unwrap();
    }
    clock.advance(Duration::minutes(60));
    engine
        .transition_status(s.session_id, SessionStatus::Completed, me)
        .await
        .unwrap();
    s.session_id
}

#[tokio::test]
async fn ratings_are_bilateral_and_set_once() {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();
    let sid = completed_session(&engine, &clock, i.user_id, i.interpreter_id, client, 10).await;

    let s = engine
        .rate(sid, RatingScores::overall(4), RaterRole::Client, Actor::client(client))
        .await
        .unwrap();
    assert_eq!(s.client_rating.unwrap().scores.overall, 4);

    let err = engine
        .rate(sid, RatingScores::overall(5), RaterRole::Client, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::AlreadyRated(RaterRole::Client)));

    let s = engine
        .rate(
            sid,
            RatingScores::overall(5),
            RaterRole::Interpreter,
            Actor::interpreter(i.user_id),
        )
        .await
        .unwrap();
    assert!(s.interpreter_rating.is_some());
}

#[tokio::test]
async fn rating_preconditions() {
    let clock = clock();
    let engine = memory_engine(clock.clone());
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();
    let sid = completed_session(&engine, &clock, i.user_id, i.interpreter_id, client, 10).await;

    let err = engine
        .rate(sid, RatingScores::overall(6), RaterRole::Client, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::Validation(ValidationError::ScoreOutOfRange { value: 6, .. })
    ));

    let mut sub = RatingScores::overall(5);
    sub.punctuality = Some(0);
    assert!(matches!(
        engine
            .rate(sid, sub, RaterRole::Client, Actor::client(client))
            .await
            .unwrap_err(),
        BookingError::Validation(_)
    ));

    // a client cannot rate as the interpreter
    let err = engine
        .rate(sid, RatingScores::overall(3), RaterRole::Interpreter, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    let open = engine
        .create_session(request(client, Some(i.interpreter_id), at(20, 0), 60))
        .await
        .unwrap();
    let err = engine
        .rate(open.session_id, RatingScores::overall(3), RaterRole::Client, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));
}

/* =========================
Registration
========================= */

#[tokio::test]
async fn registration_zeroes_aggregates_and_rejects_duplicates() {
    let engine = memory_engine(clock());
    let mut i = interpreter();
    i.stats.total_ratings = 50;
    i.stats.rating_sum = 250;
    i.stats.average_rating = 5.0;

    let stored = engine.register_interpreter(i.clone()).await.unwrap();
    assert_eq!(stored.stats.total_ratings, 0);
    assert_eq!(stored.stats.average_rating, 0.0);

    let err = engine.register_interpreter(i.clone()).await.unwrap_err();
    assert!(matches!(err, BookingError::Conflict(_)));

    let mut same_user = interpreter();
    same_user.user_id = i.user_id;
    assert!(matches!(
        engine.register_interpreter(same_user).await.unwrap_err(),
        BookingError::Conflict(_)
    ));

    let mut unsupported = interpreter();
    unsupported.languages[1].code = "tlh".into();
    assert!(matches!(
        engine.register_interpreter(unsupported).await.unwrap_err(),
        BookingError::Validation(ValidationError::UnknownLanguage(_))
    ));
}

/* =========================
Same scenarios over SQLite
========================= */

#[tokio::test]
async fn sqlite_lifecycle_and_rating_round_trip() {
    let clock = clock();
    let (engine, _db) = sqlite_engine(clock.clone()).await;
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let sid = completed_session(&engine, &clock, i.user_id, i.interpreter_id, client, 10).await;
    let s = engine
        .rate(sid, RatingScores::overall(5), RaterRole::Client, Actor::client(client))
        .await
        .unwrap();

    let stored = engine.get_session(sid).await.unwrap();
    assert_eq!(stored, s);
    assert_eq!(stored.status, SessionStatus::Completed);
    assert_eq!(stored.billing.total_cost, Decimal::new(8000, 2));

    let err = engine
        .rate(sid, RatingScores::overall(1), RaterRole::Client, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::AlreadyRated(RaterRole::Client)));
}

#[tokio::test]
async fn sqlite_cancellation_window() {
    let clock = clock();
    let (engine, _db) = sqlite_engine(clock.clone()).await;
    let i = engine.register_interpreter(interpreter()).await.unwrap();
    let client = Uuid::new_v4();

    let s = engine
        .create_session(request(client, Some(i.interpreter_id), at(10, 0), 60))
        .await
        .unwrap();

    clock.set(at(0, 0));
    let err = engine
        .cancel(s.session_id, "changed plans", CancellationCategory::ClientRequest, Actor::client(client))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));

    let err = engine
        .cancel(
            s.session_id,
            "sick",
            CancellationCategory::InterpreterUnavailable,
            Actor::interpreter(i.user_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEligible(_)));

    let cancelled = engine
        .cancel(
            s.session_id,
            "sick",
            CancellationCategory::InterpreterUnavailable,
            Actor::admin(Uuid::new_v4()),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.cancellation.as_ref().unwrap().reason, "sick");
    assert_eq!(engine.get_session(s.session_id).await.unwrap(), cancelled);
}
