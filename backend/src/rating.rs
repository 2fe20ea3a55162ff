//! Bilateral session ratings.
//!
//! A client rating folds into the interpreter aggregate through an atomic
//! increment carried by the same commit as the session write.

use std::sync::Arc;

use booking_core::policy::authorize_rating;
use booking_core::rating::validate_scores;
use booking_core::session::{RatingScores, Session, SessionRating, SessionStatus};
use booking_core::types::{Actor, RaterRole, SessionId};
use chrono::{DateTime, Utc};
use tracing::{debug, field, info, instrument};

use crate::context::EngineContext;
use crate::error::{BookingError, BookingResult};
use crate::logger::annotate_span;
use crate::metrics::counters::bump;
use crate::session::repository::{AggregateEffect, CommitOutcome, SessionCommit};

/// Attempts before a rating that keeps losing version races gives up.
const MAX_ATTEMPTS: usize = 3;

pub struct RatingAggregator {
    ctx: Arc<EngineContext>,
}

impl RatingAggregator {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    #[instrument(
        skip(self, scores, actor),
        target = "rating",
        fields(session_id = %session_id, interpreter_id = field::Empty, overall = scores.overall)
    )]
    pub async fn rate(
        &self,
        session_id: SessionId,
        scores: RatingScores,
        rater: RaterRole,
        actor: Actor,
    ) -> BookingResult<Session> {
        validate_scores(&scores)?;
        let actor_ctx = self.ctx.resolve_actor(actor).await?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            // Client ratings touch the interpreter aggregate.
            let (mut session, _lock) = match rater {
                RaterRole::Client => self.ctx.load_locked(&session_id).await?,
                RaterRole::Interpreter => (self.ctx.load_session(&session_id).await?, None),
            };
            annotate_span(None, session.interpreter_id.as_ref());

            authorize_rating(&actor_ctx, &session, rater)?;
            if session.status != SessionStatus::Completed {
                return Err(BookingError::NotEligible(format!(
                    "only COMPLETED sessions can be rated; this one is {}",
                    session.status
                )));
            }
            if session.rating_for(rater).is_some() {
                return Err(BookingError::AlreadyRated(rater));
            }

            let expected_version = session.version;
            let effect = record_rating(&mut session, rater, scores.clone(), self.ctx.clock.now());
            let commit = SessionCommit {
                session,
                expected_version,
                guard: None,
                effect,
            };

            let outcome = self.ctx.try_commit(&commit).await?;
            if outcome == CommitOutcome::VersionMismatch && attempt < MAX_ATTEMPTS {
                // The other side may have rated meanwhile; reload and re-check.
                debug!(attempt, "rating lost a version race; retrying");
                continue;
            }
            self.ctx.expect_applied(&session_id, outcome)?;

            bump(&self.ctx.counters.ratings);
            info!(%rater, "rating recorded");
            return Ok(commit.session);
        }
    }
}

/// Fills the rater's slot and bumps the version.
///
/// Returns the aggregate change for client ratings of an assigned session.
pub fn record_rating(
    session: &mut Session,
    rater: RaterRole,
    scores: RatingScores,
    now: DateTime<Utc>,
) -> Option<AggregateEffect> {
    let overall = scores.overall;
    let rating = Some(SessionRating {
        scores,
        rated_at: now,
    });

    let effect = match rater {
        RaterRole::Client => {
            session.client_rating = rating;
            session
                .interpreter_id
                .map(|interpreter_id| AggregateEffect::ClientRating {
                    interpreter_id,
                    score: overall,
                })
        }
        RaterRole::Interpreter => {
            session.interpreter_rating = rating;
            None
        }
    };

    session.updated_at = now;
    session.version += 1;
    effect
}
