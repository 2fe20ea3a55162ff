//! Candidate selection for a requested slot.

use std::sync::Arc;

use anyhow::Context;
use booking_core::availability::is_available_at;
use booking_core::error::ValidationError;
use booking_core::interpreter::Interpreter;
use booking_core::pricing::validate_language_pair;
use booking_core::ranking::rank_candidates;
use booking_core::types::{SessionType, Specialization};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::context::EngineContext;
use crate::error::BookingResult;
use crate::interpreter::repository::CandidateFilter;
use crate::logger::warn_if_slow;
use crate::metrics::counters::bump;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchCriteria {
    pub source_language: String,
    pub target_language: String,
    pub session_type: SessionType,
    pub specialization: Specialization,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl MatchCriteria {
    pub fn filter(&self) -> CandidateFilter {
        CandidateFilter {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            session_type: self.session_type,
            specialization: self.specialization,
        }
    }
}

/// Read-only and lock-free. The result is advisory: anything acting on it
/// re-checks conflicts before writing.
pub struct MatchingEngine {
    ctx: Arc<EngineContext>,
}

impl MatchingEngine {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Qualified interpreters available at the scheduled start, best first.
    ///
    /// No match is `Ok(vec![])`.
    #[instrument(
        skip(self, criteria),
        target = "matching",
        fields(
            pair = %format!("{}-{}", criteria.source_language, criteria.target_language),
            session_type = %criteria.session_type,
            specialization = %criteria.specialization,
            start = %criteria.scheduled_start,
        )
    )]
    pub async fn find_candidates(&self, criteria: &MatchCriteria) -> BookingResult<Vec<Interpreter>> {
        bump(&self.ctx.counters.match_requests);

        validate_language_pair(
            &criteria.source_language,
            &criteria.target_language,
            &self.ctx.pricing,
        )?;
        if criteria.duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration.into());
        }

        let filter = criteria.filter();
        let pool = warn_if_slow("db_query_candidates", self.ctx.slow_after, async {
            self.ctx.interpreters.query_candidates(&filter).await
        })
        .await
        .context("candidate query failed")?;

        let capable = pool.len();
        let available: Vec<Interpreter> = pool
            .into_iter()
            .filter(|i| is_available_at(&i.schedule, criteria.scheduled_start))
            .collect();

        debug!(capable, available = available.len(), "candidates filtered");

        let ranked = rank_candidates(available, self.ctx.candidate_limit);
        if ranked.is_empty() {
            bump(&self.ctx.counters.match_empty);
            info!("no matching interpreter");
        }
        Ok(ranked)
    }
}
