//! The booking engine: the single entry point callers talk to.

use std::sync::Arc;

use anyhow::Context;
use booking_core::error::ValidationError;
use booking_core::interpreter::{Interpreter, InterpreterStats};
use booking_core::pricing::{PricingBreakdown, QuoteRequest, quote};
use booking_core::session::{CancellationCategory, RatingScores, Session, SessionStatus};
use booking_core::types::{Actor, RaterRole, SessionId};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::config::BookingConfig;
use crate::context::EngineContext;
use crate::db::Db;
use crate::error::{BookingError, BookingResult};
use crate::interpreter::repository::InterpreterRepository;
use crate::interpreter::repository_sqlx::SqlxInterpreterRepository;
use crate::lifecycle::{BookingRequest, SessionLifecycle};
use crate::matching::{MatchCriteria, MatchingEngine};
use crate::memory_store::MemoryStore;
use crate::metrics::counters::Counters;
use crate::rating::RatingAggregator;
use crate::session::repository::SessionRepository;
use crate::session::repository_sqlx::SqlxSessionRepository;
use crate::time::Clock;

pub struct BookingEngine {
    ctx: Arc<EngineContext>,
    matching: Arc<MatchingEngine>,
    lifecycle: SessionLifecycle,
    ratings: RatingAggregator,
}

impl BookingEngine {
    pub fn new(
        interpreters: Arc<dyn InterpreterRepository>,
        sessions: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        cfg: &BookingConfig,
    ) -> Self {
        let ctx = Arc::new(EngineContext::new(interpreters, sessions, clock, cfg));
        let matching = Arc::new(MatchingEngine::new(ctx.clone()));
        Self {
            lifecycle: SessionLifecycle::new(ctx.clone(), matching.clone()),
            ratings: RatingAggregator::new(ctx.clone()),
            matching,
            ctx,
        }
    }

    pub fn in_memory(clock: Arc<dyn Clock>, cfg: &BookingConfig) -> Self {
        let store = MemoryStore::new();
        Self::new(Arc::new(store.clone()), Arc::new(store), clock, cfg)
    }

    /// Both repositories share `db`'s pool; the schema must already exist.
    pub fn with_sqlx(db: &Db, clock: Arc<dyn Clock>, cfg: &BookingConfig) -> Self {
        Self::new(
            Arc::new(SqlxInterpreterRepository::new(db.pool.clone())),
            Arc::new(SqlxSessionRepository::new(db.pool.clone())),
            clock,
            cfg,
        )
    }

    pub fn counters(&self) -> &Counters {
        &self.ctx.counters
    }

    pub async fn find_candidates(&self, criteria: &MatchCriteria) -> BookingResult<Vec<Interpreter>> {
        self.matching.find_candidates(criteria).await
    }

    pub async fn create_session(&self, request: BookingRequest) -> BookingResult<Session> {
        self.lifecycle.create_session(request).await
    }

    pub async fn transition_status(
        &self,
        session_id: SessionId,
        target: SessionStatus,
        actor: Actor,
    ) -> BookingResult<Session> {
        self.lifecycle
            .transition_status(session_id, target, actor)
            .await
    }

    pub async fn reschedule(
        &self,
        session_id: SessionId,
        new_start: DateTime<Utc>,
        new_duration_minutes: Option<u32>,
        reason: &str,
        actor: Actor,
    ) -> BookingResult<Session> {
        self.lifecycle
            .reschedule(session_id, new_start, new_duration_minutes, reason, actor)
            .await
    }

    pub async fn cancel(
        &self,
        session_id: SessionId,
        reason: &str,
        category: CancellationCategory,
        actor: Actor,
    ) -> BookingResult<Session> {
        self.lifecycle
            .cancel(session_id, reason, category, actor)
            .await
    }

    pub async fn rate(
        &self,
        session_id: SessionId,
        scores: RatingScores,
        rater: RaterRole,
        actor: Actor,
    ) -> BookingResult<Session> {
        self.ratings.rate(session_id, scores, rater, actor).await
    }

    pub fn quote(&self, request: &QuoteRequest) -> BookingResult<PricingBreakdown> {
        Ok(quote(request, &self.ctx.pricing)?)
    }

    pub async fn get_session(&self, session_id: SessionId) -> BookingResult<Session> {
        self.ctx.load_session(&session_id).await
    }

    /// Validates and stores a new interpreter profile.
    ///
    /// Aggregates are never taken from the caller: the stored record starts
    /// with zeroed counters.
    #[instrument(
        skip(self, interpreter),
        target = "engine",
        fields(interpreter_id = %interpreter.interpreter_id)
    )]
    pub async fn register_interpreter(&self, mut interpreter: Interpreter) -> BookingResult<Interpreter> {
        interpreter.stats = InterpreterStats::default();
        interpreter.validate()?;
        for skill in &interpreter.languages {
            if !self.ctx.pricing.is_supported(&skill.code) {
                return Err(ValidationError::UnknownLanguage(skill.code.clone()).into());
            }
        }

        let repo = &self.ctx.interpreters;
        if repo
            .fetch_by_id(&interpreter.interpreter_id)
            .await
            .context("check interpreter id")?
            .is_some()
        {
            return Err(BookingError::Conflict(format!(
                "interpreter {} already exists",
                interpreter.interpreter_id
            )));
        }
        if repo
            .fetch_by_user_id(&interpreter.user_id)
            .await
            .context("check interpreter user")?
            .is_some()
        {
            return Err(BookingError::Conflict(format!(
                "user {} already has an interpreter profile",
                interpreter.user_id
            )));
        }

        repo.insert(&interpreter)
            .await
            .with_context(|| format!("insert interpreter {}", interpreter.interpreter_id))?;

        info!("interpreter registered");
        Ok(interpreter)
    }
}
