//! State shared by the lifecycle, rating and matching services.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use booking_core::eligibility::NoticeRules;
use booking_core::interpreter::Interpreter;
use booking_core::policy::ActorContext;
use booking_core::pricing::PricingConfig;
use booking_core::session::Session;
use booking_core::types::{Actor, InterpreterId, Role, SessionId};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::config::BookingConfig;
use crate::conflict::ConflictDetector;
use crate::error::{BookingError, BookingResult};
use crate::interpreter::repository::InterpreterRepository;
use crate::locks::InterpreterLocks;
use crate::logger::warn_if_slow;
use crate::metrics::counters::{Counters, bump};
use crate::session::repository::{CommitOutcome, SessionCommit, SessionRepository, SlotGuard};
use crate::time::Clock;

pub(crate) struct EngineContext {
    pub interpreters: Arc<dyn InterpreterRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub conflicts: ConflictDetector,
    pub locks: InterpreterLocks,
    pub clock: Arc<dyn Clock>,
    pub pricing: Arc<PricingConfig>,
    pub notice: NoticeRules,
    pub candidate_limit: usize,
    pub counters: Counters,
    pub slow_after: Duration,
}

impl EngineContext {
    pub fn new(
        interpreters: Arc<dyn InterpreterRepository>,
        sessions: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        cfg: &BookingConfig,
    ) -> Self {
        let slow_after = Duration::from_millis(cfg.slow_store_ms);
        Self {
            conflicts: ConflictDetector::new(sessions.clone(), slow_after),
            interpreters,
            sessions,
            locks: InterpreterLocks::new(),
            clock,
            pricing: Arc::new(cfg.pricing.clone()),
            notice: cfg.notice,
            candidate_limit: cfg.candidate_limit,
            counters: Counters::default(),
            slow_after,
        }
    }

    pub async fn load_session(&self, session_id: &SessionId) -> BookingResult<Session> {
        let found = warn_if_slow("db_fetch_session", self.slow_after, async {
            self.sessions.fetch_by_id(session_id).await
        })
        .await
        .with_context(|| format!("fetch session {session_id}"))?;

        found.ok_or_else(|| BookingError::not_found("session", session_id))
    }

    pub async fn load_interpreter(&self, interpreter_id: &InterpreterId) -> BookingResult<Interpreter> {
        let found = warn_if_slow("db_fetch_interpreter", self.slow_after, async {
            self.interpreters.fetch_by_id(interpreter_id).await
        })
        .await
        .with_context(|| format!("fetch interpreter {interpreter_id}"))?;

        found.ok_or_else(|| BookingError::not_found("interpreter", interpreter_id))
    }

    /// Attaches the caller's interpreter record, if the caller is one.
    ///
    /// An interpreter-role user without a profile resolves to `None` and is
    /// then treated as a participant of nothing.
    pub async fn resolve_actor(&self, actor: Actor) -> BookingResult<ActorContext> {
        if actor.role != Role::Interpreter {
            return Ok(ActorContext::new(actor, None));
        }

        let profile = self
            .interpreters
            .fetch_by_user_id(&actor.user_id)
            .await
            .with_context(|| format!("resolve interpreter for user {}", actor.user_id))?;

        if profile.is_none() {
            debug!(user_id = %actor.user_id, "interpreter actor has no profile");
        }
        Ok(ActorContext::new(actor, profile.map(|i| i.interpreter_id)))
    }

    /// Loads a session and, if it has an interpreter, holds that
    /// interpreter's lock. The returned copy is read after the lock is taken.
    pub async fn load_locked(
        &self,
        session_id: &SessionId,
    ) -> BookingResult<(Session, Option<OwnedMutexGuard<()>>)> {
        let first = self.load_session(session_id).await?;
        let Some(interpreter_id) = first.interpreter_id else {
            return Ok((first, None));
        };

        let guard = self.locks.acquire(interpreter_id).await;
        let fresh = self.load_session(session_id).await?;
        Ok((fresh, Some(guard)))
    }

    /// Advisory overlap check; the commit's guard is the authority.
    pub async fn ensure_slot_free(&self, guard: &SlotGuard, exclude: Option<&SessionId>) -> BookingResult<()> {
        let hit = self
            .conflicts
            .find_conflict(&guard.interpreter_id, &guard.slot, exclude)
            .await?;

        match hit {
            Some(existing) => {
                bump(&self.counters.slot_conflicts);
                Err(slot_taken(&existing.session_id))
            }
            None => Ok(()),
        }
    }

    /// Maps any outcome other than `Applied` to `Conflict`.
    pub async fn commit(&self, commit: &SessionCommit) -> BookingResult<()> {
        let outcome = self.try_commit(commit).await?;
        self.expect_applied(&commit.session.session_id, outcome)
    }

    pub async fn try_commit(&self, commit: &SessionCommit) -> BookingResult<CommitOutcome> {
        let id = commit.session.session_id;
        let outcome = warn_if_slow("db_commit_session", self.slow_after, async {
            self.sessions.commit(commit).await
        })
        .await
        .with_context(|| format!("commit session {id}"))?;
        Ok(outcome)
    }

    pub fn expect_applied(&self, session_id: &SessionId, outcome: CommitOutcome) -> BookingResult<()> {
        match outcome {
            CommitOutcome::Applied => Ok(()),
            CommitOutcome::VersionMismatch => {
                bump(&self.counters.version_mismatches);
                warn!(session_id = %session_id, "lost optimistic race");
                Err(BookingError::Conflict(format!(
                    "session {session_id} was modified concurrently"
                )))
            }
            CommitOutcome::SlotTaken(blocking) => {
                bump(&self.counters.slot_conflicts);
                warn!(session_id = %session_id, blocking = %blocking, "slot taken at commit");
                Err(slot_taken(&blocking))
            }
        }
    }
}

fn slot_taken(blocking: &SessionId) -> BookingError {
    BookingError::Conflict(format!("interpreter is already booked by session {blocking}"))
}
