//! In-process store implementing both repositories.
//!
//! One mutex covers interpreters and sessions, so a session commit and its
//! aggregate effect land together exactly as in the SQL transaction.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use booking_core::interpreter::Interpreter;
use booking_core::rating::{apply_client_rating, apply_completion};
use booking_core::session::{Session, Slot};
use booking_core::types::{InterpreterId, SessionId, UserId};
use tokio::sync::Mutex;

use crate::conflict::blocks;
use crate::interpreter::repository::{CandidateFilter, InterpreterRepository};
use crate::session::repository::{
    AggregateEffect, CommitOutcome, SessionCommit, SessionRepository, SlotGuard,
};

#[derive(Default)]
struct State {
    interpreters: HashMap<InterpreterId, Interpreter>,
    sessions: HashMap<SessionId, Session>,
}

impl State {
    fn first_blocking(&self, guard: &SlotGuard, exclude: &SessionId) -> Option<SessionId> {
        self.sessions
            .values()
            .find(|s| blocks(s, &guard.interpreter_id, &guard.slot, Some(exclude)))
            .map(|s| s.session_id)
    }

    fn apply_effect(&mut self, effect: &AggregateEffect) -> anyhow::Result<()> {
        let interpreter_id = match effect {
            AggregateEffect::CompletionCredit { interpreter_id, .. }
            | AggregateEffect::ClientRating { interpreter_id, .. } => *interpreter_id,
        };
        let interpreter = self.interpreters.get_mut(&interpreter_id).ok_or_else(|| {
            anyhow!("interpreter {interpreter_id} missing while applying aggregate effect")
        })?;

        match *effect {
            AggregateEffect::CompletionCredit { earnings, .. } => {
                apply_completion(&mut interpreter.stats, earnings)
            }
            AggregateEffect::ClientRating { score, .. } => {
                apply_client_rating(&mut interpreter.stats, score)
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InterpreterRepository for MemoryStore {
    async fn insert(&self, interpreter: &Interpreter) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if state.interpreters.contains_key(&interpreter.interpreter_id) {
            bail!("interpreter {} already exists", interpreter.interpreter_id);
        }
        if state
            .interpreters
            .values()
            .any(|i| i.user_id == interpreter.user_id)
        {
            bail!("user {} already has an interpreter profile", interpreter.user_id);
        }

        state
            .interpreters
            .insert(interpreter.interpreter_id, interpreter.clone());
        Ok(())
    }

    async fn fetch_by_id(&self, interpreter_id: &InterpreterId) -> anyhow::Result<Option<Interpreter>> {
        Ok(self.state.lock().await.interpreters.get(interpreter_id).cloned())
    }

    async fn fetch_by_user_id(&self, user_id: &UserId) -> anyhow::Result<Option<Interpreter>> {
        Ok(self
            .state
            .lock()
            .await
            .interpreters
            .values()
            .find(|i| &i.user_id == user_id)
            .cloned())
    }

    async fn query_candidates(&self, filter: &CandidateFilter) -> anyhow::Result<Vec<Interpreter>> {
        Ok(self
            .state
            .lock()
            .await
            .interpreters
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn fetch_by_id(&self, session_id: &SessionId) -> anyhow::Result<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(session_id).cloned())
    }

    async fn find_overlapping(
        &self,
        interpreter_id: &InterpreterId,
        slot: &Slot,
        exclude: Option<&SessionId>,
    ) -> anyhow::Result<Vec<Session>> {
        let state = self.state.lock().await;
        let mut out: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| blocks(s, interpreter_id, slot, exclude))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.schedule.scheduled_start);
        Ok(out)
    }

    async fn list_for_interpreter(
        &self,
        interpreter_id: &InterpreterId,
    ) -> anyhow::Result<Vec<Session>> {
        let state = self.state.lock().await;
        let mut out: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.interpreter_id.as_ref() == Some(interpreter_id))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.schedule.scheduled_start);
        Ok(out)
    }

    async fn insert(
        &self,
        session: &Session,
        guard: Option<&SlotGuard>,
    ) -> anyhow::Result<CommitOutcome> {
        let mut state = self.state.lock().await;

        if state.sessions.contains_key(&session.session_id) {
            bail!("session {} already exists", session.session_id);
        }
        if let Some(g) = guard {
            if let Some(blocking) = state.first_blocking(g, &session.session_id) {
                return Ok(CommitOutcome::SlotTaken(blocking));
            }
        }

        state.sessions.insert(session.session_id, session.clone());
        Ok(CommitOutcome::Applied)
    }

    async fn commit(&self, commit: &SessionCommit) -> anyhow::Result<CommitOutcome> {
        let mut state = self.state.lock().await;
        let id = commit.session.session_id;

        let current_version = match state.sessions.get(&id) {
            Some(s) => s.version,
            None => bail!("session {id} vanished before commit"),
        };
        if current_version != commit.expected_version {
            return Ok(CommitOutcome::VersionMismatch);
        }

        if let Some(g) = &commit.guard {
            if let Some(blocking) = state.first_blocking(g, &id) {
                return Ok(CommitOutcome::SlotTaken(blocking));
            }
        }

        // Effect first: if the interpreter is missing nothing is written.
        if let Some(effect) = &commit.effect {
            state.apply_effect(effect)?;
        }
        state.sessions.insert(id, commit.session.clone());

        Ok(CommitOutcome::Applied)
    }
}
