use anyhow::Result;
use async_trait::async_trait;
use booking_core::session::{Session, Slot};
use booking_core::types::{InterpreterId, SessionId};
use rust_decimal::Decimal;

/// Re-checked inside the commit: no other CONFIRMED / IN_PROGRESS session of
/// `interpreter_id` may overlap `slot`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotGuard {
    pub interpreter_id: InterpreterId,
    pub slot: Slot,
}

/// Interpreter counter changes applied in the same atomic unit as a session write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateEffect {
    CompletionCredit {
        interpreter_id: InterpreterId,
        earnings: Decimal,
    },
    ClientRating {
        interpreter_id: InterpreterId,
        score: u8,
    },
}

/// A conditional session write.
///
/// Applied only if the stored version still equals `expected_version`;
/// `session.version` carries the new value.
#[derive(Clone, Debug)]
pub struct SessionCommit {
    pub session: Session,
    pub expected_version: u64,
    pub guard: Option<SlotGuard>,
    pub effect: Option<AggregateEffect>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// Someone else committed first; nothing was written.
    VersionMismatch,
    /// The guard found this blocking session; nothing was written.
    SlotTaken(SessionId),
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn fetch_by_id(&self, session_id: &SessionId) -> Result<Option<Session>>;

    /// Blocking (CONFIRMED / IN_PROGRESS) sessions of an interpreter that
    /// overlap `slot`, ordered by start.
    async fn find_overlapping(
        &self,
        interpreter_id: &InterpreterId,
        slot: &Slot,
        exclude: Option<&SessionId>,
    ) -> Result<Vec<Session>>;

    /// Every session assigned to an interpreter, ordered by start.
    async fn list_for_interpreter(&self, interpreter_id: &InterpreterId) -> Result<Vec<Session>>;

    async fn insert(&self, session: &Session, guard: Option<&SlotGuard>) -> Result<CommitOutcome>;

    async fn commit(&self, commit: &SessionCommit) -> Result<CommitOutcome>;
}
