use anyhow::Result;
use async_trait::async_trait;
use booking_core::interpreter::{AvailabilityStatus, Interpreter, InterpreterStatus};
use booking_core::types::{InterpreterId, SessionType, Specialization, UserId};

/// Capability filter applied by the store before availability is evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateFilter {
    pub source_language: String,
    pub target_language: String,
    pub session_type: SessionType,
    pub specialization: Specialization,
}

impl CandidateFilter {
    /// Active, live-available, and able to serve the request.
    pub fn matches(&self, i: &Interpreter) -> bool {
        i.status == InterpreterStatus::Active
            && i.availability == AvailabilityStatus::Available
            && i.session_types.contains(&self.session_type)
            && i.specializations.contains(&self.specialization)
            && i.covers_pair(&self.source_language, &self.target_language)
    }
}

#[async_trait]
pub trait InterpreterRepository: Send + Sync {
    async fn insert(&self, interpreter: &Interpreter) -> Result<()>;

    async fn fetch_by_id(&self, interpreter_id: &InterpreterId) -> Result<Option<Interpreter>>;

    async fn fetch_by_user_id(&self, user_id: &UserId) -> Result<Option<Interpreter>>;

    /// Interpreters passing `filter`, in no particular order.
    async fn query_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Interpreter>>;
}
