//! Double-booking detection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use booking_core::session::{Session, Slot};
use booking_core::types::{InterpreterId, SessionId};
use tracing::{debug, instrument};

use crate::logger::warn_if_slow;
use crate::session::repository::SessionRepository;

/// True if `existing` holds `interpreter_id`'s time during `slot`.
///
/// Only CONFIRMED and IN_PROGRESS sessions hold time; REQUESTED is tentative.
pub fn blocks(
    existing: &Session,
    interpreter_id: &InterpreterId,
    slot: &Slot,
    exclude: Option<&SessionId>,
) -> bool {
    existing.interpreter_id.as_ref() == Some(interpreter_id)
        && existing.status.blocks_slot()
        && Some(&existing.session_id) != exclude
        && existing.slot().overlaps(slot)
}

pub struct ConflictDetector {
    sessions: Arc<dyn SessionRepository>,
    slow_after: Duration,
}

impl ConflictDetector {
    pub fn new(sessions: Arc<dyn SessionRepository>, slow_after: Duration) -> Self {
        Self {
            sessions,
            slow_after,
        }
    }

    /// Earliest blocking session overlapping `slot`, if any.
    ///
    /// Advisory outside a commit; commits repeat the check through `SlotGuard`.
    #[instrument(
        skip(self),
        target = "conflict",
        fields(interpreter_id = %interpreter_id, start = %slot.start, end = %slot.end)
    )]
    pub async fn find_conflict(
        &self,
        interpreter_id: &InterpreterId,
        slot: &Slot,
        exclude: Option<&SessionId>,
    ) -> anyhow::Result<Option<Session>> {
        let found = warn_if_slow("db_find_overlapping", self.slow_after, async {
            self.sessions
                .find_overlapping(interpreter_id, slot, exclude)
                .await
        })
        .await
        .context("overlap query failed")?;

        let first = found.into_iter().next();
        if let Some(s) = &first {
            debug!(conflicting_session = %s.session_id, "slot already held");
        }
        Ok(first)
    }
}
