use crate::session::SessionStatus;

/// Outgoing edges of the session status graph. Terminal statuses have none.
pub fn allowed_targets(from: SessionStatus) -> &'static [SessionStatus] {
    use SessionStatus::*;

    match from {
        Requested => &[Confirmed, Cancelled],
        Confirmed => &[InProgress, Cancelled, Rescheduled],
        InProgress => &[Completed, Cancelled],
        Rescheduled => &[Confirmed, Cancelled],
        Completed | Cancelled | NoShow => &[],
    }
}

pub fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
    allowed_targets(from).contains(&to)
}
