use std::cmp::Ordering;

use crate::interpreter::Interpreter;

/// Verified first, then higher average rating, then more completed sessions.
/// Remaining ties break on id so the order is stable across calls.
pub fn compare_candidates(a: &Interpreter, b: &Interpreter) -> Ordering {
    b.is_verified()
        .cmp(&a.is_verified())
        .then_with(|| b.stats.average_rating.total_cmp(&a.stats.average_rating))
        .then_with(|| {
            b.stats
                .total_sessions_completed
                .cmp(&a.stats.total_sessions_completed)
        })
        .then_with(|| a.interpreter_id.cmp(&b.interpreter_id))
}

pub fn rank_candidates(mut candidates: Vec<Interpreter>, limit: usize) -> Vec<Interpreter> {
    candidates.sort_by(compare_candidates);
    candidates.truncate(limit);
    candidates
}
