use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub sessions_created: Arc<AtomicU64>,
    pub sessions_confirmed: Arc<AtomicU64>,
    pub sessions_completed: Arc<AtomicU64>,
    pub sessions_cancelled: Arc<AtomicU64>,
    pub reschedules: Arc<AtomicU64>,
    pub ratings: Arc<AtomicU64>,

    // lost races
    pub slot_conflicts: Arc<AtomicU64>,
    pub version_mismatches: Arc<AtomicU64>,

    pub match_requests: Arc<AtomicU64>,
    pub match_empty: Arc<AtomicU64>,
}

/// Point-in-time copy of [`Counters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub sessions_created: u64,
    pub sessions_confirmed: u64,
    pub sessions_completed: u64,
    pub sessions_cancelled: u64,
    pub reschedules: u64,
    pub ratings: u64,
    pub slot_conflicts: u64,
    pub version_mismatches: u64,
    pub match_requests: u64,
    pub match_empty: u64,
}

pub fn bump(c: &AtomicU64) {
    c.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    pub fn snapshot(&self) -> CounterSnapshot {
        let r = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);
        CounterSnapshot {
            sessions_created: r(&self.sessions_created),
            sessions_confirmed: r(&self.sessions_confirmed),
            sessions_completed: r(&self.sessions_completed),
            sessions_cancelled: r(&self.sessions_cancelled),
            reschedules: r(&self.reschedules),
            ratings: r(&self.ratings),
            slot_conflicts: r(&self.slot_conflicts),
            version_mismatches: r(&self.version_mismatches),
            match_requests: r(&self.match_requests),
            match_empty: r(&self.match_empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_cells() {
        let a = Counters::default();
        let b = a.clone();
        bump(&a.ratings);
        bump(&b.ratings);
        assert_eq!(a.snapshot().ratings, 2);
        assert_eq!(b.snapshot(), a.snapshot());
    }
}
