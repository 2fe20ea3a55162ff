use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    InterpreterId, RaterRole, SessionId, SessionType, Specialization, UrgencyLevel, UserId,
};

labelled_enum! {
    pub enum SessionStatus {
        Requested => "REQUESTED",
        Confirmed => "CONFIRMED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
        NoShow => "NO_SHOW",
        Rescheduled => "RESCHEDULED",
    }
}

labelled_enum! {
    pub enum CancellationCategory {
        ClientRequest => "CLIENT_REQUEST",
        InterpreterUnavailable => "INTERPRETER_UNAVAILABLE",
        Emergency => "EMERGENCY",
        TechnicalIssue => "TECHNICAL_ISSUE",
        Other => "OTHER",
    }
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::NoShow
        )
    }

    /// Statuses that hold the interpreter's time and block overlapping bookings.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, SessionStatus::Confirmed | SessionStatus::InProgress)
    }
}

/// A concrete `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn new(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    /// Half-open overlap: touching intervals do not overlap.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && self.end > other.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSchedule {
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub scheduled_end: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub actual_duration_minutes: Option<u32>,
}

impl SessionSchedule {
    pub fn new(scheduled_start: DateTime<Utc>, duration_minutes: u32) -> Self {
        let slot = Slot::new(scheduled_start, duration_minutes);
        Self {
            scheduled_start,
            duration_minutes,
            scheduled_end: slot.end,
            actual_start: None,
            actual_end: None,
            actual_duration_minutes: None,
        }
    }

    pub fn slot(&self) -> Slot {
        Slot {
            start: self.scheduled_start,
            end: self.scheduled_end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBilling {
    /// Effective hourly rate, snapshotted when the interpreter was assigned.
    pub hourly_rate: Decimal,
    pub additional_fees: Decimal,
    pub total_cost: Decimal,
    pub pricing_version: u32,
}

/// A submitted rating. `overall` and each present sub-score are in `[1, 5]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScores {
    pub overall: u8,
    pub punctuality: Option<u8>,
    pub professionalism: Option<u8>,
    pub communication: Option<u8>,
    pub comment: Option<String>,
}

impl RatingScores {
    pub fn overall(overall: u8) -> Self {
        Self {
            overall,
            punctuality: None,
            professionalism: None,
            communication: None,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRating {
    pub scores: RatingScores,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RescheduleInfo {
    pub is_rescheduled: bool,
    pub rescheduled_count: u8,
    /// Start time as first booked, before any reschedule.
    pub original_start: Option<DateTime<Utc>>,
    pub last_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub reason: String,
    pub category: CancellationCategory,
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: SessionId,

    // Identity
    pub client_id: UserId,
    pub interpreter_id: Option<InterpreterId>,
    pub source_language: String,
    pub target_language: String,
    pub session_type: SessionType,
    pub specialization: Specialization,
    pub urgency: UrgencyLevel,

    pub schedule: SessionSchedule,
    pub status: SessionStatus,
    pub billing: SessionBilling,

    pub client_rating: Option<SessionRating>,
    pub interpreter_rating: Option<SessionRating>,

    pub reschedule: RescheduleInfo,
    pub cancellation: Option<Cancellation>,

    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter; bumped by every committed mutation.
    pub version: u64,
}

impl Session {
    pub fn slot(&self) -> Slot {
        self.schedule.slot()
    }

    pub fn is_emergency(&self) -> bool {
        self.urgency == UrgencyLevel::Emergency
    }

    pub fn rating_for(&self, role: RaterRole) -> Option<&SessionRating> {
        match role {
            RaterRole::Client => self.client_rating.as_ref(),
            RaterRole::Interpreter => self.interpreter_rating.as_ref(),
        }
    }

    /// Hours from `now` until the scheduled start; negative once started.
    pub fn hours_until_start(&self, now: DateTime<Utc>) -> f64 {
        (self.schedule.scheduled_start - now).num_seconds() as f64 / 3600.0
    }
}
