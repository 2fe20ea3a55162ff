use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{InterpreterId, SessionType, Specialization, UserId, normalize_language};

labelled_enum! {
    pub enum Proficiency {
        Native => "NATIVE",
        Fluent => "FLUENT",
        Professional => "PROFESSIONAL",
        Conversational => "CONVERSATIONAL",
    }
}

labelled_enum! {
    /// Live presence, as set by the interpreter.
    pub enum AvailabilityStatus {
        Available => "AVAILABLE",
        Busy => "BUSY",
        Break => "BREAK",
        Offline => "OFFLINE",
    }
}

labelled_enum! {
    /// Account lifecycle, as set by platform admins.
    pub enum InterpreterStatus {
        PendingApproval => "PENDING_APPROVAL",
        Active => "ACTIVE",
        Inactive => "INACTIVE",
        Suspended => "SUSPENDED",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub code: String,
    pub proficiency: Proficiency,
}

/// Per-session-type override. Either field may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionTypeRate {
    pub hourly_rate: Option<Decimal>,
    pub minimum_duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    pub base_hourly_rate: Decimal,
    #[serde(default)]
    pub session_type_rates: BTreeMap<SessionType, SessionTypeRate>,
    #[serde(default)]
    pub specialization_multipliers: BTreeMap<Specialization, Decimal>,
}

impl RateCard {
    pub fn flat(base_hourly_rate: Decimal) -> Self {
        Self {
            base_hourly_rate,
            session_type_rates: BTreeMap::new(),
            specialization_multipliers: BTreeMap::new(),
        }
    }
}

/// One weekly availability window, in the schedule's local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    /// IANA name, kept for display. Evaluation uses `utc_offset_minutes`.
    pub timezone: String,
    pub utc_offset_minutes: i32,
    pub windows: Vec<ScheduleWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Verification {
    pub identity_verified: bool,
    pub background_checked: bool,
    pub certified: bool,
}

/// Counters owned by the interpreter aggregate.
///
/// `rating_sum` is the integer running sum of client scores; the average is
/// always `rating_sum / total_ratings`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterpreterStats {
    pub total_sessions_completed: u64,
    pub rating_sum: u64,
    pub total_ratings: u64,
    pub average_rating: f64,
    pub total_earnings: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interpreter {
    pub interpreter_id: InterpreterId,
    pub user_id: UserId,

    // Capability
    pub languages: Vec<LanguageSkill>,
    pub specializations: Vec<Specialization>,
    pub session_types: Vec<SessionType>,

    // Commercial
    pub rates: RateCard,

    // Availability
    pub schedule: WeeklySchedule,
    pub availability: AvailabilityStatus,

    // Lifecycle
    pub status: InterpreterStatus,
    pub verification: Verification,

    pub stats: InterpreterStats,
    pub created_at: DateTime<Utc>,
}

impl Interpreter {
    pub fn speaks(&self, code: &str) -> bool {
        let code = normalize_language(code);
        self.languages
            .iter()
            .any(|l| normalize_language(&l.code) == code)
    }

    /// Both languages must be listed; direction does not matter.
    pub fn covers_pair(&self, source: &str, target: &str) -> bool {
        self.speaks(source) && self.speaks(target)
    }

    pub fn is_verified(&self) -> bool {
        self.verification.identity_verified
    }

    pub fn is_bookable(&self) -> bool {
        self.status == InterpreterStatus::Active
            && self.availability == AvailabilityStatus::Available
    }

    /// Structural checks applied before a record is accepted into a store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.languages.is_empty() {
            return Err(ValidationError::InvalidInterpreter(
                "at least one language is required".into(),
            ));
        }
        if self.rates.base_hourly_rate <= Decimal::ZERO {
            return Err(ValidationError::InvalidInterpreter(
                "base hourly rate must be positive".into(),
            ));
        }
        for w in &self.schedule.windows {
            if w.day_of_week > 6 {
                return Err(ValidationError::InvalidInterpreter(format!(
                    "day_of_week {} is outside 0..=6",
                    w.day_of_week
                )));
            }
            if w.end < w.start {
                return Err(ValidationError::InvalidInterpreter(format!(
                    "window on day {} ends before it starts",
                    w.day_of_week
                )));
            }
        }
        if self.stats.total_earnings < Decimal::ZERO {
            return Err(ValidationError::InvalidInterpreter(
                "total earnings must not be negative".into(),
            ));
        }
        Ok(())
    }
}
