//! Fixtures shared by the unit tests of this crate.

use booking_core::interpreter::{
    AvailabilityStatus, Interpreter, InterpreterStats, InterpreterStatus, LanguageSkill,
    Proficiency, RateCard, ScheduleWindow, Verification, WeeklySchedule,
};
use booking_core::session::{
    RescheduleInfo, Session, SessionBilling, SessionSchedule, SessionStatus,
};
use booking_core::types::{SessionType, Specialization, UrgencyLevel};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// 2026-03-02 (a Monday) at `h:m` UTC.
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

pub fn mk_session(
    interpreter_id: Uuid,
    status: SessionStatus,
    start: DateTime<Utc>,
    minutes: u32,
) -> Session {
    Session {
        session_id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        interpreter_id: Some(interpreter_id),
        source_language: "en".into(),
        target_language: "es".into(),
        session_type: SessionType::Video,
        specialization: Specialization::General,
        urgency: UrgencyLevel::Standard,
        schedule: SessionSchedule::new(start, minutes),
        status,
        billing: SessionBilling {
            hourly_rate: Decimal::new(80, 0),
            additional_fees: Decimal::ZERO,
            total_cost: Decimal::new(80, 0),
            pricing_version: 1,
        },
        client_rating: None,
        interpreter_rating: None,
        reschedule: RescheduleInfo::default(),
        cancellation: None,
        confirmed_at: None,
        created_at: start,
        updated_at: start,
        version: 0,
    }
}

/// Active en/es video interpreter, available every day 00:00-23:59 UTC.
pub fn mk_interpreter() -> Interpreter {
    Interpreter {
        interpreter_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        languages: vec![
            LanguageSkill {
                code: "en".into(),
                proficiency: Proficiency::Native,
            },
            LanguageSkill {
                code: "es".into(),
                proficiency: Proficiency::Fluent,
            },
        ],
        specializations: vec![Specialization::General, Specialization::Legal],
        session_types: vec![SessionType::Video, SessionType::Phone],
        rates: RateCard::flat(Decimal::new(80, 0)),
        schedule: WeeklySchedule {
            timezone: "UTC".into(),
            utc_offset_minutes: 0,
            windows: (0..=6)
                .map(|d| ScheduleWindow {
                    day_of_week: d,
                    start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
                })
                .collect(),
        },
        availability: AvailabilityStatus::Available,
        status: InterpreterStatus::Active,
        verification: Verification::default(),
        stats: InterpreterStats::default(),
        created_at: at(0, 0),
    }
}
