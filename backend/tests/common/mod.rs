#![allow(dead_code)]

use std::sync::Arc;

use booking_backend::BookingEngine;
use booking_backend::config::BookingConfig;
use booking_backend::db::{Db, DbOptions};
use booking_backend::lifecycle::BookingRequest;
use booking_backend::time::ManualClock;
use booking_core::interpreter::{
    AvailabilityStatus, Interpreter, InterpreterStats, InterpreterStatus, LanguageSkill,
    Proficiency, RateCard, ScheduleWindow, Verification, WeeklySchedule,
};
use booking_core::types::{SessionType, Specialization, UrgencyLevel, UserId};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Monday 2026-03-02 at `h:m` UTC.
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

/// The Sunday before [`at`]'s Monday; every test clock starts here.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(t0()))
}

/// Active en/es interpreter billing $80/h, Legal at ×1.6, free all week.
pub fn interpreter() -> Interpreter {
    let mut rates = RateCard::flat(Decimal::new(80, 0));
    rates
        .specialization_multipliers
        .insert(Specialization::Legal, Decimal::new(16, 1));

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
                proficiency: Proficiency::Professional,
            },
        ],
        specializations: vec![Specialization::General, Specialization::Legal],
        session_types: vec![SessionType::Video, SessionType::Phone],
        rates,
        schedule: WeeklySchedule {
            timezone: "UTC".into(),
            utc_offset_minutes: 0,
            windows: (0..=6)
                .map(|d| ScheduleWindow {
                    day_of_week: d,
                    start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                })
                .collect(),
        },
        availability: AvailabilityStatus::Available,
        status: InterpreterStatus::Active,
        verification: Verification::default(),
        stats: InterpreterStats::default(),
        created_at: t0(),
    }
}

pub fn request(client_id: UserId, interpreter_id: Option<Uuid>, start: DateTime<Utc>, minutes: u32) -> BookingRequest {
    BookingRequest {
        client_id,
        interpreter_id,
        source_language: "en".into(),
        target_language: "es".into(),
        session_type: SessionType::Video,
        specialization: Specialization::General,
        urgency: UrgencyLevel::Standard,
        scheduled_start: start,
        duration_minutes: minutes,
        additional_fees: Decimal::ZERO,
    }
}

pub fn memory_engine(clock: Arc<ManualClock>) -> BookingEngine {
    BookingEngine::in_memory(clock, &BookingConfig::default())
}

/// Isolated shared-cache in-memory SQLite database with the schema applied.
pub async fn sqlite_db() -> Db {
    let url = format!("sqlite:file:{}?mode=memory&cache=shared", Uuid::new_v4());
    let opts = DbOptions {
        max_connections: 1,
        ..DbOptions::default()
    };
    let db = Db::connect_with(&url, opts).await.unwrap();
    db.migrate().await.unwrap();
    db
}

pub async fn sqlite_engine(clock: Arc<ManualClock>) -> (BookingEngine, Db) {
    let db = sqlite_db().await;
    let engine = BookingEngine::with_sqlx(&db, clock, &BookingConfig::default());
    (engine, db)
}

/// On-disk SQLite database inside `dir`, with the schema applied.
pub async fn file_db(dir: &tempfile::TempDir, opts: DbOptions) -> Db {
    let path = dir.path().join("booking.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = Db::connect_with(&url, opts).await.unwrap();
    db.migrate().await.unwrap();
    db
}
