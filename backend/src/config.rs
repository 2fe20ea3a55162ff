use std::str::FromStr;

use anyhow::Context;
use booking_core::eligibility::NoticeRules;
use booking_core::pricing::PricingConfig;

#[derive(Clone, Debug)]
pub struct BookingConfig {
    /// Database connection string.
    pub database_url: String,

    /// Pool size for `Db::connect_with`.
    pub db_max_connections: u32,

    /// SQLite busy timeout. Lock waits longer than this surface as a
    /// retryable conflict.
    pub db_busy_timeout_ms: u64,

    // =========================
    // Lifecycle rules
    // =========================
    /// Notice windows and the reschedule cap applied to cancel/reschedule.
    ///
    /// Admin actors skip the notice window but never the cap.
    pub notice: NoticeRules,

    // =========================
    // Matching
    // =========================
    /// Maximum number of ranked interpreters returned by `find_candidates`.
    pub candidate_limit: usize,

    // =========================
    // Pricing
    // =========================
    /// Rate tables in force. Its `version` is stamped on every priced session.
    pub pricing: PricingConfig,

    // =========================
    // Observability
    // =========================
    /// Emit JSON log lines instead of the pretty format.
    pub log_json: bool,

    /// Store calls slower than this are logged at WARN.
    pub slow_store_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://booking_dev.db?mode=rwc".to_string(),
            db_max_connections: 16,
            db_busy_timeout_ms: 5_000,
            notice: NoticeRules::default(),
            candidate_limit: 20,
            pricing: PricingConfig::default(),
            log_json: false,
            slow_store_ms: 100,
        }
    }
}

impl BookingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let pricing = match lookup("BOOKING_PRICING_CONFIG") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading pricing config {path}"))?;
                PricingConfig::from_json(&raw)
                    .with_context(|| format!("parsing pricing config {path}"))?
            }
            None => defaults.pricing,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parse_or(
                &lookup,
                "BOOKING_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            db_busy_timeout_ms: parse_or(
                &lookup,
                "BOOKING_DB_BUSY_TIMEOUT_MS",
                defaults.db_busy_timeout_ms,
            )?,
            notice: NoticeRules {
                standard_notice_hours: parse_or(
                    &lookup,
                    "BOOKING_STANDARD_NOTICE_HOURS",
                    defaults.notice.standard_notice_hours,
                )?,
                emergency_notice_hours: parse_or(
                    &lookup,
                    "BOOKING_EMERGENCY_NOTICE_HOURS",
                    defaults.notice.emergency_notice_hours,
                )?,
                max_reschedules: parse_or(
                    &lookup,
                    "BOOKING_MAX_RESCHEDULES",
                    defaults.notice.max_reschedules,
                )?,
            },
            candidate_limit: parse_or(&lookup, "BOOKING_CANDIDATE_LIMIT", defaults.candidate_limit)?,
            pricing,
            log_json: parse_or(&lookup, "BOOKING_LOG_JSON", defaults.log_json)?,
            slow_store_ms: parse_or(&lookup, "BOOKING_SLOW_STORE_MS", defaults.slow_store_ms)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
