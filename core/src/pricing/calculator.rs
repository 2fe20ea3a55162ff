//! Quote and session pricing.
//!
//! Both paths compose multipliers the same way: rate × specialization (or
//! content type) × urgency. Every money value is rounded to cents half-up.
//! Nothing here reads a clock or holds state; identical inputs give
//! identical outputs.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::config::{LanguageTier, PricingConfig};
use crate::error::ValidationError;
use crate::interpreter::RateCard;
use crate::types::{ContentType, SessionType, Specialization, UrgencyLevel, normalize_language};

/// Unit the quote is priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteBasis {
    Words(u32),
    Minutes(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub source_language: String,
    pub target_language: String,
    pub basis: QuoteBasis,
    pub urgency: UrgencyLevel,
    pub content_type: ContentType,
    pub certified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub tier: LanguageTier,
    pub unit_rate: Decimal,
    pub urgency_multiplier: Decimal,
    pub content_multiplier: Decimal,

    pub base: Decimal,
    pub urgency_fee: Decimal,
    pub specialty_fee: Decimal,
    pub certification_fee: Decimal,
    pub subtotal: Decimal,
    pub minimum_adjustment: Decimal,
    pub total: Decimal,

    pub config_version: u32,
}

/// Everything `price_session` needs besides the interpreter's rate card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPriceInput {
    pub session_type: SessionType,
    pub specialization: Specialization,
    pub urgency: UrgencyLevel,
    pub duration_minutes: u32,
    pub additional_fees: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrice {
    /// Override or base rate, before multipliers.
    pub base_hourly_rate: Decimal,
    pub specialization_multiplier: Decimal,
    pub urgency_multiplier: Decimal,
    /// Rate actually charged per hour; snapshotted on the session.
    pub hourly_rate: Decimal,
    pub total_cost: Decimal,
    pub config_version: u32,
}

pub fn round_money(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `minutes / 60 × hourly_rate + fees`, rounded to cents.
pub fn cost_for_minutes(minutes: u32, hourly_rate: Decimal, additional_fees: Decimal) -> Decimal {
    let hours = Decimal::from(minutes) / Decimal::from(60u32);
    round_money(hours * hourly_rate + additional_fees)
}

pub fn validate_language_pair(
    source: &str,
    target: &str,
    cfg: &PricingConfig,
) -> Result<(), ValidationError> {
    for code in [source, target] {
        if !cfg.is_supported(code) {
            return Err(ValidationError::UnknownLanguage(code.to_string()));
        }
    }
    if normalize_language(source) == normalize_language(target) {
        return Err(ValidationError::SameLanguage(normalize_language(source)));
    }
    Ok(())
}

/// Per-word / per-hour quote for translation or interpretation work.
#[instrument(
    target = "pricing",
    skip(req, cfg),
    fields(pair = %format!("{}-{}", req.source_language, req.target_language), config_version = cfg.version)
)]
pub fn quote(req: &QuoteRequest, cfg: &PricingConfig) -> Result<PricingBreakdown, ValidationError> {
    validate_language_pair(&req.source_language, &req.target_language, cfg)?;

    let tier = cfg.tier_for(&req.source_language, &req.target_language);
    let rates = cfg
        .tier_rate(tier)
        .ok_or_else(|| ValidationError::UnknownLanguage(format!("no rate for tier {tier}")))?;

    let (units, unit_rate) = match req.basis {
        QuoteBasis::Words(0) | QuoteBasis::Minutes(0) => return Err(ValidationError::EmptyBasis),
        QuoteBasis::Words(w) => (Decimal::from(w), rates.per_word),
        QuoteBasis::Minutes(m) => (Decimal::from(m) / Decimal::from(60u32), rates.per_hour),
    };

    let urgency_multiplier = cfg.urgency_multiplier(req.urgency);
    let content_multiplier = cfg.content_multiplier(req.content_type);

    let raw_base = units * unit_rate;
    let base = round_money(raw_base);
    let urgency_fee = round_money(raw_base * (urgency_multiplier - Decimal::ONE));
    let specialty_fee =
        round_money(raw_base * urgency_multiplier * (content_multiplier - Decimal::ONE));
    let certification_fee = if req.certified {
        cfg.certification_fee
    } else {
        Decimal::ZERO
    };

    let subtotal = base + urgency_fee + specialty_fee + certification_fee;
    let minimum_adjustment = (cfg.minimum_project_fee - subtotal).max(Decimal::ZERO);
    let total = subtotal + minimum_adjustment;

    debug!(%tier, %subtotal, %total, "quote computed");

    Ok(PricingBreakdown {
        tier,
        unit_rate,
        urgency_multiplier,
        content_multiplier,
        base,
        urgency_fee,
        specialty_fee,
        certification_fee,
        subtotal,
        minimum_adjustment,
        total,
        config_version: cfg.version,
    })
}

/// Minimum bookable duration for a session type on this rate card.
pub fn minimum_duration(rates: &RateCard, session_type: SessionType, cfg: &PricingConfig) -> u32 {
    rates
        .session_type_rates
        .get(&session_type)
        .and_then(|r| r.minimum_duration_minutes)
        .map(|m| m.max(cfg.min_session_minutes))
        .unwrap_or(cfg.min_session_minutes)
}

pub fn validate_duration(
    rates: &RateCard,
    session_type: SessionType,
    minutes: u32,
    cfg: &PricingConfig,
) -> Result<(), ValidationError> {
    if minutes == 0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    let min = minimum_duration(rates, session_type, cfg);
    if minutes < min || minutes > cfg.max_session_minutes {
        return Err(ValidationError::DurationOutOfBounds {
            minutes,
            min,
            max: cfg.max_session_minutes,
        });
    }
    Ok(())
}

/// Price a booked session against an interpreter's rate card.
#[instrument(
    target = "pricing",
    skip(rates, cfg),
    fields(config_version = cfg.version)
)]
pub fn price_session(
    rates: &RateCard,
    input: &SessionPriceInput,
    cfg: &PricingConfig,
) -> Result<SessionPrice, ValidationError> {
    validate_duration(rates, input.session_type, input.duration_minutes, cfg)?;

    if input.additional_fees < Decimal::ZERO {
        return Err(ValidationError::NegativeFees);
    }

    let base_hourly_rate = rates
        .session_type_rates
        .get(&input.session_type)
        .and_then(|r| r.hourly_rate)
        .unwrap_or(rates.base_hourly_rate);

    if base_hourly_rate < cfg.min_hourly_rate {
        return Err(ValidationError::RateBelowFloor {
            rate: base_hourly_rate.to_string(),
            floor: cfg.min_hourly_rate.to_string(),
        });
    }

    let specialization_multiplier = rates
        .specialization_multipliers
        .get(&input.specialization)
        .copied()
        .unwrap_or(Decimal::ONE);
    let urgency_multiplier = cfg.urgency_multiplier(input.urgency);

    let hourly_rate = round_money(base_hourly_rate * specialization_multiplier * urgency_multiplier);
    let total_cost = cost_for_minutes(input.duration_minutes, hourly_rate, input.additional_fees);

    debug!(%hourly_rate, %total_cost, "session priced");

    Ok(SessionPrice {
        base_hourly_rate,
        specialization_multiplier,
        urgency_multiplier,
        hourly_rate,
        total_cost,
        config_version: cfg.version,
    })
}
