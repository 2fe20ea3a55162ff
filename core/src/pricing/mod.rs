//! Deterministic pricing for quotes and booked sessions.

pub mod calculator;
pub mod config;

pub use calculator::{
    PricingBreakdown, QuoteBasis, QuoteRequest, SessionPrice, SessionPriceInput, cost_for_minutes,
    price_session, quote, round_money, validate_duration, validate_language_pair,
};
pub use config::{LanguageTier, PricingConfig, TierRate};
