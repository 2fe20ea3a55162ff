use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ContentType, UrgencyLevel, normalize_language};

labelled_enum! {
    /// Relative rarity of a language pair.
    pub enum LanguageTier {
        Common => "COMMON",
        Specialized => "SPECIALIZED",
        Rare => "RARE",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRate {
    pub per_word: Decimal,
    pub per_hour: Decimal,
}

/// Every table the pricing functions read.
///
/// Passed in explicitly so a stored `version` is enough to reproduce any
/// historical price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub version: u32,

    pub common_languages: BTreeSet<String>,
    pub specialized_languages: BTreeSet<String>,
    pub rare_languages: BTreeSet<String>,

    pub tier_rates: BTreeMap<LanguageTier, TierRate>,
    pub urgency_multipliers: BTreeMap<UrgencyLevel, Decimal>,
    pub content_multipliers: BTreeMap<ContentType, Decimal>,

    pub certification_fee: Decimal,
    pub minimum_project_fee: Decimal,

    /// Floor applied to an interpreter's base (pre-multiplier) hourly rate.
    pub min_hourly_rate: Decimal,
    pub min_session_minutes: u32,
    pub max_session_minutes: u32,
}

fn codes(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|c| c.to_string()).collect()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            version: 1,

            common_languages: codes(&["en", "es", "fr", "de", "it", "pt"]),
            specialized_languages: codes(&[
                "zh", "ja", "ko", "ar", "ru", "hi", "tr", "pl", "nl", "sv", "vi", "th", "he",
                "el", "uk",
            ]),
            rare_languages: codes(&["is", "mt", "ga", "cy", "eu", "sw", "yo", "am"]),

            tier_rates: BTreeMap::from([
                (
                    LanguageTier::Common,
                    TierRate {
                        per_word: Decimal::new(10, 2),
                        per_hour: Decimal::new(45, 0),
                    },
                ),
                (
                    LanguageTier::Specialized,
                    TierRate {
                        per_word: Decimal::new(15, 2),
                        per_hour: Decimal::new(65, 0),
                    },
                ),
                (
                    LanguageTier::Rare,
                    TierRate {
                        per_word: Decimal::new(25, 2),
                        per_hour: Decimal::new(95, 0),
                    },
                ),
            ]),

            urgency_multipliers: BTreeMap::from([
                (UrgencyLevel::Standard, Decimal::ONE),
                (UrgencyLevel::Rush, Decimal::new(15, 1)),
                (UrgencyLevel::Urgent, Decimal::new(20, 1)),
                (UrgencyLevel::Emergency, Decimal::new(30, 1)),
            ]),

            content_multipliers: BTreeMap::from([
                (ContentType::General, Decimal::ONE),
                (ContentType::Document, Decimal::new(11, 1)),
                (ContentType::Technical, Decimal::new(13, 1)),
                (ContentType::Legal, Decimal::new(16, 1)),
                (ContentType::Medical, Decimal::new(15, 1)),
                (ContentType::Financial, Decimal::new(14, 1)),
                (ContentType::Marketing, Decimal::new(12, 1)),
            ]),

            certification_fee: Decimal::new(25, 0),
            minimum_project_fee: Decimal::new(35, 0),

            min_hourly_rate: Decimal::new(15, 0),
            min_session_minutes: 15,
            max_session_minutes: 480,
        }
    }
}

impl PricingConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn is_supported(&self, code: &str) -> bool {
        let code = normalize_language(code);
        self.common_languages.contains(&code)
            || self.specialized_languages.contains(&code)
            || self.rare_languages.contains(&code)
    }

    /// Common only if both sides are common; rare if either side is rare.
    pub fn tier_for(&self, source: &str, target: &str) -> LanguageTier {
        let (s, t) = (normalize_language(source), normalize_language(target));

        if self.rare_languages.contains(&s) || self.rare_languages.contains(&t) {
            LanguageTier::Rare
        } else if self.common_languages.contains(&s) && self.common_languages.contains(&t) {
            LanguageTier::Common
        } else {
            LanguageTier::Specialized
        }
    }

    /// Missing table entries fall back to a neutral multiplier of 1.
    pub fn urgency_multiplier(&self, urgency: UrgencyLevel) -> Decimal {
        self.urgency_multipliers
            .get(&urgency)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    pub fn content_multiplier(&self, content: ContentType) -> Decimal {
        self.content_multipliers
            .get(&content)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    pub fn tier_rate(&self, tier: LanguageTier) -> Option<TierRate> {
        self.tier_rates.get(&tier).copied()
    }
}
