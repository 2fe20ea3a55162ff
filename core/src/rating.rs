//! Rating validation and interpreter aggregate arithmetic.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::interpreter::InterpreterStats;
use crate::session::RatingScores;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

fn check(field: &'static str, value: u8) -> Result<(), ValidationError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ScoreOutOfRange { field, value })
    }
}

pub fn validate_scores(scores: &RatingScores) -> Result<(), ValidationError> {
    check("overall", scores.overall)?;

    let subs = [
        ("punctuality", scores.punctuality),
        ("professionalism", scores.professionalism),
        ("communication", scores.communication),
    ];
    for (field, value) in subs {
        if let Some(v) = value {
            check(field, v)?;
        }
    }
    Ok(())
}

/// Folds one client score into the running aggregate.
///
/// Equivalent to `(avg * n + r) / (n + 1)`, but derived from the integer sum
/// so the average never drifts from the rating history.
pub fn apply_client_rating(stats: &mut InterpreterStats, overall: u8) {
    stats.rating_sum += u64::from(overall);
    stats.total_ratings += 1;
    stats.average_rating = average(stats.rating_sum, stats.total_ratings);
}

pub fn apply_completion(stats: &mut InterpreterStats, earnings: Decimal) {
    stats.total_sessions_completed += 1;
    stats.total_earnings += earnings;
}

pub fn average(rating_sum: u64, total_ratings: u64) -> f64 {
    if total_ratings == 0 {
        0.0
    } else {
        rating_sum as f64 / total_ratings as f64
    }
}
