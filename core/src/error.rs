use thiserror::Error;

/// A stored label did not match any variant of the target enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} value: {value}")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

/// Malformed input, detectable before any store is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown language code: {0}")]
    UnknownLanguage(String),

    #[error("source and target language must differ ({0})")]
    SameLanguage(String),

    #[error("duration must be positive")]
    NonPositiveDuration,

    #[error("duration of {minutes} minutes is outside [{min}, {max}]")]
    DurationOutOfBounds { minutes: u32, min: u32, max: u32 },

    #[error("hourly rate {rate} is below the minimum of {floor}")]
    RateBelowFloor { rate: String, floor: String },

    #[error("pricing basis must be positive")]
    EmptyBasis,

    #[error("additional fees must not be negative")]
    NegativeFees,

    #[error("{field} score {value} is outside [1, 5]")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    #[error("scheduled start must be in the future")]
    StartInPast,

    #[error("new schedule is identical to the current one")]
    UnchangedSchedule,

    #[error("a cancellation needs a reason; use cancel")]
    MissingCancelReason,

    #[error("interpreter record is invalid: {0}")]
    InvalidInterpreter(String),
}
