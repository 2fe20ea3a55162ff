//! Pure booking domain: data model, pricing, availability, the status graph,
//! the permission policy and rating arithmetic. No IO and no async.

#[macro_use]
mod macros;

pub mod availability;
pub mod eligibility;
pub mod error;
pub mod interpreter;
pub mod policy;
pub mod pricing;
pub mod ranking;
pub mod rating;
pub mod session;
pub mod transitions;
pub mod types;

pub use error::{ParseLabelError, ValidationError};
