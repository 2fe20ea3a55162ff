pub mod config;
pub mod conflict;
pub mod db;
pub mod engine;
pub mod interpreter;
pub mod lifecycle;
pub mod locks;
pub mod matching;
pub mod memory_store;
pub mod metrics;
pub mod rating;
pub mod session;

pub mod error;
pub mod logger;
pub mod time;

mod context;

#[cfg(test)]
mod testutil;

pub use engine::BookingEngine;
pub use error::{BookingError, BookingResult};
