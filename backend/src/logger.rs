use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{Span, field};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use crate::config::BookingConfig;

/// Used when `RUST_LOG` is unset. sqlx logs every statement at INFO.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Correlates every span emitted while serving one caller request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init_tracing(cfg: &BookingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_DIRECTIVES))?;

    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(filter);
    if cfg.log_json {
        registry
            .with(layer.json().with_current_span(true))
            .try_init()?;
    } else {
        registry.with(layer.compact()).try_init()?;
    }
    Ok(())
}

/// Span for one engine operation; ids are filled in by [`annotate_span`].
pub fn root_span(operation: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "booking",
        operation,
        trace_id = %trace_id.as_str(),
        session_id = field::Empty,
        interpreter_id = field::Empty
    )
}

/// Records ids on the current span once they are known.
///
/// The span must declare `session_id` / `interpreter_id` fields; spans that
/// don't simply ignore the record.
pub fn annotate_span(session_id: Option<&Uuid>, interpreter_id: Option<&Uuid>) {
    let span = Span::current();
    if let Some(sid) = session_id {
        span.record("session_id", field::display(sid));
    }
    if let Some(iid) = interpreter_id {
        span.record("interpreter_id", field::display(iid));
    }
}

/// Awaits a store call, warning when it takes longer than `budget`.
pub async fn warn_if_slow<F, T>(store_call: &'static str, budget: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let started = Instant::now();
    let out = fut.await;
    let elapsed = started.elapsed();
    if elapsed > budget {
        tracing::warn!(
            target: "performance",
            store_call,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            "slow store call"
        );
    }
    out
}
