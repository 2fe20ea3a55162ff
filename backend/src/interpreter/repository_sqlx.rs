use anyhow::Context;
use async_trait::async_trait;
use booking_core::interpreter::{Interpreter, InterpreterStats, Verification};
use booking_core::rating::average;
use booking_core::types::{InterpreterId, UserId};
use sqlx::{AnyPool, Row};

use crate::db::convert::{
    bool_to_i64, cents_to_decimal, decimal_to_cents, i64_to_u64, parse_label, parse_uuid,
    u64_to_i64,
};
use crate::interpreter::repository::{CandidateFilter, InterpreterRepository};
use crate::time::{from_ms, to_ms};

const SELECT_COLUMNS: &str = r#"
SELECT
  interpreter_id, user_id,
  languages_json, specializations_json, session_types_json, rates_json, schedule_json,
  availability, status,
  identity_verified, background_checked, certified,
  total_sessions_completed, rating_sum, total_ratings, total_earnings_cents,
  created_at_ms
FROM interpreters
"#;

/// SQLx-backed implementation of InterpreterRepository.
/// Collections are stored as JSON text; money as integer cents.
pub struct SqlxInterpreterRepository {
    pool: AnyPool,
}

impl SqlxInterpreterRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        key: String,
    ) -> anyhow::Result<Option<Interpreter>> {
        let sql = format!("{SELECT_COLUMNS} WHERE {clause} = ?;");
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(row_to_interpreter(&r)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl InterpreterRepository for SqlxInterpreterRepository {
    async fn insert(&self, i: &Interpreter) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO interpreters (
  interpreter_id, user_id,
  languages_json, specializations_json, session_types_json, rates_json, schedule_json,
  availability, status,
  identity_verified, background_checked, certified,
  total_sessions_completed, rating_sum, total_ratings, total_earnings_cents,
  created_at_ms
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(i.interpreter_id.to_string())
        .bind(i.user_id.to_string())
        .bind(serde_json::to_string(&i.languages)?)
        .bind(serde_json::to_string(&i.specializations)?)
        .bind(serde_json::to_string(&i.session_types)?)
        .bind(serde_json::to_string(&i.rates)?)
        .bind(serde_json::to_string(&i.schedule)?)
        .bind(i.availability.as_str())
        .bind(i.status.as_str())
        .bind(bool_to_i64(i.verification.identity_verified))
        .bind(bool_to_i64(i.verification.background_checked))
        .bind(bool_to_i64(i.verification.certified))
        .bind(u64_to_i64(i.stats.total_sessions_completed)?)
        .bind(u64_to_i64(i.stats.rating_sum)?)
        .bind(u64_to_i64(i.stats.total_ratings)?)
        .bind(decimal_to_cents(i.stats.total_earnings)?)
        .bind(to_ms(i.created_at))
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert interpreter {}", i.interpreter_id))?;

        Ok(())
    }

    async fn fetch_by_id(&self, interpreter_id: &InterpreterId) -> anyhow::Result<Option<Interpreter>> {
        self.fetch_one_where("interpreter_id", interpreter_id.to_string())
            .await
    }

    async fn fetch_by_user_id(&self, user_id: &UserId) -> anyhow::Result<Option<Interpreter>> {
        self.fetch_one_where("user_id", user_id.to_string()).await
    }

    async fn query_candidates(&self, filter: &CandidateFilter) -> anyhow::Result<Vec<Interpreter>> {
        // Status columns narrow the scan; capability sets live in JSON and are
        // matched after decoding.
        let sql = format!("{SELECT_COLUMNS} WHERE status = 'ACTIVE' AND availability = 'AVAILABLE';");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_interpreter(&r) {
                Ok(i) if filter.matches(&i) => out.push(i),
                Ok(_) => {}
                Err(e) => {
                    // poison-row resilience: skip but don't fail the query
                    tracing::warn!(error = %e, "skipping malformed interpreter row");
                }
            }
        }

        Ok(out)
    }
}

/* =========================
Row mapping
========================= */

fn row_to_interpreter(r: &sqlx::any::AnyRow) -> anyhow::Result<Interpreter> {
    let id_str: String = r.try_get("interpreter_id")?;
    let user_str: String = r.try_get("user_id")?;

    let json = |column: &str| -> anyhow::Result<String> { Ok(r.try_get::<String, _>(column)?) };

    let rating_sum = i64_to_u64(r.try_get("rating_sum")?)?;
    let total_ratings = i64_to_u64(r.try_get("total_ratings")?)?;

    Ok(Interpreter {
        interpreter_id: parse_uuid(&id_str, "interpreter_id")?,
        user_id: parse_uuid(&user_str, "user_id")?,
        languages: serde_json::from_str(&json("languages_json")?)
            .context("invalid languages_json")?,
        specializations: serde_json::from_str(&json("specializations_json")?)
            .context("invalid specializations_json")?,
        session_types: serde_json::from_str(&json("session_types_json")?)
            .context("invalid session_types_json")?,
        rates: serde_json::from_str(&json("rates_json")?).context("invalid rates_json")?,
        schedule: serde_json::from_str(&json("schedule_json")?)
            .context("invalid schedule_json")?,
        availability: parse_label(&r.try_get::<String, _>("availability")?)?,
        status: parse_label(&r.try_get::<String, _>("status")?)?,
        verification: Verification {
            identity_verified: r.try_get::<i64, _>("identity_verified")? == 1,
            background_checked: r.try_get::<i64, _>("background_checked")? == 1,
            certified: r.try_get::<i64, _>("certified")? == 1,
        },
        stats: InterpreterStats {
            total_sessions_completed: i64_to_u64(r.try_get("total_sessions_completed")?)?,
            rating_sum,
            total_ratings,
            // Derived; only the integer sum and count are stored.
            average_rating: average(rating_sum, total_ratings),
            total_earnings: cents_to_decimal(r.try_get("total_earnings_cents")?),
        },
        created_at: from_ms(r.try_get("created_at_ms")?)?,
    })
}
