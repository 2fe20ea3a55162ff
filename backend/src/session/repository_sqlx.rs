use anyhow::{Context, anyhow};
use async_trait::async_trait;
use booking_core::session::{
    Cancellation, RescheduleInfo, Session, SessionBilling, SessionRating, SessionSchedule,
    SessionStatus, Slot,
};
use booking_core::types::{InterpreterId, SessionId};
use chrono::{DateTime, Utc};
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, AnyPool, Row};

use crate::db::convert::{
    bool_to_i64, decimal_to_cents, i64_to_u8, i64_to_u32, i64_to_u64, parse_decimal, parse_label,
    parse_uuid, u64_to_i64,
};
use crate::session::repository::{
    AggregateEffect, CommitOutcome, SessionCommit, SessionRepository, SlotGuard,
};
use crate::time::{from_ms, to_ms};

/// Every column except `session_id`, in bind order.
const FIELDS: [&str; 32] = [
    "client_id",
    "interpreter_id",
    "source_language",
    "target_language",
    "session_type",
    "specialization",
    "urgency",
    "scheduled_start_ms",
    "duration_minutes",
    "scheduled_end_ms",
    "actual_start_ms",
    "actual_end_ms",
    "actual_duration_minutes",
    "status",
    "hourly_rate",
    "additional_fees",
    "total_cost",
    "pricing_version",
    "client_rating_json",
    "interpreter_rating_json",
    "is_rescheduled",
    "rescheduled_count",
    "original_start_ms",
    "reschedule_reason",
    "cancel_reason",
    "cancel_category",
    "cancelled_at_ms",
    "cancelled_by",
    "confirmed_at_ms",
    "created_at_ms",
    "updated_at_ms",
    "version",
];

fn select_sql(where_clause: &str) -> String {
    format!(
        "SELECT session_id, {} FROM sessions WHERE {where_clause}",
        FIELDS.join(", ")
    )
}

fn insert_sql() -> String {
    let placeholders = vec!["?"; FIELDS.len() + 1].join(", ");
    format!(
        "INSERT INTO sessions (session_id, {}) VALUES ({placeholders});",
        FIELDS.join(", ")
    )
}

fn update_sql() -> String {
    let sets: Vec<String> = FIELDS.iter().map(|f| format!("{f} = ?")).collect();
    format!(
        "UPDATE sessions SET {} WHERE session_id = ? AND version = ?;",
        sets.join(", ")
    )
}

const BLOCKING_OVERLAP: &str = "interpreter_id = ? \
     AND status IN ('CONFIRMED', 'IN_PROGRESS') \
     AND scheduled_start_ms < ? AND scheduled_end_ms > ? \
     AND session_id <> ?";

/// SQLx-backed implementation of SessionRepository.
///
/// Commits run in one transaction: versioned write, slot guard, then the
/// interpreter counter increments. The write goes first so SQLite hands out
/// its write lock at the start of the transaction; a read-then-write
/// transaction would have to upgrade a shared lock, which SQLite refuses
/// with SQLITE_BUSY when two connections try it at once.
pub struct SqlxSessionRepository {
    pool: AnyPool,
}

impl SqlxSessionRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn fetch_by_id(&self, session_id: &SessionId) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query(&select_sql("session_id = ?;"))
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(row_to_session(&r)?)),
            None => Ok(None),
        }
    }

    async fn find_overlapping(
        &self,
        interpreter_id: &InterpreterId,
        slot: &Slot,
        exclude: Option<&SessionId>,
    ) -> anyhow::Result<Vec<Session>> {
        let sql = select_sql(&format!("{BLOCKING_OVERLAP} ORDER BY scheduled_start_ms;"));
        let rows = sqlx::query(&sql)
            .bind(interpreter_id.to_string())
            .bind(to_ms(slot.end))
            .bind(to_ms(slot.start))
            .bind(exclude.map(|id| id.to_string()).unwrap_or_default())
            .fetch_all(&self.pool)
            .await?;

        collect_rows(rows)
    }

    async fn list_for_interpreter(
        &self,
        interpreter_id: &InterpreterId,
    ) -> anyhow::Result<Vec<Session>> {
        let sql = select_sql("interpreter_id = ? ORDER BY scheduled_start_ms;");
        let rows = sqlx::query(&sql)
            .bind(interpreter_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        collect_rows(rows)
    }

    async fn insert(
        &self,
        session: &Session,
        guard: Option<&SlotGuard>,
    ) -> anyhow::Result<CommitOutcome> {
        let row = SessionRow::from_session(session)?;
        let mut tx = self.pool.begin().await?;

        let sql = insert_sql();
        let q = sqlx::query(&sql).bind(session.session_id.to_string());
        row.bind(q)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert session {}", session.session_id))?;

        if let Some(g) = guard {
            if let Some(blocking) = first_blocking(&mut tx, g, &session.session_id).await? {
                tx.rollback().await?;
                return Ok(CommitOutcome::SlotTaken(blocking));
            }
        }

        tx.commit().await?;
        Ok(CommitOutcome::Applied)
    }

    async fn commit(&self, commit: &SessionCommit) -> anyhow::Result<CommitOutcome> {
        let session = &commit.session;
        let row = SessionRow::from_session(session)?;
        let mut tx = self.pool.begin().await?;

        let sql = update_sql();
        let res = row
            .bind(sqlx::query(&sql))
            .bind(session.session_id.to_string())
            .bind(u64_to_i64(commit.expected_version)?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("update session {}", session.session_id))?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::VersionMismatch);
        }

        if let Some(g) = &commit.guard {
            if let Some(blocking) = first_blocking(&mut tx, g, &session.session_id).await? {
                tx.rollback().await?;
                return Ok(CommitOutcome::SlotTaken(blocking));
            }
        }

        if let Some(effect) = &commit.effect {
            apply_effect(&mut tx, effect).await?;
        }

        tx.commit().await?;
        Ok(CommitOutcome::Applied)
    }
}

/* =========================
In-transaction helpers
========================= */

async fn first_blocking(
    conn: &mut AnyConnection,
    guard: &SlotGuard,
    exclude: &SessionId,
) -> anyhow::Result<Option<SessionId>> {
    let sql = format!("SELECT session_id FROM sessions WHERE {BLOCKING_OVERLAP} LIMIT 1;");
    let row = sqlx::query(&sql)
        .bind(guard.interpreter_id.to_string())
        .bind(to_ms(guard.slot.end))
        .bind(to_ms(guard.slot.start))
        .bind(exclude.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => {
            let id: String = r.try_get("session_id")?;
            Ok(Some(parse_uuid(&id, "session_id")?))
        }
        None => Ok(None),
    }
}

async fn apply_effect(conn: &mut AnyConnection, effect: &AggregateEffect) -> anyhow::Result<()> {
    let (res, interpreter_id) = match *effect {
        AggregateEffect::CompletionCredit {
            interpreter_id,
            earnings,
        } => {
            let res = sqlx::query(
                r#"
UPDATE interpreters
SET total_sessions_completed = total_sessions_completed + 1,
    total_earnings_cents = total_earnings_cents + ?
WHERE interpreter_id = ?;
"#,
            )
            .bind(decimal_to_cents(earnings)?)
            .bind(interpreter_id.to_string())
            .execute(&mut *conn)
            .await?;
            (res, interpreter_id)
        }
        AggregateEffect::ClientRating {
            interpreter_id,
            score,
        } => {
            let res = sqlx::query(
                r#"
UPDATE interpreters
SET rating_sum = rating_sum + ?,
    total_ratings = total_ratings + 1
WHERE interpreter_id = ?;
"#,
            )
            .bind(i64::from(score))
            .bind(interpreter_id.to_string())
            .execute(&mut *conn)
            .await?;
            (res, interpreter_id)
        }
    };

    if res.rows_affected() != 1 {
        return Err(anyhow!(
            "interpreter {interpreter_id} missing while applying aggregate effect"
        ));
    }
    Ok(())
}

/* =========================
Row mapping
========================= */

/// Owned column values for one session, ready to bind.
struct SessionRow {
    client_id: String,
    interpreter_id: Option<String>,
    source_language: String,
    target_language: String,
    session_type: &'static str,
    specialization: &'static str,
    urgency: &'static str,
    scheduled_start_ms: i64,
    duration_minutes: i64,
    scheduled_end_ms: i64,
    actual_start_ms: Option<i64>,
    actual_end_ms: Option<i64>,
    actual_duration_minutes: Option<i64>,
    status: &'static str,
    hourly_rate: String,
    additional_fees: String,
    total_cost: String,
    pricing_version: i64,
    client_rating_json: Option<String>,
    interpreter_rating_json: Option<String>,
    is_rescheduled: i64,
    rescheduled_count: i64,
    original_start_ms: Option<i64>,
    reschedule_reason: Option<String>,
    cancel_reason: Option<String>,
    cancel_category: Option<&'static str>,
    cancelled_at_ms: Option<i64>,
    cancelled_by: Option<String>,
    confirmed_at_ms: Option<i64>,
    created_at_ms: i64,
    updated_at_ms: i64,
    version: i64,
}

impl SessionRow {
    fn from_session(s: &Session) -> anyhow::Result<Self> {
        let rating_json = |r: &Option<SessionRating>| -> anyhow::Result<Option<String>> {
            r.as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("encode rating")
        };

        Ok(Self {
            client_id: s.client_id.to_string(),
            interpreter_id: s.interpreter_id.map(|id| id.to_string()),
            source_language: s.source_language.clone(),
            target_language: s.target_language.clone(),
            session_type: s.session_type.as_str(),
            specialization: s.specialization.as_str(),
            urgency: s.urgency.as_str(),
            scheduled_start_ms: to_ms(s.schedule.scheduled_start),
            duration_minutes: i64::from(s.schedule.duration_minutes),
            scheduled_end_ms: to_ms(s.schedule.scheduled_end),
            actual_start_ms: s.schedule.actual_start.map(to_ms),
            actual_end_ms: s.schedule.actual_end.map(to_ms),
            actual_duration_minutes: s.schedule.actual_duration_minutes.map(i64::from),
            status: s.status.as_str(),
            hourly_rate: s.billing.hourly_rate.to_string(),
            additional_fees: s.billing.additional_fees.to_string(),
            total_cost: s.billing.total_cost.to_string(),
            pricing_version: i64::from(s.billing.pricing_version),
            client_rating_json: rating_json(&s.client_rating)?,
            interpreter_rating_json: rating_json(&s.interpreter_rating)?,
            is_rescheduled: bool_to_i64(s.reschedule.is_rescheduled),
            rescheduled_count: i64::from(s.reschedule.rescheduled_count),
            original_start_ms: s.reschedule.original_start.map(to_ms),
            reschedule_reason: s.reschedule.last_reason.clone(),
            cancel_reason: s.cancellation.as_ref().map(|c| c.reason.clone()),
            cancel_category: s.cancellation.as_ref().map(|c| c.category.as_str()),
            cancelled_at_ms: s.cancellation.as_ref().map(|c| to_ms(c.cancelled_at)),
            cancelled_by: s.cancellation.as_ref().map(|c| c.cancelled_by.to_string()),
            confirmed_at_ms: s.confirmed_at.map(to_ms),
            created_at_ms: to_ms(s.created_at),
            updated_at_ms: to_ms(s.updated_at),
            version: u64_to_i64(s.version)?,
        })
    }

    /// Binds the `FIELDS` columns, in order.
    fn bind<'q>(
        &'q self,
        q: Query<'q, Any, AnyArguments<'q>>,
    ) -> Query<'q, Any, AnyArguments<'q>> {
        q.bind(&self.client_id)
            .bind(&self.interpreter_id)
            .bind(&self.source_language)
            .bind(&self.target_language)
            .bind(self.session_type)
            .bind(self.specialization)
            .bind(self.urgency)
            .bind(self.scheduled_start_ms)
            .bind(self.duration_minutes)
            .bind(self.scheduled_end_ms)
            .bind(self.actual_start_ms)
            .bind(self.actual_end_ms)
            .bind(self.actual_duration_minutes)
            .bind(self.status)
            .bind(&self.hourly_rate)
            .bind(&self.additional_fees)
            .bind(&self.total_cost)
            .bind(self.pricing_version)
            .bind(&self.client_rating_json)
            .bind(&self.interpreter_rating_json)
            .bind(self.is_rescheduled)
            .bind(self.rescheduled_count)
            .bind(self.original_start_ms)
            .bind(&self.reschedule_reason)
            .bind(&self.cancel_reason)
            .bind(self.cancel_category)
            .bind(self.cancelled_at_ms)
            .bind(&self.cancelled_by)
            .bind(self.confirmed_at_ms)
            .bind(self.created_at_ms)
            .bind(self.updated_at_ms)
            .bind(self.version)
    }
}

fn collect_rows(rows: Vec<sqlx::any::AnyRow>) -> anyhow::Result<Vec<Session>> {
    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        match row_to_session(&r) {
            Ok(s) => out.push(s),
            Err(e) => {
                // poison-row resilience: skip but don't fail the batch
                tracing::warn!(error = %e, "skipping malformed session row");
            }
        }
    }
    Ok(out)
}

fn opt_ms(r: &sqlx::any::AnyRow, column: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
    r.try_get::<Option<i64>, _>(column)?
        .map(from_ms)
        .transpose()
}

fn opt_rating(r: &sqlx::any::AnyRow, column: &str) -> anyhow::Result<Option<SessionRating>> {
    r.try_get::<Option<String>, _>(column)?
        .map(|raw| serde_json::from_str(&raw).with_context(|| format!("invalid {column}")))
        .transpose()
}

fn row_to_session(r: &sqlx::any::AnyRow) -> anyhow::Result<Session> {
    let id_str: String = r.try_get("session_id")?;
    let session_id = parse_uuid(&id_str, "session_id")?;

    let client_str: String = r.try_get("client_id")?;
    let interpreter_id = r
        .try_get::<Option<String>, _>("interpreter_id")?
        .map(|raw| parse_uuid(&raw, "interpreter_id"))
        .transpose()?;

    let status: SessionStatus = parse_label(&r.try_get::<String, _>("status")?)?;

    let cancellation = match r.try_get::<Option<String>, _>("cancel_category")? {
        Some(category) => {
            let by: String = r.try_get::<Option<String>, _>("cancelled_by")?.unwrap_or_default();
            Some(Cancellation {
                reason: r
                    .try_get::<Option<String>, _>("cancel_reason")?
                    .unwrap_or_default(),
                category: parse_label(&category)?,
                cancelled_at: opt_ms(r, "cancelled_at_ms")?
                    .ok_or_else(|| anyhow!("cancelled session {session_id} has no cancelled_at"))?,
                cancelled_by: parse_uuid(&by, "cancelled_by")?,
            })
        }
        None => None,
    };

    Ok(Session {
        session_id,
        client_id: parse_uuid(&client_str, "client_id")?,
        interpreter_id,
        source_language: r.try_get("source_language")?,
        target_language: r.try_get("target_language")?,
        session_type: parse_label(&r.try_get::<String, _>("session_type")?)?,
        specialization: parse_label(&r.try_get::<String, _>("specialization")?)?,
        urgency: parse_label(&r.try_get::<String, _>("urgency")?)?,
        schedule: SessionSchedule {
            scheduled_start: from_ms(r.try_get("scheduled_start_ms")?)?,
            duration_minutes: i64_to_u32(r.try_get("duration_minutes")?)?,
            scheduled_end: from_ms(r.try_get("scheduled_end_ms")?)?,
            actual_start: opt_ms(r, "actual_start_ms")?,
            actual_end: opt_ms(r, "actual_end_ms")?,
            actual_duration_minutes: r
                .try_get::<Option<i64>, _>("actual_duration_minutes")?
                .map(i64_to_u32)
                .transpose()?,
        },
        status,
        billing: SessionBilling {
            hourly_rate: parse_decimal(&r.try_get::<String, _>("hourly_rate")?, "hourly_rate")?,
            additional_fees: parse_decimal(
                &r.try_get::<String, _>("additional_fees")?,
                "additional_fees",
            )?,
            total_cost: parse_decimal(&r.try_get::<String, _>("total_cost")?, "total_cost")?,
            pricing_version: i64_to_u32(r.try_get("pricing_version")?)?,
        },
        client_rating: opt_rating(r, "client_rating_json")?,
        interpreter_rating: opt_rating(r, "interpreter_rating_json")?,
        reschedule: RescheduleInfo {
            is_rescheduled: r.try_get::<i64, _>("is_rescheduled")? == 1,
            rescheduled_count: i64_to_u8(r.try_get("rescheduled_count")?)?,
            original_start: opt_ms(r, "original_start_ms")?,
            last_reason: r.try_get("reschedule_reason")?,
        },
        cancellation,
        confirmed_at: opt_ms(r, "confirmed_at_ms")?,
        created_at: from_ms(r.try_get("created_at_ms")?)?,
        updated_at: from_ms(r.try_get("updated_at_ms")?)?,
        version: i64_to_u64(r.try_get("version")?)?,
    })
}
