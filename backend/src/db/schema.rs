use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Interpreters
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS interpreters (
  interpreter_id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL UNIQUE,

  languages_json TEXT NOT NULL,
  specializations_json TEXT NOT NULL,
  session_types_json TEXT NOT NULL,
  rates_json TEXT NOT NULL,
  schedule_json TEXT NOT NULL,

  availability TEXT NOT NULL,
  status TEXT NOT NULL,
  identity_verified INTEGER NOT NULL CHECK (identity_verified IN (0,1)),
  background_checked INTEGER NOT NULL CHECK (background_checked IN (0,1)),
  certified INTEGER NOT NULL CHECK (certified IN (0,1)),

  total_sessions_completed BIGINT NOT NULL DEFAULT 0,
  rating_sum BIGINT NOT NULL DEFAULT 0,
  total_ratings BIGINT NOT NULL DEFAULT 0,
  total_earnings_cents BIGINT NOT NULL DEFAULT 0 CHECK (total_earnings_cents >= 0),

  created_at_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Sessions
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS sessions (
  session_id TEXT PRIMARY KEY,
  client_id TEXT NOT NULL,
  interpreter_id TEXT,
  source_language TEXT NOT NULL,
  target_language TEXT NOT NULL,
  session_type TEXT NOT NULL,
  specialization TEXT NOT NULL,
  urgency TEXT NOT NULL,

  scheduled_start_ms BIGINT NOT NULL,
  duration_minutes BIGINT NOT NULL,
  scheduled_end_ms BIGINT NOT NULL,
  actual_start_ms BIGINT,
  actual_end_ms BIGINT,
  actual_duration_minutes BIGINT,

  status TEXT NOT NULL,

  hourly_rate TEXT NOT NULL,
  additional_fees TEXT NOT NULL,
  total_cost TEXT NOT NULL,
  pricing_version BIGINT NOT NULL,

  client_rating_json TEXT,
  interpreter_rating_json TEXT,

  is_rescheduled INTEGER NOT NULL DEFAULT 0 CHECK (is_rescheduled IN (0,1)),
  rescheduled_count BIGINT NOT NULL DEFAULT 0,
  original_start_ms BIGINT,
  reschedule_reason TEXT,

  cancel_reason TEXT,
  cancel_category TEXT,
  cancelled_at_ms BIGINT,
  cancelled_by TEXT,

  confirmed_at_ms BIGINT,
  created_at_ms BIGINT NOT NULL,
  updated_at_ms BIGINT NOT NULL,
  version BIGINT NOT NULL,

  CHECK (scheduled_end_ms > scheduled_start_ms)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_sessions_interpreter_window ON sessions(interpreter_id, status, scheduled_start_ms);"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_interpreters_bookable ON interpreters(status, availability);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
