pub mod convert;
pub mod schema;

use std::time::Duration;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::config::BookingConfig;

/// Pool settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DbOptions {
    pub max_connections: u32,
    /// How long a SQLite connection waits on another writer's lock before
    /// giving up with SQLITE_BUSY.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            max_connections: 16,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl DbOptions {
    pub fn from_config(cfg: &BookingConfig) -> Self {
        Self {
            max_connections: cfg.db_max_connections,
            busy_timeout: Duration::from_millis(cfg.db_busy_timeout_ms),
        }
    }
}

#[derive(Clone)]
pub struct Db {
    pub pool: AnyPool,
}

impl Db {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        Self::connect_with(database_url, DbOptions::default()).await
    }

    /// SQLite in-memory databases should use a single connection so every
    /// transaction sees the same writer lock.
    pub async fn connect_with(database_url: &str, opts: DbOptions) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();

        let mut pool = AnyPoolOptions::new().max_connections(opts.max_connections);
        if database_url.starts_with("sqlite:") {
            let busy_ms = opts.busy_timeout.as_millis();
            pool = pool.after_connect(move |conn, _meta| {
                Box::pin(async move {
                    let pragma = format!("PRAGMA busy_timeout = {busy_ms};");
                    sqlx::query(&pragma).execute(&mut *conn).await?;
                    Ok(())
                })
            });
        }

        let pool = pool.connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        schema::migrate(&self.pool).await
    }
}
