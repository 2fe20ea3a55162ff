use anyhow::Context;
use booking_backend::{
    config::BookingConfig,
    db::{Db, DbOptions},
    logger::{TraceId, init_tracing, root_span},
};
use tracing::Instrument;

/// Creates or upgrades the booking schema at `DATABASE_URL`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let cfg = BookingConfig::from_env().context("loading configuration")?;
    init_tracing(&cfg)?;

    let span = root_span("migrate", &TraceId::random());
    async {
        tracing::info!(
            pricing_version = cfg.pricing.version,
            "connecting to booking database"
        );

        let db = Db::connect_with(&cfg.database_url, DbOptions::from_config(&cfg))
            .await
            .with_context(|| format!("connecting to {}", cfg.database_url))?;
        db.migrate().await.context("applying schema")?;

        tracing::info!("schema is up to date");
        Ok::<_, anyhow::Error>(())
    }
    .instrument(span)
    .await
}
