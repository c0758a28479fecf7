use anyhow::Result;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Ensure TLS is enabled when the DSN asks for it explicitly.
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");

        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Create the catalog tables when they do not exist yet. The unique index
    /// on `sku_normalized` is what the upsert path relies on for dedup.
    async fn ensure_schema(pool: &PgPool) -> Result<()> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS products (
                id BIGSERIAL PRIMARY KEY,
                sku VARCHAR(255) NOT NULL,
                sku_normalized VARCHAR(255) NOT NULL,
                name VARCHAR(512),
                description TEXT,
                active BOOLEAN NOT NULL DEFAULT TRUE
             );
             CREATE UNIQUE INDEX IF NOT EXISTS ix_products_sku_normalized
                 ON products (sku_normalized);
             CREATE TABLE IF NOT EXISTS webhooks (
                id BIGSERIAL PRIMARY KEY,
                url VARCHAR(1024) NOT NULL,
                event VARCHAR(100) NOT NULL,
                enabled BOOLEAN NOT NULL DEFAULT TRUE
             );",
        )
        .execute(pool)
        .await?;
        info!("schema ensured");
        Ok(())
    }
}
