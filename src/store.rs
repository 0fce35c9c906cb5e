use crate::types::SeriesKind;

use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append-only persistence for observed price points, one table per series.
///
/// A trait so the decision engine can run against an in-memory double in
/// tests; `PgPriceStore` is the real thing.
#[allow(async_fn_in_trait)]
pub trait PriceStore {
    /// The most recent persisted observation time for `kind`, `None` while
    /// the table is still empty.
    async fn latest_time(&self, kind: SeriesKind) -> Result<Option<NaiveDateTime>, StoreError>;

    async fn insert(
        &self,
        kind: SeriesKind,
        time: NaiveDateTime,
        price: f64,
    ) -> Result<(), StoreError>;
}

pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    /// Connects and idempotently creates the per-series tables. Table names
    /// come from the fixed `SeriesKind::table()` lookup; row values are
    /// always bound parameters.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let url = format!(
            "{}?sslmode=require&application_name={}",
            database_url,
            env!("CARGO_PKG_NAME")
        );

        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        log::info!("Initializing db tables ...");

        for kind in SeriesKind::ALL {
            let table = kind.table();
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id SERIAL PRIMARY KEY,
                    time timestamp UNIQUE NOT NULL,
                    cost float8 NOT NULL
                )"
            ))
            .execute(&self.pool)
            .await?;

            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {table}_time_idx ON {table}(time)"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl PriceStore for PgPriceStore {
    async fn latest_time(&self, kind: SeriesKind) -> Result<Option<NaiveDateTime>, StoreError> {
        let query = format!(
            "SELECT max(time) FROM {} HAVING max(time) IS NOT NULL",
            kind.table()
        );
        let time: Option<NaiveDateTime> =
            sqlx::query_scalar(&query).fetch_optional(&self.pool).await?;
        Ok(time)
    }

    async fn insert(
        &self,
        kind: SeriesKind,
        time: NaiveDateTime,
        price: f64,
    ) -> Result<(), StoreError> {
        log::debug!(
            "inserting cost entry type[{}] date[{}] cost[{}]",
            kind,
            time,
            price
        );

        let query = format!("INSERT INTO {}(time, cost) VALUES ($1, $2)", kind.table());
        sqlx::query(&query)
            .bind(time)
            .bind(price)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
