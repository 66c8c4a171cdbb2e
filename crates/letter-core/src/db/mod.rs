//! Database access for letter recipients
//!
//! - `queries` - SQL text loaded from the queries directory
//! - `mapper` - typed records built from result rows

pub mod mapper;
pub mod queries;

pub use queries::QuerySet;

use crate::config::DatabaseConfig;
use crate::error::{LetterError, Result};
use async_trait::async_trait;
use letter_types::{LetterKind, LetterRequest, ReferenceKey, ScheduleTable};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

/// Everything the pipeline needs from the backing store
#[async_trait]
pub trait LetterSource: Send + Sync {
    /// Recipients for one letter kind, in query order
    async fn fetch_requests(&self, kind: LetterKind) -> Result<Vec<LetterRequest>>;

    /// Collection schedule for one property; a missing row is an error
    async fn fetch_schedule(&self, property: &ReferenceKey) -> Result<ScheduleTable>;

    /// Flag the requests behind `kinds` as processed, all or nothing
    async fn mark_processed(&self, kinds: &[LetterKind]) -> Result<()>;
}

/// SQL backed letter source over a single connection
pub struct LetterStore {
    pool: AnyPool,
    queries: QuerySet,
}

impl LetterStore {
    /// Open the run's only connection. Queries are attached afterwards with
    /// [`LetterStore::with_queries`].
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        log::info!("Connecting to {}", config.describe());
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&config.connection_url())
            .await
            .map_err(|e| LetterError::Connection(e.to_string()))?;

        Ok(Self::from_pool(pool, QuerySet::new()))
    }

    pub fn with_queries(mut self, queries: QuerySet) -> Self {
        self.queries = queries;
        self
    }

    pub fn from_pool(pool: AnyPool, queries: QuerySet) -> Self {
        Self { pool, queries }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LetterSource for LetterStore {
    async fn fetch_requests(&self, kind: LetterKind) -> Result<Vec<LetterRequest>> {
        let rows = sqlx::query(self.queries.listing(kind)?)
            .fetch_all(&self.pool)
            .await?;

        log::info!("Query returned {} {} rows", rows.len(), kind);

        rows.iter().map(|row| mapper::map_request(kind, row)).collect()
    }

    async fn fetch_schedule(&self, property: &ReferenceKey) -> Result<ScheduleTable> {
        let row = sqlx::query(self.queries.schedule()?)
            .bind(property.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| LetterError::MissingSchedule(property.to_string()))?;

        mapper::map_schedule(&row)
    }

    async fn mark_processed(&self, kinds: &[LetterKind]) -> Result<()> {
        let statements = self.queries.updates_for(kinds);
        if statements.is_empty() {
            log::info!("No processed-flag updates configured for this run");
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for sql in &statements {
            let result = sqlx::query(sql).execute(&mut *tx).await?;
            log::debug!("Update affected {} rows", result.rows_affected());
        }
        tx.commit().await?;

        log::info!("Marked requests processed ({} statements)", statements.len());
        Ok(())
    }
}
