//! Postgres-backed source store
//!
//! Reads the `models` table (`fqid`, `data`, `updated`, `deleted`). Every scan
//! opens its own connection and closes it afterwards.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Connection, Row};

use super::SourceStore;
use super::types::SourceRow;
use crate::config::DatabaseConfig;
use crate::search::errors::{SearchError, SearchResult};

const SELECT_COLLECTION_SIZES_SQL: &str = r#"
SELECT
  count(*),
  left(fqid, position('/' IN fqid)-1) coll
FROM models
WHERE NOT deleted
GROUP BY coll"#;

const SELECT_ALL_SQL: &str = r#"
SELECT
  fqid,
  data::text,
  updated::timestamptz
FROM models
WHERE NOT deleted"#;

// The diff scan still returns every live row so the tracker can keep
// unchanged entries alive; only the payload is filtered by the watermark.
const SELECT_DIFF_SQL: &str = r#"
SELECT
  fqid,
  CASE WHEN updated::timestamptz > $1 THEN data::text ELSE NULL END,
  updated::timestamptz
FROM models
WHERE NOT deleted"#;

/// Source store reading from Postgres
#[derive(Debug, Clone)]
pub struct PostgresStore {
    options: PgConnectOptions,
}

impl PostgresStore {
    #[must_use]
    pub fn new(database: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(database.host())
            .port(database.port())
            .username(database.user())
            .password(database.password())
            .database(database.name());
        Self { options }
    }

    async fn connect(&self) -> SearchResult<PgConnection> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| SearchError::Connection(e.to_string()))
    }

    async fn stream_rows<'q, F>(
        &self,
        query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
        mut on_row: F,
    ) -> SearchResult<()>
    where
        F: FnMut(SourceRow) -> SearchResult<()> + Send,
    {
        let mut conn = self.connect().await?;
        let result = async {
            let mut rows = query.fetch(&mut conn);
            while let Some(row) = rows.try_next().await? {
                on_row(decode_row(&row)?)?;
            }
            Ok::<(), SearchError>(())
        }
        .await;

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Closing source store connection failed");
        }
        result
    }
}

fn decode_row(row: &PgRow) -> SearchResult<SourceRow> {
    Ok(SourceRow {
        reference: row.try_get::<String, _>(0)?,
        payload: row.try_get::<Option<String>, _>(1)?,
        updated_at: row.try_get::<DateTime<Utc>, _>(2)?,
    })
}

impl SourceStore for PostgresStore {
    async fn collection_sizes(&self) -> SearchResult<AHashMap<String, usize>> {
        let mut conn = self.connect().await?;
        let result: SearchResult<Vec<(i64, String)>> = sqlx::query_as(SELECT_COLLECTION_SIZES_SQL)
            .fetch_all(&mut conn)
            .await
            .map_err(SearchError::from);

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Closing source store connection failed");
        }

        Ok(result?
            .into_iter()
            .map(|(size, collection)| (collection, usize::try_from(size).unwrap_or(0)))
            .collect())
    }

    async fn scan_all<F>(&self, on_row: F) -> SearchResult<()>
    where
        F: FnMut(SourceRow) -> SearchResult<()> + Send,
    {
        self.stream_rows(sqlx::query(SELECT_ALL_SQL), on_row).await
    }

    async fn scan_since<F>(&self, watermark: DateTime<Utc>, on_row: F) -> SearchResult<()>
    where
        F: FnMut(SourceRow) -> SearchResult<()> + Send,
    {
        self.stream_rows(sqlx::query(SELECT_DIFF_SQL).bind(watermark), on_row)
            .await
    }
}
