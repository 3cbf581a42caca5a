//! Vector memory storage backed by PostgreSQL
//!
//! One table per collection. With pgvector the embedding column is
//! `vector(D)` and similarity is computed in SQL with `<=>`, `<->` or `<#>`;
//! without it the column is `REAL[]` and candidates are ranked in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Postgres, Row};
use tracing::{debug, info};

use crate::core::record::{Metadata, ScoredRecord, VectorRecord};
use crate::core::similarity::DistanceMetric;
use crate::core::storage::{self, VectorStore};
use crate::database::PostgresPool;
use crate::error::{Error, Result};

const RECORD_COLUMNS: &str =
    "id, text, embedding, metadata, description, external_source_name, is_reference, timestamp, seq";

const TABLE_EXISTS_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name = $1
    )
"#;

/// Vector store backed by PostgreSQL
#[derive(Clone)]
pub struct PostgresVectorStore {
    pool: PostgresPool,
    dimension: usize,
    distance: DistanceMetric,
    auto_create: bool,
    native_vectors: bool,
    table_prefix: String,
}

impl PostgresVectorStore {
    /// Create a store using pgvector, cosine similarity and auto-created collections
    pub fn new(pool: PostgresPool, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("Vector dimension must be positive".into()));
        }

        Ok(PostgresVectorStore {
            pool,
            dimension,
            distance: DistanceMetric::default(),
            auto_create: true,
            native_vectors: true,
            table_prefix: "memory_".to_string(),
        })
    }

    /// Set the distance metric
    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    /// Enable or disable creating collections on first upsert
    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// Use native pgvector columns, or `REAL[]` with in-process scoring
    pub fn with_pgvector(mut self, enabled: bool) -> Self {
        self.native_vectors = enabled;
        self
    }

    /// Set the table name prefix
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Config(format!("Invalid table prefix: {}", prefix)));
        }
        self.table_prefix = prefix;
        Ok(self)
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    /// Unquoted table name for a collection
    fn raw_table_name(&self, collection: &str) -> Result<String> {
        storage::validate_collection_name(collection)?;
        Ok(format!("{}{}", self.table_prefix, collection))
    }

    /// Quoted table identifier for a collection
    fn table_name(&self, collection: &str) -> Result<String> {
        Ok(quote_ident(&self.raw_table_name(collection)?))
    }

    fn column_type(&self) -> String {
        if self.native_vectors {
            format!("vector({})", self.dimension)
        } else {
            "REAL[]".to_string()
        }
    }

    fn bind_embedding<'q>(
        &self,
        query: Query<'q, Postgres, PgArguments>,
        embedding: &[f32],
    ) -> Query<'q, Postgres, PgArguments> {
        if self.native_vectors {
            query.bind(Vector::from(embedding.to_vec()))
        } else {
            query.bind(embedding.to_vec())
        }
    }

    fn record_from_row(&self, row: &PgRow) -> Result<VectorRecord> {
        let embedding: Vec<f32> = if self.native_vectors {
            row.try_get::<Vector, _>("embedding")?.to_vec()
        } else {
            row.try_get("embedding")?
        };
        let metadata: Json<Metadata> = row.try_get("metadata")?;
        let timestamp: DateTime<Utc> = row.try_get("timestamp")?;

        Ok(VectorRecord {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            embedding,
            metadata: metadata.0,
            description: row.try_get("description")?,
            external_source_name: row.try_get("external_source_name")?,
            is_reference: row.try_get("is_reference")?,
            timestamp,
        })
    }

    /// Dimension of an existing collection table, if it can be determined
    async fn existing_dimension(&self, collection: &str) -> Result<Option<usize>> {
        let raw = self.raw_table_name(collection)?;

        if self.native_vectors {
            // pgvector stores the dimension as the column's type modifier
            let typmod: Option<(i32,)> = sqlx::query_as(
                r#"
                SELECT a.atttypmod
                FROM pg_attribute a
                JOIN pg_class c ON a.attrelid = c.oid
                JOIN pg_namespace n ON c.relnamespace = n.oid
                WHERE n.nspname = current_schema() AND c.relname = $1 AND a.attname = 'embedding'
                "#,
            )
            .bind(&raw)
            .fetch_optional(&self.pool)
            .await?;

            Ok(typmod.and_then(|(m,)| usize::try_from(m).ok()))
        } else {
            let sql = format!(
                "SELECT array_length(embedding, 1) FROM {} LIMIT 1",
                quote_ident(&raw)
            );
            let len: Option<(Option<i32>,)> = sqlx::query_as(&sql).fetch_optional(&self.pool).await?;

            Ok(len.and_then(|(l,)| l).and_then(|l| usize::try_from(l).ok()))
        }
    }

    /// Reject an existing collection whose vectors have another dimension
    async fn check_existing_dimension(&self, collection: &str) -> Result<()> {
        match self.existing_dimension(collection).await? {
            Some(actual) if actual != self.dimension => Err(Error::InvalidDimension {
                collection: collection.to_string(),
                expected: self.dimension,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Make sure a compatible collection exists before writing to it
    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        if self.does_collection_exist(collection).await? {
            return self.check_existing_dimension(collection).await;
        }
        if !self.auto_create {
            return Err(Error::CollectionNotFound(collection.to_string()));
        }
        self.create_collection(collection).await
    }

    fn upsert_sql(&self, table: &str) -> String {
        format!(
            r#"
            INSERT INTO {table} (id, text, embedding, metadata, description, external_source_name, is_reference, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                text = EXCLUDED.text,
                embedding = EXCLUDED.embedding,
                metadata = EXCLUDED.metadata,
                description = EXCLUDED.description,
                external_source_name = EXCLUDED.external_source_name,
                is_reference = EXCLUDED.is_reference,
                timestamp = EXCLUDED.timestamp
            "#
        )
    }

    fn upsert_query<'q>(
        &self,
        sql: &'q str,
        record: &'q VectorRecord,
        now: DateTime<Utc>,
    ) -> Query<'q, Postgres, PgArguments> {
        let query = sqlx::query(sql).bind(&record.id).bind(&record.text);
        self.bind_embedding(query, &record.embedding)
            .bind(Json(record.metadata.clone()))
            .bind(&record.description)
            .bind(&record.external_source_name)
            .bind(record.is_reference)
            .bind(now)
    }

    /// Exact scan scored in SQL. Ordering uses the reported score so NaN
    /// distances from zero vectors rank where their score of 0 puts them.
    fn search_sql(&self, table: &str) -> String {
        let score = score_expression(self.distance);
        format!(
            r#"
            SELECT {RECORD_COLUMNS}, {score} AS score
            FROM {table}
            WHERE {score} >= $2
            ORDER BY score DESC, seq
            LIMIT $3
            "#
        )
    }

    async fn search_native(
        &self,
        table: &str,
        query: &[f32],
        top_k: usize,
        min_relevance_score: f64,
    ) -> Result<Vec<ScoredRecord>> {
        let sql = self.search_sql(table);
        let rows = sqlx::query(&sql)
            .bind(Vector::from(query.to_vec()))
            .bind(min_relevance_score)
            .bind(i64::try_from(top_k).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ScoredRecord {
                    record: self.record_from_row(row)?,
                    score: row.try_get("score")?,
                })
            })
            .collect()
    }

    async fn search_scan(
        &self,
        table: &str,
        query: &[f32],
        top_k: usize,
        min_relevance_score: f64,
    ) -> Result<Vec<ScoredRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM {table}");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let candidates = rows
            .iter()
            .map(|row| {
                let seq: i64 = row.try_get("seq")?;
                Ok((seq.max(0) as u64, self.record_from_row(row)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(storage::rank(
            self.distance,
            query,
            candidates,
            top_k,
            min_relevance_score,
        ))
    }
}

#[async_trait]
impl VectorStore for PostgresVectorStore {
    fn id(&self) -> &str {
        "postgres"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn distance(&self) -> DistanceMetric {
        self.distance
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        let raw = self.raw_table_name(name)?;

        if self.does_collection_exist(name).await? {
            return self.check_existing_dimension(name).await;
        }

        // Serialize creators of the same table
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&raw)
            .execute(&mut *tx)
            .await?;

        let (exists,): (bool,) = sqlx::query_as(TABLE_EXISTS_SQL)
            .bind(&raw)
            .fetch_one(&mut *tx)
            .await?;
        if exists {
            tx.commit().await?;
            return self.check_existing_dimension(name).await;
        }

        sqlx::query(&format!(
            r#"
            CREATE TABLE {table} (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                embedding {column} NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{{}}',
                description TEXT,
                external_source_name TEXT,
                is_reference BOOLEAN NOT NULL DEFAULT FALSE,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                seq BIGSERIAL
            )
            "#,
            table = quote_ident(&raw),
            column = self.column_type(),
        ))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Created collection '{}' (dimension={}, distance={})", name, self.dimension, self.distance);
        Ok(())
    }

    async fn does_collection_exist(&self, name: &str) -> Result<bool> {
        let raw = self.raw_table_name(name)?;

        let (exists,): (bool,) = sqlx::query_as(TABLE_EXISTS_SQL)
            .bind(&raw)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let tables: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT table_name::text FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name LIKE $1
            ORDER BY table_name
            "#,
        )
        .bind(format!("{}%", escape_like(&self.table_prefix)))
        .fetch_all(&self.pool)
        .await?;

        Ok(tables
            .into_iter()
            .filter_map(|(table,)| table.strip_prefix(&self.table_prefix).map(str::to_string))
            .filter(|name| storage::validate_collection_name(name).is_ok())
            .collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let table = self.table_name(name)?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&self.pool)
            .await?;

        info!("Deleted collection '{}'", name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<String> {
        storage::validate_record(self.dimension, &record)?;
        self.ensure_collection(collection).await?;

        let table = self.table_name(collection)?;
        let sql = self.upsert_sql(&table);
        self.upsert_query(&sql, &record, Utc::now())
            .execute(&self.pool)
            .await?;

        debug!("Upserted record '{}' into '{}'", record.id, collection);
        Ok(record.id)
    }

    async fn upsert_batch(&self, collection: &str, records: Vec<VectorRecord>) -> Result<Vec<String>> {
        for record in &records {
            storage::validate_record(self.dimension, record)?;
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_collection(collection).await?;

        let table = self.table_name(collection)?;
        let sql = self.upsert_sql(&table);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        for record in &records {
            self.upsert_query(&sql, record, now).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!("Upserted {} records into '{}'", records.len(), collection);
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<VectorRecord> {
        if !self.does_collection_exist(collection).await? {
            return Err(Error::not_found(collection, id));
        }

        let table = self.table_name(collection)?;
        let row = sqlx::query(&format!("SELECT {RECORD_COLUMNS} FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => self.record_from_row(&row),
            None => Err(Error::not_found(collection, id)),
        }
    }

    async fn get_batch(&self, collection: &str, ids: &[String]) -> Result<Vec<VectorRecord>> {
        storage::validate_collection_name(collection)?;
        if ids.is_empty() || !self.does_collection_exist(collection).await? {
            return Ok(Vec::new());
        }

        let table = self.table_name(collection)?;
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM {table} WHERE id = ANY($1) ORDER BY seq"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| self.record_from_row(row)).collect()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if !self.does_collection_exist(collection).await? {
            return Ok(());
        }

        let table = self.table_name(collection)?;
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<()> {
        storage::validate_collection_name(collection)?;
        if ids.is_empty() || !self.does_collection_exist(collection).await? {
            return Ok(());
        }

        let table = self.table_name(collection)?;
        sqlx::query(&format!("DELETE FROM {} WHERE id = ANY($1)", table))
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
        min_relevance_score: f64,
    ) -> Result<Vec<ScoredRecord>> {
        storage::validate_query(self.dimension, query, top_k)?;

        if !self.does_collection_exist(collection).await? {
            return Ok(Vec::new());
        }

        let table = self.table_name(collection)?;
        let results = if self.native_vectors {
            self.search_native(&table, query, top_k, min_relevance_score).await?
        } else {
            self.search_scan(&table, query, top_k, min_relevance_score).await?
        };

        debug!("Search in '{}' returned {} results", collection, results.len());
        Ok(results)
    }

    async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}

/// Quote an SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape LIKE wildcards
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// SQL expression yielding the same score as `DistanceMetric::score`.
///
/// `<=>` is NaN for zero vectors; those score 0 like the in-process path.
fn score_expression(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Cosine => "COALESCE(NULLIF(1 - (embedding <=> $1), 'NaN'::float8), 0)",
        DistanceMetric::Euclidean => "(1 / (1 + (embedding <-> $1)))",
        DistanceMetric::DotProduct => "((embedding <#> $1) * -1)",
    }
}
