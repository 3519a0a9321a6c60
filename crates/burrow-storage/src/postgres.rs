use async_trait::async_trait;
use burrow_core::error::{Result, StorageError};
use burrow_core::{KeyedUrl, OwnerId, Repository, Resolution, ShortCode, Stats};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool, Postgres, Transaction};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Upper bound on every database call.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(1);

const SHORT_URL_CONSTRAINT: &str = "shorturl_short_url_key";
const ORIGINAL_URL_CONSTRAINT: &str = "shorturl_original_url_key";

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL implementation of the repository contract.
///
/// Rows are never removed: deletion flips the `deleted` flag, and a
/// deleted key keeps resolving to [`Resolution::Deleted`]. Writes run in
/// explicit transactions. Every call is bounded by the operation timeout
/// and reports [`StorageError::Timeout`] when it is exceeded.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Creates a repository by opening a new connection pool.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(dsn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("migration failed: {e}")))?;
        info!("database schema is up to date");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(format!(
                "{operation} exceeded {:?}",
                self.timeout
            ))),
        }
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

/// Unique violations are told apart by constraint name; any other
/// violation is a plain query failure.
fn map_insert_error(err: sqlx::Error, code: &ShortCode, original_url: &str) -> StorageError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            match db.constraint() {
                Some(ORIGINAL_URL_CONSTRAINT) => {
                    return StorageError::DuplicateUrl(original_url.to_owned())
                }
                Some(SHORT_URL_CONSTRAINT) => return StorageError::KeyConflict(code.to_string()),
                _ => {}
            }
        }
    }
    map_sqlx_error(err)
}

async fn insert_row(
    tx: &mut Transaction<'_, Postgres>,
    code: &ShortCode,
    original_url: &str,
    owner: OwnerId,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO shorturl (id, short_url, original_url, user_id)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(code.as_str())
    .bind(original_url)
    .bind(owner)
    .execute(&mut **tx)
    .await
    .map_err(|err| map_insert_error(err, code, original_url))?;

    Ok(())
}

async fn finish<T>(tx: Transaction<'_, Postgres>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(map_sqlx_error)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                error!(error = %rollback, "failed to roll back transaction");
            }
            Err(err)
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn add_url(&self, code: &ShortCode, original_url: &str, owner: OwnerId) -> Result<()> {
        self.bounded("add_url", async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
            let outcome = insert_row(&mut tx, code, original_url, owner).await;
            finish(tx, outcome).await
        })
        .await?;

        debug!(code = %code, owner, "stored short url");
        Ok(())
    }

    async fn add_batch(&self, entries: &[KeyedUrl], owner: OwnerId) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        self.bounded("add_batch", async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
            let mut outcome = Ok(());
            for entry in entries {
                outcome = insert_row(&mut tx, &entry.code, &entry.original_url, owner).await;
                if outcome.is_err() {
                    break;
                }
            }
            finish(tx, outcome).await
        })
        .await?;

        debug!(count = entries.len(), owner, "stored short url batch");
        Ok(())
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Resolution> {
        let row: Option<(String, bool)> = self
            .bounded("get_url", async {
                sqlx::query_as(
                    r#"
                    SELECT original_url, deleted
                    FROM shorturl
                    WHERE short_url = $1
                    "#,
                )
                .bind(code.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)
            })
            .await?;

        Ok(match row {
            None => Resolution::NotFound,
            Some((_, true)) => Resolution::Deleted,
            Some((url, false)) => Resolution::Active(url),
        })
    }

    async fn get_short_url(&self, original_url: &str) -> Result<Option<ShortCode>> {
        let code: Option<String> = self
            .bounded("get_short_url", async {
                sqlx::query_scalar("SELECT short_url FROM shorturl WHERE original_url = $1")
                    .bind(original_url)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)
            })
            .await?;

        Ok(code.map(ShortCode::new_unchecked))
    }

    async fn get_all_urls(&self, owner: OwnerId) -> Result<Vec<KeyedUrl>> {
        let rows: Vec<(String, String)> = self
            .bounded("get_all_urls", async {
                sqlx::query_as(
                    r#"
                    SELECT short_url, original_url
                    FROM shorturl
                    WHERE user_id = $1
                      AND NOT deleted
                    "#,
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|(code, url)| KeyedUrl::new(ShortCode::new_unchecked(code), url))
            .collect())
    }

    async fn delete_batch(&self, codes: &[ShortCode], owner: OwnerId) -> Result<u64> {
        if codes.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = codes.iter().map(|c| c.as_str().to_owned()).collect();

        let affected = self
            .bounded("delete_batch", async {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
                let outcome = sqlx::query(
                    r#"
                    UPDATE shorturl
                    SET deleted = TRUE
                    WHERE short_url = ANY($1)
                      AND user_id = $2
                      AND NOT deleted
                    "#,
                )
                .bind(keys)
                .bind(owner)
                .execute(&mut *tx)
                .await
                .map(|done| done.rows_affected())
                .map_err(map_sqlx_error);
                finish(tx, outcome).await
            })
            .await?;

        debug!(requested = codes.len(), affected, owner, "soft-deleted short urls");
        Ok(affected)
    }

    async fn stats(&self) -> Result<Stats> {
        let (urls, users): (i64, i64) = self
            .bounded("stats", async {
                sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT user_id) FROM shorturl")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)
            })
            .await?;

        Ok(Stats {
            urls: urls.max(0) as u64,
            users: users.max(0) as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.bounded("ping", async {
            let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
            conn.ping().await.map_err(map_sqlx_error)
        })
        .await
    }
}
