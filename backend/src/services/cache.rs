use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Database-backed caching service over the cache_entries table.
///
/// Callers treat reads and writes as best-effort: a cache failure is never a
/// request failure, the caller falls back to the source query.
#[derive(Debug, Clone)]
pub struct CacheService {
    pool: PgPool,
}

impl CacheService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let result: Option<(JsonValue,)> = sqlx::query_as(
            r#"
            SELECT value FROM cache_entries
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match result {
            Some((value,)) => {
                // Update hit count
                sqlx::query("UPDATE cache_entries SET hit_count = hit_count + 1 WHERE key = $1")
                    .bind(key)
                    .execute(&self.pool)
                    .await?;

                let parsed = serde_json::from_value(value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a value in cache
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: i32) -> CacheResult<()> {
        let json_value = serde_json::to_value(value)?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES ($1, $2, NOW() + ($3 || ' seconds')::interval)
            ON CONFLICT (key) DO UPDATE
            SET value = $2, expires_at = NOW() + ($3 || ' seconds')::interval, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(json_value)
        .bind(ttl_seconds.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Invalidate cache entries matching a pattern (SQL LIKE pattern)
    pub async fn invalidate_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key LIKE $1")
            .bind(pattern)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Cache key builders for common patterns
pub mod cache_keys {
    pub fn customer_list(
        page: i64,
        per_page: i64,
        sort: &str,
        direction: &str,
        search: Option<&str>,
    ) -> String {
        format!(
            "customers:list:{}:{}:{}:{}:{}",
            page,
            per_page,
            sort,
            direction,
            search.unwrap_or("-")
        )
    }

    /// Pattern to invalidate all customer-related caches
    pub fn customers_pattern() -> String {
        "customers:%".to_string()
    }
}

/// Default TTL values in seconds
pub mod ttl {
    pub const SHORT: i32 = 60; // 1 minute
}
