//! Redis storage backend.
//!
//! [`RedisBackend`] implements [`KeyValueBackend`] with Redis hashes. The
//! trait methods map one-to-one onto Redis commands:
//!
//! | Method | Redis |
//! |--------|-------|
//! | `get_field` | `HGET key field` |
//! | `get_all_fields` | `HGETALL key` |
//! | `set_fields` / `set_field` | `HSET key field value [field value ...]` |
//! | `replace_fields` | `MULTI` / `DEL key` / `HSET ...` / `EXEC` |
//!
//! # Key Schema
//!
//! Keys are used verbatim so records interoperate with other clients of the
//! same store (`task:{task_id}:metadata`, `task:{task_id}:step:{step_id}`).
//! An optional namespace can be set with [`RedisBackend::with_namespace`],
//! in which case every key becomes `{namespace}:{key}`. This exists for
//! test isolation; production deployments leave it unset.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use retsu::store::redis::RedisBackend;
//! use retsu::ResultTracker;
//!
//! # async fn example() {
//! let backend = RedisBackend::new("redis://127.0.0.1:6379/0").await.unwrap();
//! let tracker = ResultTracker::new(Arc::new(backend));
//! # }
//! ```

use std::collections::HashMap;

use ::redis::aio::MultiplexedConnection;
use ::redis::AsyncCommands;
use async_trait::async_trait;

use crate::config::TrackingConfig;
use crate::store::backend::{KeyValueBackend, RecordFields, StorageError};

/// Redis storage backend over a multiplexed async connection.
///
/// # Connection Model
///
/// The connection is acquired once at construction. [`MultiplexedConnection`]
/// is cheap to clone (all clones share one TCP connection), so each method
/// clones it for the duration of a single command. There is no pooling,
/// reconnection, or retry at this layer.
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    namespace: Option<String>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connects to Redis at the given URL.
    ///
    /// The URL format is `redis://[:<password>@]<host>:<port>[/<db>]`.
    /// Fails fast if the connection cannot be established.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the client cannot be created or
    /// the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        let client = ::redis::Client::open(url).map_err(|e| StorageError::Backend {
            message: format!("failed to create Redis client: {e}"),
            source: Some(Box::new(e)),
        })?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::Backend {
                message: format!("failed to connect to Redis: {e}"),
                source: Some(Box::new(e)),
            })?;
        tracing::debug!(url = %url, "connected to Redis");
        Ok(Self::with_connection(conn))
    }

    /// Connects using host, port and database index from a
    /// [`TrackingConfig`].
    ///
    /// # Errors
    ///
    /// Same as [`RedisBackend::new`].
    pub async fn from_config(config: &TrackingConfig) -> Result<Self, StorageError> {
        Self::new(&config.redis_url()).await
    }

    /// Wraps a pre-built multiplexed connection.
    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            namespace: None,
        }
    }

    /// Prefixes every key with `{namespace}:` (builder pattern).
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn full_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{key}"),
            None => key.to_string(),
        }
    }
}

/// Builds `HSET key field value [field value ...]`.
fn hset_command(key: &str, fields: &RecordFields) -> ::redis::Cmd {
    let mut cmd = ::redis::cmd("HSET");
    cmd.arg(key);
    for (field, value) in fields {
        cmd.arg(field.as_str()).arg(value.as_slice());
    }
    cmd
}

fn map_redis_error(err: ::redis::RedisError, key: &str) -> StorageError {
    StorageError::Backend {
        message: format!("Redis error for key {key}: {err}"),
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = self.full_key(key);
        let mut conn = self.conn.clone();
        conn.hget(&key, field)
            .await
            .map_err(|e| map_redis_error(e, &key))
    }

    async fn get_all_fields(&self, key: &str) -> Result<RecordFields, StorageError> {
        let key = self.full_key(key);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, Vec<u8>> = conn
            .hgetall(&key)
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        Ok(fields.into_iter().collect())
    }

    async fn set_fields(&self, key: &str, fields: &RecordFields) -> Result<(), StorageError> {
        if fields.is_empty() {
            // HSET without field/value pairs is a syntax error in Redis.
            return Ok(());
        }
        let key = self.full_key(key);
        let mut conn = self.conn.clone();
        let _: () = hset_command(&key, fields)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        Ok(())
    }

    async fn set_field(&self, key: &str, field: &str, value: &[u8]) -> Result<(), StorageError> {
        let key = self.full_key(key);
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(&key, field, value)
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        Ok(())
    }

    async fn replace_fields(&self, key: &str, fields: &RecordFields) -> Result<(), StorageError> {
        let key = self.full_key(key);
        let mut pipe = ::redis::pipe();
        pipe.atomic().del(&key).ignore();
        if !fields.is_empty() {
            pipe.add_command(hset_command(&key, fields)).ignore();
        }
        let mut conn = self.conn.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hset_command_packs_field_value_pairs() {
        let mut fields = RecordFields::new();
        fields.insert("status".to_string(), b"started".to_vec());
        fields.insert("updated_at".to_string(), b"now".to_vec());
        let packed = hset_command("task:t1:metadata", &fields).get_packed_command();
        let text = String::from_utf8_lossy(&packed);
        assert!(text.contains("HSET"));
        assert!(text.contains("task:t1:metadata"));
        assert!(text.find("status").unwrap() < text.find("updated_at").unwrap());
    }
}

// ---------------------------------------------------------------------------
// Integration tests -- Redis backend contract tests
// ---------------------------------------------------------------------------

/// Integration tests for [`RedisBackend`] against a real Redis instance.
///
/// Requires a running Redis (default `redis://127.0.0.1:6379`, override
/// with `REDIS_URL`). Run with:
///
/// ```bash
/// cargo test --features redis-tests -- redis_ --test-threads=1
/// ```
///
/// Each test uses a unique UUID namespace, so no cleanup is needed.
#[cfg(all(test, feature = "redis-tests"))]
mod integration_tests {
    use super::*;

    async fn test_backend() -> RedisBackend {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        RedisBackend::new(&url)
            .await
            .expect("Redis connection failed -- is Redis running?")
            .with_namespace(format!("test-{}", uuid::Uuid::new_v4()))
    }

    fn fields(pairs: &[(&str, &[u8])]) -> RecordFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn redis_get_field_missing_returns_none() {
        let backend = test_backend().await;
        let value = backend.get_field("task:none:metadata", "status").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn redis_set_fields_then_get_all() {
        let backend = test_backend().await;
        let key = "task:t1:metadata";
        backend
            .set_fields(key, &fields(&[("status", &b"started"[..]), ("bin", &[0u8, 159, 255][..])]))
            .await
            .unwrap();
        let all = backend.get_all_fields(key).await.unwrap();
        assert_eq!(all.get("status").unwrap(), b"started");
        assert_eq!(all.get("bin").unwrap(), &vec![0u8, 159, 255]);
    }

    #[tokio::test]
    async fn redis_set_field_overwrites_single_field() {
        let backend = test_backend().await;
        let key = "task:t1:step:load";
        backend.set_field(key, "status", b"started").await.unwrap();
        backend.set_field(key, "status", b"completed").await.unwrap();
        assert_eq!(
            backend.get_field(key, "status").await.unwrap(),
            Some(b"completed".to_vec())
        );
    }

    #[tokio::test]
    async fn redis_replace_fields_drops_old_fields() {
        let backend = test_backend().await;
        let key = "task:t2:metadata";
        backend
            .set_fields(key, &fields(&[("status", &b"pending"[..]), ("extra", &b"1"[..])]))
            .await
            .unwrap();
        backend
            .replace_fields(key, &fields(&[("status", &b"started"[..])]))
            .await
            .unwrap();
        let all = backend.get_all_fields(key).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("status").unwrap(), b"started");
    }
}
