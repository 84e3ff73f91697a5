//! Owner of the process-wide connection pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rusqlite::Connection;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::error::{StoreError, StoreResult};
use super::pool::ConnectionPool;
use crate::config::StoreConfig;

/// Lazily creates the single shared [`ConnectionPool`] and hands out
/// references to it.
///
/// Concurrent first callers are serialized on the write lock and re-check
/// the slot, so exactly one pool is ever built. A failed creation leaves the
/// slot empty and the next caller retries from scratch.
pub struct PoolManager {
    config: StoreConfig,
    pool: RwLock<Option<Arc<ConnectionPool>>>,
    created: AtomicUsize,
}

impl PoolManager {
    /// Create a manager; no connection is opened until the first acquire.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
            created: AtomicUsize::new(0),
        }
    }

    /// Get the shared pool, creating it on first use.
    pub async fn acquire(&self) -> StoreResult<Arc<ConnectionPool>> {
        if let Some(pool) = self.pool.read().await.as_ref() {
            return Ok(Arc::clone(pool));
        }

        let mut slot = self.pool.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(Arc::clone(pool));
        }

        let started = Instant::now();
        let config = self.config.clone();
        let pool = tokio::task::spawn_blocking(move || ConnectionPool::open(config)).await??;
        let pool = Arc::new(pool);

        let generation = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            path = %self.config.path,
            max_connections = self.config.max_connections,
            generation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "connection pool created"
        );

        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Drop `pool` as the shared pool if it is still the current one.
    pub async fn invalidate(&self, pool: &Arc<ConnectionPool>) {
        let mut slot = self.pool.write().await;
        let is_current = slot
            .as_ref()
            .map(|current| Arc::ptr_eq(current, pool))
            .unwrap_or(false);

        if is_current {
            warn!(path = %self.config.path, "discarding connection pool after fatal error");
            pool.close();
            *slot = None;
        }
    }

    /// Whether a pool currently exists.
    pub async fn is_initialized(&self) -> bool {
        self.pool.read().await.is_some()
    }

    /// How many pools this manager has built.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Borrow a connection and run a blocking closure on it.
    ///
    /// Fatal errors invalidate the pool; the connection that produced one is
    /// discarded.
    pub async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.acquire().await?;
        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(err) => {
                if err.is_fatal() {
                    self.invalidate(&pool).await;
                }
                return Err(err);
            }
        };

        let result = tokio::task::spawn_blocking(move || {
            let result = f(&conn);
            if matches!(&result, Err(err) if err.is_fatal()) {
                conn.mark_broken();
            }
            result
        })
        .await?;

        if let Err(err) = &result {
            if err.is_fatal() {
                self.invalidate(&pool).await;
            }
        }

        result
    }
}
