//! Bounded pool of SQLite connections.

use std::ops::Deref;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use crate::config::StoreConfig;

/// A reusable set of live connections to the store.
///
/// At most `max_connections` connections are checked out at once; further
/// callers wait for a permit. Idle connections are reused, new ones are
/// opened lazily up to the bound.
#[derive(Debug)]
pub struct ConnectionPool {
    config: StoreConfig,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

impl ConnectionPool {
    /// Build a pool, opening one connection eagerly so a bad configuration
    /// fails here instead of on the first query.
    ///
    /// Blocking: call from a blocking context.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let first = open_connection(&config)?;
        let permits = Arc::new(Semaphore::new(config.max_connections as usize));

        Ok(Self {
            config,
            idle: Mutex::new(vec![first]),
            permits,
        })
    }

    /// Check out a connection, waiting while the pool is at capacity.
    pub async fn get(self: &Arc<Self>) -> StoreResult<PooledConnection> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::PoolClosed)?;

        let reused = self.lock_idle().pop();
        let conn = match reused {
            Some(conn) => conn,
            None => {
                debug!(path = %self.config.path, "opening pooled connection");
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || open_connection(&config)).await??
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(self),
            broken: false,
            _permit: permit,
        })
    }

    /// Number of connections currently idle in the pool.
    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    /// Stop handing out connections; waiting callers get `PoolClosed`.
    pub fn close(&self) {
        self.permits.close();
        self.lock_idle().clear();
    }

    fn lock_idle(&self) -> std::sync::MutexGuard<'_, Vec<Connection>> {
        // A panic while holding the lock leaves the Vec itself intact.
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, conn: Connection) {
        if !self.permits.is_closed() {
            self.lock_idle().push(conn);
        }
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Returned to the pool on drop unless marked broken.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<ConnectionPool>,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Discard this connection instead of returning it to the pool.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in Drop.
        self.conn.as_ref().expect("pooled connection used after release")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if !self.broken {
                self.pool.release(conn);
            }
        }
    }
}

/// Open and configure a single connection.
fn open_connection(config: &StoreConfig) -> StoreResult<Connection> {
    let conn = Connection::open_with_flags(config.database_path(), config.open_flags())
        .map_err(StoreError::Open)?;

    conn.busy_timeout(config.busy_timeout())
        .map_err(StoreError::Open)?;

    if config.query_only {
        conn.pragma_update(None, "query_only", true)
            .map_err(StoreError::Open)?;
    }

    // Touch the schema so a file that is not a database fails here.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(StoreError::Open)?;

    Ok(conn)
}
