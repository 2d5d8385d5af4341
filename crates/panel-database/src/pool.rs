//! Bounded connection pool shared by every request.
//!
//! Connections are opened lazily, up to `max_connections`, and recycled
//! through an idle list. A borrowed connection is represented by a
//! [`PooledConnection`] guard; releasing it explicitly or dropping it returns
//! the slot, so every successful `acquire()` is released exactly once.
//!
//! No database is ever selected on a pooled connection. A borrower that
//! rescopes its connection with `USE` taints it: on release the connection is
//! closed and its slot freed instead of returning to the idle list, and the
//! next borrower opens a fresh, unscoped session. The same happens to a
//! connection whose guard is dropped while a statement is in flight.

use crate::{
    Connector, DatabaseError, DatabaseResult, Identifier, QueryResult, RowMap, ServerConnection,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info, warn};

/// Configuration for the connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum connections borrowed at once.
    pub max_connections: usize,
    /// Maximum callers waiting for a connection. Zero means unbounded.
    pub queue_limit: usize,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            queue_limit: 0,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolState {
    pub capacity: usize,
    /// Connections currently held by callers.
    pub borrowed: usize,
    /// Open connections ready for reuse.
    pub idle: usize,
    /// Callers queued for a connection.
    pub waiting: usize,
    /// Connections closed because they were rescoped, since startup.
    pub retired: usize,
}

struct Shared<C: Connector> {
    connector: C,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<C::Connection>>,
    borrowed: AtomicUsize,
    waiting: AtomicUsize,
    retired: AtomicUsize,
    closed: AtomicBool,
}

/// Shared handle to the pool. Cloning is cheap.
pub struct ConnectionPool<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Connector> ConnectionPool<C> {
    /// Create a pool. No connection is opened until the first `acquire()`.
    pub fn new(connector: C, config: PoolConfig) -> DatabaseResult<Self> {
        if config.max_connections == 0 {
            return Err(DatabaseError::InvalidInput(
                "pool size must be greater than zero".to_string(),
            ));
        }

        info!(
            max_connections = config.max_connections,
            queue_limit = config.queue_limit,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "Connection pool created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                permits: Arc::new(Semaphore::new(config.max_connections)),
                idle: Mutex::new(Vec::with_capacity(config.max_connections)),
                connector,
                config,
                borrowed: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                retired: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Borrow a connection.
    ///
    /// Waits up to `acquire_timeout` when every connection is borrowed, and
    /// fails immediately with `PoolExhausted` when `queue_limit` callers are
    /// already waiting. Connection failures propagate without retry.
    pub async fn acquire(&self) -> DatabaseResult<PooledConnection<C>> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(DatabaseError::PoolClosed);
        }

        let permit = match Arc::clone(&self.shared.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(DatabaseError::PoolClosed),
            Err(TryAcquireError::NoPermits) => self.wait_for_permit().await?,
        };

        let reused = {
            let mut idle = self.shared.idle.lock();
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(DatabaseError::PoolClosed);
            }
            idle.pop()
        };

        let conn = match reused {
            Some(conn) => conn,
            None => match self.shared.connector.connect().await {
                Ok(conn) => {
                    debug!("Opened new pooled connection");
                    conn
                }
                Err(e) => {
                    warn!(error = %e, "Failed to open database connection");
                    return Err(e);
                }
            },
        };

        self.shared.borrowed.fetch_add(1, Ordering::AcqRel);
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.shared),
            permit: Some(permit),
            rescoped: false,
            in_flight: false,
        })
    }

    async fn wait_for_permit(&self) -> DatabaseResult<OwnedSemaphorePermit> {
        let queue = WaitingSlot::enter(&self.shared.waiting);
        let limit = self.shared.config.queue_limit;
        if limit > 0 && queue.ahead >= limit {
            warn!(waiting = queue.ahead, queue_limit = limit, "Connection pool exhausted");
            return Err(DatabaseError::PoolExhausted {
                waiting: queue.ahead,
            });
        }

        let timeout = self.shared.config.acquire_timeout;
        match tokio::time::timeout(timeout, Arc::clone(&self.shared.permits).acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(DatabaseError::PoolClosed),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Timed out waiting for a connection");
                Err(DatabaseError::PoolTimeout(timeout))
            }
        }
    }

    /// Get pool statistics for monitoring.
    pub fn state(&self) -> PoolState {
        PoolState {
            capacity: self.shared.config.max_connections,
            borrowed: self.shared.borrowed.load(Ordering::Acquire),
            idle: self.shared.idle.lock().len(),
            waiting: self.shared.waiting.load(Ordering::Acquire),
            retired: self.shared.retired.load(Ordering::Acquire),
        }
    }

    /// Check the pool is healthy by borrowing a connection and pinging.
    pub async fn health_check(&self) -> DatabaseResult<()> {
        let mut conn = self.acquire().await?;
        let result = conn.ping().await;
        conn.release();
        result?;
        debug!("Connection pool health check passed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Shut the pool down.
    ///
    /// New and queued acquires fail with `PoolClosed`, idle connections are
    /// closed now, and borrowed ones are closed when they are released.
    pub async fn close(&self) {
        let drained = {
            let mut idle = self.shared.idle.lock();
            self.shared.closed.store(true, Ordering::Release);
            std::mem::take(&mut *idle)
        };
        self.shared.permits.close();

        let count = drained.len();
        for conn in drained {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Error closing idle connection");
            }
        }
        info!(closed_idle = count, "Connection pool closed");
    }
}

/// Counts a caller in the wait queue for as long as it is alive.
struct WaitingSlot<'a> {
    counter: &'a AtomicUsize,
    ahead: usize,
}

impl<'a> WaitingSlot<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let ahead = counter.fetch_add(1, Ordering::AcqRel);
        Self { counter, ahead }
    }
}

impl Drop for WaitingSlot<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A borrowed connection. Returned to the pool on [`release`](Self::release)
/// or drop.
pub struct PooledConnection<C: Connector> {
    conn: Option<C::Connection>,
    pool: Arc<Shared<C>>,
    permit: Option<OwnedSemaphorePermit>,
    rescoped: bool,
    in_flight: bool,
}

impl<C: Connector> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("rescoped", &self.rescoped)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> PooledConnection<C> {
    fn live(&mut self) -> DatabaseResult<&mut C::Connection> {
        self.conn.as_mut().ok_or(DatabaseError::PoolClosed)
    }

    pub async fn fetch(&mut self, sql: &str) -> DatabaseResult<Vec<RowMap>> {
        self.in_flight = true;
        let result = self.live()?.fetch(sql).await;
        self.in_flight = false;
        result
    }

    pub async fn fetch_bound(&mut self, sql: &str, params: &[String]) -> DatabaseResult<Vec<RowMap>> {
        self.in_flight = true;
        let result = self.live()?.fetch_bound(sql, params).await;
        self.in_flight = false;
        result
    }

    pub async fn execute_bound(&mut self, sql: &str, params: &[String]) -> DatabaseResult<u64> {
        self.in_flight = true;
        let result = self.live()?.execute_bound(sql, params).await;
        self.in_flight = false;
        result
    }

    pub async fn execute_raw(&mut self, sql: &str) -> DatabaseResult<QueryResult> {
        self.in_flight = true;
        let result = self.live()?.execute_raw(sql).await;
        self.in_flight = false;
        result
    }

    /// Select a default database for this session only.
    ///
    /// The connection is marked before the statement is sent, so even a
    /// failed `USE` retires it on release.
    pub async fn use_database(&mut self, database: &Identifier) -> DatabaseResult<()> {
        self.rescoped = true;
        self.in_flight = true;
        let result = self.live()?.use_database(database).await;
        self.in_flight = false;
        result
    }

    pub async fn ping(&mut self) -> DatabaseResult<()> {
        self.in_flight = true;
        let result = self.live()?.ping().await;
        self.in_flight = false;
        result
    }

    pub fn is_rescoped(&self) -> bool {
        self.rescoped
    }

    /// Return the connection to the pool.
    pub fn release(mut self) {
        self.give_back();
    }

    fn give_back(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        self.pool.borrowed.fetch_sub(1, Ordering::AcqRel);

        let retire = self.rescoped || self.in_flight;
        if retire {
            self.pool.retired.fetch_add(1, Ordering::AcqRel);
            debug!(
                rescoped = self.rescoped,
                interrupted = self.in_flight,
                "Retiring connection instead of reusing it"
            );
            close_in_background(conn);
        } else {
            let mut idle = self.pool.idle.lock();
            if self.pool.closed.load(Ordering::Acquire) {
                drop(idle);
                close_in_background(conn);
            } else {
                idle.push(conn);
            }
        }

        // The slot opens only after the connection is back on the idle list.
        self.permit.take();
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        self.give_back();
    }
}

fn close_in_background<T: ServerConnection>(conn: T) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = conn.close().await {
                    debug!(error = %e, "Error closing retired connection");
                }
            });
        }
        Err(_) => drop(conn),
    }
}
