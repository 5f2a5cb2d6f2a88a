use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    connection::{SimpleConnection, TransactionManager},
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
};

use crate::util_resp::FailureResponse;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub key: Key,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Applied to every connection the pool opens. SQLite leaves foreign keys
/// off unless asked, and without a busy timeout a writer waiting on
/// another writer's lock fails straight away.
#[derive(Debug, Clone, Copy)]
pub struct SqlitePragmas {
    pub busy_timeout: Duration,
}

impl Default for SqlitePragmas {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for SqlitePragmas
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn build_pool(db_url: &str, max_size: u32) -> Result<DbPool, String> {
    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(SqlitePragmas::default()))
        .build(ConnectionManager::<SqliteConnection>::new(db_url))
        .map_err(|e| format!("failed to build connection pool: {e}"))
}

/// Where the connection extractor leaves a request's open transaction, so
/// that [`tx_commit`] can finish it once the response is known.
#[derive(Clone, Default)]
struct TxSlot(Arc<std::sync::Mutex<Option<ThreadSafeConn<true>>>>);

/// This middleware commits opened transactions after each request has been
/// handled, or rolls them back if the handler failed.
pub async fn tx_commit(mut req: Request, next: Next) -> Response {
    let slot = TxSlot::default();
    req.extensions_mut().insert(slot.clone());

    let res = next.run(req).await;

    let opened = match slot.0.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => None,
    };

    if let Some(conn) = opened {
        let mut conn = conn.inner.lock().await;

        let status = res.status();
        let outcome = if status.is_success()
            || status.is_redirection()
            || status.is_informational()
        {
            <PooledConn as diesel::Connection>::TransactionManager::commit_transaction(&mut *conn)
        } else {
            <PooledConn as diesel::Connection>::TransactionManager::rollback_transaction(&mut *conn)
        };

        if let Err(e) = outcome {
            tracing::error!("failed to finish request transaction: {e}");
            return FailureResponse::ServerError(()).into_response();
        }
    }

    res
}

pub struct Conn<const TX: bool> {
    inner: tokio::sync::OwnedMutexGuard<PooledConn>,
}

impl<const TX: bool> Deref for Conn<TX> {
    type Target = PooledConn;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<const TX: bool> DerefMut for Conn<TX> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for Conn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let conn = ThreadSafeConn::<TX>::from_request_parts(parts, state).await?;
        let inner = conn.inner.try_lock_owned().map_err(|_| {
            tracing::error!("request connection is already locked");
            FailureResponse::ServerError(())
        })?;
        Ok(Conn { inner })
    }
}

/// One pooled connection per request, shared between extractors. With
/// `TX = true` a transaction is opened on checkout.
#[derive(Clone)]
pub struct ThreadSafeConn<const TX: bool> {
    pub inner: Arc<tokio::sync::Mutex<PooledConn>>,
}

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for ThreadSafeConn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        if let Some(conn) = parts.extensions.get::<ThreadSafeConn<TX>>() {
            return Ok(conn.clone());
        }

        let pool = DbPool::from_ref(state);
        let mut conn = tokio::task::spawn_blocking(move || pool.get())
            .await
            .map_err(|e| {
                tracing::error!("connection checkout task failed: {e}");
                FailureResponse::ServerError(())
            })?
            .map_err(|e| {
                tracing::error!("could not check out a connection: {e}");
                FailureResponse::ServerError(())
            })?;

        let conn = if TX {
            let Some(slot) = parts.extensions.get::<TxSlot>().cloned() else {
                tracing::error!("transactional connection requested without tx_commit middleware");
                return Err(FailureResponse::ServerError(()));
            };

            <PooledConn as diesel::Connection>::TransactionManager::begin_transaction(&mut conn)
                .map_err(FailureResponse::from)?;

            let conn = ThreadSafeConn::<TX> {
                inner: Arc::new(tokio::sync::Mutex::new(conn)),
            };
            let opened = ThreadSafeConn::<true> {
                inner: conn.inner.clone(),
            };
            match slot.0.lock() {
                Ok(mut guard) => *guard = Some(opened),
                Err(_) => return Err(FailureResponse::ServerError(())),
            }
            conn
        } else {
            ThreadSafeConn::<TX> {
                inner: Arc::new(tokio::sync::Mutex::new(conn)),
            }
        };

        parts.extensions.insert(conn.clone());
        Ok(conn)
    }
}

/// Runs the embedded migrations on one pooled connection.
pub fn run_migrations(pool: &DbPool) -> Result<(), String> {
    use diesel_migrations::MigrationHarness;

    let mut conn = pool.get().map_err(|e| e.to_string())?;
    conn.run_pending_migrations(crate::MIGRATIONS)
        .map(|_| ())
        .map_err(|e| format!("failed to run migrations: {e}"))
}
