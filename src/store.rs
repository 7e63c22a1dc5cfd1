//! SQLite-backed route lookup.
//!
//! A [`Resolver`] owns a read-only [`SqlitePool`] and the lookup query,
//! prepared once at [`Resolver::provision`]. [`Resolver::resolve`] binds a
//! [`RouteKey`] to that query and decodes the first row into a
//! [`RouteTarget`]. The pool is the only concurrency boundary: a
//! `Resolver` is shared behind an `Arc` and used from every request task
//! without further locking.
//!
//! Queries can compare keys with `COLLATE route_key`; the collation is
//! registered on every pooled connection from [`KeyCollation`].

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow, SqliteStatement};
use sqlx::{Connection, Executor, Row, Statement};

use crate::error::{ProvisionError, ResolveError, StoreError, TeardownError};
use crate::key::RouteKey;
use crate::query;

/// Name of the collation queries use to compare routing keys.
pub const KEY_COLLATION_NAME: &str = "route_key";

/// How `COLLATE route_key` compares stored keys against the request key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCollation {
    #[default]
    Binary,
    Nocase,
}

impl KeyCollation {
    fn compare(self, a: &str, b: &str) -> std::cmp::Ordering {
        match self {
            Self::Binary => a.cmp(b),
            Self::Nocase => a
                .bytes()
                .map(|c| c.to_ascii_lowercase())
                .cmp(b.bytes().map(|c| c.to_ascii_lowercase())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub path: PathBuf,
    pub query: String,
    pub busy_timeout: Duration,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub connect_timeout: Duration,
    pub lookup_timeout: Duration,
    pub close_timeout: Duration,
    pub key_collation: KeyCollation,
}

impl StoreSettings {
    pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(3000);
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(3000);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
    pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(5000);
    pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_millis(5000);

    #[must_use]
    pub fn new(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
            busy_timeout: Self::DEFAULT_BUSY_TIMEOUT,
            max_connections: default_max_connections(),
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            lookup_timeout: Self::DEFAULT_LOOKUP_TIMEOUT,
            close_timeout: Self::DEFAULT_CLOSE_TIMEOUT,
            key_collation: KeyCollation::default(),
        }
    }
}

/// One pooled connection per logical CPU.
#[must_use]
pub fn default_max_connections() -> u32 {
    std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .try_into()
        .unwrap_or(u32::MAX)
}

/// Resolved upstream for a routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// The lookup query, prepared once and executed with a single bound key.
struct CompiledQuery {
    statement: SqliteStatement<'static>,
}

impl CompiledQuery {
    async fn compile(pool: &SqlitePool, sql: &str) -> Result<Self, ProvisionError> {
        let prepared = pool.prepare(sql).await.map_err(ProvisionError::Compile)?;
        let statement = Statement::to_owned(&prepared);

        if let Some(name) = query::named_parameter(sql) {
            return Err(ProvisionError::NamedParameter(name.to_string()));
        }

        let parameters = statement
            .parameters()
            .map_or(0, |params| params.either(|types| types.len(), |count| count));
        if parameters != 1 {
            return Err(ProvisionError::ParameterCount(parameters));
        }

        let columns = statement.columns().len();
        if columns < 2 {
            return Err(ProvisionError::ColumnCount(columns));
        }

        Ok(Self { statement })
    }
}

pub struct Resolver {
    pool: SqlitePool,
    query: CompiledQuery,
    lookup_timeout: Duration,
    close_timeout: Duration,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("query", &self.query.statement.sql())
            .field("pool_size", &self.pool.size())
            .field("closed", &self.pool.is_closed())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Open the store read-only, verify it answers, and compile the query.
    ///
    /// Nothing stays open on failure: once the pool exists, any later
    /// error closes it before returning.
    pub async fn provision(settings: &StoreSettings) -> Result<Self, ProvisionError> {
        let collation = settings.key_collation;
        let options = SqliteConnectOptions::new()
            .filename(&settings.path)
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(settings.busy_timeout)
            .collation(KEY_COLLATION_NAME, move |a: &str, b: &str| {
                collation.compare(a, b)
            });

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|source| ProvisionError::Open {
                path: settings.path.clone(),
                source,
            })?;

        let prepared = async {
            health_check(&pool, settings.connect_timeout).await?;
            CompiledQuery::compile(&pool, &settings.query).await
        }
        .await;

        match prepared {
            Ok(query) => {
                tracing::info!(
                    path = %settings.path.display(),
                    max_connections = settings.max_connections,
                    collation = ?settings.key_collation,
                    "lookup store provisioned"
                );
                Ok(Self {
                    pool,
                    query,
                    lookup_timeout: settings.lookup_timeout,
                    close_timeout: settings.close_timeout,
                })
            }
            Err(e) => {
                pool.close().await;
                Err(e)
            }
        }
    }

    /// Look up the upstream for `key`.
    ///
    /// Dropping the returned future releases any connection it holds.
    pub async fn resolve(&self, key: &RouteKey) -> Result<RouteTarget, ResolveError> {
        let lookup = self
            .query
            .statement
            .query()
            .bind(key.as_str())
            .fetch_optional(&self.pool);

        let row = tokio::time::timeout(self.lookup_timeout, lookup)
            .await
            .map_err(|_| StoreError::Timeout(self.lookup_timeout))?
            .map_err(StoreError::Query)?
            .ok_or(ResolveError::NotFound)?;

        Ok(decode_target(&row)?)
    }

    /// Release the compiled query, then close the pool.
    pub async fn teardown(self) -> Result<(), TeardownError> {
        let Self {
            pool,
            query,
            close_timeout,
            ..
        } = self;

        drop(query);

        if tokio::time::timeout(close_timeout, pool.close()).await.is_err() {
            tracing::error!(
                timeout = ?close_timeout,
                idle = pool.num_idle(),
                size = pool.size(),
                "lookup store did not close in time"
            );
            return Err(TeardownError::CloseTimeout(close_timeout));
        }

        tracing::info!("lookup store closed");
        Ok(())
    }

    /// Close the pool in place. Every later [`resolve`](Self::resolve) fails
    /// with a store error.
    pub async fn close_store(&self) {
        self.pool.close().await;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    #[must_use]
    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }

    #[must_use]
    pub fn idle_connections(&self) -> usize {
        self.pool.num_idle()
    }
}

async fn health_check(pool: &SqlitePool, timeout: Duration) -> Result<(), ProvisionError> {
    let ping = async {
        let mut conn = pool.acquire().await?;
        conn.ping().await?;
        Ok::<(), sqlx::Error>(())
    };

    tokio::time::timeout(timeout, ping)
        .await
        .map_err(|_| ProvisionError::HealthCheckTimeout(timeout))?
        .map_err(ProvisionError::HealthCheck)
}

fn decode_target(row: &SqliteRow) -> Result<RouteTarget, StoreError> {
    let host: String = row
        .try_get(0)
        .map_err(|source| StoreError::Decode {
            column: "host",
            source,
        })?;
    let port: i64 = row
        .try_get(1)
        .map_err(|source| StoreError::Decode {
            column: "port",
            source,
        })?;
    let port = u16::try_from(port).map_err(|_| StoreError::PortOutOfRange(port))?;

    Ok(RouteTarget { host, port })
}
