use crate::error::{Error, Result};
use crate::ir::Dialect;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Connection};

/// A connection pool plus the dialect its SQL is written in.
///
/// Pools opened by [`Database::connect`] are owned and closed by
/// [`Database::close`]; pools passed to [`Database::from_pool`] belong to the
/// caller and are left open.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
    owned: bool,
}

impl Database {
    /// Open a single-connection pool for `url` and ping it.
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let dialect =
            Dialect::from_url(url).ok_or_else(|| Error::UnsupportedDatabaseUrl(url.to_string()))?;
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(Error::Connect)?;

        let ping = async {
            let mut conn = pool.acquire().await?;
            conn.ping().await
        };
        if let Err(err) = ping.await {
            pool.close().await;
            return Err(Error::Connect(err));
        }

        tracing::debug!(%dialect, "connected");
        Ok(Database {
            pool,
            dialect,
            owned: true,
        })
    }

    /// Wrap a pool owned by the caller.
    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Database {
            pool,
            dialect,
            owned: false,
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Close the pool if this handle opened it.
    pub async fn close(self) {
        if self.owned {
            self.pool.close().await;
        }
    }
}
