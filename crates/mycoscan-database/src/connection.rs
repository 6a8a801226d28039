//! 数据库连接管理

use mycoscan_core::{MycoscanError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// 数据库连接池
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// 建立连接池
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| MycoscanError::Database(e.to_string()))?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
