use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use super::{like_pattern, SchemaStore};
use crate::schema::render::Dialect;

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SchemaStore for MySqlStore {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = DATABASE() AND table_name LIKE ? ESCAPE '!'",
        )
        .bind(like_pattern(table_name))
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
        sqlx::query(statement).execute(&self.pool).await?;
        Ok(())
    }
}
