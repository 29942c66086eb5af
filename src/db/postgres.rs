use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{like_pattern, SchemaStore};
use crate::schema::render::Dialect;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SchemaStore for PostgresStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool, sqlx::Error> {
        // Unquoted identifiers are folded to lower case on creation.
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name LIKE $1 ESCAPE '!'",
        )
        .bind(like_pattern(&table_name.to_lowercase()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
        sqlx::query(statement).execute(&self.pool).await?;
        Ok(())
    }

    async fn execute_all(&self, statements: &[String]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await
    }
}
