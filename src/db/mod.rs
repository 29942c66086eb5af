//! Database handles the provisioner runs against.
//!
//! One [`SchemaStore`] implementation per sqlx driver; [`connect`] picks the
//! driver from the URL scheme.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::schema::render::Dialect;

#[async_trait]
pub trait SchemaStore: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Pattern lookup for a table named exactly `table_name`.
    async fn table_exists(&self, table_name: &str) -> Result<bool, sqlx::Error>;

    /// Runs a single DDL statement.
    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error>;

    /// Runs the statements creating one table. Stores whose engine has
    /// transactional DDL apply them all or none.
    async fn execute_all(&self, statements: &[String]) -> Result<(), sqlx::Error> {
        for statement in statements {
            self.execute(statement).await?;
        }
        Ok(())
    }
}

pub async fn connect(url: &str, max_connections: u32) -> Result<Arc<dyn SchemaStore>, sqlx::Error> {
    let scheme = url.split_once(':').map(|(scheme, _)| scheme).unwrap_or("");

    let store: Arc<dyn SchemaStore> = match scheme {
        "mysql" | "mariadb" => Arc::new(mysql::MySqlStore::connect(url, max_connections).await?),
        "postgres" | "postgresql" => {
            Arc::new(postgres::PostgresStore::connect(url, max_connections).await?)
        }
        "sqlite" => Arc::new(sqlite::SqliteStore::connect(url, max_connections).await?),
        _ => {
            return Err(sqlx::Error::Configuration(
                format!("Unsupported database URL scheme '{scheme}'").into(),
            ));
        }
    };

    Ok(store)
}

/// Escape character for [`like_pattern`], spelled out in every query as
/// `ESCAPE '!'` so it holds regardless of backslash handling.
pub const LIKE_ESCAPE: char = '!';

/// Escapes LIKE wildcards so `_` in table names only matches itself.
pub fn like_pattern(table_name: &str) -> String {
    let mut pattern = String::with_capacity(table_name.len() + 8);
    for c in table_name.chars() {
        if c == LIKE_ESCAPE || c == '_' || c == '%' {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern
}

/// Whether a failed CREATE TABLE lost a race against another writer.
pub fn is_already_exists(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            // 42S01: MySQL ER_TABLE_EXISTS_ERROR, 42P07: PostgreSQL duplicate_table
            matches!(db_err.code().as_deref(), Some("42S01") | Some("42P07"))
                || db_err.message().contains("already exists")
        }
        _ => false,
    }
}
