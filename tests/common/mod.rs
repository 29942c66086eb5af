#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use site_provisioner::config::Config;
use site_provisioner::db::sqlite::SqliteStore;
use site_provisioner::db::SchemaStore;
use site_provisioner::site::TablePrefix;
use site_provisioner::state::SharedState;

/// A fresh in-memory SQLite database behind a single connection.
pub async fn memory_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::connect("sqlite::memory:", 1)
            .await
            .expect("Failed to open in-memory database"),
    )
}

pub fn test_config(hook_token: Option<&str>) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        table_prefix: TablePrefix::new("wp_").unwrap(),
        charset: None,
        collate: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        hook_token: hook_token.map(str::to_string),
        max_connections: 1,
        repair_sites: vec![],
        log_level: "warn".to_string(),
    }
}

/// Names of all user tables, sorted.
pub async fn table_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[derive(Debug, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub ty: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub pk: bool,
}

pub async fn columns(pool: &SqlitePool, table: &str) -> Vec<ColumnInfo> {
    let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
        sqlx::query_as(&format!("PRAGMA table_info({table})"))
            .fetch_all(pool)
            .await
            .unwrap();

    rows.into_iter()
        .map(|(_, name, ty, not_null, default, pk)| ColumnInfo {
            name,
            ty,
            not_null: not_null != 0,
            default,
            pk: pk != 0,
        })
        .collect()
}

/// Index name to indexed columns, for indexes created by DDL.
pub async fn indexes(pool: &SqlitePool, table: &str) -> Vec<(String, Vec<String>)> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master
         WHERE type = 'index' AND tbl_name = ? AND sql IS NOT NULL ORDER BY name",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .unwrap();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let cols: Vec<(i64, i64, String)> =
            sqlx::query_as(&format!("PRAGMA index_info({name})"))
                .fetch_all(pool)
                .await
                .unwrap();
        out.push((name, cols.into_iter().map(|(_, _, c)| c).collect()));
    }
    out
}

/// A running test server instance backed by an in-memory database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<SqliteStore>,
    pub state: SharedState,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn pool(&self) -> &SqlitePool {
        self.store.pool()
    }

    /// Deliver a "site created" hook, return (body, status).
    pub async fn site_created(&self, site_id: u64, token: Option<&str>) -> (Value, StatusCode) {
        let mut req = self
            .client
            .post(self.url("/v1/sites"))
            .json(&json!({ "site_id": site_id }));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.expect("site created request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (Value, StatusCode) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Spawn a test app with a fresh in-memory database.
pub async fn spawn_app(hook_token: Option<&str>) -> TestApp {
    let store = memory_store().await;
    let dyn_store: Arc<dyn SchemaStore> = store.clone();
    let state = site_provisioner::build_state(dyn_store, test_config(hook_token));
    let app = site_provisioner::build_app(state.clone());

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        store,
        state,
        client: Client::new(),
    }
}
