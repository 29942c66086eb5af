use std::net::IpAddr;

use crate::schema::render::TableOptions;
use crate::site::{SiteId, TablePrefix};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub table_prefix: TablePrefix,
    pub charset: Option<String>,
    pub collate: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub hook_token: Option<String>,
    pub max_connections: u32,
    pub repair_sites: Vec<SiteId>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let table_prefix = TablePrefix::new(&env_or("PROVISIONER_TABLE_PREFIX", "wp_"))
            .map_err(|e| format!("Invalid PROVISIONER_TABLE_PREFIX: {e}"))?;

        let charset = env_identifier("PROVISIONER_DB_CHARSET", "utf8mb4")?;
        let collate = env_identifier("PROVISIONER_DB_COLLATE", "")?;

        let host: IpAddr = env_or("PROVISIONER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid PROVISIONER_HOST: {e}"))?;

        let port: u16 = env_or("PROVISIONER_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PROVISIONER_PORT: {e}"))?;

        let hook_token = std::env::var("PROVISIONER_HOOK_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let max_connections: u32 = env_or("PROVISIONER_MAX_CONNECTIONS", "5")
            .parse()
            .map_err(|e| format!("Invalid PROVISIONER_MAX_CONNECTIONS: {e}"))?;

        let repair_sites = parse_site_list(&env_or("PROVISIONER_REPAIR_SITES", ""))
            .map_err(|e| format!("Invalid PROVISIONER_REPAIR_SITES: {e}"))?;

        let log_level = env_or("PROVISIONER_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            table_prefix,
            charset,
            collate,
            host,
            port,
            hook_token,
            max_connections,
            repair_sites,
            log_level,
        })
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            charset: self.charset.clone(),
            collate: self.collate.clone(),
        }
    }
}

/// Parses a comma separated list of positive site ids.
pub fn parse_site_list(raw: &str) -> Result<Vec<SiteId>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| -> Result<SiteId, String> {
            let id: u64 = s
                .trim()
                .parse()
                .map_err(|e| format!("entry '{s}': {e}"))?;
            if id == 0 {
                return Err(format!("entry '{s}': site ids start at 1"));
            }
            Ok(SiteId(id))
        })
        .collect()
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Charset and collation names are spliced into DDL, so only identifier
/// characters are allowed. Empty means unset.
fn env_identifier(key: &str, default: &str) -> Result<Option<String>, String> {
    let value = env_or(key, default);
    if value.is_empty() {
        return Ok(None);
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("Invalid {key}: '{value}'"));
    }
    Ok(Some(value))
}
