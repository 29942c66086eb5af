use serde::{Deserialize, Serialize};

use crate::schema::SchemaTable;

/// Numeric identifier of a site in the network. Site 1 is the main site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl SiteId {
    pub const MAIN: SiteId = SiteId(1);

    pub fn is_main(self) -> bool {
        self.0 <= 1
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Table-name prefix owned by one site, e.g. `wp_42_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TablePrefix(String);

impl TablePrefix {
    /// Validates a base prefix. Only ASCII letters, digits and underscores are
    /// accepted since prefixes are spliced into DDL unquoted.
    pub fn new(prefix: &str) -> Result<Self, String> {
        if prefix.is_empty() {
            return Err("Table prefix must not be empty".to_string());
        }
        if let Some(c) = prefix
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(format!("Invalid character '{c}' in table prefix '{prefix}'"));
        }
        Ok(Self(prefix.to_string()))
    }

    /// The main site shares the base prefix; every other site gets
    /// `{base}{id}_`.
    pub fn for_site(base: &TablePrefix, site: SiteId) -> Self {
        if site.is_main() {
            base.clone()
        } else {
            Self(format!("{}{}_", base.0, site.0))
        }
    }

    pub fn table_name(&self, table: SchemaTable) -> String {
        format!("{}{}", self.0, table.base_name())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TablePrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
