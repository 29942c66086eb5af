//! Static catalog of the job-scheduler tables every site must carry.
//!
//! Each [`SchemaTable`] maps to a [`TableSchema`] descriptor; descriptors are
//! rendered to a concrete SQL dialect by [`render`].

pub mod render;

use serde::Serialize;

/// Historical index key-length limit for utf8mb4 columns.
pub const MAX_INDEX_LEN: u16 = 191;

/// Legacy "not yet set" value for datetime columns.
pub const ZERO_TIMESTAMP: &str = "0000-00-00 00:00:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaTable {
    Actions,
    Claims,
    Groups,
    Logs,
}

impl SchemaTable {
    pub const ALL: [SchemaTable; 4] = [
        SchemaTable::Actions,
        SchemaTable::Claims,
        SchemaTable::Groups,
        SchemaTable::Logs,
    ];

    /// Unprefixed table name.
    pub fn base_name(self) -> &'static str {
        match self {
            SchemaTable::Actions => "actionscheduler_actions",
            SchemaTable::Claims => "actionscheduler_claims",
            SchemaTable::Groups => "actionscheduler_groups",
            SchemaTable::Logs => "actionscheduler_logs",
        }
    }

    pub fn primary_key(self) -> &'static str {
        match self {
            SchemaTable::Actions => "action_id",
            SchemaTable::Claims => "claim_id",
            SchemaTable::Groups => "group_id",
            SchemaTable::Logs => "log_id",
        }
    }

    pub fn schema(self) -> TableSchema {
        match self {
            SchemaTable::Actions => actions_schema(),
            SchemaTable::Claims => claims_schema(),
            SchemaTable::Groups => groups_schema(),
            SchemaTable::Logs => logs_schema(),
        }
    }
}

impl std::fmt::Display for SchemaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigUnsigned,
    Int,
    VarChar(u16),
    DateTime,
    Text,
    LongText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NotNull,
    /// Rendered as an explicit `NULL`.
    Null,
    /// Nullable by the engine default, nothing rendered.
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    ZeroTimestamp,
    Integer(i64),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullability: Nullability,
    pub default: Option<ColumnDefault>,
    pub auto_increment: bool,
}

impl Column {
    fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullability: Nullability::Unspecified,
            default: None,
            auto_increment: false,
        }
    }

    fn not_null(mut self) -> Self {
        self.nullability = Nullability::NotNull;
        self
    }

    fn null(mut self) -> Self {
        self.nullability = Nullability::Null;
        self
    }

    fn default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    fn primary_id(name: &'static str) -> Self {
        Column::new(name, ColumnType::BigUnsigned)
            .not_null()
            .auto_increment()
    }

    fn zero_datetime(name: &'static str) -> Self {
        Column::new(name, ColumnType::DateTime)
            .null()
            .default(ColumnDefault::ZeroTimestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPart {
    pub column: &'static str,
    pub prefix_len: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: &'static str,
    pub parts: Vec<IndexPart>,
}

impl Index {
    fn single(column: &'static str) -> Self {
        Self {
            name: column,
            parts: vec![IndexPart {
                column,
                prefix_len: None,
            }],
        }
    }

    fn prefixed(column: &'static str, len: u16) -> Self {
        Self {
            name: column,
            parts: vec![IndexPart {
                column,
                prefix_len: Some(len),
            }],
        }
    }

    fn composite(name: &'static str, columns: &[&'static str]) -> Self {
        Self {
            name,
            parts: columns
                .iter()
                .map(|&column| IndexPart {
                    column,
                    prefix_len: None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: SchemaTable,
    pub columns: Vec<Column>,
    pub primary_key: &'static str,
    pub indexes: Vec<Index>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn actions_schema() -> TableSchema {
    use ColumnType::*;

    TableSchema {
        table: SchemaTable::Actions,
        columns: vec![
            Column::primary_id("action_id"),
            Column::new("hook", VarChar(191)).not_null(),
            Column::new("status", VarChar(20)).not_null(),
            Column::zero_datetime("scheduled_date_gmt"),
            Column::zero_datetime("scheduled_date_local"),
            Column::new("args", VarChar(MAX_INDEX_LEN)),
            Column::new("schedule", LongText),
            Column::new("group_id", BigUnsigned)
                .not_null()
                .default(ColumnDefault::Integer(0)),
            Column::new("attempts", Int)
                .not_null()
                .default(ColumnDefault::Integer(0)),
            Column::zero_datetime("last_attempt_gmt"),
            Column::zero_datetime("last_attempt_local"),
            Column::new("claim_id", BigUnsigned)
                .not_null()
                .default(ColumnDefault::Integer(0)),
            Column::new("extended_args", VarChar(8000)).default(ColumnDefault::Null),
        ],
        primary_key: "action_id",
        indexes: vec![
            Index::prefixed("hook", MAX_INDEX_LEN),
            Index::single("status"),
            Index::single("scheduled_date_gmt"),
            Index::prefixed("args", MAX_INDEX_LEN),
            Index::single("group_id"),
            Index::single("last_attempt_gmt"),
            Index::composite(
                "claim_id_status_scheduled_date_gmt",
                &["claim_id", "status", "scheduled_date_gmt"],
            ),
        ],
    }
}

fn claims_schema() -> TableSchema {
    TableSchema {
        table: SchemaTable::Claims,
        columns: vec![
            Column::primary_id("claim_id"),
            Column::zero_datetime("date_created_gmt"),
        ],
        primary_key: "claim_id",
        indexes: vec![Index::single("date_created_gmt")],
    }
}

fn groups_schema() -> TableSchema {
    TableSchema {
        table: SchemaTable::Groups,
        columns: vec![
            Column::primary_id("group_id"),
            Column::new("slug", ColumnType::VarChar(255)).not_null(),
        ],
        primary_key: "group_id",
        indexes: vec![Index::prefixed("slug", MAX_INDEX_LEN)],
    }
}

fn logs_schema() -> TableSchema {
    TableSchema {
        table: SchemaTable::Logs,
        columns: vec![
            Column::primary_id("log_id"),
            Column::new("action_id", ColumnType::BigUnsigned).not_null(),
            Column::new("message", ColumnType::Text).not_null(),
            Column::zero_datetime("log_date_gmt"),
            Column::zero_datetime("log_date_local"),
        ],
        primary_key: "log_id",
        indexes: vec![Index::single("action_id"), Index::single("log_date_gmt")],
    }
}
