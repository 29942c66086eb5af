//! Renders [`TableSchema`] descriptors into dialect-specific DDL.
//!
//! MySQL output follows the scheduler library's own `CREATE TABLE` layout.
//! PostgreSQL and SQLite have no prefix indexes or unsigned integers, so they
//! get the nearest native types and secondary indexes as separate statements.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{ColumnDefault, ColumnType, Index, Nullability, TableSchema, ZERO_TIMESTAMP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Longest identifier the engine keeps intact. PostgreSQL silently truncates
/// longer names, MySQL rejects them.
pub fn identifier_limit(dialect: Dialect) -> Option<usize> {
    match dialect {
        Dialect::MySql => Some(64),
        Dialect::Postgres => Some(63),
        Dialect::Sqlite => None,
    }
}

/// Table options appended by dialects that support them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub charset: Option<String>,
    pub collate: Option<String>,
}

impl TableOptions {
    /// `DEFAULT CHARACTER SET ... COLLATE ...`, empty when neither is set.
    pub fn charset_collate(&self) -> String {
        let mut out = String::new();
        if let Some(charset) = &self.charset {
            out.push_str("DEFAULT CHARACTER SET ");
            out.push_str(charset);
        }
        if let Some(collate) = &self.collate {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("COLLATE ");
            out.push_str(collate);
        }
        out
    }
}

/// Statements creating `schema` under `table_name`, in execution order.
/// The first statement always creates the table itself.
pub fn create_table(
    schema: &TableSchema,
    table_name: &str,
    dialect: Dialect,
    options: &TableOptions,
) -> Vec<String> {
    match dialect {
        Dialect::MySql => vec![mysql_table(schema, table_name, options)],
        Dialect::Postgres | Dialect::Sqlite => {
            let mut statements = vec![portable_table(schema, table_name, dialect)];
            statements.extend(
                schema
                    .indexes
                    .iter()
                    .map(|index| portable_index(index, table_name, dialect)),
            );
            statements
        }
    }
}

fn mysql_table(schema: &TableSchema, table_name: &str, options: &TableOptions) -> String {
    let mut lines: Vec<String> = schema
        .columns
        .iter()
        .map(|column| {
            let mut line = format!("{} {}", column.name, mysql_type(column.ty));
            match column.nullability {
                Nullability::NotNull => line.push_str(" NOT NULL"),
                Nullability::Null => line.push_str(" NULL"),
                Nullability::Unspecified => {}
            }
            match column.default {
                Some(ColumnDefault::ZeroTimestamp) => {
                    line.push_str(&format!(" default '{ZERO_TIMESTAMP}'"))
                }
                Some(ColumnDefault::Integer(value)) => {
                    line.push_str(&format!(" default '{value}'"))
                }
                Some(ColumnDefault::Null) => line.push_str(" DEFAULT NULL"),
                None => {}
            }
            if column.auto_increment {
                line.push_str(" auto_increment");
            }
            line
        })
        .collect();

    lines.push(format!("PRIMARY KEY  ({})", schema.primary_key));
    for index in &schema.indexes {
        let parts: Vec<String> = index
            .parts
            .iter()
            .map(|part| match part.prefix_len {
                Some(len) => format!("{}({len})", part.column),
                None => part.column.to_string(),
            })
            .collect();
        lines.push(format!("KEY {} ({})", index.name, parts.join(", ")));
    }

    let mut sql = format!("CREATE TABLE {table_name} (\n\t{}\n)", lines.join(",\n\t"));
    let charset_collate = options.charset_collate();
    if !charset_collate.is_empty() {
        sql.push(' ');
        sql.push_str(&charset_collate);
    }
    sql
}

fn mysql_type(ty: ColumnType) -> String {
    match ty {
        ColumnType::BigUnsigned => "bigint(20) unsigned".to_string(),
        ColumnType::Int => "int(11)".to_string(),
        ColumnType::VarChar(len) => format!("varchar({len})"),
        ColumnType::DateTime => "datetime".to_string(),
        ColumnType::Text => "text".to_string(),
        ColumnType::LongText => "longtext".to_string(),
    }
}

fn portable_table(schema: &TableSchema, table_name: &str, dialect: Dialect) -> String {
    let mut lines: Vec<String> = schema
        .columns
        .iter()
        .map(|column| {
            if column.auto_increment {
                return match dialect {
                    Dialect::Sqlite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", column.name),
                    _ => format!("{} BIGSERIAL", column.name),
                };
            }

            let mut line = format!("{} {}", column.name, portable_type(column.ty, dialect));
            match column.nullability {
                Nullability::NotNull => line.push_str(" NOT NULL"),
                Nullability::Null if dialect == Dialect::Postgres => line.push_str(" NULL"),
                _ => {}
            }
            match (column.default, dialect) {
                // PostgreSQL rejects the zero date; NULL carries the same meaning there.
                (Some(ColumnDefault::ZeroTimestamp), Dialect::Postgres)
                | (Some(ColumnDefault::Null), _) => line.push_str(" DEFAULT NULL"),
                (Some(ColumnDefault::ZeroTimestamp), _) => {
                    line.push_str(&format!(" DEFAULT '{ZERO_TIMESTAMP}'"))
                }
                (Some(ColumnDefault::Integer(value)), _) => {
                    line.push_str(&format!(" DEFAULT {value}"))
                }
                (None, _) => {}
            }
            line
        })
        .collect();

    let inline_pk = schema
        .column(schema.primary_key)
        .is_some_and(|c| c.auto_increment && dialect == Dialect::Sqlite);
    if !inline_pk {
        lines.push(format!("PRIMARY KEY ({})", schema.primary_key));
    }

    format!("CREATE TABLE {table_name} (\n\t{}\n)", lines.join(",\n\t"))
}

fn portable_type(ty: ColumnType, dialect: Dialect) -> String {
    match (ty, dialect) {
        (ColumnType::BigUnsigned, Dialect::Sqlite) => "BIGINT UNSIGNED".to_string(),
        (ColumnType::BigUnsigned, _) => "BIGINT".to_string(),
        (ColumnType::Int, _) => "INTEGER".to_string(),
        (ColumnType::VarChar(len), _) => format!("VARCHAR({len})"),
        (ColumnType::DateTime, Dialect::Sqlite) => "DATETIME".to_string(),
        (ColumnType::DateTime, _) => "TIMESTAMP".to_string(),
        (ColumnType::Text | ColumnType::LongText, _) => "TEXT".to_string(),
    }
}

fn portable_index(index: &Index, table_name: &str, dialect: Dialect) -> String {
    let columns: Vec<&str> = index.parts.iter().map(|part| part.column).collect();
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {table_name} ({})",
        index_name(table_name, index, dialect),
        columns.join(", ")
    )
}

/// `{table}_{index}`, or when that is too long for the engine, its head plus
/// a short digest of the full name so truncated names stay distinct.
fn index_name(table_name: &str, index: &Index, dialect: Dialect) -> String {
    let full = format!("{table_name}_{}", index.name);
    match identifier_limit(dialect) {
        Some(limit) if full.len() > limit => {
            let digest = format!("{:x}", Sha256::digest(full.as_bytes()));
            format!("{}_{}", &full[..limit - 9], &digest[..8])
        }
        _ => full,
    }
}
