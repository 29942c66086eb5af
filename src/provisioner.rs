//! Ensures the job-scheduler tables exist for a site.
//!
//! Only DDL is issued: tables are created when missing and never altered or
//! dropped afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{self, SchemaStore};
use crate::error::ProvisionError;
use crate::events::{ListenerError, SiteCreated, SiteListener};
use crate::schema::render::{self, Dialect, TableOptions};
use crate::schema::SchemaTable;
use crate::site::{SiteId, TablePrefix};

/// Runs ahead of default-priority listeners so they find the tables in place.
pub const PROVISIONER_PRIORITY: i32 = -10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOutcome {
    Created,
    AlreadyPresent,
    /// Another writer created the table between our check and our CREATE.
    CreatedConcurrently,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: SchemaTable,
    pub name: String,
    pub outcome: TableOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub site_id: SiteId,
    pub prefix: TablePrefix,
    pub dialect: Dialect,
    pub tables: Vec<TableReport>,
    pub finished_at: DateTime<Utc>,
}

impl ProvisionReport {
    pub fn created(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.outcome != TableOutcome::AlreadyPresent)
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStatus {
    pub table: SchemaTable,
    pub name: String,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteInspection {
    pub site_id: SiteId,
    pub prefix: TablePrefix,
    pub tables: Vec<TableStatus>,
}

impl SiteInspection {
    pub fn complete(&self) -> bool {
        self.tables.iter().all(|t| t.exists)
    }
}

pub struct Provisioner {
    store: Arc<dyn SchemaStore>,
    base_prefix: TablePrefix,
    options: TableOptions,
}

impl Provisioner {
    pub fn new(store: Arc<dyn SchemaStore>, base_prefix: TablePrefix, options: TableOptions) -> Self {
        Self {
            store,
            base_prefix,
            options,
        }
    }

    pub fn prefix_for(&self, site: SiteId) -> TablePrefix {
        TablePrefix::for_site(&self.base_prefix, site)
    }

    /// Creates whichever of the four tables `site` is missing. Tables are
    /// handled one after another; the first failure aborts the run and leaves
    /// already created tables in place.
    pub async fn ensure_tables(&self, site: SiteId) -> Result<ProvisionReport, ProvisionError> {
        let prefix = self.prefix_for(site);
        let mut tables = Vec::with_capacity(SchemaTable::ALL.len());

        for table in SchemaTable::ALL {
            let name = prefix.table_name(table);
            let outcome = self.ensure_table(table, &name).await?;
            tables.push(TableReport {
                table,
                name,
                outcome,
            });
        }

        let report = ProvisionReport {
            site_id: site,
            prefix,
            dialect: self.store.dialect(),
            tables,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "Site {site} provisioned ({} of {} tables created)",
            report.created(),
            report.tables.len()
        );

        Ok(report)
    }

    async fn ensure_table(&self, table: SchemaTable, name: &str) -> Result<TableOutcome, ProvisionError> {
        let exists = self
            .store
            .table_exists(name)
            .await
            .map_err(|source| ProvisionError::CheckFailed {
                table: name.to_string(),
                source,
            })?;

        if exists {
            tracing::debug!("Table {name} already present");
            return Ok(TableOutcome::AlreadyPresent);
        }

        let dialect = self.store.dialect();
        if let Some(limit) = render::identifier_limit(dialect) {
            if name.len() > limit {
                return Err(ProvisionError::NameTooLong {
                    table: name.to_string(),
                    limit,
                });
            }
        }

        // One call per table: a failed index takes the table down with it.
        let statements = render::create_table(&table.schema(), name, dialect, &self.options);
        let outcome = match self.store.execute_all(&statements).await {
            Ok(()) => {
                tracing::info!("Created table {name}");
                TableOutcome::Created
            }
            Err(err) if db::is_already_exists(&err) => {
                tracing::warn!("Table {name} was created concurrently: {err}");
                TableOutcome::CreatedConcurrently
            }
            Err(source) => {
                return Err(ProvisionError::CreateFailed {
                    table: name.to_string(),
                    source,
                });
            }
        };

        Ok(outcome)
    }

    /// Reports which of the four tables exist for `site` without creating any.
    pub async fn inspect(&self, site: SiteId) -> Result<SiteInspection, ProvisionError> {
        let prefix = self.prefix_for(site);
        let mut tables = Vec::with_capacity(SchemaTable::ALL.len());

        for table in SchemaTable::ALL {
            let name = prefix.table_name(table);
            let exists = self.store.table_exists(&name).await.map_err(|source| {
                ProvisionError::CheckFailed {
                    table: name.clone(),
                    source,
                }
            })?;
            tables.push(TableStatus {
                table,
                name,
                exists,
            });
        }

        Ok(SiteInspection {
            site_id: site,
            prefix,
            tables,
        })
    }

    /// Provisions existing sites in order, e.g. sites created while the
    /// provisioner was not listening.
    pub async fn repair(&self, sites: &[SiteId]) -> Result<Vec<ProvisionReport>, ProvisionError> {
        let mut reports = Vec::with_capacity(sites.len());
        for site in sites {
            reports.push(self.ensure_tables(*site).await?);
        }
        Ok(reports)
    }
}

#[async_trait]
impl SiteListener for Provisioner {
    fn name(&self) -> &str {
        "table-provisioner"
    }

    async fn on_site_created(
        &self,
        event: &SiteCreated,
    ) -> Result<Option<serde_json::Value>, ListenerError> {
        let report = self.ensure_tables(event.site_id).await.map_err(|e| {
            tracing::error!("Provisioning site {} failed: {e}", event.site_id);
            ListenerError::new(self.name(), e.to_string())
        })?;

        serde_json::to_value(&report)
            .map(Some)
            .map_err(|e| ListenerError::new(self.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingStore {
        existing: Mutex<HashSet<String>>,
        checked: Mutex<Vec<String>>,
        executed: Mutex<Vec<String>>,
        fail_check_on: Option<String>,
        fail_create_on: Option<String>,
    }

    impl RecordingStore {
        fn with_tables(names: &[&str]) -> Self {
            let store = Self::default();
            store
                .existing
                .lock()
                .unwrap()
                .extend(names.iter().map(|n| n.to_string()));
            store
        }

        fn checked(&self) -> Vec<String> {
            self.checked.lock().unwrap().clone()
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    fn created_table(statement: &str) -> Option<String> {
        statement
            .strip_prefix("CREATE TABLE ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
    }

    #[async_trait]
    impl SchemaStore for RecordingStore {
        fn dialect(&self) -> Dialect {
            Dialect::MySql
        }

        async fn table_exists(&self, table_name: &str) -> Result<bool, sqlx::Error> {
            self.checked.lock().unwrap().push(table_name.to_string());
            if self.fail_check_on.as_deref() == Some(table_name) {
                return Err(sqlx::Error::PoolTimedOut);
            }
            Ok(self.existing.lock().unwrap().contains(table_name))
        }

        async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
            let table = created_table(statement);
            if table.is_some() && table == self.fail_create_on {
                return Err(sqlx::Error::Protocol("disk full".to_string()));
            }
            self.executed.lock().unwrap().push(statement.to_string());
            if let Some(table) = table {
                self.existing.lock().unwrap().insert(table);
            }
            Ok(())
        }
    }

    fn provisioner(store: Arc<RecordingStore>) -> Provisioner {
        Provisioner::new(
            store,
            TablePrefix::new("wp_").unwrap(),
            TableOptions::default(),
        )
    }

    #[tokio::test]
    async fn checks_prefixed_names_for_site_42() {
        let store = Arc::new(RecordingStore::default());
        provisioner(store.clone())
            .ensure_tables(SiteId(42))
            .await
            .unwrap();

        assert_eq!(
            store.checked(),
            [
                "wp_42_actionscheduler_actions",
                "wp_42_actionscheduler_claims",
                "wp_42_actionscheduler_groups",
                "wp_42_actionscheduler_logs",
            ]
        );
    }

    #[tokio::test]
    async fn fresh_site_gets_all_four_tables() {
        let store = Arc::new(RecordingStore::default());
        let report = provisioner(store.clone())
            .ensure_tables(SiteId(7))
            .await
            .unwrap();

        assert_eq!(report.prefix.as_str(), "wp_7_");
        assert_eq!(report.created(), 4);
        assert!(report.tables.iter().all(|t| t.outcome == TableOutcome::Created));

        let created: Vec<_> = store
            .executed()
            .iter()
            .filter_map(|s| created_table(s))
            .collect();
        assert_eq!(
            created,
            [
                "wp_7_actionscheduler_actions",
                "wp_7_actionscheduler_claims",
                "wp_7_actionscheduler_groups",
                "wp_7_actionscheduler_logs",
            ]
        );
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = Arc::new(RecordingStore::default());
        let provisioner = provisioner(store.clone());

        provisioner.ensure_tables(SiteId(3)).await.unwrap();
        let executed = store.executed().len();

        let report = provisioner.ensure_tables(SiteId(3)).await.unwrap();
        assert_eq!(report.created(), 0);
        assert!(report
            .tables
            .iter()
            .all(|t| t.outcome == TableOutcome::AlreadyPresent));
        assert_eq!(store.executed().len(), executed);
    }

    #[tokio::test]
    async fn existing_table_is_left_alone() {
        let store = Arc::new(RecordingStore::with_tables(&["wp_4_actionscheduler_groups"]));
        let report = provisioner(store.clone())
            .ensure_tables(SiteId(4))
            .await
            .unwrap();

        let outcomes: Vec<_> = report.tables.iter().map(|t| t.outcome).collect();
        assert_eq!(
            outcomes,
            [
                TableOutcome::Created,
                TableOutcome::Created,
                TableOutcome::AlreadyPresent,
                TableOutcome::Created,
            ]
        );
        assert!(store
            .executed()
            .iter()
            .all(|s| !s.contains("wp_4_actionscheduler_groups")));
    }

    #[tokio::test]
    async fn sites_are_isolated() {
        let store = Arc::new(RecordingStore::with_tables(&["wp_5_actionscheduler_actions"]));
        provisioner(store.clone())
            .ensure_tables(SiteId(6))
            .await
            .unwrap();

        assert!(store.checked().iter().all(|n| n.starts_with("wp_6_")));
        assert!(store
            .executed()
            .iter()
            .all(|s| s.contains("wp_6_") && !s.contains("wp_5_")));
    }

    #[tokio::test]
    async fn main_site_uses_base_prefix() {
        let store = Arc::new(RecordingStore::default());
        let report = provisioner(store.clone())
            .ensure_tables(SiteId::MAIN)
            .await
            .unwrap();
        assert_eq!(report.tables[0].name, "wp_actionscheduler_actions");
    }

    #[tokio::test]
    async fn check_failure_aborts_run() {
        let store = Arc::new(RecordingStore {
            fail_check_on: Some("wp_9_actionscheduler_claims".to_string()),
            ..Default::default()
        });
        let err = provisioner(store.clone())
            .ensure_tables(SiteId(9))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CheckFailed { .. }));
        assert_eq!(err.table(), "wp_9_actionscheduler_claims");
        // actions was created before the failure, groups and logs never checked
        assert_eq!(store.executed().len(), 1);
        assert_eq!(store.checked().len(), 2);
    }

    #[tokio::test]
    async fn create_failure_is_surfaced() {
        let store = Arc::new(RecordingStore {
            fail_create_on: Some("wp_9_actionscheduler_groups".to_string()),
            ..Default::default()
        });
        let err = provisioner(store.clone())
            .ensure_tables(SiteId(9))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CreateFailed { .. }));
        assert_eq!(err.table(), "wp_9_actionscheduler_groups");
        assert!(!store.checked().contains(&"wp_9_actionscheduler_logs".to_string()));
    }

    #[tokio::test]
    async fn inspect_issues_no_ddl() {
        let store = Arc::new(RecordingStore::with_tables(&["wp_2_actionscheduler_logs"]));
        let inspection = provisioner(store.clone())
            .inspect(SiteId(2))
            .await
            .unwrap();

        assert!(!inspection.complete());
        let existing: Vec<_> = inspection
            .tables
            .iter()
            .filter(|t| t.exists)
            .map(|t| t.table)
            .collect();
        assert_eq!(existing, [SchemaTable::Logs]);
        assert!(store.executed().is_empty());
    }

    #[tokio::test]
    async fn repair_walks_sites_in_order() {
        let store = Arc::new(RecordingStore::default());
        let reports = provisioner(store.clone())
            .repair(&[SiteId(2), SiteId(3)])
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].prefix.as_str(), "wp_2_");
        assert_eq!(reports[1].prefix.as_str(), "wp_3_");
        assert_eq!(store.executed().len(), 8);
    }

    #[tokio::test]
    async fn listener_returns_report() {
        let store = Arc::new(RecordingStore::default());
        let provisioner = provisioner(store);
        let detail = provisioner
            .on_site_created(&SiteCreated { site_id: SiteId(11) })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(detail["site_id"], 11);
        assert_eq!(detail["prefix"], "wp_11_");
        assert_eq!(detail["tables"][0]["outcome"], "created");
        assert_eq!(detail["tables"][3]["table"], "logs");
    }

    #[tokio::test]
    async fn overlong_table_name_is_refused() {
        let store = Arc::new(RecordingStore::default());
        let provisioner = Provisioner::new(
            store.clone(),
            TablePrefix::new("a_network_prefix_long_enough_to_overflow_mysql_").unwrap(),
            TableOptions::default(),
        );

        let err = provisioner.ensure_tables(SiteId::MAIN).await.unwrap_err();
        assert!(matches!(err, ProvisionError::NameTooLong { limit: 64, .. }));
        assert!(store.executed().is_empty());
    }
}
