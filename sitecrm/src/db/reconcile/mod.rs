//! Startup schema reconciliation.
//!
//! Instead of versioned migrations, the service compares the live catalog against the static
//! description in [`schema`] and applies the difference: create missing tables, add missing
//! columns, create missing indexes, seed empty reference tables, backfill null workspace scopes,
//! rewrite legacy stage labels, reset unrecognised ones and drop deprecated columns. Every step checks before acting, so a
//! run against an up-to-date database changes nothing and a run interrupted halfway can simply be
//! repeated.
//!
//! Each statement runs in autocommit on a single connection. Any failure aborts the run and the
//! caller is expected to abort startup.

pub mod catalog;
pub mod schema;

use std::fmt;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument, trace, warn};

use crate::db::errors::Result;
use catalog::Catalog;
use schema::{DEAL_STAGE_REWRITE, DEPRECATED_COLUMNS, SCOPE_COLUMN, TABLES, TableSpec, ValueRewrite, Vocabulary, vocabularies};

/// Advisory lock key serialising reconciliation across instances sharing one database.
pub const RECONCILE_LOCK_ID: i64 = 0x5349_5445_4352_4d01;

/// One change applied to the schema or its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    CreatedTable { table: String },
    SeededTable { table: String, rows: u64 },
    AddedColumn { table: String, column: String },
    CreatedIndex { table: String, index: String },
    BackfilledScope { table: String, rows: u64 },
    RewroteValues { table: String, column: String, rows: u64 },
    NormalizedValues { table: String, column: String, rows: u64 },
    DroppedColumn { table: String, column: String },
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaChange::CreatedTable { table } => write!(f, "created table {table}"),
            SchemaChange::SeededTable { table, rows } => write!(f, "seeded {rows} rows into {table}"),
            SchemaChange::AddedColumn { table, column } => write!(f, "added column {table}.{column}"),
            SchemaChange::CreatedIndex { table, index } => write!(f, "created index {index} on {table}"),
            SchemaChange::BackfilledScope { table, rows } => {
                write!(f, "backfilled {SCOPE_COLUMN} on {rows} rows of {table}")
            }
            SchemaChange::RewroteValues { table, column, rows } => {
                write!(f, "rewrote {rows} legacy values in {table}.{column}")
            }
            SchemaChange::NormalizedValues { table, column, rows } => {
                write!(f, "reset {rows} unrecognised values in {table}.{column}")
            }
            SchemaChange::DroppedColumn { table, column } => write!(f, "dropped column {table}.{column}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub changes: Vec<SchemaChange>,
}

impl ReconciliationReport {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    fn record(&mut self, change: SchemaChange) {
        info!("Schema reconciler {}", change);
        self.changes.push(change);
    }
}

/// Reconcile the schema while holding the cluster-wide advisory lock.
///
/// Advisory locks are session-scoped, so the whole run happens on one dedicated connection. A
/// second instance starting concurrently blocks here until the first has finished, then finds
/// nothing left to do.
#[instrument(skip(pool), err)]
pub async fn run_reconciler(pool: &PgPool, default_workspace: &str) -> Result<ReconciliationReport> {
    let mut conn = pool.acquire().await?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(RECONCILE_LOCK_ID)
        .execute(&mut *conn)
        .await?;

    let outcome = reconcile(&mut conn, default_workspace).await;

    let unlocked = sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(RECONCILE_LOCK_ID)
        .execute(&mut *conn)
        .await;

    let report = outcome?;
    unlocked?;

    if report.is_noop() {
        info!("Schema is up to date");
    } else {
        info!("Schema reconciled with {} changes", report.changes.len());
    }
    Ok(report)
}

/// Bring the connected schema in line with [`schema::TABLES`].
pub async fn reconcile(conn: &mut PgConnection, default_workspace: &str) -> Result<ReconciliationReport> {
    let mut report = ReconciliationReport::default();
    let catalog = Catalog::load(conn).await?;

    for table in TABLES {
        match catalog.table(table.name) {
            None => create_table(conn, table, &mut report).await?,
            Some(existing) => {
                info!("Table {} exists, checking columns", table.name);
                for column in table.columns {
                    if existing.has_column(column.name) {
                        trace!("Column {}.{} present", table.name, column.name);
                        continue;
                    }
                    let sql = format!("ALTER TABLE {} ADD COLUMN IF NOT EXISTS {}", table.name, column.add_definition());
                    sqlx::query(&sql).execute(&mut *conn).await?;
                    report.record(SchemaChange::AddedColumn {
                        table: table.name.to_string(),
                        column: column.name.to_string(),
                    });
                }
                for index in table.indexes {
                    if existing.has_index(index.name) {
                        trace!("Index {} present", index.name);
                        continue;
                    }
                    sqlx::query(&index.create_statement(table.name)).execute(&mut *conn).await?;
                    report.record(SchemaChange::CreatedIndex {
                        table: table.name.to_string(),
                        index: index.name.to_string(),
                    });
                }
            }
        }

        seed_if_empty(conn, table, &mut report).await?;
    }

    drop_deprecated_columns(conn, &catalog, &mut report).await?;
    rewrite_values(conn, &DEAL_STAGE_REWRITE, &mut report).await?;
    for vocabulary in vocabularies() {
        normalize_values(conn, &vocabulary, &mut report).await?;
    }
    backfill_scope(conn, default_workspace, &mut report).await?;

    Ok(report)
}

async fn create_table(conn: &mut PgConnection, table: &TableSpec, report: &mut ReconciliationReport) -> Result<()> {
    sqlx::query(&table.create_statement()).execute(&mut *conn).await?;
    report.record(SchemaChange::CreatedTable {
        table: table.name.to_string(),
    });

    for index in table.indexes {
        sqlx::query(&index.create_statement(table.name)).execute(&mut *conn).await?;
        report.record(SchemaChange::CreatedIndex {
            table: table.name.to_string(),
            index: index.name.to_string(),
        });
    }
    Ok(())
}

/// Insert the table's reference rows if it currently has none. Conflicting rows are skipped.
async fn seed_if_empty(conn: &mut PgConnection, table: &TableSpec, report: &mut ReconciliationReport) -> Result<()> {
    if table.seed.is_empty() {
        return Ok(());
    }

    let populated: bool = sqlx::query_scalar(&format!("SELECT EXISTS (SELECT 1 FROM {})", table.name))
        .fetch_one(&mut *conn)
        .await?;
    if populated {
        trace!("Table {} already holds reference rows", table.name);
        return Ok(());
    }

    let mut inserted = 0;
    for row in table.seed {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!("INSERT INTO {} (", table.name));
        let mut columns = query.separated(", ");
        for (column, _) in row.iter() {
            columns.push(*column);
        }
        query.push(") VALUES (");
        let mut values = query.separated(", ");
        for (_, value) in row.iter() {
            values.push_bind(*value);
        }
        query.push(") ON CONFLICT DO NOTHING");

        inserted += query.build().execute(&mut *conn).await?.rows_affected();
    }

    if inserted > 0 {
        report.record(SchemaChange::SeededTable {
            table: table.name.to_string(),
            rows: inserted,
        });
    }
    Ok(())
}

async fn drop_deprecated_columns(conn: &mut PgConnection, catalog: &Catalog, report: &mut ReconciliationReport) -> Result<()> {
    for (table, column) in DEPRECATED_COLUMNS {
        if !catalog.table(table).is_some_and(|t| t.has_column(column)) {
            trace!("Deprecated column {}.{} absent", table, column);
            continue;
        }
        sqlx::query(&format!("ALTER TABLE {table} DROP COLUMN IF EXISTS {column}"))
            .execute(&mut *conn)
            .await?;
        report.record(SchemaChange::DroppedColumn {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    Ok(())
}

async fn rewrite_values(conn: &mut PgConnection, rewrite: &ValueRewrite, report: &mut ReconciliationReport) -> Result<()> {
    let sql = format!("UPDATE {} SET {} = $1 WHERE {} = $2", rewrite.table, rewrite.column, rewrite.column);

    let mut rows = 0;
    for (legacy, current) in rewrite.mapping {
        rows += sqlx::query(&sql)
            .bind(*current)
            .bind(*legacy)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    if rows > 0 {
        report.record(SchemaChange::RewroteValues {
            table: rewrite.table.to_string(),
            column: rewrite.column.to_string(),
            rows,
        });
    } else {
        trace!("No legacy values in {}.{}", rewrite.table, rewrite.column);
    }
    Ok(())
}

/// Reset values outside the column's vocabulary to its fallback, logging each distinct label.
async fn normalize_values(conn: &mut PgConnection, vocabulary: &Vocabulary, report: &mut ReconciliationReport) -> Result<()> {
    let (table, column) = (vocabulary.table, vocabulary.column);
    let outside = format!("{column} IS NULL OR NOT ({column} = ANY($1))");

    let unknown: Vec<(Option<String>, i64)> =
        sqlx::query_as(&format!("SELECT {column}, COUNT(*) FROM {table} WHERE {outside} GROUP BY {column}"))
            .bind(&vocabulary.labels)
            .fetch_all(&mut *conn)
            .await?;
    if unknown.is_empty() {
        trace!("All values in {}.{} are recognised", table, column);
        return Ok(());
    }
    for (label, count) in &unknown {
        warn!(
            "Resetting {} rows of {}.{} from {:?} to '{}'",
            count, table, column, label, vocabulary.fallback
        );
    }

    let rows = sqlx::query(&format!("UPDATE {table} SET {column} = $2 WHERE {outside}"))
        .bind(&vocabulary.labels)
        .bind(&vocabulary.fallback)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    report.record(SchemaChange::NormalizedValues {
        table: table.to_string(),
        column: column.to_string(),
        rows,
    });
    Ok(())
}

/// Point rows with no workspace at the default one, if that workspace exists.
async fn backfill_scope(conn: &mut PgConnection, default_workspace: &str, report: &mut ReconciliationReport) -> Result<()> {
    let workspace_id: Option<i64> = sqlx::query_scalar("SELECT id FROM workspaces WHERE name = $1")
        .bind(default_workspace)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(workspace_id) = workspace_id else {
        warn!("Default workspace '{}' not found, skipping {} backfill", default_workspace, SCOPE_COLUMN);
        return Ok(());
    };

    for table in TABLES.iter().filter(|t| t.scoped) {
        let rows = sqlx::query(&format!(
            "UPDATE {} SET {SCOPE_COLUMN} = $1 WHERE {SCOPE_COLUMN} IS NULL",
            table.name
        ))
        .bind(workspace_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if rows > 0 {
            report.record(SchemaChange::BackfilledScope {
                table: table.name.to_string(),
                rows,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    const DEFAULT_WORKSPACE: &str = "Satoris";

    #[sqlx::test]
    #[test_log::test]
    async fn test_fresh_database_creates_everything(pool: PgPool) {
        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();

        for table in TABLES {
            assert!(
                report.changes.contains(&SchemaChange::CreatedTable {
                    table: table.name.to_string()
                }),
                "{} was not created",
                table.name
            );
        }
        assert!(report.changes.contains(&SchemaChange::SeededTable {
            table: "workspaces".to_string(),
            rows: 3
        }));

        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM workspaces ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(names, vec!["Satoris", "Westpark", "Business Technology Group"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_second_run_is_noop(pool: PgPool) {
        run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let before = Catalog::load(&mut conn).await.unwrap();
        drop(conn);

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.is_noop(), "unexpected changes: {:?}", report.changes);

        let mut conn = pool.acquire().await.unwrap();
        let after = Catalog::load(&mut conn).await.unwrap();
        assert_eq!(before, after);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_resumes_after_partial_run(pool: PgPool) {
        // A previous run that only got as far as a stripped-down deals table
        sqlx::query("CREATE TABLE deals (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL, stage TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO deals (name, stage) VALUES ('Old fit-out', 'Prospects')")
            .execute(&pool)
            .await
            .unwrap();

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();

        assert!(!report.changes.contains(&SchemaChange::CreatedTable {
            table: "deals".to_string()
        }));
        assert!(report.changes.contains(&SchemaChange::AddedColumn {
            table: "deals".to_string(),
            column: "workspace_id".to_string()
        }));
        assert!(report.changes.contains(&SchemaChange::CreatedIndex {
            table: "deals".to_string(),
            index: "deals_monday_item_id_unique".to_string()
        }));
        assert!(report.changes.contains(&SchemaChange::BackfilledScope {
            table: "deals".to_string(),
            rows: 1
        }));

        // Added columns are nullable even when the full definition is not
        let mut conn = pool.acquire().await.unwrap();
        let catalog = Catalog::load(&mut conn).await.unwrap();
        assert!(catalog.table("deals").unwrap().columns["created_at"].nullable);

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.is_noop(), "unexpected changes: {:?}", report.changes);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_backfill_skipped_without_default_workspace(pool: PgPool) {
        run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        sqlx::query("INSERT INTO leads (name) VALUES ('Unscoped lead')")
            .execute(&pool)
            .await
            .unwrap();

        let report = run_reconciler(&pool, "Nonexistent").await.unwrap();
        assert!(report.is_noop(), "unexpected changes: {:?}", report.changes);

        let scope: Option<i64> = sqlx::query_scalar("SELECT workspace_id FROM leads")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(scope, None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_repair_pass_backfills_rows_inserted_later(pool: PgPool) {
        run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        sqlx::query("INSERT INTO tasks (name) VALUES ('Call back')")
            .execute(&pool)
            .await
            .unwrap();

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert_eq!(
            report.changes,
            vec![SchemaChange::BackfilledScope {
                table: "tasks".to_string(),
                rows: 1
            }]
        );

        let scope: i64 = sqlx::query_scalar(
            "SELECT t.workspace_id FROM tasks t JOIN workspaces w ON w.id = t.workspace_id WHERE w.name = 'Satoris'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(scope > 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_emptied_reference_table_is_reseeded(pool: PgPool) {
        run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        sqlx::query("DELETE FROM workspaces").execute(&pool).await.unwrap();

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.changes.contains(&SchemaChange::SeededTable {
            table: "workspaces".to_string(),
            rows: 3
        }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unrecognised_labels_reset_to_initial(pool: PgPool) {
        run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        sqlx::query("INSERT INTO deals (name, stage) VALUES ('Imported', 'Contract sent'), ('Valid', 'Lost')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO tasks (name, status) VALUES ('Imported task', 'Blocked')")
            .execute(&pool)
            .await
            .unwrap();

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.changes.contains(&SchemaChange::NormalizedValues {
            table: "deals".to_string(),
            column: "stage".to_string(),
            rows: 1
        }));
        assert!(report.changes.contains(&SchemaChange::NormalizedValues {
            table: "tasks".to_string(),
            column: "status".to_string(),
            rows: 1
        }));

        let stages: Vec<(String, String)> = sqlx::query_as("SELECT name, stage FROM deals ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(
            stages,
            vec![
                ("Imported".to_string(), "Prospects".to_string()),
                ("Valid".to_string(), "Lost".to_string())
            ]
        );
        let status: String = sqlx::query_scalar("SELECT status FROM tasks").fetch_one(&pool).await.unwrap();
        assert_eq!(status, "To do");

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.is_noop(), "unexpected changes: {:?}", report.changes);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_legacy_stages_rewritten_to_fixed_point(pool: PgPool) {
        run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        for stage in ["Leads", "Estimating", "Submitted", "Won", "Declined", "Completed"] {
            sqlx::query("INSERT INTO deals (name, stage) VALUES ($1, $2)")
                .bind(format!("{stage} deal"))
                .bind(stage)
                .execute(&pool)
                .await
                .unwrap();
        }

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.changes.contains(&SchemaChange::RewroteValues {
            table: "deals".to_string(),
            column: "stage".to_string(),
            rows: 5
        }));

        let stages: Vec<String> = sqlx::query_scalar("SELECT stage FROM deals ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(
            stages,
            vec![
                "Prospects",
                "Preparing proposal",
                "Proposal sent",
                "Closed Won",
                "Lost",
                "Completed"
            ]
        );

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.is_noop(), "unexpected changes: {:?}", report.changes);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deprecated_deal_columns_dropped(pool: PgPool) {
        sqlx::query("CREATE TABLE workspaces (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE deals (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL, return_date DATE, location_lat DOUBLE PRECISION)")
            .execute(&pool)
            .await
            .unwrap();

        let report = run_reconciler(&pool, DEFAULT_WORKSPACE).await.unwrap();
        assert!(report.changes.contains(&SchemaChange::DroppedColumn {
            table: "deals".to_string(),
            column: "return_date".to_string()
        }));
        assert!(report.changes.contains(&SchemaChange::DroppedColumn {
            table: "deals".to_string(),
            column: "location_lat".to_string()
        }));

        let mut conn = pool.acquire().await.unwrap();
        let catalog = Catalog::load(&mut conn).await.unwrap();
        let deals = catalog.table("deals").unwrap();
        assert!(!deals.has_column("return_date"));
        assert!(!deals.has_column("location_lat"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_runs_serialise(pool: PgPool) {
        let (a, b) = tokio::join!(
            run_reconciler(&pool, DEFAULT_WORKSPACE),
            run_reconciler(&pool, DEFAULT_WORKSPACE)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        // Exactly one of the two did the work
        assert!(a.is_noop() != b.is_noop());
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workspaces")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }
}
