//! Snapshot of what actually exists in the connected schema.

use std::collections::{BTreeMap, BTreeSet};

use sqlx::{FromRow, PgConnection};

use crate::db::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableInfo {
    pub columns: BTreeMap<String, ColumnInfo>,
    pub indexes: BTreeSet<String>,
}

impl TableInfo {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains(name)
    }
}

/// Tables, columns and indexes in `current_schema()`, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub tables: BTreeMap<String, TableInfo>,
}

#[derive(FromRow)]
struct ColumnRow {
    table_name: String,
    column_name: String,
    data_type: String,
    is_nullable: String,
}

#[derive(FromRow)]
struct IndexRow {
    tablename: String,
    indexname: String,
}

impl Catalog {
    pub async fn load(conn: &mut PgConnection) -> Result<Self> {
        let table_names: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::TEXT FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut tables: BTreeMap<String, TableInfo> = table_names.into_iter().map(|name| (name, TableInfo::default())).collect();

        let columns = sqlx::query_as::<_, ColumnRow>(
            "SELECT table_name::TEXT, column_name::TEXT, data_type::TEXT, is_nullable::TEXT
             FROM information_schema.columns
             WHERE table_schema = current_schema()",
        )
        .fetch_all(&mut *conn)
        .await?;

        for column in columns {
            // Views also show up in information_schema.columns
            if let Some(table) = tables.get_mut(&column.table_name) {
                table.columns.insert(
                    column.column_name,
                    ColumnInfo {
                        data_type: column.data_type,
                        nullable: column.is_nullable == "YES",
                    },
                );
            }
        }

        let indexes = sqlx::query_as::<_, IndexRow>(
            "SELECT tablename::TEXT, indexname::TEXT FROM pg_indexes WHERE schemaname = current_schema()",
        )
        .fetch_all(&mut *conn)
        .await?;

        for index in indexes {
            if let Some(table) = tables.get_mut(&index.tablename) {
                table.indexes.insert(index.indexname);
            }
        }

        Ok(Self { tables })
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }
}
