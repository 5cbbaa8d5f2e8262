//! In-process implementation of [`RemoteStore`]
//!
//! Behaves like the hosted tables as far as the coordinator can tell: inserts
//! get a `created_at` when they lack one, filters are column equality, ordering
//! compares column values as strings.

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::remote::{Filter, OrderBy, RemoteStore};
use crate::shared::error::Result;
use crate::shared::record::Record;

/// Tables kept in memory
#[derive(Debug, Default)]
pub struct MemoryRemote {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row in `table`, in insertion order
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert rows as they are, without stamping
    pub async fn seed(&self, table: &str, rows: Vec<Record>) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }
}

fn sort_key(record: &Record, column: &str) -> String {
    match record.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Record> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = order {
            if order.descending {
                // Ties keep newest-inserted first
                rows.reverse();
            }
            rows.sort_by(|a, b| {
                let ordering = sort_key(a, &order.column).cmp(&sort_key(b, &order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Record) -> Result<()> {
        if !row.contains_key("created_at") {
            row.insert(
                "created_at",
                chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            );
        }
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn update(&self, table: &str, filter: &Filter, changes: Record) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                for (column, value) in changes.as_map() {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !filter.matches(row));
        }
        Ok(())
    }
}
