//! # Remote Database Access
//!
//! The coordinator never talks to a database client directly. It goes through
//! [`RemoteAccessor`], which maps entity types to tables and scopes every
//! query to the current user, on top of the [`RemoteStore`] trait.
//!
//! ## Implementations
//!
//! - [`RestRemote`]: PostgREST over HTTP (the hosted backend)
//! - [`MemoryRemote`]: in-process tables

pub mod accessor;
pub mod memory;
pub mod rest;


pub use accessor::{table_for, table_name, RemoteAccessor};
pub use memory::MemoryRemote;
pub use rest::RestRemote;

use async_trait::async_trait;
use serde_json::Value;

use crate::shared::error::Result;
use crate::shared::record::Record;

/// Conjunction of column equality conditions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` condition
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    /// Whether `record` satisfies every condition
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            match record.get(column) {
                Some(Value::String(actual)) => actual == expected,
                Some(Value::Number(actual)) => actual.to_string() == *expected,
                Some(Value::Bool(actual)) => actual.to_string() == *expected,
                _ => false,
            }
        })
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

/// Generic table client of the hosted database
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Rows of `table` matching `filter`
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Record>>;

    /// Insert one row
    async fn insert(&self, table: &str, row: Record) -> Result<()>;

    /// Apply `changes` to every row matching `filter`
    async fn update(&self, table: &str, filter: &Filter, changes: Record) -> Result<()>;

    /// Delete every row matching `filter`
    async fn delete(&self, table: &str, filter: &Filter) -> Result<()>;
}
