//! Entity and operation kinds
//!
//! The coordinator manages a closed set of record kinds. Each maps to exactly
//! one remote table and one local cache key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::error::StorageError;

/// Logical record kind handled by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Completed workout
    Activity,
    /// Workout in progress
    Ongoing,
    /// Reusable workout template
    Template,
    /// User goals
    Goals,
    /// Sleep log entry
    Sleep,
}

impl EntityType {
    /// Every entity type, in declaration order
    pub const ALL: [EntityType; 5] = [
        EntityType::Activity,
        EntityType::Ongoing,
        EntityType::Template,
        EntityType::Goals,
        EntityType::Sleep,
    ];

    /// Name used in storage keys and operation ids
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Activity => "activity",
            EntityType::Ongoing => "ongoing",
            EntityType::Template => "template",
            EntityType::Goals => "goals",
            EntityType::Sleep => "sleep",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" => Ok(EntityType::Activity),
            "ongoing" => Ok(EntityType::Ongoing),
            "template" => Ok(EntityType::Template),
            "goals" => Ok(EntityType::Goals),
            "sleep" => Ok(EntityType::Sleep),
            other => Err(StorageError::UnsupportedType(other.to_string())),
        }
    }
}

/// Mutation kind of a queued operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}
