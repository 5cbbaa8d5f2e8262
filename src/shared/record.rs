//! Record payloads
//!
//! [`Record`] is the untyped JSON object the cache and queue store. The coordinator
//! only ever interprets its `id`; everything else passes through untouched.
//!
//! The typed structs below give each entity type its own shape. They keep
//! unknown columns in a flattened `extra` map so a remote row converted to a
//! typed record and back loses nothing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::shared::entity::EntityType;
use crate::shared::error::Result;

/// Opaque JSON object with at least an `id`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from any JSON value, failing unless it is an object
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Convert a typed record
    pub fn from_typed<R: Serialize>(record: &R) -> Result<Self> {
        Self::from_value(serde_json::to_value(record)?)
    }

    /// Decode into a typed record
    pub fn to_typed<R: DeserializeOwned>(&self) -> Result<R> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    /// Record id; numeric ids are rendered as strings
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Return the id, assigning a fresh UUID when the record has none
    pub fn ensure_id(&mut self) -> String {
        if let Some(id) = self.id() {
            return id;
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.0.insert("id".to_string(), Value::String(id.clone()));
        id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A typed record bound to one entity type
pub trait EntityRecord: Serialize + DeserializeOwned + Send + Sync {
    /// Entity type this shape belongs to
    const ENTITY: EntityType;

    fn id(&self) -> &str;
}

/// Completed workout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkoutActivity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Workout in progress
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OngoingWorkout {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default)]
    pub elapsed_seconds: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reusable workout template
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fitness goals
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserGoals {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_workouts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight_kg: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One night of sleep
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SleepEntry {
    pub id: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

macro_rules! entity_record {
    ($ty:ty, $entity:expr) => {
        impl EntityRecord for $ty {
            const ENTITY: EntityType = $entity;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

entity_record!(WorkoutActivity, EntityType::Activity);
entity_record!(OngoingWorkout, EntityType::Ongoing);
entity_record!(WorkoutTemplate, EntityType::Template);
entity_record!(UserGoals, EntityType::Goals);
entity_record!(SleepEntry, EntityType::Sleep);
