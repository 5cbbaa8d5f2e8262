//! Entity-to-table mapping and user scoping

use std::sync::Arc;

use crate::offline::operation::StorageOperation;
use crate::offline::reconciliation::USER_ID_FIELD;
use crate::remote::{Filter, OrderBy, RemoteStore};
use crate::shared::entity::{EntityType, OperationKind};
use crate::shared::error::{Result, StorageError};
use crate::shared::record::Record;

const USER_COLUMN: &str = "user_id";
const ID_COLUMN: &str = "id";
const CREATED_COLUMN: &str = "created_at";

/// Remote table backing `entity`
pub fn table_name(entity: EntityType) -> &'static str {
    match entity {
        EntityType::Activity => "workout_activities",
        EntityType::Ongoing => "ongoing_workouts",
        EntityType::Template => "workout_templates",
        EntityType::Goals => "user_goals",
        EntityType::Sleep => "sleep_data",
    }
}

/// Remote table for an entity type given by name
///
/// Unknown names fail with [`StorageError::UnsupportedType`].
pub fn table_for(entity: &str) -> Result<&'static str> {
    Ok(table_name(entity.parse()?))
}

/// User-scoped view of the remote database
pub struct RemoteAccessor {
    remote: Arc<dyn RemoteStore>,
    user_id: String,
}

impl RemoteAccessor {
    pub fn new(remote: Arc<dyn RemoteStore>, user_id: impl Into<String>) -> Self {
        Self {
            remote,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// All rows of the current user, newest first
    pub async fn load(&self, entity: EntityType) -> Result<Vec<Record>> {
        let filter = Filter::new().eq(USER_COLUMN, self.user_id.as_str());
        self.remote
            .select(table_name(entity), &filter, Some(&OrderBy::desc(CREATED_COLUMN)))
            .await
    }

    /// Perform the remote write a queued operation stands for
    pub async fn apply(&self, op: &StorageOperation) -> Result<()> {
        let table = table_name(op.entity);

        let mut row = op.data.clone();
        row.remove(USER_ID_FIELD);
        row.insert(USER_COLUMN, self.user_id.as_str());

        match op.operation {
            OperationKind::Create => self.remote.insert(table, row).await,
            OperationKind::Update => {
                let filter = self.record_filter(op)?;
                self.remote.update(table, &filter, row).await
            }
            OperationKind::Delete => {
                let filter = self.record_filter(op)?;
                self.remote.delete(table, &filter).await
            }
        }
    }

    fn record_filter(&self, op: &StorageOperation) -> Result<Filter> {
        let id = op
            .record_id()
            .ok_or_else(|| StorageError::MissingId(op.id.clone()))?;
        Ok(Filter::new()
            .eq(ID_COLUMN, id)
            .eq(USER_COLUMN, self.user_id.as_str()))
    }
}
