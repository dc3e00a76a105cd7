use crate::domain::entities::{Inspection, InspectionPatch, NewInspection};
use crate::domain::value_objects::{InspectionId, InspectionStatus, RemoteEventId, SyncStatus};
use crate::shared::change_signal::ChangeSubscription;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

/// Secondary-index lookups supported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexQuery {
    OrgUnit(String),
    EventDate(NaiveDate),
    Status(InspectionStatus),
    SyncStatus(SyncStatus),
    Dhis2EventId(RemoteEventId),
}

/// Result of a non-mutating storage probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum StorageHealth {
    Ok,
    Unsupported(String),
    Blocked(String),
    QuotaExceeded(String),
}

impl StorageHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, StorageHealth::Ok)
    }
}

#[async_trait]
pub trait InspectionStore: Send + Sync {
    async fn create(&self, draft: NewInspection) -> Result<Inspection, AppError>;
    /// Creates a record under a caller-chosen identifier (pull adoption).
    async fn create_with_id(
        &self,
        id: InspectionId,
        draft: NewInspection,
    ) -> Result<Inspection, AppError>;
    async fn get(&self, id: &InspectionId) -> Result<Option<Inspection>, AppError>;
    async fn update(
        &self,
        id: &InspectionId,
        patch: InspectionPatch,
    ) -> Result<Inspection, AppError>;
    async fn delete(&self, id: &InspectionId) -> Result<(), AppError>;
    async fn query_by_index(&self, query: IndexQuery) -> Result<Vec<Inspection>, AppError>;
    /// Records whose aggregate status is `not_synced` or `sync_failed`, oldest first.
    async fn list_pending_sync(&self) -> Result<Vec<Inspection>, AppError>;
    /// Single lookup by primary id, inspection-level or category remote id.
    async fn find_by_remote_identifier(
        &self,
        remote_id: &RemoteEventId,
    ) -> Result<Option<Inspection>, AppError>;
    async fn list(&self, limit: u32) -> Result<Vec<Inspection>, AppError>;
    async fn health_check(&self) -> StorageHealth;
    fn subscribe(&self) -> ChangeSubscription;
}
