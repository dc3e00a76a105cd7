use async_trait::async_trait;
use field_inspection_sync::application::ports::inspection_store::{
    IndexQuery, InspectionStore, StorageHealth,
};
use field_inspection_sync::domain::entities::{Inspection, InspectionPatch, NewInspection};
use field_inspection_sync::domain::value_objects::{InspectionId, RemoteEventId};
use field_inspection_sync::shared::change_signal::ChangeSubscription;
use field_inspection_sync::shared::error::AppError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Wraps a real store to slow down reads or fail a number of updates.
pub struct InterceptingStore {
    inner: Arc<dyn InspectionStore>,
    read_delay: Mutex<Option<Duration>>,
    failing_updates: AtomicU32,
    update_calls: AtomicU32,
}

impl InterceptingStore {
    pub fn new(inner: Arc<dyn InspectionStore>) -> Self {
        Self {
            inner,
            read_delay: Mutex::new(None),
            failing_updates: AtomicU32::new(0),
            update_calls: AtomicU32::new(0),
        }
    }

    /// Every `get` returns what it read, but only after `delay`.
    pub async fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock().await = delay;
    }

    pub fn fail_next_updates(&self, count: u32) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InspectionStore for InterceptingStore {
    async fn create(&self, draft: NewInspection) -> Result<Inspection, AppError> {
        self.inner.create(draft).await
    }

    async fn create_with_id(
        &self,
        id: InspectionId,
        draft: NewInspection,
    ) -> Result<Inspection, AppError> {
        self.inner.create_with_id(id, draft).await
    }

    async fn get(&self, id: &InspectionId) -> Result<Option<Inspection>, AppError> {
        let read = self.inner.get(id).await;
        let delay = *self.read_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        read
    }

    async fn update(
        &self,
        id: &InspectionId,
        patch: InspectionPatch,
    ) -> Result<Inspection, AppError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if failing.is_ok() {
            return Err(AppError::StorageBlocked("database is locked".to_string()));
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &InspectionId) -> Result<(), AppError> {
        self.inner.delete(id).await
    }

    async fn query_by_index(&self, query: IndexQuery) -> Result<Vec<Inspection>, AppError> {
        self.inner.query_by_index(query).await
    }

    async fn list_pending_sync(&self) -> Result<Vec<Inspection>, AppError> {
        self.inner.list_pending_sync().await
    }

    async fn find_by_remote_identifier(
        &self,
        remote_id: &RemoteEventId,
    ) -> Result<Option<Inspection>, AppError> {
        self.inner.find_by_remote_identifier(remote_id).await
    }

    async fn list(&self, limit: u32) -> Result<Vec<Inspection>, AppError> {
        self.inner.list(limit).await
    }

    async fn health_check(&self) -> StorageHealth {
        self.inner.health_check().await
    }

    fn subscribe(&self) -> ChangeSubscription {
        self.inner.subscribe()
    }
}
