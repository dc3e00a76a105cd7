use crate::application::ports::inspection_store::InspectionStore;
use crate::application::ports::remote_tracker::{RemoteEventPayload, RemoteTracker};
use crate::application::shared::mappers::{FieldCatalog, TrackerProgram, build_event_payload};
use crate::domain::entities::{
    CategoryPushOutcome, CategorySyncRecord, Inspection, InspectionPatch, PushResult, PushedEvent,
};
use crate::domain::value_objects::{InspectionId, RemoteEventId, SyncStatus};
use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const WRITE_BACK_ATTEMPTS: u32 = 3;
const WRITE_BACK_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSummary {
    /// Inspections that had pending work.
    pub attempted: u32,
    /// Inspections whose aggregate ended `synced`.
    pub synced: u32,
    /// Inspections with at least one rejected category.
    pub failed: u32,
}

impl PushSummary {
    fn record(&mut self, patch: &InspectionPatch, stored: &Inspection) {
        if patch.push_outcomes.iter().any(|outcome| !outcome.is_accepted()) {
            self.failed += 1;
        } else if stored.sync_status == SyncStatus::Synced {
            self.synced += 1;
        }
    }
}

/// Sends pending categories to the tracker, one at a time.
pub struct PushService {
    store: Arc<dyn InspectionStore>,
    remote: Arc<dyn RemoteTracker>,
    program: TrackerProgram,
    catalog: Arc<FieldCatalog>,
    gate: Mutex<()>,
    /// Accepted outcomes the store could not persist yet, keyed by record.
    unsaved: Mutex<HashMap<InspectionId, InspectionPatch>>,
}

impl PushService {
    pub fn new(
        store: Arc<dyn InspectionStore>,
        remote: Arc<dyn RemoteTracker>,
        program: TrackerProgram,
        catalog: Arc<FieldCatalog>,
    ) -> Self {
        Self {
            store,
            remote,
            program,
            catalog,
            gate: Mutex::new(()),
            unsaved: Mutex::new(HashMap::new()),
        }
    }

    /// Runs a push, waiting for any push already in progress to finish first.
    pub async fn push_pending(&self) -> Result<PushSummary, AppError> {
        let _guard = self.gate.lock().await;
        self.run().await
    }

    /// Runs a push unless one is already in progress, in which case `None`.
    pub async fn try_push_pending(&self) -> Option<Result<PushSummary, AppError>> {
        let _guard = self.gate.try_lock().ok()?;
        Some(self.run().await)
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    async fn run(&self) -> Result<PushSummary, AppError> {
        let mut summary = PushSummary::default();
        self.flush_unsaved(&mut summary).await;

        let pending = self.store.list_pending_sync().await?;
        tracing::debug!(pending = pending.len(), "push started");

        for inspection in &pending {
            // Re-sending before the stored outcome lands would create the event twice.
            if self.unsaved.lock().await.contains_key(&inspection.id) {
                continue;
            }
            let outcomes = self.push_inspection(inspection).await;
            if outcomes.is_empty() {
                continue;
            }
            summary.attempted += 1;

            let patch = InspectionPatch {
                push_outcomes: outcomes,
                pushed_as: Some(PushedEvent::of(inspection)),
                ..Default::default()
            };
            match self.write_back(&inspection.id, patch.clone()).await {
                Ok(stored) => {
                    tracing::debug!(
                        inspection_id = %inspection.id,
                        event_ids = ?stored.categories.event_ids(),
                        "push outcome stored"
                    );
                    summary.record(&patch, &stored);
                }
                Err(AppError::RecordNotFound(_)) => {
                    tracing::warn!(
                        inspection_id = %inspection.id,
                        "inspection deleted during push, outcome dropped"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        inspection_id = %inspection.id,
                        error = %err,
                        "push outcome not stored, kept for the next run"
                    );
                    summary.failed += 1;
                    self.unsaved.lock().await.insert(inspection.id.clone(), patch);
                }
            }
        }

        tracing::info!(
            attempted = summary.attempted,
            synced = summary.synced,
            failed = summary.failed,
            "push finished"
        );
        Ok(summary)
    }

    /// Stores outcomes a previous run could not write back.
    async fn flush_unsaved(&self, summary: &mut PushSummary) {
        let unsaved: Vec<(InspectionId, InspectionPatch)> =
            self.unsaved.lock().await.drain().collect();

        for (id, patch) in unsaved {
            summary.attempted += 1;
            match self.write_back(&id, patch.clone()).await {
                Ok(stored) => {
                    tracing::info!(inspection_id = %id, "stored outcome of an earlier push");
                    summary.record(&patch, &stored);
                }
                Err(AppError::RecordNotFound(_)) => {
                    tracing::warn!(inspection_id = %id, "inspection deleted, outcome dropped");
                }
                Err(err) => {
                    tracing::error!(
                        inspection_id = %id,
                        error = %err,
                        "push outcome still not stored"
                    );
                    summary.failed += 1;
                    self.unsaved.lock().await.insert(id, patch);
                }
            }
        }
    }

    async fn write_back(
        &self,
        id: &InspectionId,
        patch: InspectionPatch,
    ) -> Result<Inspection, AppError> {
        let mut attempt = 1;
        loop {
            match self.store.update(id, patch.clone()).await {
                Err(err)
                    if attempt < WRITE_BACK_ATTEMPTS
                        && !matches!(err, AppError::RecordNotFound(_)) =>
                {
                    tracing::warn!(
                        inspection_id = %id,
                        attempt,
                        error = %err,
                        "push write-back failed, retrying"
                    );
                    tokio::time::sleep(WRITE_BACK_BACKOFF * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn push_inspection(&self, inspection: &Inspection) -> Vec<CategoryPushOutcome> {
        let categorized = inspection.is_categorized();
        let mut outcomes = Vec::new();

        for unit in inspection.sync_units() {
            if unit.sync_status.is_synced() {
                continue;
            }

            let payload =
                build_event_payload(inspection, &unit, categorized, &self.program, &self.catalog);
            let result = match self.send(&unit, payload).await {
                Ok(remote_event_id) => {
                    tracing::debug!(
                        inspection_id = %inspection.id,
                        category = %unit.key,
                        remote_event_id = %remote_event_id,
                        "category pushed"
                    );
                    PushResult::Accepted { remote_event_id }
                }
                Err(err) => {
                    tracing::warn!(
                        inspection_id = %inspection.id,
                        category = %unit.key,
                        error = %err,
                        "category push failed"
                    );
                    PushResult::Rejected {
                        error: err.user_message(),
                    }
                }
            };

            outcomes.push(CategoryPushOutcome {
                key: unit.key.clone(),
                label: unit.label.clone(),
                pushed_form: unit.form_data.clone(),
                result,
            });
        }

        outcomes
    }

    async fn send(
        &self,
        unit: &CategorySyncRecord,
        payload: RemoteEventPayload,
    ) -> Result<RemoteEventId, AppError> {
        let report = self
            .remote
            .upsert_events(std::slice::from_ref(&payload))
            .await?;

        if report
            .status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("ERROR"))
        {
            return Err(AppError::RemoteValidationFailed {
                message: "The tracker rejected the event".to_string(),
                org_unit_not_assigned: false,
            });
        }

        // Updates keep the identifier that was sent.
        if let Some(existing) = &unit.remote_event_id {
            return Ok(existing.clone());
        }

        report
            .uid_at(0)
            .and_then(|uid| RemoteEventId::new(uid.to_string()).ok())
            .ok_or(AppError::RemoteIdentifierMissing)
    }
}
