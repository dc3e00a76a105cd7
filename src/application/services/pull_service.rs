use crate::application::ports::inspection_store::InspectionStore;
use crate::application::ports::remote_tracker::{RecordQuery, RemoteRecord, RemoteTracker};
use crate::application::shared::mappers::{
    FieldCatalog, RemoteInspection, map_remote_record, strip_note_prefix,
};
use crate::domain::entities::{CategorySyncRecord, Inspection, InspectionPatch, NewInspection};
use crate::domain::value_objects::{CategoryKey, InspectionId, RecordSource, SyncStatus};
use crate::shared::error::AppError;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullSummary {
    pub fetched: u32,
    pub created: u32,
    pub updated: u32,
    /// Records left alone by the conflict policy or unreadable remote records.
    pub skipped: u32,
}

/// Decides whether a pulled record may overwrite a matched local record.
pub trait PullConflictPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn should_overwrite(&self, local: &Inspection) -> bool;
}

/// The tracker always wins; unsynced local edits are discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastPullWins;

impl PullConflictPolicy for LastPullWins {
    fn name(&self) -> &'static str {
        "last_pull_wins"
    }

    fn should_overwrite(&self, _local: &Inspection) -> bool {
        true
    }
}

/// Leaves records with unpushed local edits for the next push.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreserveLocalEdits;

impl PullConflictPolicy for PreserveLocalEdits {
    fn name(&self) -> &'static str {
        "preserve_local_edits"
    }

    fn should_overwrite(&self, local: &Inspection) -> bool {
        local.sync_status == SyncStatus::Synced
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconciled {
    Created,
    Updated,
    Skipped,
}

pub struct PullService {
    store: Arc<dyn InspectionStore>,
    remote: Arc<dyn RemoteTracker>,
    catalog: Arc<FieldCatalog>,
    program: String,
    page_size: u32,
    policy: Arc<dyn PullConflictPolicy>,
    org_unit_names: Mutex<LruCache<String, String>>,
    gate: Mutex<()>,
}

impl PullService {
    pub fn new(
        store: Arc<dyn InspectionStore>,
        remote: Arc<dyn RemoteTracker>,
        catalog: Arc<FieldCatalog>,
        program: impl Into<String>,
        page_size: u32,
        org_unit_cache_size: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(org_unit_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            remote,
            catalog,
            program: program.into(),
            page_size: page_size.max(1),
            policy: Arc::new(LastPullWins),
            org_unit_names: Mutex::new(LruCache::new(capacity)),
            gate: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn PullConflictPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Fetches the most recent page of program events and reconciles each one.
    /// Every reconciliation is its own store write; a failure aborts the pull
    /// but keeps what was already written.
    pub async fn pull_latest(&self) -> Result<PullSummary, AppError> {
        let _guard = self.gate.lock().await;

        let query = RecordQuery::latest(&self.program, self.page_size);
        let records = self.remote.query_records(&query).await?;
        let names = self.resolve_org_unit_names(&records).await?;

        let mut summary = PullSummary {
            fetched: records.len() as u32,
            ..Default::default()
        };

        for record in &records {
            let remote = match map_remote_record(record, &self.catalog, &names) {
                Ok(remote) => remote,
                Err(reason) => {
                    tracing::warn!(
                        event = %record.event,
                        %reason,
                        "skipping unreadable tracker event"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.reconcile(remote).await? {
                Reconciled::Created => summary.created += 1,
                Reconciled::Updated => summary.updated += 1,
                Reconciled::Skipped => summary.skipped += 1,
            }
        }

        tracing::info!(
            fetched = summary.fetched,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            policy = self.policy.name(),
            "pull finished"
        );
        Ok(summary)
    }

    /// Names for every org unit referenced by `records`, requesting only the
    /// ones not cached yet, all in one call.
    async fn resolve_org_unit_names(
        &self,
        records: &[RemoteRecord],
    ) -> Result<HashMap<String, String>, AppError> {
        let wanted: BTreeSet<&str> = records
            .iter()
            .map(|record| record.org_unit.as_str())
            .filter(|org_unit| !org_unit.is_empty())
            .collect();

        let mut names = HashMap::new();
        let mut missing = Vec::new();
        {
            let mut cache = self.org_unit_names.lock().await;
            for org_unit in wanted {
                match cache.get(org_unit) {
                    Some(name) => {
                        names.insert(org_unit.to_string(), name.clone());
                    }
                    None => missing.push(org_unit.to_string()),
                }
            }
        }

        if missing.is_empty() {
            return Ok(names);
        }

        let units = self.remote.query_org_units(&missing).await?;
        let mut cache = self.org_unit_names.lock().await;
        for unit in units {
            if unit.display_name.is_empty() {
                continue;
            }
            cache.put(unit.id.clone(), unit.display_name.clone());
            names.insert(unit.id, unit.display_name);
        }
        Ok(names)
    }

    async fn reconcile(&self, remote: RemoteInspection) -> Result<Reconciled, AppError> {
        let Some(local) = self.store.find_by_remote_identifier(&remote.remote_id).await? else {
            self.adopt(remote).await?;
            return Ok(Reconciled::Created);
        };

        if !self.policy.should_overwrite(&local) {
            tracing::debug!(
                inspection_id = %local.id,
                sync_status = %local.sync_status,
                "local edits kept, pulled event skipped"
            );
            return Ok(Reconciled::Skipped);
        }

        self.overwrite(&local, remote).await?;
        Ok(Reconciled::Updated)
    }

    /// Stores a tracker event never seen locally under its remote identifier.
    async fn adopt(&self, remote: RemoteInspection) -> Result<(), AppError> {
        let id = InspectionId::new(remote.remote_id.to_string()).map_err(AppError::InvalidInput)?;
        let mut default =
            CategorySyncRecord::new(CategoryKey::default_key(), remote.form_data.clone());
        default.mark_pulled(None, &remote.remote_id);

        let org_unit_name = remote
            .org_unit_name
            .clone()
            .unwrap_or_else(|| remote.org_unit.clone());
        let mut draft = NewInspection::new(remote.org_unit, org_unit_name, remote.event_date)
            .with_status(remote.status)
            .with_form_data(remote.form_data)
            .with_category(default);
        draft.dhis2_event_id = Some(remote.remote_id);
        draft.source = RecordSource::Server;

        let created = self.store.create_with_id(id, draft).await?;
        tracing::debug!(inspection_id = %created.id, "pulled event adopted");
        Ok(())
    }

    async fn overwrite(
        &self,
        local: &Inspection,
        remote: RemoteInspection,
    ) -> Result<(), AppError> {
        let mut patch = InspectionPatch {
            org_unit: Some(remote.org_unit.clone()),
            org_unit_name: remote.org_unit_name.clone(),
            event_date: Some(remote.event_date),
            status: Some(remote.status),
            source: Some(RecordSource::Server),
            ..Default::default()
        };

        let matched_category = local
            .categories
            .find_by_remote_id(&remote.remote_id)
            .filter(|category| !category.key.is_default())
            .cloned();

        match matched_category {
            Some(mut category) => {
                let mut form_data = remote.form_data;
                strip_note_prefix(&mut form_data, &self.catalog, category.display_label());
                category.mark_pulled(Some(form_data), &remote.remote_id);
                patch.categories.push(category);
            }
            None => {
                let mut default = local
                    .categories
                    .get(&CategoryKey::default_key())
                    .cloned()
                    .unwrap_or_else(|| {
                        CategorySyncRecord::new(
                            CategoryKey::default_key(),
                            remote.form_data.clone(),
                        )
                    });
                default.mark_pulled(Some(remote.form_data.clone()), &remote.remote_id);
                patch.categories.push(default);
                patch.form_data = Some(remote.form_data);
                patch.dhis2_event_id = Some(remote.remote_id.clone());
            }
        }

        let updated = self.store.update(&local.id, patch).await?;
        tracing::debug!(
            inspection_id = %updated.id,
            remote_event_id = %remote.remote_id,
            sync_status = %updated.sync_status,
            "pulled event applied"
        );
        Ok(())
    }
}
