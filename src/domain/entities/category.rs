use crate::domain::value_objects::{CategoryKey, FormData, RemoteEventId, SyncStatus};
use serde::{Deserialize, Serialize};

/// One independently synchronized sub-record of an inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySyncRecord {
    pub key: CategoryKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub form_data: FormData,
    pub sync_status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_event_id: Option<RemoteEventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl CategorySyncRecord {
    pub fn new(key: CategoryKey, form_data: FormData) -> Self {
        Self {
            key,
            label: None,
            form_data,
            sync_status: SyncStatus::NotSynced,
            remote_event_id: None,
            last_error: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.key.as_str())
    }

    /// Local edit: the category needs to be pushed again.
    pub fn mark_edited(&mut self) {
        self.sync_status = SyncStatus::NotSynced;
        self.last_error = None;
    }

    /// Pull is authoritative for the snapshot it delivered.
    pub fn mark_pulled(&mut self, form_data: Option<FormData>, remote_event_id: &RemoteEventId) {
        if let Some(form_data) = form_data {
            self.form_data = form_data;
        }
        self.assign_remote_id(remote_event_id.clone());
        self.sync_status = SyncStatus::Synced;
        self.last_error = None;
    }

    /// Assigns the remote identifier once. Returns `false` when a different
    /// identifier is already in place; the existing one is kept.
    pub fn assign_remote_id(&mut self, remote_event_id: RemoteEventId) -> bool {
        match &self.remote_event_id {
            None => {
                self.remote_event_id = Some(remote_event_id);
                true
            }
            Some(existing) => existing == &remote_event_id,
        }
    }

    pub fn apply_push_outcome(&mut self, outcome: &CategoryPushOutcome) {
        // The inspector may have edited the category while the request was in flight.
        let unchanged = self.form_data == outcome.pushed_form;
        match &outcome.result {
            PushResult::Accepted { remote_event_id } => {
                self.assign_remote_id(remote_event_id.clone());
                self.last_error = None;
                self.sync_status = if unchanged {
                    SyncStatus::Synced
                } else {
                    SyncStatus::NotSynced
                };
            }
            PushResult::Rejected { error } => {
                self.last_error = Some(error.clone());
                self.sync_status = if unchanged {
                    SyncStatus::SyncFailed
                } else {
                    SyncStatus::NotSynced
                };
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushResult {
    Accepted { remote_event_id: RemoteEventId },
    Rejected { error: String },
}

/// Field-level edit of one category, merged into the stored state.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEdit {
    pub key: CategoryKey,
    pub label: Option<String>,
    pub fields: FormData,
}

/// Result of pushing one category, applied to the stored record atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPushOutcome {
    pub key: CategoryKey,
    pub label: Option<String>,
    /// Snapshot that was sent to the tracker.
    pub pushed_form: FormData,
    pub result: PushResult,
}

impl CategoryPushOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.result, PushResult::Accepted { .. })
    }
}

/// Ordered collection of an inspection's categories, keyed by [`CategoryKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap(Vec<CategorySyncRecord>);

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CategoryKey) -> Option<&CategorySyncRecord> {
        self.0.iter().find(|record| &record.key == key)
    }

    pub fn get_mut(&mut self, key: &CategoryKey) -> Option<&mut CategorySyncRecord> {
        self.0.iter_mut().find(|record| &record.key == key)
    }

    /// Replaces the entry with the same key in place, or appends it. An
    /// identifier already assigned to the stored entry is never dropped.
    pub fn upsert(&mut self, mut record: CategorySyncRecord) {
        match self.get_mut(&record.key) {
            Some(existing) => {
                if let Some(assigned) = existing.remote_event_id.take() {
                    record.remote_event_id = Some(assigned);
                }
                *existing = record;
            }
            None => self.0.push(record),
        }
    }

    /// Merges an inspector's edit into the stored category, creating it when
    /// absent, and reopens it for the next push.
    pub fn apply_edit(&mut self, edit: CategoryEdit) {
        if self.get(&edit.key).is_none() {
            self.0
                .push(CategorySyncRecord::new(edit.key.clone(), FormData::new()));
        }
        let Some(category) = self.get_mut(&edit.key) else {
            return;
        };
        category.form_data.merge(edit.fields);
        if let Some(label) = edit.label {
            category.label = Some(label);
        }
        category.mark_edited();
    }

    pub fn reopen_all(&mut self) {
        for category in self.0.iter_mut() {
            category.mark_edited();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategorySyncRecord> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CategorySyncRecord> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when at least one category other than the synthetic default exists.
    pub fn is_categorized(&self) -> bool {
        self.0.iter().any(|record| !record.key.is_default())
    }

    pub fn aggregate_status(&self) -> SyncStatus {
        SyncStatus::aggregate(self.statuses().into_iter().map(|(_, status)| status))
    }

    pub fn statuses(&self) -> Vec<(&CategoryKey, SyncStatus)> {
        self.0
            .iter()
            .map(|record| (&record.key, record.sync_status))
            .collect()
    }

    pub fn event_ids(&self) -> Vec<(&CategoryKey, &RemoteEventId)> {
        self.0
            .iter()
            .filter_map(|record| record.remote_event_id.as_ref().map(|id| (&record.key, id)))
            .collect()
    }

    pub fn find_by_remote_id(
        &self,
        remote_event_id: &RemoteEventId,
    ) -> Option<&CategorySyncRecord> {
        self.0
            .iter()
            .find(|record| record.remote_event_id.as_ref() == Some(remote_event_id))
    }

    /// Errors of failed categories, labelled, for display.
    pub fn failure_summary(&self) -> Option<String> {
        let messages: Vec<String> = self
            .0
            .iter()
            .filter(|record| record.sync_status == SyncStatus::SyncFailed)
            .filter_map(|record| {
                record
                    .last_error
                    .as_ref()
                    .map(|error| format!("{}: {}", record.display_label(), error))
            })
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    }
}

impl FromIterator<CategorySyncRecord> for CategoryMap {
    fn from_iter<T: IntoIterator<Item = CategorySyncRecord>>(iter: T) -> Self {
        let mut map = CategoryMap::new();
        for record in iter {
            map.upsert(record);
        }
        map
    }
}
