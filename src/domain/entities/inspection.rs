use super::category::{CategoryEdit, CategoryMap, CategoryPushOutcome, CategorySyncRecord};
use crate::domain::value_objects::{
    CategoryKey, FormData, InspectionId, InspectionStatus, RecordSource, RemoteEventId, SyncStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: InspectionId,
    pub org_unit: String,
    pub org_unit_name: String,
    pub event_date: NaiveDate,
    pub status: InspectionStatus,
    /// Derived from `categories`; see [`Inspection::recompute_sync_status`].
    pub sync_status: SyncStatus,
    pub form_data: FormData,
    pub categories: CategoryMap,
    pub dhis2_event_id: Option<RemoteEventId>,
    pub source: RecordSource,
    pub sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInspection {
    pub org_unit: String,
    pub org_unit_name: String,
    pub event_date: NaiveDate,
    pub status: InspectionStatus,
    pub form_data: FormData,
    pub categories: CategoryMap,
    pub dhis2_event_id: Option<RemoteEventId>,
    pub source: RecordSource,
}

impl NewInspection {
    pub fn new(
        org_unit: impl Into<String>,
        org_unit_name: impl Into<String>,
        event_date: NaiveDate,
    ) -> Self {
        Self {
            org_unit: org_unit.into(),
            org_unit_name: org_unit_name.into(),
            event_date,
            status: InspectionStatus::Scheduled,
            form_data: FormData::new(),
            categories: CategoryMap::new(),
            dhis2_event_id: None,
            source: RecordSource::Local,
        }
    }

    pub fn with_status(mut self, status: InspectionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_form_data(mut self, form_data: FormData) -> Self {
        self.form_data = form_data;
        self
    }

    pub fn with_category(mut self, category: CategorySyncRecord) -> Self {
        self.categories.upsert(category);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.org_unit.trim().is_empty() {
            return Err("Inspection org unit cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Field-level merge applied by the store inside one transaction.
///
/// `None` leaves a field untouched. `categories` are upserted by key, while
/// `category_edits`, `reopen_all_categories` and `push_outcomes` are applied
/// against the stored state, not a stale copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionPatch {
    pub org_unit: Option<String>,
    pub org_unit_name: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub status: Option<InspectionStatus>,
    pub form_data: Option<FormData>,
    pub categories: Vec<CategorySyncRecord>,
    pub category_edits: Vec<CategoryEdit>,
    /// Status and date travel with every category's event.
    pub reopen_all_categories: bool,
    pub push_outcomes: Vec<CategoryPushOutcome>,
    /// Event header the outcomes were pushed with.
    pub pushed_as: Option<PushedEvent>,
    pub dhis2_event_id: Option<RemoteEventId>,
    pub source: Option<RecordSource>,
}

/// Inspection-level fields carried by every pushed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushedEvent {
    pub status: InspectionStatus,
    pub event_date: NaiveDate,
}

impl PushedEvent {
    pub fn of(inspection: &Inspection) -> Self {
        Self {
            status: inspection.status,
            event_date: inspection.event_date,
        }
    }
}

impl Inspection {
    pub fn from_new(id: InspectionId, draft: NewInspection, now: DateTime<Utc>) -> Self {
        let mut inspection = Self {
            id,
            org_unit: draft.org_unit,
            org_unit_name: draft.org_unit_name,
            event_date: draft.event_date,
            status: draft.status,
            sync_status: SyncStatus::NotSynced,
            form_data: draft.form_data,
            categories: draft.categories,
            dhis2_event_id: draft.dhis2_event_id,
            source: draft.source,
            sync_error: None,
            created_at: now,
            updated_at: now,
        };
        inspection.recompute_sync_status();
        inspection
    }

    pub fn is_categorized(&self) -> bool {
        self.categories.is_categorized()
    }

    /// Categories a push has to consider. Without explicit categorization
    /// this is a single synthetic `default` category over `form_data`.
    pub fn sync_units(&self) -> Vec<CategorySyncRecord> {
        if !self.categories.is_empty() {
            return self.categories.iter().cloned().collect();
        }
        let mut default =
            CategorySyncRecord::new(CategoryKey::default_key(), self.form_data.clone());
        default.remote_event_id = self.dhis2_event_id.clone();
        default.sync_status = self.sync_status;
        vec![default]
    }

    pub fn recompute_sync_status(&mut self) {
        self.sync_status = self.categories.aggregate_status();
        self.sync_error = self.categories.failure_summary();
    }

    pub fn apply_patch(&mut self, patch: InspectionPatch, now: DateTime<Utc>) {
        let event_unchanged = patch
            .pushed_as
            .map_or(true, |pushed| pushed == PushedEvent::of(self));

        if let Some(org_unit) = patch.org_unit {
            self.org_unit = org_unit;
        }
        if let Some(org_unit_name) = patch.org_unit_name {
            self.org_unit_name = org_unit_name;
        }
        if let Some(event_date) = patch.event_date {
            self.event_date = event_date;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(form_data) = patch.form_data {
            self.replace_flat_form(form_data);
        }
        if let Some(source) = patch.source {
            self.source = source;
        }
        if let Some(remote_id) = patch.dhis2_event_id {
            self.adopt_inspection_remote_id(remote_id);
        }

        for category in patch.categories {
            self.categories.upsert(category);
        }

        for edit in patch.category_edits {
            self.apply_edit(edit);
        }

        if patch.reopen_all_categories {
            self.categories.reopen_all();
        }

        for outcome in &patch.push_outcomes {
            self.apply_push_outcome(outcome, event_unchanged);
        }

        self.recompute_sync_status();
        self.updated_at = now;
    }

    /// The flat form doubles as the default category's snapshot, so an edit
    /// of an uncategorized record puts that category back to `not_synced`.
    fn replace_flat_form(&mut self, form_data: FormData) {
        let changed = self.form_data != form_data;
        self.form_data = form_data;
        if !changed || self.is_categorized() {
            return;
        }
        if let Some(default) = self.categories.get_mut(&CategoryKey::default_key()) {
            default.form_data = self.form_data.clone();
            default.mark_edited();
        }
    }

    fn apply_edit(&mut self, edit: CategoryEdit) {
        if edit.key.is_default() && !self.is_categorized() {
            let mut form_data = self.form_data.clone();
            form_data.merge(edit.fields);
            self.replace_flat_form(form_data);
            return;
        }
        self.categories.apply_edit(edit);
    }

    fn apply_push_outcome(&mut self, outcome: &CategoryPushOutcome, event_unchanged: bool) {
        if self.categories.get(&outcome.key).is_none() {
            // First push of an uncategorized record materializes its default
            // category from the current flat form, which may have moved on.
            let form_data = if outcome.key.is_default() {
                self.form_data.clone()
            } else {
                outcome.pushed_form.clone()
            };
            let mut record = CategorySyncRecord::new(outcome.key.clone(), form_data);
            record.label = outcome.label.clone();
            record.remote_event_id = if outcome.key.is_default() {
                self.dhis2_event_id.clone()
            } else {
                None
            };
            self.categories.upsert(record);
        }

        let Some(category) = self.categories.get_mut(&outcome.key) else {
            return;
        };
        category.apply_push_outcome(outcome);
        if !event_unchanged && category.sync_status == SyncStatus::Synced {
            // Status or date moved while the request was in flight.
            category.sync_status = SyncStatus::NotSynced;
        }
        let remote_id = category.remote_event_id.clone();

        let sole_or_default = outcome.key.is_default() || self.categories.len() == 1;
        if sole_or_default {
            if let Some(remote_id) = remote_id {
                self.adopt_inspection_remote_id(remote_id);
            }
        }
    }

    fn adopt_inspection_remote_id(&mut self, remote_id: RemoteEventId) {
        if self.dhis2_event_id.is_none() {
            self.dhis2_event_id = Some(remote_id);
        }
    }
}
