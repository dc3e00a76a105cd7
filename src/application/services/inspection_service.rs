use crate::application::ports::inspection_store::{IndexQuery, InspectionStore};
use crate::domain::entities::{CategoryEdit, Inspection, InspectionPatch, NewInspection};
use crate::domain::value_objects::{CategoryKey, FormData, InspectionId, InspectionStatus};
use crate::shared::error::AppError;
use chrono::NaiveDate;
use std::sync::Arc;

/// Fields entered by the inspector for the flat form or one category.
#[derive(Debug, Clone, PartialEq)]
pub struct FormEdit {
    pub category: Option<CategoryKey>,
    pub label: Option<String>,
    pub fields: FormData,
}

impl FormEdit {
    pub fn flat(fields: FormData) -> Self {
        Self {
            category: None,
            label: None,
            fields,
        }
    }

    pub fn category(key: CategoryKey, fields: FormData) -> Self {
        Self {
            category: Some(key),
            label: None,
            fields,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Local-only operations collaborators use to capture and edit inspections.
pub struct InspectionService {
    store: Arc<dyn InspectionStore>,
}

impl InspectionService {
    pub fn new(store: Arc<dyn InspectionStore>) -> Self {
        Self { store }
    }

    pub async fn create_inspection(&self, draft: NewInspection) -> Result<Inspection, AppError> {
        self.store.create(draft).await
    }

    pub async fn get(&self, id: &InspectionId) -> Result<Option<Inspection>, AppError> {
        self.store.get(id).await
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Inspection>, AppError> {
        self.store.list(limit).await
    }

    pub async fn list_by_org_unit(&self, org_unit: &str) -> Result<Vec<Inspection>, AppError> {
        self.store
            .query_by_index(IndexQuery::OrgUnit(org_unit.to_string()))
            .await
    }

    pub async fn delete_inspection(&self, id: &InspectionId) -> Result<(), AppError> {
        self.store.delete(id).await
    }

    /// Merges the edited fields and marks the touched category `not_synced`.
    /// The merge runs against the stored record inside the store's write, so
    /// an identifier assigned by a concurrent push is kept.
    pub async fn edit_form(
        &self,
        id: &InspectionId,
        edit: FormEdit,
    ) -> Result<Inspection, AppError> {
        let key = edit.category.unwrap_or_else(CategoryKey::default_key);
        let patch = InspectionPatch {
            category_edits: vec![CategoryEdit {
                key: key.clone(),
                label: edit.label,
                fields: edit.fields,
            }],
            ..Default::default()
        };

        let updated = self.store.update(id, patch).await?;
        tracing::debug!(inspection_id = %id, category = %key, "form edited");
        Ok(updated)
    }

    pub async fn set_status(
        &self,
        id: &InspectionId,
        status: InspectionStatus,
    ) -> Result<Inspection, AppError> {
        let patch = InspectionPatch {
            status: Some(status),
            reopen_all_categories: true,
            ..Default::default()
        };
        self.store.update(id, patch).await
    }

    pub async fn reschedule(
        &self,
        id: &InspectionId,
        event_date: NaiveDate,
    ) -> Result<Inspection, AppError> {
        let patch = InspectionPatch {
            event_date: Some(event_date),
            reopen_all_categories: true,
            ..Default::default()
        };
        self.store.update(id, patch).await
    }
}
