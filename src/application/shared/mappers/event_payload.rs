use super::field_catalog::FieldCatalog;
use crate::application::ports::remote_tracker::{RemoteDataValue, RemoteEventPayload};
use crate::domain::entities::{CategorySyncRecord, Inspection};
use crate::domain::value_objects::FormData;
use serde_json::Value;

/// Program and stage every pushed event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerProgram {
    pub program: String,
    pub program_stage: String,
}

/// Builds the tracker event for one category of an inspection.
///
/// Only non-zero/non-empty fields with a known data element are sent, so
/// defaults never overwrite values entered on other devices.
pub fn build_event_payload(
    inspection: &Inspection,
    category: &CategorySyncRecord,
    categorized: bool,
    program: &TrackerProgram,
    catalog: &FieldCatalog,
) -> RemoteEventPayload {
    let data_values = category
        .form_data
        .meaningful_fields()
        .filter_map(|(key, rendered)| {
            let Some(data_element) = catalog.data_element_for(key) else {
                tracing::trace!(field = key, "no data element mapped, field not sent");
                return None;
            };
            let value = if categorized && catalog.note_key() == Some(key) {
                format!("[{}] {}", category.display_label(), rendered)
            } else {
                rendered
            };
            Some(RemoteDataValue {
                data_element: data_element.to_string(),
                value: Value::String(value),
            })
        })
        .collect();

    RemoteEventPayload {
        event: category
            .remote_event_id
            .as_ref()
            .map(|id| id.as_str().to_string()),
        program: program.program.clone(),
        program_stage: program.program_stage.clone(),
        org_unit: inspection.org_unit.clone(),
        occurred_at: inspection.event_date.format("%Y-%m-%d").to_string(),
        status: inspection.status.tracker_status().to_string(),
        data_values,
    }
}

/// Removes the `[label] ` prefix a categorized push put on the note field.
pub fn strip_note_prefix(form_data: &mut FormData, catalog: &FieldCatalog, label: &str) {
    let Some(note_key) = catalog.note_key() else {
        return;
    };
    let prefix = format!("[{label}] ");
    let stripped = match form_data.get(note_key) {
        Some(Value::String(note)) => note.strip_prefix(&prefix).map(str::to_string),
        _ => None,
    };
    if let Some(stripped) = stripped {
        form_data.insert(note_key, stripped);
    }
}
