use super::field_catalog::FieldCatalog;
use crate::application::ports::remote_tracker::RemoteRecord;
use crate::domain::value_objects::{FormData, InspectionStatus, RemoteEventId};
use chrono::NaiveDate;
use serde_json::{Number, Value};
use std::collections::HashMap;

/// A tracker event translated into the local record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteInspection {
    pub remote_id: RemoteEventId,
    pub org_unit: String,
    /// `None` when the name could not be resolved.
    pub org_unit_name: Option<String>,
    pub event_date: NaiveDate,
    pub status: InspectionStatus,
    pub form_data: FormData,
}

pub fn map_remote_record(
    record: &RemoteRecord,
    catalog: &FieldCatalog,
    org_unit_names: &HashMap<String, String>,
) -> Result<RemoteInspection, String> {
    let remote_id = RemoteEventId::new(record.event.clone())?;
    let occurred_at = record
        .occurred_at
        .as_deref()
        .ok_or_else(|| format!("event {} has no occurredAt", record.event))?;
    let event_date = parse_event_date(occurred_at)
        .ok_or_else(|| format!("event {} has invalid occurredAt {occurred_at}", record.event))?;

    let form_data = record
        .data_values
        .iter()
        .filter_map(|data_value| {
            let key = catalog.key_for(&data_value.data_element)?;
            let value = if catalog.note_key() == Some(key) {
                data_value.value.clone()
            } else {
                local_value(&data_value.value)
            };
            Some((key.to_string(), value))
        })
        .collect();

    Ok(RemoteInspection {
        remote_id,
        org_unit: record.org_unit.clone(),
        org_unit_name: org_unit_names.get(&record.org_unit).cloned(),
        event_date,
        status: record
            .status
            .as_deref()
            .map(InspectionStatus::from_tracker_status)
            .unwrap_or_default(),
        form_data,
    })
}

// The tracker reports timestamps like `2024-03-14T00:00:00.000`.
fn parse_event_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Tracker values are strings; restore numbers and booleans for the form.
/// Only canonical renderings convert, so codes like `007` stay text.
fn local_value(value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    if let Ok(integer) = text.parse::<i64>() {
        if integer.to_string() == *text {
            return Value::Number(integer.into());
        }
    }
    if let Ok(float) = text.parse::<f64>() {
        if float.to_string() == *text {
            if let Some(number) = Number::from_f64(float) {
                return Value::Number(number);
            }
        }
    }
    match text.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => value.clone(),
    }
}
