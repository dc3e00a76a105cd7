use super::rows::InspectionRow;
use crate::domain::entities::{CategoryMap, Inspection};
use crate::domain::value_objects::{
    FormData, InspectionId, InspectionStatus, RecordSource, RemoteEventId, SyncStatus,
};
use crate::shared::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current time at the millisecond precision the store persists.
pub(super) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub(super) fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(super) fn map_inspection_row(row: InspectionRow) -> Result<Inspection, AppError> {
    let corrupt = |field: &str, err: String| {
        AppError::Database(format!("inspection {} has invalid {field}: {err}", row.id))
    };

    let form_data: FormData = serde_json::from_str(&row.form_data)
        .map_err(|err| corrupt("form_data", err.to_string()))?;
    let categories: CategoryMap = serde_json::from_str(&row.categories)
        .map_err(|err| corrupt("categories", err.to_string()))?;
    let event_date = NaiveDate::parse_from_str(&row.event_date, DATE_FORMAT)
        .map_err(|err| corrupt("event_date", err.to_string()))?;
    let status: InspectionStatus = row.status.parse().map_err(|err| corrupt("status", err))?;
    let sync_status: SyncStatus = row
        .sync_status
        .parse()
        .map_err(|err| corrupt("sync_status", err))?;
    let source: RecordSource = row.source.parse().map_err(|err| corrupt("source", err))?;
    let dhis2_event_id = row
        .dhis2_event_id
        .clone()
        .map(RemoteEventId::new)
        .transpose()
        .map_err(|err| corrupt("dhis2_event_id", err))?;
    let id = InspectionId::new(row.id.clone()).map_err(|err| corrupt("id", err))?;

    Ok(Inspection {
        id,
        org_unit: row.org_unit,
        org_unit_name: row.org_unit_name,
        event_date,
        status,
        sync_status,
        form_data,
        categories,
        dhis2_event_id,
        source,
        sync_error: row.sync_error,
        created_at: DateTime::from_timestamp_millis(row.created_at).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(row.updated_at).unwrap_or_else(Utc::now),
    })
}

pub(super) fn map_inspection_rows(rows: Vec<InspectionRow>) -> Result<Vec<Inspection>, AppError> {
    rows.into_iter().map(map_inspection_row).collect()
}
