use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub(super) struct InspectionRow {
    pub id: String,
    pub org_unit: String,
    pub org_unit_name: String,
    pub event_date: String,
    pub status: String,
    pub sync_status: String,
    pub form_data: String,
    pub categories: String,
    pub dhis2_event_id: Option<String>,
    pub source: String,
    pub sync_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
