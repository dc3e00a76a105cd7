pub(super) const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

pub(super) const INSERT_INSPECTION: &str = r#"
    INSERT INTO inspections (
        id,
        org_unit,
        org_unit_name,
        event_date,
        status,
        sync_status,
        form_data,
        categories,
        dhis2_event_id,
        source,
        sync_error,
        created_at,
        updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#;

pub(super) const UPDATE_INSPECTION: &str = r#"
    UPDATE inspections
    SET org_unit = ?2,
        org_unit_name = ?3,
        event_date = ?4,
        status = ?5,
        sync_status = ?6,
        form_data = ?7,
        categories = ?8,
        dhis2_event_id = ?9,
        source = ?10,
        sync_error = ?11,
        updated_at = ?12
    WHERE id = ?1
"#;

pub(super) const DELETE_INSPECTION: &str = r#"
    DELETE FROM inspections
    WHERE id = ?1
"#;

pub(super) const SELECT_INSPECTION_BY_ID: &str = r#"
    SELECT * FROM inspections
    WHERE id = ?1
"#;

pub(super) const SELECT_INSPECTIONS_BY_ORG_UNIT: &str = r#"
    SELECT * FROM inspections
    WHERE org_unit = ?1
    ORDER BY event_date DESC, created_at DESC
"#;

pub(super) const SELECT_INSPECTIONS_BY_EVENT_DATE: &str = r#"
    SELECT * FROM inspections
    WHERE event_date = ?1
    ORDER BY created_at DESC
"#;

pub(super) const SELECT_INSPECTIONS_BY_STATUS: &str = r#"
    SELECT * FROM inspections
    WHERE status = ?1
    ORDER BY event_date DESC, created_at DESC
"#;

pub(super) const SELECT_INSPECTIONS_BY_SYNC_STATUS: &str = r#"
    SELECT * FROM inspections
    WHERE sync_status = ?1
    ORDER BY created_at ASC
"#;

pub(super) const SELECT_INSPECTIONS_BY_DHIS2_EVENT_ID: &str = r#"
    SELECT * FROM inspections
    WHERE dhis2_event_id = ?1
"#;

pub(super) const SELECT_PENDING_SYNC: &str = r#"
    SELECT * FROM inspections
    WHERE sync_status IN ('not_synced', 'sync_failed')
    ORDER BY created_at ASC, rowid ASC
"#;

pub(super) const SELECT_BY_REMOTE_IDENTIFIER: &str = r#"
    SELECT * FROM inspections
    WHERE id = ?1
       OR dhis2_event_id = ?1
       OR EXISTS (
            SELECT 1
            FROM json_each(inspections.categories) AS category
            WHERE json_extract(category.value, '$.remote_event_id') = ?1
       )
    ORDER BY CASE
        WHEN id = ?1 THEN 0
        WHEN dhis2_event_id = ?1 THEN 1
        ELSE 2
    END
    LIMIT 1
"#;

pub(super) const SELECT_RECENT_INSPECTIONS: &str = r#"
    SELECT * FROM inspections
    ORDER BY updated_at DESC
    LIMIT ?1
"#;
