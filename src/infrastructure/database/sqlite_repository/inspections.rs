use super::SqliteInspectionStore;
use super::mapper::{format_date, map_inspection_row, map_inspection_rows, now_millis};
use super::queries::{
    BEGIN_WRITE, DELETE_INSPECTION, INSERT_INSPECTION, SELECT_BY_REMOTE_IDENTIFIER,
    SELECT_INSPECTION_BY_ID, SELECT_INSPECTIONS_BY_DHIS2_EVENT_ID,
    SELECT_INSPECTIONS_BY_EVENT_DATE, SELECT_INSPECTIONS_BY_ORG_UNIT,
    SELECT_INSPECTIONS_BY_STATUS, SELECT_INSPECTIONS_BY_SYNC_STATUS, SELECT_PENDING_SYNC,
    SELECT_RECENT_INSPECTIONS, UPDATE_INSPECTION,
};
use super::rows::InspectionRow;
use crate::application::ports::inspection_store::{IndexQuery, InspectionStore, StorageHealth};
use crate::domain::entities::{Inspection, InspectionPatch, NewInspection};
use crate::domain::value_objects::{InspectionId, RemoteEventId};
use crate::shared::change_signal::ChangeSubscription;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::{Executor, Sqlite, Transaction};

impl SqliteInspectionStore {
    async fn insert<'e, E>(executor: E, inspection: &Inspection) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(INSERT_INSPECTION)
            .bind(inspection.id.as_str())
            .bind(&inspection.org_unit)
            .bind(&inspection.org_unit_name)
            .bind(format_date(&inspection.event_date))
            .bind(inspection.status.as_str())
            .bind(inspection.sync_status.as_str())
            .bind(serde_json::to_string(&inspection.form_data)?)
            .bind(serde_json::to_string(&inspection.categories)?)
            .bind(inspection.dhis2_event_id.as_ref().map(|id| id.as_str()))
            .bind(inspection.source.as_str())
            .bind(inspection.sync_error.as_deref())
            .bind(inspection.created_at.timestamp_millis())
            .bind(inspection.updated_at.timestamp_millis())
            .execute(executor)
            .await?;
        Ok(())
    }

    async fn write_back<'e, E>(executor: E, inspection: &Inspection) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(UPDATE_INSPECTION)
            .bind(inspection.id.as_str())
            .bind(&inspection.org_unit)
            .bind(&inspection.org_unit_name)
            .bind(format_date(&inspection.event_date))
            .bind(inspection.status.as_str())
            .bind(inspection.sync_status.as_str())
            .bind(serde_json::to_string(&inspection.form_data)?)
            .bind(serde_json::to_string(&inspection.categories)?)
            .bind(inspection.dhis2_event_id.as_ref().map(|id| id.as_str()))
            .bind(inspection.source.as_str())
            .bind(inspection.sync_error.as_deref())
            .bind(inspection.updated_at.timestamp_millis())
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Takes the write lock up front so concurrent writers queue on the busy
    /// timeout instead of failing when a read lock is upgraded.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.get_pool().begin_with(BEGIN_WRITE).await?)
    }

    async fn create_record(
        &self,
        id: InspectionId,
        draft: NewInspection,
    ) -> Result<Inspection, AppError> {
        draft.validate().map_err(AppError::InvalidInput)?;
        let inspection = Inspection::from_new(id, draft, now_millis());

        let mut tx = self.begin_write().await?;
        Self::insert(&mut *tx, &inspection).await?;
        tx.commit().await?;

        tracing::debug!(
            inspection_id = %inspection.id,
            source = %inspection.source,
            "inspection created"
        );
        self.notifier.notify();
        Ok(inspection)
    }

    async fn fetch_by(
        &self,
        query: &'static str,
        value: String,
    ) -> Result<Vec<Inspection>, AppError> {
        let rows = sqlx::query_as::<_, InspectionRow>(query)
            .bind(value)
            .fetch_all(self.pool.get_pool())
            .await?;
        map_inspection_rows(rows)
    }
}

#[async_trait]
impl InspectionStore for SqliteInspectionStore {
    async fn create(&self, draft: NewInspection) -> Result<Inspection, AppError> {
        self.create_record(InspectionId::generate(), draft).await
    }

    async fn create_with_id(
        &self,
        id: InspectionId,
        draft: NewInspection,
    ) -> Result<Inspection, AppError> {
        self.create_record(id, draft).await
    }

    async fn get(&self, id: &InspectionId) -> Result<Option<Inspection>, AppError> {
        let row = sqlx::query_as::<_, InspectionRow>(SELECT_INSPECTION_BY_ID)
            .bind(id.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;

        row.map(map_inspection_row).transpose()
    }

    async fn update(
        &self,
        id: &InspectionId,
        patch: InspectionPatch,
    ) -> Result<Inspection, AppError> {
        let mut tx = self.begin_write().await?;

        let row = sqlx::query_as::<_, InspectionRow>(SELECT_INSPECTION_BY_ID)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(AppError::RecordNotFound(id.to_string()));
        };

        let mut inspection = map_inspection_row(row)?;
        inspection.apply_patch(patch, now_millis());
        Self::write_back(&mut *tx, &inspection).await?;
        tx.commit().await?;

        tracing::debug!(
            inspection_id = %inspection.id,
            sync_status = %inspection.sync_status,
            "inspection updated"
        );
        self.notifier.notify();
        Ok(inspection)
    }

    async fn delete(&self, id: &InspectionId) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_INSPECTION)
            .bind(id.as_str())
            .execute(self.pool.get_pool())
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(inspection_id = %id, "inspection deleted");
            self.notifier.notify();
        }
        Ok(())
    }

    async fn query_by_index(&self, query: IndexQuery) -> Result<Vec<Inspection>, AppError> {
        match query {
            IndexQuery::OrgUnit(org_unit) => {
                self.fetch_by(SELECT_INSPECTIONS_BY_ORG_UNIT, org_unit).await
            }
            IndexQuery::EventDate(date) => {
                self.fetch_by(SELECT_INSPECTIONS_BY_EVENT_DATE, format_date(&date))
                    .await
            }
            IndexQuery::Status(status) => {
                self.fetch_by(SELECT_INSPECTIONS_BY_STATUS, status.as_str().to_string())
                    .await
            }
            IndexQuery::SyncStatus(status) => {
                self.fetch_by(SELECT_INSPECTIONS_BY_SYNC_STATUS, status.as_str().to_string())
                    .await
            }
            IndexQuery::Dhis2EventId(remote_id) => {
                self.fetch_by(SELECT_INSPECTIONS_BY_DHIS2_EVENT_ID, remote_id.into())
                    .await
            }
        }
    }

    async fn list_pending_sync(&self) -> Result<Vec<Inspection>, AppError> {
        let rows = sqlx::query_as::<_, InspectionRow>(SELECT_PENDING_SYNC)
            .fetch_all(self.pool.get_pool())
            .await?;
        map_inspection_rows(rows)
    }

    async fn find_by_remote_identifier(
        &self,
        remote_id: &RemoteEventId,
    ) -> Result<Option<Inspection>, AppError> {
        let row = sqlx::query_as::<_, InspectionRow>(SELECT_BY_REMOTE_IDENTIFIER)
            .bind(remote_id.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;

        row.map(map_inspection_row).transpose()
    }

    async fn list(&self, limit: u32) -> Result<Vec<Inspection>, AppError> {
        let rows = sqlx::query_as::<_, InspectionRow>(SELECT_RECENT_INSPECTIONS)
            .bind(i64::from(limit))
            .fetch_all(self.pool.get_pool())
            .await?;
        map_inspection_rows(rows)
    }

    async fn health_check(&self) -> StorageHealth {
        self.probe_health().await
    }

    fn subscribe(&self) -> ChangeSubscription {
        self.notifier.subscribe()
    }
}
