use super::SqliteInspectionStore;
use crate::application::ports::inspection_store::StorageHealth;
use crate::shared::error::AppError;

impl SqliteInspectionStore {
    /// Probes the database without changing it: connectivity, page quota and
    /// whether a write lock could be taken right now.
    pub(super) async fn probe_health(&self) -> StorageHealth {
        let mut conn = match self.pool.get_pool().acquire().await {
            Ok(conn) => conn,
            Err(err) => return StorageHealth::Unsupported(err.to_string()),
        };

        if let Err(err) = sqlx::query("SELECT 1").execute(&mut *conn).await {
            return health_from_error(AppError::from(err));
        }

        let page_count = sqlx::query_scalar::<_, i64>("PRAGMA page_count")
            .fetch_one(&mut *conn)
            .await;
        let max_page_count = sqlx::query_scalar::<_, i64>("PRAGMA max_page_count")
            .fetch_one(&mut *conn)
            .await;
        if let (Ok(page_count), Ok(max_page_count)) = (page_count, max_page_count) {
            if max_page_count > 0 && page_count >= max_page_count {
                return StorageHealth::QuotaExceeded(format!(
                    "database uses {page_count} of {max_page_count} pages"
                ));
            }
        }

        match sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await {
            Ok(_) => {
                if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    tracing::warn!(error = %err, "failed to release storage probe lock");
                }
                StorageHealth::Ok
            }
            Err(err) => health_from_error(AppError::from(err)),
        }
    }
}

fn health_from_error(err: AppError) -> StorageHealth {
    match err {
        AppError::StorageBlocked(reason) => StorageHealth::Blocked(reason),
        AppError::StorageQuotaExceeded(reason) => StorageHealth::QuotaExceeded(reason),
        other => StorageHealth::Unsupported(other.to_string()),
    }
}
