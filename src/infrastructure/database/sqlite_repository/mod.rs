use super::ConnectionPool;
use crate::shared::change_signal::ChangeNotifier;
use crate::shared::error::AppError;

mod health;
mod inspections;
mod mapper;
mod queries;
mod rows;

#[cfg(test)]
mod tests;

/// SQLite-backed inspection store. One transaction per mutation; committed
/// mutations fire the store's change signal.
pub struct SqliteInspectionStore {
    pool: ConnectionPool,
    notifier: ChangeNotifier,
}

impl SqliteInspectionStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Opens the store and applies pending schema upgrades.
    pub async fn open(pool: ConnectionPool) -> Result<Self, AppError> {
        let store = Self::new(pool);
        store.initialize().await?;
        Ok(store)
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        self.pool.migrate().await?;
        Ok(())
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}
