use crate::application::ports::inspection_store::InspectionStore;
use crate::application::ports::remote_tracker::RemoteTracker;
use crate::application::services::{
    InspectionService, PullService, PushService, SyncService,
};
use crate::application::shared::mappers::{FieldCatalog, TrackerProgram};
use crate::infrastructure::database::{ConnectionPool, SqliteInspectionStore};
use crate::infrastructure::remote::TrackerHttpClient;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Wired services of one running instance.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn InspectionStore>,
    pub inspection_service: Arc<InspectionService>,
    pub push_service: Arc<PushService>,
    pub pull_service: Arc<PullService>,
    pub sync_service: Arc<SyncService>,
    connectivity: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Opens the configured database and tracker client.
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Configuration)?;

        let pool = ConnectionPool::new(&config.database).await?;
        let store: Arc<dyn InspectionStore> = Arc::new(SqliteInspectionStore::open(pool).await?);
        let remote: Arc<dyn RemoteTracker> = Arc::new(TrackerHttpClient::new(&config.remote)?);

        Self::with_components(config, store, remote)
    }

    /// Wires services around an existing store and tracker.
    pub fn with_components(
        config: AppConfig,
        store: Arc<dyn InspectionStore>,
        remote: Arc<dyn RemoteTracker>,
    ) -> Result<Self, AppError> {
        let catalog = Arc::new(match &config.sync.field_catalog_path {
            Some(path) => FieldCatalog::from_json_file(path)?,
            None => FieldCatalog::default(),
        });
        let program = TrackerProgram {
            program: config.sync.program.clone(),
            program_stage: config.sync.program_stage.clone(),
        };

        let inspection_service = Arc::new(InspectionService::new(Arc::clone(&store)));
        let push_service = Arc::new(PushService::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            program,
            Arc::clone(&catalog),
        ));
        let pull_service = Arc::new(PullService::new(
            Arc::clone(&store),
            remote,
            catalog,
            config.sync.program.clone(),
            config.sync.pull_page_size,
            config.remote.org_unit_cache_size,
        ));
        let sync_service = Arc::new(SyncService::new(
            Arc::clone(&push_service),
            Arc::clone(&pull_service),
        ));
        let (connectivity, _) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            store,
            inspection_service,
            push_service,
            pull_service,
            sync_service,
            connectivity: Arc::new(connectivity),
        })
    }

    /// Reports the host's network state; going online triggers a push when
    /// `push_on_reconnect` is enabled.
    pub fn set_online(&self, online: bool) {
        self.connectivity.send_replace(online);
    }

    /// Starts the reconnect watcher and periodic sync as configured.
    pub fn start_background_sync(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if self.config.sync.push_on_reconnect {
            handles.push(
                self.sync_service
                    .spawn_connectivity_watch(self.connectivity.subscribe()),
            );
        }
        if self.config.sync.auto_sync {
            handles.push(
                self.sync_service
                    .schedule(Duration::from_secs(self.config.sync.sync_interval)),
            );
        }
        tracing::info!(tasks = handles.len(), "background sync started");
        handles
    }
}
