use super::pull_service::{PullService, PullSummary};
use super::push_service::{PushService, PushSummary};
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SyncState {
    pub is_syncing: bool,
    pub last_push: Option<PushSummary>,
    pub last_pull: Option<PullSummary>,
    pub last_sync: Option<i64>,
    pub sync_errors: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(PushSummary),
    /// A push was already running; nothing was queued.
    Skipped,
}

/// Decides when push and pull run: on demand, after reconnecting, or on a timer.
#[derive(Clone)]
pub struct SyncService {
    push: Arc<PushService>,
    pull: Arc<PullService>,
    status: Arc<RwLock<SyncState>>,
}

impl SyncService {
    pub fn new(push: Arc<PushService>, pull: Arc<PullService>) -> Self {
        Self {
            push,
            pull,
            status: Arc::new(RwLock::new(SyncState::default())),
        }
    }

    /// Manual push. Waits for a running push instead of skipping.
    pub async fn sync_now(&self) -> Result<PushSummary, AppError> {
        let result = self.push.push_pending().await;
        self.record_push(&result).await;
        result
    }

    /// Automatic push, suppressed while another push is in flight.
    pub async fn trigger_auto(&self) -> Result<TriggerOutcome, AppError> {
        match self.push.try_push_pending().await {
            None => {
                tracing::debug!("push already running, automatic trigger skipped");
                Ok(TriggerOutcome::Skipped)
            }
            Some(result) => {
                self.record_push(&result).await;
                result.map(TriggerOutcome::Completed)
            }
        }
    }

    pub async fn pull_now(&self) -> Result<PullSummary, AppError> {
        let result = self.pull.pull_latest().await;
        let mut status = self.status.write().await;
        match &result {
            Ok(summary) => {
                status.last_pull = Some(*summary);
                status.last_sync = Some(chrono::Utc::now().timestamp());
            }
            Err(_) => status.sync_errors += 1,
        }
        result
    }

    /// Pushes on every offline to online transition of `connectivity`.
    pub fn spawn_connectivity_watch(
        &self,
        mut connectivity: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        let mut online = *connectivity.borrow_and_update();
        tokio::spawn(async move {
            while connectivity.changed().await.is_ok() {
                let now_online = *connectivity.borrow_and_update();
                let reconnected = now_online && !online;
                online = now_online;
                if !reconnected {
                    continue;
                }

                tracing::info!("connectivity restored, pushing pending inspections");
                if let Err(e) = service.trigger_auto().await {
                    tracing::error!("Sync error after reconnect: {}", e);
                }
            }
        })
    }

    /// Periodic pull followed by an automatic push.
    pub fn schedule(&self, interval: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if let Err(e) = service.pull_now().await {
                    tracing::error!("Scheduled pull error: {}", e);
                }
                if let Err(e) = service.trigger_auto().await {
                    tracing::error!("Scheduled push error: {}", e);
                }
            }
        })
    }

    pub async fn status(&self) -> SyncState {
        let mut state = self.status.read().await.clone();
        state.is_syncing = self.push.is_running() || self.pull.is_running();
        state
    }

    pub async fn reset_errors(&self) {
        self.status.write().await.sync_errors = 0;
    }

    async fn record_push(&self, result: &Result<PushSummary, AppError>) {
        let mut status = self.status.write().await;
        match result {
            Ok(summary) => {
                status.last_push = Some(*summary);
                status.last_sync = Some(chrono::Utc::now().timestamp());
            }
            Err(_) => status.sync_errors += 1,
        }
    }
}
