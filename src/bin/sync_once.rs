use anyhow::Context;
use field_inspection_sync::{AppConfig, AppState, init_logging};
use tracing::info;

/// Pulls the latest tracker events, then pushes pending local inspections.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env();
    let state = AppState::new(config)
        .await
        .context("failed to initialise inspection sync")?;

    let health = state.store.health_check().await;
    if !health.is_ok() {
        anyhow::bail!("local storage is not usable: {health:?}");
    }

    let pulled = state.sync_service.pull_now().await.context("pull failed")?;
    info!(
        fetched = pulled.fetched,
        created = pulled.created,
        updated = pulled.updated,
        skipped = pulled.skipped,
        "pull complete"
    );

    let pushed = state.sync_service.sync_now().await.context("push failed")?;
    info!(
        attempted = pushed.attempted,
        synced = pushed.synced,
        failed = pushed.failed,
        "push complete"
    );

    if pushed.failed > 0 {
        for inspection in state.inspection_service.list_recent(100).await? {
            if let Some(error) = &inspection.sync_error {
                info!(inspection_id = %inspection.id, %error, "inspection failed to sync");
            }
        }
    }

    Ok(())
}
