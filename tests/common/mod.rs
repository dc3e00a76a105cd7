#![allow(dead_code)]

pub mod fake_tracker;
pub mod intercepting_store;

use chrono::NaiveDate;
use field_inspection_sync::application::ports::inspection_store::InspectionStore;
use field_inspection_sync::application::ports::remote_tracker::{RemoteDataValue, RemoteRecord};
use field_inspection_sync::application::shared::mappers::FieldCatalog;
use field_inspection_sync::domain::entities::{CategorySyncRecord, NewInspection};
use field_inspection_sync::domain::value_objects::{
    CategoryKey, FormData, RemoteEventId, SyncStatus,
};
use field_inspection_sync::infrastructure::database::{ConnectionPool, SqliteInspectionStore};
use field_inspection_sync::{AppConfig, AppState};
use std::sync::Arc;

pub use fake_tracker::{FakeRemoteTracker, UpsertScript};
pub use intercepting_store::InterceptingStore;

pub const PROGRAM: &str = "IpHINAT79UW";
pub const PROGRAM_STAGE: &str = "A03MvHHogjR";
pub const ORG_UNIT: &str = "DiszpKrYNg8";
pub const ORG_UNIT_NAME: &str = "Ngelehun CHC";

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<dyn InspectionStore>,
    pub remote: Arc<FakeRemoteTracker>,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.program = PROGRAM.to_string();
    config.sync.program_stage = PROGRAM_STAGE.to_string();
    config.sync.auto_sync = false;
    config.sync.pull_page_size = 25;
    config
}

pub async fn open_memory_store() -> Arc<SqliteInspectionStore> {
    let pool = ConnectionPool::from_memory()
        .await
        .expect("in-memory sqlite");
    Arc::new(
        SqliteInspectionStore::open(pool)
            .await
            .expect("migrations apply"),
    )
}

pub async fn setup() -> TestContext {
    let store: Arc<dyn InspectionStore> = open_memory_store().await;
    let remote = Arc::new(FakeRemoteTracker::new());
    let state = AppState::with_components(test_config(), Arc::clone(&store), remote.clone())
        .expect("wire services");

    TestContext {
        state,
        store,
        remote,
    }
}

/// Like [`setup`], with the services talking to the store through an
/// [`InterceptingStore`].
pub async fn setup_intercepted() -> (TestContext, Arc<InterceptingStore>) {
    let inner: Arc<dyn InspectionStore> = open_memory_store().await;
    let intercepting = Arc::new(InterceptingStore::new(inner));
    let store: Arc<dyn InspectionStore> = intercepting.clone();
    let remote = Arc::new(FakeRemoteTracker::new());
    let state = AppState::with_components(test_config(), Arc::clone(&store), remote.clone())
        .expect("wire services");

    (
        TestContext {
            state,
            store,
            remote,
        },
        intercepting,
    )
}

pub fn event_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 14).expect("valid date")
}

pub fn key(value: &str) -> CategoryKey {
    CategoryKey::new(value.to_string()).expect("valid category key")
}

pub fn remote_id(value: &str) -> RemoteEventId {
    RemoteEventId::new(value.to_string()).expect("valid remote id")
}

pub fn data_element(field: &str) -> String {
    FieldCatalog::default()
        .data_element_for(field)
        .expect("field is in the default catalog")
        .to_string()
}

/// Uncategorized draft with `chairs = 5` and `textbooks = 0`.
pub fn flat_draft() -> NewInspection {
    NewInspection::new(ORG_UNIT, ORG_UNIT_NAME, event_date())
        .with_form_data(FormData::new().with("chairs", 5).with("textbooks", 0))
}

/// Category with the given status and, optionally, an identifier from an earlier push.
pub fn category(
    name: &str,
    label: &str,
    form_data: FormData,
    status: SyncStatus,
    remote: Option<&str>,
) -> CategorySyncRecord {
    let mut record = CategorySyncRecord::new(key(name), form_data).with_label(label);
    record.sync_status = status;
    record.remote_event_id = remote.map(remote_id);
    record
}

pub fn remote_record(event: &str, org_unit: &str, values: &[(&str, &str)]) -> RemoteRecord {
    RemoteRecord {
        event: event.to_string(),
        org_unit: org_unit.to_string(),
        occurred_at: Some("2024-04-02T00:00:00.000".to_string()),
        status: Some("COMPLETED".to_string()),
        data_values: values
            .iter()
            .map(|(field, value)| RemoteDataValue {
                data_element: data_element(field),
                value: serde_json::Value::String(value.to_string()),
            })
            .collect(),
    }
}

/// Polls `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
