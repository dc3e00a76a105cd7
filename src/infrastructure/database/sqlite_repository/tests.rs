use super::SqliteInspectionStore;
use crate::application::ports::inspection_store::{IndexQuery, InspectionStore, StorageHealth};
use crate::domain::entities::{CategorySyncRecord, InspectionPatch, NewInspection};
use crate::domain::value_objects::{
    CategoryKey, FormData, InspectionId, InspectionStatus, RecordSource, RemoteEventId, SyncStatus,
};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::config::DatabaseConfig;
use crate::shared::error::AppError;
use chrono::NaiveDate;
use serde_json::json;

async fn setup_store() -> SqliteInspectionStore {
    let pool = ConnectionPool::from_memory()
        .await
        .expect("in-memory sqlite");
    SqliteInspectionStore::open(pool)
        .await
        .expect("migrations apply")
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).expect("valid date")
}

fn remote(value: &str) -> RemoteEventId {
    RemoteEventId::new(value.to_string()).expect("valid remote id")
}

fn key(value: &str) -> CategoryKey {
    CategoryKey::new(value.to_string()).expect("valid key")
}

fn draft(org_unit: &str, day: u32) -> NewInspection {
    NewInspection::new(org_unit, "Ngelehun CHC", date(day))
        .with_form_data(FormData::new().with("chairs", 5).with("textbooks", 0))
}

#[tokio::test]
async fn create_then_get_round_trips_every_field() {
    let store = setup_store().await;
    let created = store
        .create(
            draft("DiszpKrYNg8", 14)
                .with_status(InspectionStatus::InProgress)
                .with_category(
                    CategorySyncRecord::new(key("primary"), FormData::new().with("desks", 3))
                        .with_label("Primary"),
                ),
        )
        .await
        .expect("create");

    let loaded = store
        .get(&created.id)
        .await
        .expect("get")
        .expect("record exists");

    assert_eq!(loaded, created);
    assert_eq!(loaded.sync_status, SyncStatus::NotSynced);
    assert_eq!(loaded.source, RecordSource::Local);
    assert_eq!(loaded.created_at, loaded.updated_at);
}

#[tokio::test]
async fn get_missing_record_is_none() {
    let store = setup_store().await;
    let missing = store
        .get(&InspectionId::generate())
        .await
        .expect("get succeeds");
    assert!(missing.is_none());
}

#[tokio::test]
async fn create_rejects_blank_org_unit() {
    let store = setup_store().await;
    let err = store.create(draft("  ", 14)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn create_with_id_uses_supplied_identifier() {
    let store = setup_store().await;
    let id: InspectionId = "Remote000001".parse().expect("valid id");

    let created = store
        .create_with_id(id.clone(), draft("DiszpKrYNg8", 14))
        .await
        .expect("create");

    assert_eq!(created.id, id);
    assert!(store.get(&id).await.expect("get").is_some());
}

#[tokio::test]
async fn update_merges_fields_and_keeps_created_at() {
    let store = setup_store().await;
    let created = store.create(draft("DiszpKrYNg8", 14)).await.expect("create");

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let updated = store
        .update(
            &created.id,
            InspectionPatch {
                status: Some(InspectionStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.status, InspectionStatus::Completed);
    assert_eq!(updated.org_unit, "DiszpKrYNg8");
    assert_eq!(updated.form_data, created.form_data);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn update_missing_record_is_not_found() {
    let store = setup_store().await;
    let err = store
        .update(&InspectionId::generate(), InspectionPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound(_)));
}

#[tokio::test]
async fn aggregate_status_is_recomputed_on_write() {
    let store = setup_store().await;
    let mut synced = CategorySyncRecord::new(key("primary"), FormData::new());
    synced.sync_status = SyncStatus::Synced;
    let created = store
        .create(draft("DiszpKrYNg8", 14).with_category(synced))
        .await
        .expect("create");
    assert_eq!(created.sync_status, SyncStatus::Synced);

    let mut failed = CategorySyncRecord::new(key("secondary"), FormData::new());
    failed.sync_status = SyncStatus::SyncFailed;
    failed.last_error = Some("rejected".to_string());
    let updated = store
        .update(
            &created.id,
            InspectionPatch {
                categories: vec![failed],
                ..Default::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.sync_status, SyncStatus::SyncFailed);
    assert_eq!(updated.sync_error.as_deref(), Some("secondary: rejected"));
    assert_eq!(updated.categories.len(), 2);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = setup_store().await;
    let created = store.create(draft("DiszpKrYNg8", 14)).await.expect("create");

    store.delete(&created.id).await.expect("first delete");
    store.delete(&created.id).await.expect("second delete");

    assert!(store.get(&created.id).await.expect("get").is_none());
}

#[tokio::test]
async fn index_queries_filter_on_each_column() {
    let store = setup_store().await;
    let first = store.create(draft("OU_A", 14)).await.expect("create");
    let second = store
        .create(draft("OU_B", 15).with_status(InspectionStatus::Completed))
        .await
        .expect("create");
    store
        .update(
            &second.id,
            InspectionPatch {
                dhis2_event_id: Some(remote("evt00000002")),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    let by_org_unit = store
        .query_by_index(IndexQuery::OrgUnit("OU_A".to_string()))
        .await
        .expect("query");
    assert_eq!(by_org_unit.len(), 1);
    assert_eq!(by_org_unit[0].id, first.id);

    let by_date = store
        .query_by_index(IndexQuery::EventDate(date(15)))
        .await
        .expect("query");
    assert_eq!(by_date.len(), 1);
    assert_eq!(by_date[0].id, second.id);

    let by_status = store
        .query_by_index(IndexQuery::Status(InspectionStatus::Completed))
        .await
        .expect("query");
    assert_eq!(by_status.len(), 1);

    let by_sync = store
        .query_by_index(IndexQuery::SyncStatus(SyncStatus::NotSynced))
        .await
        .expect("query");
    assert_eq!(by_sync.len(), 2);

    let by_remote = store
        .query_by_index(IndexQuery::Dhis2EventId(remote("evt00000002")))
        .await
        .expect("query");
    assert_eq!(by_remote.len(), 1);
    assert_eq!(by_remote[0].id, second.id);
}

#[tokio::test]
async fn pending_sync_excludes_synced_records() {
    let store = setup_store().await;
    let pending = store.create(draft("OU_A", 14)).await.expect("create");
    let mut synced = CategorySyncRecord::new(key("primary"), FormData::new());
    synced.sync_status = SyncStatus::Synced;
    store
        .create(draft("OU_B", 14).with_category(synced))
        .await
        .expect("create");

    let listed = store.list_pending_sync().await.expect("list");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, pending.id);
}

#[tokio::test]
async fn remote_identifier_lookup_covers_all_identity_columns() {
    let store = setup_store().await;
    let adopted = store
        .create_with_id("evt00000001".parse().expect("id"), draft("OU_A", 14))
        .await
        .expect("create");
    let linked = store.create(draft("OU_B", 14)).await.expect("create");
    store
        .update(
            &linked.id,
            InspectionPatch {
                dhis2_event_id: Some(remote("evt00000002")),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    let mut category = CategorySyncRecord::new(key("secondary"), FormData::new());
    category.remote_event_id = Some(remote("evt00000003"));
    let categorized = store
        .create(draft("OU_C", 14).with_category(category))
        .await
        .expect("create");

    let by_id = store
        .find_by_remote_identifier(&remote("evt00000001"))
        .await
        .expect("lookup");
    assert_eq!(by_id.map(|i| i.id), Some(adopted.id));

    let by_event = store
        .find_by_remote_identifier(&remote("evt00000002"))
        .await
        .expect("lookup");
    assert_eq!(by_event.map(|i| i.id), Some(linked.id));

    let by_category = store
        .find_by_remote_identifier(&remote("evt00000003"))
        .await
        .expect("lookup");
    assert_eq!(by_category.map(|i| i.id), Some(categorized.id));

    let none = store
        .find_by_remote_identifier(&remote("evt99999999"))
        .await
        .expect("lookup");
    assert!(none.is_none());
}

#[tokio::test]
async fn list_returns_most_recently_updated_first() {
    let store = setup_store().await;
    let older = store.create(draft("OU_A", 14)).await.expect("create");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = store.create(draft("OU_B", 14)).await.expect("create");

    let listed = store.list(10).await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);

    let limited = store.list(1).await.expect("list");
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn committed_mutations_fire_change_signal() {
    let store = setup_store().await;
    let mut subscription = store.subscribe();

    let created = store.create(draft("OU_A", 14)).await.expect("create");
    assert!(subscription.try_changed());

    store
        .update(
            &created.id,
            InspectionPatch {
                form_data: Some(FormData::new().with("chairs", json!(9))),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert!(subscription.try_changed());

    store.delete(&created.id).await.expect("delete");
    assert!(subscription.try_changed());

    store.delete(&created.id).await.expect("delete again");
    assert!(!subscription.try_changed());
}

#[tokio::test]
async fn failed_update_does_not_fire_change_signal() {
    let store = setup_store().await;
    let mut subscription = store.subscribe();

    let _ = store
        .update(&InspectionId::generate(), InspectionPatch::default())
        .await;

    assert!(!subscription.try_changed());
}

#[tokio::test]
async fn migrations_can_run_again() {
    let store = setup_store().await;
    store.initialize().await.expect("second migration run");
    store.create(draft("OU_A", 14)).await.expect("create");
}

#[tokio::test]
async fn health_check_reports_ok_for_writable_store() {
    let store = setup_store().await;
    assert_eq!(store.health_check().await, StorageHealth::Ok);
}

#[tokio::test]
async fn records_survive_reopening_the_database_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DatabaseConfig {
        url: format!(
            "sqlite://{}",
            dir.path().join("nested").join("inspections.db").display()
        ),
        max_connections: 2,
        busy_timeout_ms: 1_000,
    };

    let pool = ConnectionPool::new(&config).await.expect("open file database");
    let store = SqliteInspectionStore::open(pool).await.expect("migrate");
    let created = store.create(draft("OU_A", 14)).await.expect("create");
    store.pool().close().await;

    let pool = ConnectionPool::new(&config).await.expect("reopen file database");
    let reopened = SqliteInspectionStore::open(pool).await.expect("migrate");
    let loaded = reopened
        .get(&created.id)
        .await
        .expect("get")
        .expect("record persisted");

    assert_eq!(loaded, created);
}

fn file_config(
    dir: &tempfile::TempDir,
    max_connections: u32,
    busy_timeout_ms: u64,
) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("inspections.db").display()),
        max_connections,
        busy_timeout_ms,
    }
}

#[tokio::test]
async fn concurrent_updates_of_one_record_all_commit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = ConnectionPool::new(&file_config(&dir, 5, 5_000))
        .await
        .expect("open file database");
    let store = std::sync::Arc::new(SqliteInspectionStore::open(pool).await.expect("migrate"));
    let created = store.create(draft("OU_A", 14)).await.expect("create");

    let mut writers = Vec::new();
    for i in 0..20 {
        let store = std::sync::Arc::clone(&store);
        let id = created.id.clone();
        writers.push(tokio::spawn(async move {
            store
                .update(
                    &id,
                    InspectionPatch {
                        org_unit_name: Some(format!("n{i}")),
                        ..Default::default()
                    },
                )
                .await
        }));
    }

    for writer in writers {
        writer.await.expect("join").expect("update commits");
    }
    let stored = store.get(&created.id).await.expect("get").expect("exists");
    assert!(stored.org_unit_name.starts_with('n'));
}

#[tokio::test]
async fn health_check_reports_blocked_while_another_writer_holds_the_lock() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = file_config(&dir, 2, 50);
    let pool = ConnectionPool::new(&config).await.expect("open file database");
    let store = SqliteInspectionStore::open(pool).await.expect("migrate");

    let other = ConnectionPool::new(&config).await.expect("second pool");
    let mut holder = other.get_pool().acquire().await.expect("connection");
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *holder)
        .await
        .expect("take write lock");

    let health = store.health_check().await;
    assert!(matches!(health, StorageHealth::Blocked(_)), "{health:?}");

    sqlx::query("ROLLBACK")
        .execute(&mut *holder)
        .await
        .expect("release write lock");
    assert_eq!(store.health_check().await, StorageHealth::Ok);
}

#[tokio::test]
async fn health_check_reports_quota_when_page_limit_is_reached() {
    let store = setup_store().await;
    store.create(draft("OU_A", 14)).await.expect("create");
    let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
        .fetch_one(store.pool().get_pool())
        .await
        .expect("page count");

    let limit = format!("PRAGMA max_page_count = {page_count}");
    sqlx::query(&limit)
        .execute(store.pool().get_pool())
        .await
        .expect("lower page limit");

    let health = store.health_check().await;
    assert!(matches!(health, StorageHealth::QuotaExceeded(_)), "{health:?}");
}

#[tokio::test]
async fn health_check_reports_unsupported_once_the_pool_is_closed() {
    let store = setup_store().await;
    store.pool().close().await;

    let health = store.health_check().await;
    assert!(matches!(health, StorageHealth::Unsupported(_)), "{health:?}");
}
