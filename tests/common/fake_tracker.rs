use async_trait::async_trait;
use field_inspection_sync::application::ports::remote_tracker::{
    BundleReport, ObjectReport, OrgUnit, RecordQuery, RemoteEventPayload, RemoteRecord,
    RemoteTracker,
};
use field_inspection_sync::shared::error::AppError;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

/// Scripted answer for one upsert call.
#[derive(Debug)]
pub enum UpsertScript {
    Accept,
    AcceptWithoutId,
    Fail(AppError),
}

/// In-memory tracker that records every call it receives.
#[derive(Default)]
pub struct FakeRemoteTracker {
    records: Mutex<Vec<RemoteRecord>>,
    org_units: Mutex<HashMap<String, String>>,
    upsert_scripts: Mutex<VecDeque<UpsertScript>>,
    query_failures: Mutex<VecDeque<AppError>>,
    upsert_delay: Mutex<Option<Duration>>,
    upsert_calls: Mutex<Vec<RemoteEventPayload>>,
    org_unit_queries: Mutex<Vec<Vec<String>>>,
    record_queries: Mutex<Vec<RecordQuery>>,
    next_uid: Mutex<u32>,
}

impl FakeRemoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_records(&self, records: Vec<RemoteRecord>) {
        *self.records.lock().await = records;
    }

    pub async fn add_org_unit(&self, id: &str, name: &str) {
        self.org_units
            .lock()
            .await
            .insert(id.to_string(), name.to_string());
    }

    pub async fn script_upserts(&self, scripts: Vec<UpsertScript>) {
        self.upsert_scripts.lock().await.extend(scripts);
    }

    pub async fn fail_next_query(&self, err: AppError) {
        self.query_failures.lock().await.push_back(err);
    }

    pub async fn set_upsert_delay(&self, delay: Duration) {
        *self.upsert_delay.lock().await = Some(delay);
    }

    pub async fn upsert_calls(&self) -> Vec<RemoteEventPayload> {
        self.upsert_calls.lock().await.clone()
    }

    pub async fn upsert_count(&self) -> usize {
        self.upsert_calls.lock().await.len()
    }

    pub async fn org_unit_queries(&self) -> Vec<Vec<String>> {
        self.org_unit_queries.lock().await.clone()
    }

    pub async fn record_queries(&self) -> Vec<RecordQuery> {
        self.record_queries.lock().await.clone()
    }

    async fn issue_uid(&self) -> String {
        let mut next = self.next_uid.lock().await;
        *next += 1;
        format!("evt{:08}", *next)
    }
}

#[async_trait]
impl RemoteTracker for FakeRemoteTracker {
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<RemoteRecord>, AppError> {
        self.record_queries.lock().await.push(query.clone());
        if let Some(err) = self.query_failures.lock().await.pop_front() {
            return Err(err);
        }
        Ok(self.records.lock().await.clone())
    }

    async fn upsert_events(&self, events: &[RemoteEventPayload]) -> Result<BundleReport, AppError> {
        self.upsert_calls.lock().await.extend(events.iter().cloned());

        let delay = *self.upsert_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let script = self
            .upsert_scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or(UpsertScript::Accept);

        let mut object_reports = Vec::new();
        match script {
            UpsertScript::Fail(err) => return Err(err),
            UpsertScript::AcceptWithoutId => {}
            UpsertScript::Accept => {
                for (index, event) in events.iter().enumerate() {
                    let uid = match &event.event {
                        Some(existing) => existing.clone(),
                        None => self.issue_uid().await,
                    };
                    object_reports.push(ObjectReport {
                        uid: Some(uid),
                        index: Some(index),
                    });
                }
            }
        }

        Ok(BundleReport {
            status: Some("OK".to_string()),
            object_reports,
        })
    }

    async fn query_org_units(&self, ids: &[String]) -> Result<Vec<OrgUnit>, AppError> {
        self.org_unit_queries.lock().await.push(ids.to_vec());
        let known = self.org_units.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                known.get(id).map(|name| OrgUnit {
                    id: id.clone(),
                    display_name: name.clone(),
                })
            })
            .collect())
    }
}
