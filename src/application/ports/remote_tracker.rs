use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of a program-scoped event listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub program: String,
    pub fields: String,
    pub order: String,
    pub page_size: u32,
}

impl RecordQuery {
    pub const DEFAULT_FIELDS: &'static str =
        "event,orgUnit,occurredAt,status,dataValues[dataElement,value]";
    pub const MOST_RECENT_FIRST: &'static str = "occurredAt:desc";

    pub fn latest(program: impl Into<String>, page_size: u32) -> Self {
        Self {
            program: program.into(),
            fields: Self::DEFAULT_FIELDS.to_string(),
            order: Self::MOST_RECENT_FIRST.to_string(),
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDataValue {
    pub data_element: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub event: String,
    #[serde(default)]
    pub org_unit: String,
    #[serde(default)]
    pub occurred_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data_values: Vec<RemoteDataValue>,
}

/// Event body sent to the bulk upsert endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub program: String,
    pub program_stage: String,
    pub org_unit: String,
    /// Date only, `YYYY-MM-DD`.
    pub occurred_at: String,
    pub status: String,
    pub data_values: Vec<RemoteDataValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReport {
    pub uid: Option<String>,
    pub index: Option<usize>,
}

/// Unwrapped import summary of an upsert call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleReport {
    pub status: Option<String>,
    pub object_reports: Vec<ObjectReport>,
}

impl BundleReport {
    /// Identifier reported for the event at `index` of the request.
    pub fn uid_at(&self, index: usize) -> Option<&str> {
        self.object_reports
            .iter()
            .find(|report| report.index == Some(index))
            .or_else(|| self.object_reports.get(index))
            .and_then(|report| report.uid.as_deref())
            .filter(|uid| !uid.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnit {
    pub id: String,
    #[serde(default, alias = "name")]
    pub display_name: String,
}

#[async_trait]
pub trait RemoteTracker: Send + Sync {
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<RemoteRecord>, AppError>;
    async fn upsert_events(&self, events: &[RemoteEventPayload]) -> Result<BundleReport, AppError>;
    async fn query_org_units(&self, ids: &[String]) -> Result<Vec<OrgUnit>, AppError>;
}
