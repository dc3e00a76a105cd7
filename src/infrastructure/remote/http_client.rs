use super::bundle_report::{error_from_response, parse_bundle_report, validation_error};
use super::retry::{RequestKind, RetryPolicy};
use crate::application::ports::remote_tracker::{
    BundleReport, OrgUnit, RecordQuery, RemoteEventPayload, RemoteRecord, RemoteTracker,
};
use crate::shared::config::{RemoteConfig, RemoteCredentials};
use crate::shared::error::AppError;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const EVENTS_PATH: &str = "/api/tracker/events";
const TRACKER_IMPORT_PATH: &str = "/api/tracker";
const ORG_UNITS_PATH: &str = "/api/organisationUnits";

#[derive(Serialize)]
struct EventBundle<'a> {
    events: &'a [RemoteEventPayload],
}

/// HTTP client for the tracker's event and organisation unit endpoints.
#[derive(Clone)]
pub struct TrackerHttpClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TrackerHttpClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        if let Some(credentials) = &config.credentials {
            headers.insert(AUTHORIZATION, authorization_header(credentials)?);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|err| AppError::Configuration(format!("HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<F>(&self, kind: RequestKind, build: F) -> Result<Response, AppError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let can_retry = attempt <= self.retry.max_retries;

            match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if can_retry && self.retry.should_retry_status(kind, status) {
                        let delay = retry_after(&response)
                            .map(|delay| delay.min(self.retry.max_delay))
                            .unwrap_or_else(|| self.retry.delay_for(attempt));
                        tracing::warn!(
                            status = status.as_u16(),
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            "tracker request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(error_from_response(status.as_u16(), &body));
                }
                Err(err) => {
                    if can_retry && self.retry.should_retry_transport(kind, &err) {
                        let delay = self.retry.delay_for(attempt);
                        tracing::warn!(
                            error = %err,
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            "tracker unreachable, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AppError::from(err));
                }
            }
        }
    }
}

#[async_trait]
impl RemoteTracker for TrackerHttpClient {
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<RemoteRecord>, AppError> {
        let url = self.url(EVENTS_PATH);
        let page_size = query.page_size.to_string();
        let params = [
            ("program", query.program.as_str()),
            ("fields", query.fields.as_str()),
            ("order", query.order.as_str()),
            ("pageSize", page_size.as_str()),
        ];

        let response = self
            .send(RequestKind::Idempotent, || self.client.get(&url).query(&params))
            .await?;
        let body: Value = response.json().await?;

        let instances = body
            .get("instances")
            .or_else(|| body.get("events"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::Serialization(
                    "event listing has neither instances nor events".to_string(),
                )
            })?;

        let records = instances
            .iter()
            .filter_map(|instance| {
                match serde_json::from_value::<RemoteRecord>(instance.clone()) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping malformed tracker event");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(program = %query.program, count = records.len(), "fetched tracker events");
        Ok(records)
    }

    async fn upsert_events(&self, events: &[RemoteEventPayload]) -> Result<BundleReport, AppError> {
        let url = self.url(TRACKER_IMPORT_PATH);
        let bundle = EventBundle { events };
        let params = [("async", "false"), ("importStrategy", "CREATE_AND_UPDATE")];

        let response = self
            .send(RequestKind::Create, || {
                self.client.post(&url).query(&params).json(&bundle)
            })
            .await?;
        let body: Value = response.json().await?;

        if let Some(err) = validation_error(&body) {
            return Err(err);
        }

        let report = parse_bundle_report(&body);
        tracing::debug!(
            events = events.len(),
            status = report.status.as_deref().unwrap_or("unknown"),
            "tracker import finished"
        );
        Ok(report)
    }

    async fn query_org_units(&self, ids: &[String]) -> Result<Vec<OrgUnit>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url(ORG_UNITS_PATH);
        let filter = format!("id:in:[{}]", ids.join(","));
        let params = [
            ("filter", filter.as_str()),
            ("fields", "id,displayName"),
            ("paging", "false"),
        ];

        let response = self
            .send(RequestKind::Idempotent, || self.client.get(&url).query(&params))
            .await?;
        let body: Value = response.json().await?;

        let units = match body.get("organisationUnits") {
            Some(units) => serde_json::from_value::<Vec<OrgUnit>>(units.clone())?,
            None => Vec::new(),
        };
        Ok(units)
    }
}

fn authorization_header(credentials: &RemoteCredentials) -> Result<HeaderValue, AppError> {
    let raw = match credentials {
        RemoteCredentials::Bearer { token } => format!("Bearer {token}"),
        RemoteCredentials::Basic { username, password } => {
            format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
        }
    };
    let mut value = HeaderValue::from_str(&raw).map_err(|_| {
        AppError::Configuration("credentials contain invalid characters".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
