use crate::application::ports::remote_tracker::{BundleReport, ObjectReport};
use crate::shared::error::AppError;
use serde_json::Value;

/// Tracker error code for an event whose org unit is not part of the program.
const ORG_UNIT_PROGRAM_MISMATCH: &str = "E1029";

/// Unwraps the import report of a tracker upsert response. The report is
/// either at the top level or nested under `response`, depending on the
/// server version.
pub fn parse_bundle_report(body: &Value) -> BundleReport {
    let envelope = envelope(body);
    let status = envelope
        .get("status")
        .or_else(|| body.get("status"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let object_reports = envelope
        .pointer("/bundleReport/typeReportMap/EVENT/objectReports")
        .and_then(Value::as_array)
        .map(|reports| reports.iter().map(object_report).collect())
        .unwrap_or_default();

    BundleReport {
        status,
        object_reports,
    }
}

/// Structured validation failure carried by an upsert response, if any.
pub fn validation_error(body: &Value) -> Option<AppError> {
    let reports = envelope(body)
        .pointer("/validationReport/errorReports")
        .and_then(Value::as_array)?;
    if reports.is_empty() {
        return None;
    }

    let mut org_unit_not_assigned = false;
    let messages: Vec<String> = reports
        .iter()
        .map(|report| {
            let code = report.get("errorCode").and_then(Value::as_str).unwrap_or("");
            let message = report
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Validation error");
            if is_org_unit_not_assigned(code, message) {
                org_unit_not_assigned = true;
            }
            if code.is_empty() {
                message.to_string()
            } else {
                format!("{code}: {message}")
            }
        })
        .collect();

    Some(AppError::RemoteValidationFailed {
        message: messages.join("; "),
        org_unit_not_assigned,
    })
}

/// Converts a non-2xx response body into the matching error.
pub fn error_from_response(status: u16, body: &str) -> AppError {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        let message = body.trim();
        return AppError::RemoteRequestFailed {
            status,
            message: (!message.is_empty()).then(|| truncate(message)),
        };
    };

    if let Some(validation) = validation_error(&json) {
        return validation;
    }

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .map(|message| {
            if is_org_unit_not_assigned("", message) {
                return AppError::RemoteValidationFailed {
                    message: message.to_string(),
                    org_unit_not_assigned: true,
                };
            }
            AppError::RemoteRequestFailed {
                status,
                message: Some(message.to_string()),
            }
        });

    message.unwrap_or(AppError::RemoteRequestFailed {
        status,
        message: None,
    })
}

fn envelope(body: &Value) -> &Value {
    match body.get("response") {
        Some(inner) if inner.is_object() => inner,
        _ => body,
    }
}

fn object_report(report: &Value) -> ObjectReport {
    ObjectReport {
        uid: report
            .get("uid")
            .and_then(Value::as_str)
            .map(str::to_string),
        index: report
            .get("index")
            .and_then(Value::as_u64)
            .and_then(|index| usize::try_from(index).ok()),
    }
}

fn is_org_unit_not_assigned(code: &str, message: &str) -> bool {
    if code == ORG_UNIT_PROGRAM_MISMATCH {
        return true;
    }
    let lowered = message.to_ascii_lowercase();
    lowered.contains("not assigned to program")
        || (lowered.contains("organisationunit") && lowered.contains("don't match"))
}

fn truncate(message: &str) -> String {
    const LIMIT: usize = 300;
    if message.chars().count() <= LIMIT {
        return message.to_string();
    }
    let mut short: String = message.chars().take(LIMIT).collect();
    short.push('…');
    short
}
