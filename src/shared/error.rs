use thiserror::Error;

/// Message shown when the tracker rejects an event because the inspected
/// organisation unit is not part of the program.
pub const ORG_UNIT_NOT_ASSIGNED_MESSAGE: &str = "This organisation unit is not assigned to the inspection program. Ask an administrator to assign it, then sync again.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Storage blocked: {0}")]
    StorageBlocked(String),
    #[error("Storage quota exceeded: {0}")]
    StorageQuotaExceeded(String),
    #[error("Record not found: {0}")]
    RecordNotFound(String),
    #[error("Remote request failed with status {status}{}", format_remote_message(.message))]
    RemoteRequestFailed {
        status: u16,
        message: Option<String>,
    },
    #[error("Remote validation failed: {message}")]
    RemoteValidationFailed {
        message: String,
        org_unit_not_assigned: bool,
    },
    #[error("Remote response did not contain the created event identifier")]
    RemoteIdentifierMissing,
    #[error("Remote unreachable: {0}")]
    RemoteUnreachable(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn format_remote_message(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

impl AppError {
    /// Text retained on a failed category for display to the inspector.
    pub fn user_message(&self) -> String {
        match self {
            AppError::RemoteValidationFailed {
                org_unit_not_assigned: true,
                ..
            } => ORG_UNIT_NOT_ASSIGNED_MESSAGE.to_string(),
            AppError::RemoteValidationFailed { message, .. } => message.clone(),
            AppError::RemoteRequestFailed {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}

// SQLite primary result codes, see https://www.sqlite.org/rescode.html
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;
const SQLITE_FULL: i64 = 13;
const SQLITE_CANTOPEN: i64 = 14;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let primary_code = db_err
                    .code()
                    .and_then(|code| code.parse::<i64>().ok())
                    .map(|code| code & 0xff);
                match primary_code {
                    Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => {
                        AppError::StorageBlocked(db_err.message().to_string())
                    }
                    Some(SQLITE_FULL) => {
                        AppError::StorageQuotaExceeded(db_err.message().to_string())
                    }
                    Some(SQLITE_CANTOPEN) => {
                        AppError::StorageUnavailable(db_err.message().to_string())
                    }
                    _ => AppError::Database(err.to_string()),
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                AppError::StorageUnavailable(err.to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        match err {
            sqlx::migrate::MigrateError::Execute(inner) => AppError::from(inner),
            sqlx::migrate::MigrateError::Dirty(version) => AppError::StorageBlocked(format!(
                "migration {version} was left partially applied"
            )),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::Serialization(err.to_string());
        }
        match err.status() {
            Some(status) => AppError::RemoteRequestFailed {
                status: status.as_u16(),
                message: None,
            },
            None => AppError::RemoteUnreachable(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
