use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Synchronization state of a category, and by aggregation of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    #[default]
    NotSynced,
    SyncFailed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::NotSynced => "not_synced",
            SyncStatus::SyncFailed => "sync_failed",
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }

    // sync_failed > not_synced > synced
    fn severity(&self) -> u8 {
        match self {
            SyncStatus::Synced => 0,
            SyncStatus::NotSynced => 1,
            SyncStatus::SyncFailed => 2,
        }
    }

    /// Worst status of the given category statuses. An empty set is `NotSynced`.
    pub fn aggregate<I>(statuses: I) -> SyncStatus
    where
        I: IntoIterator<Item = SyncStatus>,
    {
        statuses
            .into_iter()
            .max_by_key(SyncStatus::severity)
            .unwrap_or(SyncStatus::NotSynced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "synced" => Ok(SyncStatus::Synced),
            "not_synced" => Ok(SyncStatus::NotSynced),
            "sync_failed" => Ok(SyncStatus::SyncFailed),
            other => Err(format!("Unknown sync status: {other}")),
        }
    }
}
