use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Scheduling state of an inspection, independent of synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionStatus::Scheduled => "scheduled",
            InspectionStatus::InProgress => "in_progress",
            InspectionStatus::Completed => "completed",
        }
    }

    /// Tracker event status sent on push.
    pub fn tracker_status(&self) -> &'static str {
        match self {
            InspectionStatus::Completed => "COMPLETED",
            InspectionStatus::Scheduled | InspectionStatus::InProgress => "ACTIVE",
        }
    }

    /// Maps the tracker's event status vocabulary onto the local lifecycle.
    pub fn from_tracker_status(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "COMPLETED" => InspectionStatus::Completed,
            "ACTIVE" => InspectionStatus::InProgress,
            _ => InspectionStatus::Scheduled,
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InspectionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(InspectionStatus::Scheduled),
            "in_progress" => Ok(InspectionStatus::InProgress),
            "completed" => Ok(InspectionStatus::Completed),
            other => Err(format!("Unknown inspection status: {other}")),
        }
    }
}
