use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Where a record was first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    #[default]
    Local,
    Server,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Local => "local",
            RecordSource::Server => "server",
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(RecordSource::Local),
            "server" => Ok(RecordSource::Server),
            other => Err(format!("Unknown record source: {other}")),
        }
    }
}
