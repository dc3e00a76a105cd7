use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of an independently synchronized sub-group of an inspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey(String);

impl CategoryKey {
    /// Synthetic category used when an inspection has no explicit categorization.
    pub const DEFAULT: &'static str = "default";

    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Category key cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn default_key() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
