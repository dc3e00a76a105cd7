use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mapping between a local form key and a tracker data element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub key: String,
    pub data_element: String,
}

impl FieldMapping {
    pub fn new(key: impl Into<String>, data_element: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data_element: data_element.into(),
        }
    }
}

/// Fixed table translating form keys to tracker data elements and back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalog {
    fields: Vec<FieldMapping>,
    /// Free-text field that gets a category label prefix on push.
    #[serde(default)]
    note_key: Option<String>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldMapping>, note_key: Option<String>) -> Self {
        Self { fields, note_key }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::Configuration(format!(
                "failed to read field catalog {}: {err}",
                path.display()
            ))
        })?;
        let catalog: FieldCatalog = serde_json::from_str(&raw)?;
        Ok(catalog)
    }

    pub fn data_element_for(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|mapping| mapping.key == key)
            .map(|mapping| mapping.data_element.as_str())
    }

    pub fn key_for(&self, data_element: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|mapping| mapping.data_element == data_element)
            .map(|mapping| mapping.key.as_str())
    }

    pub fn note_key(&self) -> Option<&str> {
        self.note_key.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::new(
            vec![
                FieldMapping::new("textbooks", "hT9pXr4TbkQ"),
                FieldMapping::new("chairs", "kLm2ChRs8aZ"),
                FieldMapping::new("desks", "pQ7dEsKs3nB"),
                FieldMapping::new("classrooms", "vW4cLsRm9yT"),
                FieldMapping::new("toilets", "gH6tLtS2kxM"),
                FieldMapping::new("teachers_present", "rS3tChPr5jD"),
                FieldMapping::new("learners_present", "zX8lRnPr1qW"),
                FieldMapping::new("notes", "nB5nOtEs7cV"),
            ],
            Some("notes".to_string()),
        )
    }
}
