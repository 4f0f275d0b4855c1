use crate::errors::{InflateError, Result};
use crate::metadata::Metadata;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Read every document of a netkan file.
pub fn read_netkans(path: &Path) -> Result<Vec<Metadata>> {
    let contents = super::read_file(path)?;
    parse_netkans(&contents).map_err(|e| match e {
        InflateError::BadMetadata { message, .. } => {
            InflateError::bad_metadata(path.display().to_string(), message)
        }
        other => other,
    })
}

/// Parse netkan text: a single JSON object, or one or more YAML documents.
/// Empty YAML documents are skipped.
pub fn parse_netkans(contents: &str) -> Result<Vec<Metadata>> {
    if let Ok(value) = serde_json::from_str::<Value>(contents) {
        return Ok(vec![Metadata::from_value(value)?]);
    }

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(contents) {
        let value = Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        documents.push(Metadata::from_value(value)?);
    }
    if documents.is_empty() {
        return Err(InflateError::bad_metadata("<unknown>", "no documents found"));
    }
    Ok(documents)
}
