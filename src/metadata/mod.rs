//! The metadata document that flows through the pipeline.
//!
//! A [`Metadata`] wraps a JSON object behind an `Arc`. Stages never mutate a
//! document they were given: [`Metadata::edit`] copies the object, applies
//! the change and returns a new document, while a stage with nothing to do
//! hands back the same `Arc`. Fan-out branches can therefore share a parent
//! without seeing each other's changes.

mod merge;
pub mod overrides;
mod reference;

pub use merge::merge_group;
pub use overrides::{Comparator, OverrideStanza, VersionConstraint};
pub use reference::Reference;

use crate::errors::{InflateError, Result};
use crate::version::{ModuleVersion, SpecVersion};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Property-name prefix reserved for pipeline-internal directives.
pub const RESERVED_PREFIX: &str = "x_netkan";

pub const KREF: &str = "$kref";
pub const VREF: &str = "$vref";

const UNKNOWN_IDENTIFIER: &str = "<unknown>";

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    json: Arc<Map<String, Value>>,
}

impl Metadata {
    pub fn new(json: Map<String, Value>) -> Self {
        Self {
            json: Arc::new(json),
        }
    }

    /// Wrap a parsed JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(InflateError::bad_metadata(
                UNKNOWN_IDENTIFIER,
                format!("expected a JSON object, found {}", json_type_name(&other)),
            )),
        }
    }

    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.json.as_ref().clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.json.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.json.contains_key(key)
    }

    /// Copy the document, apply `change`, and return the copy.
    pub fn edit<F>(&self, change: F) -> Result<Self>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<()>,
    {
        let mut json = self.json.as_ref().clone();
        change(&mut json)?;
        Ok(Self::new(json))
    }

    /// True when both handles point at the same underlying document.
    pub fn same_document(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.json, &other.json)
    }

    /// The identifier, or a placeholder for error messages when it is missing.
    pub fn identifier(&self) -> &str {
        self.json
            .get("identifier")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_IDENTIFIER)
    }

    /// Shorthand for a malformed-input error about this document.
    pub fn bad(&self, message: impl Into<String>) -> InflateError {
        InflateError::bad_metadata(self.identifier(), message)
    }

    pub fn kref(&self) -> Result<Option<Reference>> {
        self.reference(KREF)
    }

    pub fn vref(&self) -> Result<Option<Reference>> {
        self.reference(VREF)
    }

    fn reference(&self, key: &str) -> Result<Option<Reference>> {
        match self.json.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Reference::parse(s)
                .map(Some)
                .ok_or_else(|| self.bad(format!("{} is not a valid reference: {}", key, s))),
            Some(other) => Err(self.bad(format!("{} must be a string, found {}", key, other))),
        }
    }

    /// The declared `version`; numbers written by YAML authors are accepted.
    pub fn version(&self) -> Option<ModuleVersion> {
        match self.json.get("version")? {
            Value::String(s) => Some(ModuleVersion::parse(s)),
            Value::Number(n) => Some(ModuleVersion::parse(&n.to_string())),
            _ => None,
        }
    }

    pub fn spec_version(&self) -> Option<SpecVersion> {
        self.json.get("spec_version").and_then(SpecVersion::from_json)
    }

    /// All download URLs; `download` may be a string or a list.
    pub fn downloads(&self) -> Vec<String> {
        match self.json.get("download") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn download(&self) -> Option<String> {
        self.downloads().into_iter().next()
    }

    /// Testing and development releases count as prereleases.
    pub fn prerelease(&self) -> bool {
        matches!(
            self.json.get("release_status").and_then(Value::as_str),
            Some("testing") | Some("development")
        )
    }

    /// When the upstream release was last updated.
    pub fn release_date(&self) -> Option<DateTime<Utc>> {
        self.json
            .get("release_date")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// A boolean directive, accepting `true` or the string `"true"`.
    pub fn flag(&self, key: &str) -> bool {
        match self.json.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn staged(&self) -> bool {
        self.flag("x_netkan_staging")
    }

    pub fn staging_reason(&self) -> Option<&str> {
        self.json
            .get("x_netkan_staging_reason")
            .and_then(Value::as_str)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        Metadata::from_value(value).unwrap()
    }

    #[test]
    fn test_rejects_non_object() {
        let err = Metadata::from_value(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn test_edit_returns_new_document() {
        let original = metadata(json!({"identifier": "Mod", "version": "1.0"}));
        let edited = original
            .edit(|json| {
                json.insert("version".into(), json!("2.0"));
                Ok(())
            })
            .unwrap();

        assert_eq!(original.version().unwrap().to_string(), "1.0");
        assert_eq!(edited.version().unwrap().to_string(), "2.0");
        assert!(!original.same_document(&edited));
        assert!(original.same_document(&original.clone()));
    }

    #[test]
    fn test_references() {
        let doc = metadata(json!({
            "identifier": "Mod",
            "$kref": "#/ckan/github/owner/repo",
            "$vref": "#/ckan/ksp-avc"
        }));
        assert_eq!(doc.kref().unwrap().unwrap().source, "github");
        assert_eq!(doc.vref().unwrap().unwrap().source, "ksp-avc");

        let broken = metadata(json!({"identifier": "Mod", "$kref": "github"}));
        assert!(broken.kref().unwrap_err().to_string().contains("Mod"));

        let missing = metadata(json!({"identifier": "Mod"}));
        assert!(missing.kref().unwrap().is_none());
    }

    #[test]
    fn test_download_forms() {
        let single = metadata(json!({"download": "https://a/1.zip"}));
        assert_eq!(single.downloads(), vec!["https://a/1.zip"]);

        let many = metadata(json!({"download": ["https://a/1.zip", "https://b/1.zip"]}));
        assert_eq!(many.download().as_deref(), Some("https://a/1.zip"));
        assert_eq!(many.downloads().len(), 2);
    }

    #[test]
    fn test_prerelease_and_flags() {
        let doc = metadata(json!({
            "release_status": "testing",
            "x_netkan_staging": "true",
            "x_netkan_force_v": false
        }));
        assert!(doc.prerelease());
        assert!(doc.staged());
        assert!(!doc.flag("x_netkan_force_v"));
        assert!(!metadata(json!({"release_status": "stable"})).prerelease());
    }

    #[test]
    fn test_numeric_version_and_release_date() {
        let doc = metadata(json!({
            "version": 1.5,
            "release_date": "2020-01-02T03:04:05Z"
        }));
        assert_eq!(doc.version().unwrap().to_string(), "1.5");
        assert_eq!(
            doc.release_date().unwrap().to_rfc3339(),
            "2020-01-02T03:04:05+00:00"
        );
    }

    #[test]
    fn test_missing_identifier_placeholder() {
        assert_eq!(metadata(json!({})).identifier(), "<unknown>");
    }
}
