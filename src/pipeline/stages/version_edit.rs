//! `x_netkan_version_edit`: rewrite an upstream version with a regex.
//!
//! ```yaml
//! x_netkan_version_edit: ^v?(?<version>.+)$
//! # or
//! x_netkan_version_edit:
//!   find: ^Release-(?<version>.+)$
//!   replace: ${version}
//!   strict: false
//! ```

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;
use crate::pipeline::stage::{passthrough, Stage};
use regex::Regex;
use serde_json::Value;

const VERSION_EDIT_KEY: &str = "x_netkan_version_edit";
const DEFAULT_REPLACE: &str = "${version}";

#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionEdit {
    find: String,
    replace: String,
    strict: bool,
}

fn parse_edit(metadata: &Metadata, value: &Value) -> Result<VersionEdit> {
    match value {
        Value::String(find) => Ok(VersionEdit {
            find: find.clone(),
            replace: DEFAULT_REPLACE.to_string(),
            strict: true,
        }),
        Value::Object(edit) => {
            let find = match edit.get("find") {
                Some(Value::String(find)) => find.clone(),
                Some(_) => return Err(metadata.bad("`x_netkan_version_edit` `find` property must be a string")),
                None => return Err(metadata.bad("`x_netkan_version_edit` must contain `find` property")),
            };
            let replace = match edit.get("replace") {
                None => DEFAULT_REPLACE.to_string(),
                Some(Value::String(replace)) => replace.clone(),
                Some(_) => {
                    return Err(metadata.bad("`x_netkan_version_edit` `replace` property must be a string"))
                }
            };
            let strict = match edit.get("strict") {
                None => true,
                Some(Value::Bool(strict)) => *strict,
                Some(_) => return Err(metadata.bad("`x_netkan_version_edit` `strict` property must be a bool")),
            };
            Ok(VersionEdit {
                find,
                replace,
                strict,
            })
        }
        other => Err(metadata.bad(format!(
            "Unrecognized `x_netkan_version_edit` value: {}",
            other
        ))),
    }
}

pub struct VersionEditStage;

impl Stage for VersionEditStage {
    fn name(&self) -> &str {
        "version_edit"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let edit = match metadata.get(VERSION_EDIT_KEY) {
            None | Some(Value::Null) => return passthrough(metadata),
            Some(value) => parse_edit(&metadata, value)?,
        };

        let version = match metadata.get("version") {
            Some(Value::String(version)) => version.clone(),
            Some(_) => return Err(metadata.bad("`version` property must be a string")),
            None => return Err(metadata.bad("`version` property does not exist to edit")),
        };

        let find = Regex::new(&edit.find).map_err(|e| {
            metadata.bad(format!("Invalid `x_netkan_version_edit` pattern {}: {}", edit.find, e))
        })?;

        if !find.is_match(&version) {
            if edit.strict {
                return Err(metadata.bad(format!(
                    "Could not match version {} with find pattern {}",
                    version, edit.find
                )));
            }
            log::debug!("Version {} does not match {}, leaving it alone", version, edit.find);
            return passthrough(metadata);
        }

        let edited = find.replace_all(&version, edit.replace.as_str()).into_owned();
        log::debug!("Edited version {} to {}", version, edited);
        let updated = metadata.edit(|json| {
            json.insert("version".into(), Value::String(edited));
            Ok(())
        })?;
        Ok(vec![updated])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(value: Value) -> Result<Vec<Metadata>> {
        VersionEditStage.transform(Metadata::from_value(value).unwrap(), &mut RunContext::new())
    }

    #[test]
    fn test_string_form_extracts_named_group() {
        let out = run(json!({
            "identifier": "Mod",
            "version": "v1.2.3",
            "x_netkan_version_edit": "^v(?P<version>.+)$"
        }))
        .unwrap();
        assert_eq!(out[0].get("version"), Some(&json!("1.2.3")));
    }

    #[test]
    fn test_object_form_with_replace() {
        let out = run(json!({
            "identifier": "Mod",
            "version": "Release-4",
            "x_netkan_version_edit": {"find": "^Release-(?P<n>\\d+)$", "replace": "1.${n}"}
        }))
        .unwrap();
        assert_eq!(out[0].get("version"), Some(&json!("1.4")));
    }

    #[test]
    fn test_every_match_is_replaced() {
        let out = run(json!({
            "identifier": "Mod",
            "version": "1_2_3",
            "x_netkan_version_edit": {"find": "_", "replace": "."}
        }))
        .unwrap();
        assert_eq!(out[0].get("version"), Some(&json!("1.2.3")));
    }

    #[test]
    fn test_strict_mismatch_fails() {
        let err = run(json!({
            "identifier": "Mod",
            "version": "1.0",
            "x_netkan_version_edit": "^v(?P<version>.+)$"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Could not match version"));
    }

    #[test]
    fn test_lenient_mismatch_passes_through() {
        let input = Metadata::from_value(json!({
            "identifier": "Mod",
            "version": "1.0",
            "x_netkan_version_edit": {"find": "^v(?P<version>.+)$", "strict": false}
        }))
        .unwrap();
        let out = VersionEditStage
            .transform(input.clone(), &mut RunContext::new())
            .unwrap();
        assert!(out[0].same_document(&input));
    }

    #[test]
    fn test_type_errors_name_the_property() {
        let err = run(json!({
            "identifier": "Mod",
            "version": "1.0",
            "x_netkan_version_edit": {"find": 5}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("`find` property must be a string"));

        let err = run(json!({
            "identifier": "Mod",
            "version": "1.0",
            "x_netkan_version_edit": {"find": ".*", "strict": "yes"}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("`strict` property must be a bool"));

        let err = run(json!({"identifier": "Mod", "x_netkan_version_edit": ".*"})).unwrap_err();
        assert!(err.to_string().contains("does not exist to edit"));
    }
}
