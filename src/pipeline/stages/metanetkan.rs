//! `$kref: "#/ckan/netkan/<uri>"` delegates to a netkan hosted elsewhere,
//! usually in the mod's own repository.

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::{Metadata, KREF, VREF};
use crate::pipeline::stage::{passthrough, Stage};
use crate::sources::RawTextSource;
use crate::version::SpecVersion;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const METANETKAN_SOURCE: &str = "netkan";

pub struct MetaNetkanStage {
    source: Arc<dyn RawTextSource>,
}

impl MetaNetkanStage {
    pub fn new(source: Arc<dyn RawTextSource>) -> Self {
        Self { source }
    }

    fn fetch_target(&self, metadata: &Metadata, uri: &str) -> Result<Map<String, Value>> {
        let text = self.source.fetch_raw_text(uri)?;
        // YAML is a superset of JSON, so one parser covers both
        let value: Value = serde_yaml::from_str(&text)
            .map_err(|e| metadata.bad(format!("Could not parse metanetkan {}: {}", uri, e)))?;
        match value {
            Value::Object(target) => Ok(target),
            _ => Err(metadata.bad(format!("Metanetkan {} is not an object", uri))),
        }
    }
}

impl Stage for MetaNetkanStage {
    fn name(&self) -> &str {
        "metanetkan"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let reference = match metadata.kref()? {
            Some(reference) if reference.source == METANETKAN_SOURCE => reference,
            _ => return passthrough(metadata),
        };
        let uri = reference
            .locator()
            .ok_or_else(|| metadata.bad("Metanetkan reference has no location"))?
            .to_string();

        log::info!("Fetching metanetkan for {} from {}", metadata.identifier(), uri);
        let target = self.fetch_target(&metadata, &uri)?;

        let target_is_meta = target
            .get(KREF)
            .and_then(Value::as_str)
            .and_then(crate::metadata::Reference::parse)
            .is_some_and(|r| r.source == METANETKAN_SOURCE);
        if target_is_meta {
            return Err(metadata.bad(format!(
                "Metanetkan {} points to another metanetkan",
                uri
            )));
        }

        let local_spec = metadata.spec_version();
        let target_spec = target.get("spec_version").and_then(SpecVersion::from_json);

        let updated = metadata.edit(|json| {
            json.remove(KREF);
            for (key, value) in &target {
                if !json.contains_key(key) {
                    json.insert(key.clone(), value.clone());
                }
            }
            if let Some(kref) = target.get(KREF) {
                json.insert(KREF.into(), kref.clone());
            }
            if let Some(vref) = target.get(VREF) {
                json.insert(VREF.into(), vref.clone());
            }

            let spec = match (local_spec, target_spec) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            if let Some(spec) = spec {
                json.insert("spec_version".into(), spec.to_json());
            }

            let resources = json
                .entry("resources")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(resources) = resources {
                resources.insert("metanetkan".into(), Value::String(uri.clone()));
            }
            Ok(())
        })?;
        Ok(vec![updated])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FixtureSources;
    use serde_json::json;

    const URI: &str = "https://example.com/Mod.netkan";

    fn stage(text: &str) -> MetaNetkanStage {
        MetaNetkanStage::new(Arc::new(FixtureSources::new().with_text(URI, text)))
    }

    fn local(extra: Value) -> Metadata {
        let mut value = json!({
            "spec_version": 1,
            "identifier": "Mod",
            "$kref": format!("#/ckan/netkan/{}", URI),
            "license": "MIT"
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut value, extra) {
            base.extend(extra);
        }
        Metadata::from_value(value).unwrap()
    }

    #[test]
    fn test_remote_fills_missing_properties_only() {
        let remote = r##"{"spec_version": "v1.4", "identifier": "Other", "license": "GPL-3.0",
            "$kref": "#/ckan/github/owner/mod", "$vref": "#/ckan/ksp-avc", "author": "someone"}"##;
        let out = stage(remote)
            .transform(local(json!({})), &mut RunContext::new())
            .unwrap();
        let doc = &out[0];
        assert_eq!(doc.identifier(), "Mod");
        assert_eq!(doc.get("license"), Some(&json!("MIT")));
        assert_eq!(doc.get("author"), Some(&json!("someone")));
        assert_eq!(doc.get("$kref"), Some(&json!("#/ckan/github/owner/mod")));
        assert_eq!(doc.get("$vref"), Some(&json!("#/ckan/ksp-avc")));
        assert_eq!(doc.get("spec_version"), Some(&json!("v1.4")));
        assert_eq!(doc.get("resources"), Some(&json!({"metanetkan": URI})));
    }

    #[test]
    fn test_yaml_target_and_local_spec_version_kept_when_higher() {
        let remote = "spec_version: v1.2\n$kref: '#/ckan/github/owner/mod'\n";
        let out = stage(remote)
            .transform(local(json!({"spec_version": "v1.16"})), &mut RunContext::new())
            .unwrap();
        assert_eq!(out[0].get("spec_version"), Some(&json!("v1.16")));
        assert_eq!(out[0].get("$kref"), Some(&json!("#/ckan/github/owner/mod")));
    }

    #[test]
    fn test_nested_metanetkan_is_rejected() {
        let remote = r##"{"$kref": "#/ckan/netkan/https://example.com/Other.netkan"}"##;
        let err = stage(remote)
            .transform(local(json!({})), &mut RunContext::new())
            .unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_other_references_pass_through() {
        let input = Metadata::from_value(json!({"identifier": "Mod", "$kref": "#/ckan/github/a/b"})).unwrap();
        let out = stage("{}").transform(input.clone(), &mut RunContext::new()).unwrap();
        assert!(out[0].same_document(&input));
    }
}
