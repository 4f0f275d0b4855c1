//! Canonical property order, so regenerated files diff cleanly.

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;
use crate::pipeline::stage::{passthrough, Stage};
use serde_json::{Map, Value};
use std::cmp::Ordering;

const PROPERTY_ORDER: &[&str] = &[
    "spec_version",
    "comment",
    "identifier",
    "name",
    "abstract",
    "description",
    "author",
    "kind",
    "version",
    "ksp_version",
    "ksp_version_min",
    "ksp_version_max",
    "ksp_version_strict",
    "license",
    "release_status",
    "resources",
    "tags",
    "localizations",
    "provides",
    "depends",
    "recommends",
    "suggests",
    "supports",
    "conflicts",
    "replaced_by",
    "download",
    "download_size",
    "download_hash",
    "download_content_type",
    "install_size",
    "release_date",
    "install",
];

const RESOURCE_ORDER: &[&str] = &[
    "homepage",
    "spacedock",
    "curse",
    "repository",
    "bugtracker",
    "discussions",
    "ci",
    "license",
    "manual",
    "metanetkan",
    "remote-avc",
    "remote-swinfo",
    "store",
    "steamstore",
    "gogstore",
    "epicstore",
];

/// Known keys in table order, then unknown keys, then `x_` extension keys.
/// Ties break alphabetically.
fn sort_rank(key: &str, order: &[&str]) -> (usize, usize) {
    match order.iter().position(|k| *k == key) {
        Some(index) => (0, index),
        None if key.starts_with("x_") => (2, 0),
        None => (1, 0),
    }
}

fn compare_keys(a: &str, b: &str, order: &[&str]) -> Ordering {
    sort_rank(a, order)
        .cmp(&sort_rank(b, order))
        .then_with(|| a.cmp(b))
}

fn sorted(map: &Map<String, Value>, order: &[&str]) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b, order));
    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn is_sorted(map: &Map<String, Value>, order: &[&str]) -> bool {
    let keys: Vec<&String> = map.keys().collect();
    keys.windows(2)
        .all(|pair| compare_keys(pair[0], pair[1], order) != Ordering::Greater)
}

pub struct PropertySortStage;

impl Stage for PropertySortStage {
    fn name(&self) -> &str {
        "property_sort"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let resources_sorted = match metadata.get("resources") {
            Some(Value::Object(resources)) => is_sorted(resources, RESOURCE_ORDER),
            _ => true,
        };
        if resources_sorted && is_sorted(metadata.json(), PROPERTY_ORDER) {
            return passthrough(metadata);
        }

        let updated = metadata.edit(|json| {
            let mut result = sorted(json, PROPERTY_ORDER);
            if let Some(Value::Object(resources)) = result.get_mut("resources") {
                *resources = sorted(resources, RESOURCE_ORDER);
            }
            *json = result;
            Ok(())
        })?;
        Ok(vec![updated])
    }
}
