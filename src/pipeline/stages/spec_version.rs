//! Minimum `spec_version` inference.
//!
//! Clients refuse documents with a spec version newer than they understand,
//! and misread documents that use features newer than the spec version they
//! claim. The stage derives the minimum from the features the document
//! actually uses. Rules are checked from newest to oldest and the first
//! match wins.

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;
use crate::pipeline::stage::{passthrough, Stage};
use crate::version::SpecVersion;
use serde_json::{Map, Value};

const RELATIONSHIPS: [&str; 5] = ["depends", "recommends", "suggests", "supports", "conflicts"];

type Predicate = fn(&Metadata) -> bool;

/// `(minimum version, feature, predicate)`, newest first.
pub const SPEC_VERSION_RULES: &[(SpecVersion, &str, Predicate)] = &[
    (SpecVersion::new(1, 35), "partial download_hash", partial_download_hash),
    (SpecVersion::new(1, 34), "multiple download URLs", |m| {
        matches!(m.get("download"), Some(Value::Array(_)))
    }),
    (SpecVersion::new(1, 31), "any_of with choice_help_text", |m| {
        any_of_entries(m).any(|entry| entry.contains_key("choice_help_text"))
    }),
    (SpecVersion::new(1, 30), "MPL-2.0 license", |m| has_license(m, "MPL-2.0")),
    (SpecVersion::new(1, 29), "Ships/Script install", |m| {
        install_stanzas(m).any(|stanza| {
            ["find", "file", "as"].iter().any(|key| {
                stanza
                    .get(*key)
                    .and_then(Value::as_str)
                    .is_some_and(|path| path.ends_with("Ships/Script"))
            })
        })
    }),
    (SpecVersion::new(1, 28), "dlc kind", |m| kind_is(m, "dlc")),
    (SpecVersion::new(1, 26), "replaced_by or any_of", |m| {
        m.contains("replaced_by")
            || any_of_entries(m).any(|entry| !entry.contains_key("choice_help_text"))
    }),
    (SpecVersion::new(1, 25), "Missions install", |m| install_to_starts_with(m, "Missions")),
    (SpecVersion::new(1, 24), "include_only filters", |m| {
        install_uses(m, "include_only") || install_uses(m, "include_only_regexp")
    }),
    (SpecVersion::new(1, 18), "Unlicense license or install as", |m| {
        has_license(m, "Unlicense") || install_uses(m, "as")
    }),
    (SpecVersion::new(1, 16), "ksp_version_strict", |m| m.contains("ksp_version_strict")),
    (SpecVersion::new(1, 16), "Ships/@thumbs install", |m| {
        install_to_starts_with(m, "Ships/@thumbs")
    }),
    (SpecVersion::new(1, 16), "find_matches_files", |m| install_uses(m, "find_matches_files")),
    (SpecVersion::new(1, 14), "Scenarios install", |m| install_to_starts_with(m, "Scenarios")),
    (SpecVersion::new(1, 12), "Ships install", |m| install_to_starts_with(m, "Ships/")),
    (SpecVersion::new(1, 10), "regexp filters", |m| {
        install_uses(m, "find_regexp") || install_uses(m, "filter_regexp")
    }),
    (SpecVersion::new(1, 8), "multiple licenses", |m| {
        matches!(m.get("license"), Some(Value::Array(_)))
    }),
    (SpecVersion::new(1, 6), "metapackage kind", |m| kind_is(m, "metapackage")),
    (SpecVersion::new(1, 4), "find install", |m| install_uses(m, "find")),
    (SpecVersion::new(1, 2), "WTFPL, supports, or GameData install", |m| {
        has_license(m, "WTFPL") || m.contains("supports") || install_to_starts_with(m, "GameData/")
    }),
];

fn partial_download_hash(metadata: &Metadata) -> bool {
    match metadata.get("download_hash") {
        Some(Value::Object(hash)) => !hash.contains_key("sha1") || !hash.contains_key("sha256"),
        _ => false,
    }
}

fn install_stanzas(metadata: &Metadata) -> impl Iterator<Item = &Map<String, Value>> {
    metadata
        .get("install")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn install_uses(metadata: &Metadata, key: &str) -> bool {
    install_stanzas(metadata).any(|stanza| stanza.contains_key(key))
}

fn install_to_starts_with(metadata: &Metadata, prefix: &str) -> bool {
    install_stanzas(metadata).any(|stanza| {
        stanza
            .get("install_to")
            .and_then(Value::as_str)
            .is_some_and(|target| target.starts_with(prefix))
    })
}

fn any_of_entries(metadata: &Metadata) -> impl Iterator<Item = &Map<String, Value>> {
    RELATIONSHIPS
        .iter()
        .filter_map(|key| metadata.get(key).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
        .filter(|entry| entry.contains_key("any_of"))
}

fn has_license(metadata: &Metadata, license: &str) -> bool {
    match metadata.get("license") {
        Some(Value::String(s)) => s == license,
        Some(Value::Array(items)) => items.iter().any(|item| item.as_str() == Some(license)),
        _ => false,
    }
}

fn kind_is(metadata: &Metadata, kind: &str) -> bool {
    metadata.get("kind").and_then(Value::as_str) == Some(kind)
}

/// The lowest spec version able to represent `metadata`.
pub fn minimum_spec_version(metadata: &Metadata) -> SpecVersion {
    SPEC_VERSION_RULES
        .iter()
        .find(|(_, feature, predicate)| {
            let matched = predicate(metadata);
            if matched {
                log::debug!("{} uses {}", metadata.identifier(), feature);
            }
            matched
        })
        .map_or(SpecVersion::BASELINE, |(version, _, _)| *version)
}

pub struct SpecVersionStage;

impl Stage for SpecVersionStage {
    fn name(&self) -> &str {
        "spec_version"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let minimum = minimum_spec_version(&metadata);
        if metadata.spec_version() == Some(minimum) {
            return passthrough(metadata);
        }

        log::debug!(
            "Setting spec_version of {} to {}",
            metadata.identifier(),
            minimum
        );
        let updated = metadata.edit(|json| {
            json.insert("spec_version".into(), minimum.to_json());
            Ok(())
        })?;
        Ok(vec![updated])
    }
}
