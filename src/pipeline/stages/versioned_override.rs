//! Checkpoint that applies matching `x_netkan_override` stanzas.

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::overrides::parse_overrides;
use crate::metadata::{Metadata, OverrideStanza};
use crate::pipeline::stage::{passthrough, Stage};

/// Applies the stanzas whose trigger matches this checkpoint and whose
/// version constraints all hold, in the order they are listed.
#[derive(Debug, Clone, Default)]
pub struct VersionedOverrideStage {
    before: Vec<String>,
    after: Vec<String>,
    untagged: bool,
}

impl VersionedOverrideStage {
    pub fn new(before: Vec<String>, after: Vec<String>, untagged: bool) -> Self {
        Self {
            before,
            after,
            untagged,
        }
    }

    fn triggered(&self, stanza: &OverrideStanza) -> bool {
        match (&stanza.before, &stanza.after) {
            (None, None) => self.untagged,
            (before, after) => {
                before.as_ref().is_some_and(|b| self.before.contains(b))
                    || after.as_ref().is_some_and(|a| self.after.contains(a))
            }
        }
    }
}

impl Stage for VersionedOverrideStage {
    fn name(&self) -> &str {
        "versioned_override"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let stanzas = parse_overrides(&metadata)?;
        if stanzas.is_empty() {
            return passthrough(metadata);
        }

        let version = match metadata.version() {
            Some(version) => version,
            None => {
                log::debug!("{} has no version yet, skipping overrides", metadata.identifier());
                return passthrough(metadata);
            }
        };

        let applicable: Vec<&OverrideStanza> = stanzas
            .iter()
            .filter(|s| self.triggered(s) && s.matches_version(&version))
            .collect();
        if applicable.is_empty() {
            return passthrough(metadata);
        }

        log::debug!(
            "Applying {} override stanza(s) to {} {}",
            applicable.len(),
            metadata.identifier(),
            version
        );
        let overridden = metadata.edit(|json| {
            for stanza in &applicable {
                stanza.apply(json).map_err(|msg| metadata.bad(msg))?;
            }
            Ok(())
        })?;
        Ok(vec![overridden])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn checkpoint(before: &[&str], after: &[&str], untagged: bool) -> VersionedOverrideStage {
        VersionedOverrideStage::new(
            before.iter().map(|s| s.to_string()).collect(),
            after.iter().map(|s| s.to_string()).collect(),
            untagged,
        )
    }

    fn run_one(stage: &VersionedOverrideStage, value: Value) -> Metadata {
        let mut out = stage
            .transform(Metadata::from_value(value).unwrap(), &mut RunContext::new())
            .unwrap();
        assert_eq!(out.len(), 1);
        out.remove(0)
    }

    #[test]
    fn test_game_version_max_goes_through_normalization() {
        let stage = checkpoint(&["X"], &[], false);
        let out = run_one(
            &stage,
            json!({
                "identifier": "Mod",
                "version": "2.5",
                "ksp_version": "1.4",
                "x_netkan_override": [
                    {"before": "X", "version": ">=2.0", "override": {"ksp_version_max": "1.8"}}
                ]
            }),
        );
        assert_eq!(out.get("ksp_version"), None);
        assert_eq!(out.get("ksp_version_min"), Some(&json!("1.4")));
        assert_eq!(out.get("ksp_version_max"), Some(&json!("1.8")));
    }

    #[test]
    fn test_untriggered_stanza_passes_through() {
        let stage = checkpoint(&["Y"], &["Z"], false);
        let input = Metadata::from_value(json!({
            "identifier": "Mod",
            "version": "2.5",
            "x_netkan_override": [{"before": "X", "version": "2.5", "override": {"a": 1}}]
        }))
        .unwrap();
        let out = stage.transform(input.clone(), &mut RunContext::new()).unwrap();
        assert!(out[0].same_document(&input));
    }

    #[test]
    fn test_failing_constraint_skips_stanza() {
        let stage = checkpoint(&["X"], &[], false);
        let out = run_one(
            &stage,
            json!({
                "identifier": "Mod",
                "version": "1.5",
                "x_netkan_override": [
                    {"before": "X", "version": [">=1.0", "<1.5"], "override": {"a": 1}},
                    {"before": "X", "version": [">=1.0", "<=1.5"], "override": {"b": 2}}
                ]
            }),
        );
        assert_eq!(out.get("a"), None);
        assert_eq!(out.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_later_stanzas_overwrite_earlier_ones() {
        let stage = checkpoint(&[], &["X"], false);
        let out = run_one(
            &stage,
            json!({
                "identifier": "Mod",
                "version": "1.0",
                "author": "original",
                "x_netkan_override": [
                    {"after": "X", "version": "1.0", "override": {"author": "first"}},
                    {"after": "X", "version": "1.0", "override": {"author": "second"}, "delete": ["abstract"]}
                ],
                "abstract": "gone"
            }),
        );
        assert_eq!(out.get("author"), Some(&json!("second")));
        assert_eq!(out.get("abstract"), None);
    }

    #[test]
    fn test_untagged_stanzas_only_fire_at_untagged_checkpoint() {
        let doc = json!({
            "identifier": "Mod",
            "version": "1.0",
            "x_netkan_override": [{"version": "1.0", "override": {"a": 1}}]
        });
        assert_eq!(run_one(&checkpoint(&["epoch"], &[], false), doc.clone()).get("a"), None);
        assert_eq!(
            run_one(&checkpoint(&["epoch"], &[], true), doc).get("a"),
            Some(&json!(1))
        );
    }

    #[test]
    fn test_malformed_stanza_fails() {
        let stage = checkpoint(&["X"], &[], false);
        let err = stage
            .transform(
                Metadata::from_value(json!({
                    "identifier": "Mod",
                    "version": "1.0",
                    "x_netkan_override": [{"before": "X", "version": "=>1.0"}]
                }))
                .unwrap(),
                &mut RunContext::new(),
            )
            .unwrap_err();
        assert!(err.is_malformed_input());
        assert!(err.to_string().contains("Mod"));
    }

    proptest! {
        #[test]
        fn prop_application_is_deterministic(
            major in 0u32..4,
            minor in 0u32..10,
            authors in proptest::collection::vec("[a-z]{1,6}", 1..4),
        ) {
            let stanzas: Vec<Value> = authors
                .iter()
                .enumerate()
                .map(|(i, author)| json!({
                    "before": "X",
                    "version": format!(">={}.{}", i, 0),
                    "override": {"author": author, "index": i}
                }))
                .collect();
            let doc = json!({
                "identifier": "Mod",
                "version": format!("{}.{}", major, minor),
                "x_netkan_override": stanzas
            });
            let stage = checkpoint(&["X"], &[], false);

            let first = run_one(&stage, doc.clone());
            let second = run_one(&stage, doc);
            prop_assert_eq!(first.to_value(), second.to_value());
        }
    }
}
