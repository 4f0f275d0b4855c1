//! Batch driver for one netkan file.
//!
//! A netkan file holds one or more documents. Each document is completed
//! from its siblings, validated, and run through the main pipeline; the
//! results are merged by version and canonicalized by the finishing
//! pipeline. The caller owns the [`RunContext`] and reads escalation state
//! from it afterwards.

use crate::context::RunContext;
use crate::errors::{InflateError, Result};
use crate::metadata::{merge_group, Metadata};
use crate::pipeline::stages::metanetkan::METANETKAN_SOURCE;
use crate::pipeline::stages::strip::is_internal;
use crate::pipeline::stages::{
    EpochStage, ForceVStage, MetaNetkanStage, PropertySortStage, ReleaseStage, SpecVersionStage,
    StagingLinksStage, StagingStage, StripStage, VersionEditStage, VersionFileStage,
};
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::sources::Sources;
use crate::version::ModuleVersion;
use serde_json::Value;

pub struct Inflator {
    sources: Sources,
    main: Pipeline,
    finishing: Pipeline,
}

impl Inflator {
    pub fn new(sources: Sources) -> Self {
        let main = sources
            .releases
            .iter()
            .fold(
                PipelineBuilder::new().stage(MetaNetkanStage::new(sources.raw_text.clone())),
                |builder, source| builder.stage(ReleaseStage::new(source.clone())),
            )
            .stage(VersionFileStage::new(sources.version_files.clone()))
            .stage(VersionEditStage)
            .stage(ForceVStage)
            .stage(EpochStage)
            .stage(StagingStage)
            .with_overrides()
            .build();

        let finishing = PipelineBuilder::new()
            .stage(SpecVersionStage)
            .stage(PropertySortStage)
            .stage(StagingLinksStage)
            .stage(StripStage)
            .build();

        Self {
            sources,
            main,
            finishing,
        }
    }

    pub fn main_pipeline(&self) -> &Pipeline {
        &self.main
    }

    pub fn finishing_pipeline(&self) -> &Pipeline {
        &self.finishing
    }

    /// Inflate every document of one netkan file.
    ///
    /// Prerelease results come first. With a release limit set, producing
    /// more stable results than the limit is an error.
    pub fn inflate(&self, netkans: &[Metadata], ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let netkans = mix_netkans(netkans)?;
        let identifier = match netkans.first() {
            Some(first) => first.identifier().to_string(),
            None => {
                return Err(InflateError::bad_metadata(
                    "<unknown>",
                    "netkan file contains no documents",
                ))
            }
        };
        for netkan in &netkans {
            self.validate(netkan)?;
        }

        let mut inflated = Vec::new();
        for netkan in netkans {
            inflated.extend(self.main.run(netkan, ctx)?);
        }

        let mut results = Vec::new();
        for group in group_by_version(inflated) {
            let merged = merge_group(&group)?;
            results.extend(self.finishing.run(merged, ctx)?);
        }
        results.sort_by_key(|m| !m.prerelease());

        if let Some(requested) = ctx.release_limit {
            let generated = results.iter().filter(|m| !m.prerelease()).count();
            if generated > requested {
                return Err(InflateError::TooManyReleases {
                    identifier,
                    generated,
                    requested,
                });
            }
        }

        log::info!("Inflated {} into {} documents", identifier, results.len());
        Ok(results)
    }

    fn validate(&self, netkan: &Metadata) -> Result<()> {
        match netkan.get("identifier") {
            Some(Value::String(id)) if !id.trim().is_empty() => {}
            _ => {
                return Err(InflateError::bad_metadata(
                    netkan.identifier(),
                    "identifier must be a non-empty string",
                ))
            }
        }

        netkan.vref()?;
        match netkan.kref()? {
            Some(reference) => {
                let known = reference.source == METANETKAN_SOURCE
                    || self.sources.release_tags().contains(&reference.source.as_str());
                if !known {
                    return Err(InflateError::reference_not_found(
                        netkan.identifier(),
                        reference.to_string(),
                        format!("no source registered for {}", reference.source),
                    ));
                }
            }
            None => {
                if !netkan.contains("version") || netkan.download().is_none() {
                    return Err(netkan.bad("a netkan without $kref needs version and download"));
                }
            }
        }
        Ok(())
    }
}

/// Complete each document with the properties only its siblings have,
/// ignoring their pipeline directives.
fn mix_netkans(netkans: &[Metadata]) -> Result<Vec<Metadata>> {
    if netkans.len() < 2 {
        return Ok(netkans.to_vec());
    }
    netkans
        .iter()
        .enumerate()
        .map(|(i, netkan)| {
            netkan.edit(|json| {
                let siblings = netkans
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .flat_map(|(_, sibling)| sibling.json());
                for (key, value) in siblings {
                    if !is_internal(key) && !json.contains_key(key) {
                        json.insert(key.clone(), value.clone());
                    }
                }
                Ok(())
            })
        })
        .collect()
}

/// Groups in order of first appearance.
fn group_by_version(documents: Vec<Metadata>) -> Vec<Vec<Metadata>> {
    let mut groups: Vec<(Option<ModuleVersion>, Vec<Metadata>)> = Vec::new();
    for document in documents {
        let version = document.version();
        match groups.iter_mut().find(|(v, _)| *v == version) {
            Some((_, group)) => group.push(document),
            None => groups.push((version, vec![document])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FixtureSources, Release};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Metadata {
        Metadata::from_value(value).unwrap()
    }

    fn inflator() -> Inflator {
        let fixtures = FixtureSources::new().with_releases(
            "#/ckan/github/owner/mod",
            vec![
                Release::new("1.1").with_asset("Mod-1.1.zip", "https://example.com/1.1.zip"),
                Release::new("1.0").with_asset("Mod-1.0.zip", "https://example.com/1.0.zip"),
            ],
        );
        Inflator::new(Sources::from_fixtures(fixtures))
    }

    #[test]
    fn test_pipeline_layout() {
        let inflator = inflator();
        let names = inflator.main_pipeline().stage_names();
        let stages: Vec<&str> = names
            .into_iter()
            .filter(|n| *n != "versioned_override")
            .collect();
        assert_eq!(
            stages,
            ["metanetkan", "github", "version_file", "version_edit", "force_v", "epoch", "staging"]
        );
        assert_eq!(inflator.main_pipeline().stage_count(), 15);
        assert_eq!(
            inflator.finishing_pipeline().stage_names(),
            ["spec_version", "property_sort", "staging_links", "strip"]
        );
    }

    #[test]
    fn test_mixing_fills_from_siblings_without_directives() {
        let mixed = mix_netkans(&[
            doc(json!({"identifier": "Mod", "license": "MIT", "$kref": "#/ckan/github/a/b"})),
            doc(json!({"$kref": "#/ckan/spacedock/1", "x_netkan_epoch": 1})),
        ])
        .unwrap();
        assert_eq!(mixed[0].get("x_netkan_epoch"), None);
        assert_eq!(mixed[1].get("identifier"), Some(&json!("Mod")));
        assert_eq!(mixed[1].get("license"), Some(&json!("MIT")));
        assert_eq!(mixed[1].get("$kref"), Some(&json!("#/ckan/spacedock/1")));
    }

    #[test]
    fn test_grouping_keeps_first_appearance_order() {
        let groups = group_by_version(vec![
            doc(json!({"version": "2.0", "n": 1})),
            doc(json!({"version": "1.0", "n": 2})),
            doc(json!({"version": "2.0", "n": 3})),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1][0].get("n"), Some(&json!(2)));
    }

    #[test]
    fn test_validation() {
        let inflator = inflator();
        let mut ctx = RunContext::new();

        let err = inflator.inflate(&[doc(json!({"identifier": ""}))], &mut ctx).unwrap_err();
        assert!(err.is_malformed_input());

        let err = inflator
            .inflate(&[doc(json!({"identifier": "Mod", "$kref": "#/ckan/jenkins/x"}))], &mut ctx)
            .unwrap_err();
        assert!(matches!(err, InflateError::ReferenceNotFound { .. }));

        let err = inflator
            .inflate(&[doc(json!({"identifier": "Mod", "version": "1.0"}))], &mut ctx)
            .unwrap_err();
        assert!(err.is_malformed_input());

        let err = inflator.inflate(&[], &mut ctx).unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_too_many_releases() {
        let inflator = inflator();
        let netkan = doc(json!({"identifier": "Mod", "$kref": "#/ckan/github/owner/mod"}));

        let mut ctx = RunContext::new().with_release_limit(None);
        assert_eq!(inflator.inflate(&[netkan.clone()], &mut ctx).unwrap().len(), 2);

        let mut ctx = RunContext::new();
        let err = inflator
            .inflate(
                &[netkan.clone(), doc(json!({"version": "0.9", "download": "https://example.com/0.9.zip"}))],
                &mut ctx,
            )
            .unwrap_err();
        assert!(matches!(err, InflateError::TooManyReleases { generated: 2, requested: 1, .. }));
    }
}
