//! Release fan-out: one document per upstream release.

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::{Metadata, KREF};
use crate::pipeline::stage::{passthrough, Stage};
use crate::sources::{ProjectInfo, Release, ReleaseSource};
use chrono::SecondsFormat;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Expands a document whose `$kref` names this source into one document per
/// selected release.
pub struct ReleaseStage {
    source: Arc<dyn ReleaseSource>,
}

#[derive(Debug, Default)]
struct HostOptions {
    prereleases: bool,
    asset_match: Option<Regex>,
}

impl ReleaseStage {
    pub fn new(source: Arc<dyn ReleaseSource>) -> Self {
        Self { source }
    }

    /// `x_netkan_<tag>: { prereleases: bool, asset_match: regex }`
    fn host_options(&self, metadata: &Metadata) -> Result<HostOptions> {
        let key = format!("x_netkan_{}", self.source.tag());
        let options = match metadata.get(&key) {
            None | Some(Value::Null) => return Ok(HostOptions::default()),
            Some(Value::Object(options)) => options,
            Some(_) => return Err(metadata.bad(format!("{} must be an object", key))),
        };

        let prereleases = match options.get("prereleases") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(metadata.bad(format!("{}.prereleases must be a bool", key))),
        };
        let asset_match = match options.get("asset_match") {
            None => None,
            Some(Value::String(pattern)) => Some(Regex::new(pattern).map_err(|e| {
                metadata.bad(format!("Invalid {}.asset_match {}: {}", key, pattern, e))
            })?),
            Some(_) => return Err(metadata.bad(format!("{}.asset_match must be a string", key))),
        };
        Ok(HostOptions {
            prereleases,
            asset_match,
        })
    }
}

fn select_download(release: &Release, asset_match: Option<&Regex>) -> Option<String> {
    let asset = match asset_match {
        Some(pattern) => release.assets.iter().find(|a| pattern.is_match(&a.name)),
        None => release
            .assets
            .iter()
            .find(|a| a.name.to_ascii_lowercase().ends_with(".zip")),
    };
    asset
        .map(|a| a.url.clone())
        .or_else(|| release.download_url.clone())
}

fn insert_missing(json: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        if !json.contains_key(key) {
            json.insert(key.to_string(), Value::String(value.clone()));
        }
    }
}

fn apply_project_info(json: &mut Map<String, Value>, project: &ProjectInfo) {
    insert_missing(json, "name", project.name.as_ref());
    insert_missing(json, "abstract", project.summary.as_ref());
    insert_missing(json, "license", project.license.as_ref());

    let links = [
        ("homepage", project.homepage.as_ref()),
        ("repository", project.repository.as_ref()),
        ("bugtracker", project.bugtracker.as_ref()),
    ];
    if links.iter().all(|(_, url)| url.is_none()) {
        return;
    }
    let resources = json
        .entry("resources")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(resources) = resources {
        for (key, url) in links {
            insert_missing(resources, key, url);
        }
    }
}

const DOWNLOAD_FACTS: [&str; 3] = ["download_size", "download_hash", "download_content_type"];

fn release_document(
    metadata: &Metadata,
    release: &Release,
    download: String,
    project: Option<&ProjectInfo>,
) -> Result<Metadata> {
    metadata.edit(|json| {
        json.remove(KREF);
        json.insert("version".into(), Value::String(release.tag.clone()));
        // A download mixed in from a sibling document belongs to another
        // host; the release asset replaces it along with its file facts.
        let previous = json.insert("download".into(), Value::String(download.clone()));
        if previous.is_some_and(|previous| previous != Value::String(download)) {
            for key in DOWNLOAD_FACTS {
                json.remove(key);
            }
        }
        if let Some(published) = release.published {
            json.insert(
                "release_date".into(),
                Value::String(published.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }
        insert_missing(json, "author", release.uploader.as_ref());
        if let Some(project) = project {
            apply_project_info(json, project);
        }
        if release.prerelease {
            json.insert("release_status".into(), Value::String("testing".into()));
        }
        Ok(())
    })
}

impl Stage for ReleaseStage {
    fn name(&self) -> &str {
        self.source.tag()
    }

    fn transform(&self, metadata: Metadata, ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let reference = match metadata.kref()? {
            Some(reference) if reference.source == self.source.tag() => reference,
            _ => return passthrough(metadata),
        };
        let options = self.host_options(&metadata)?;
        let include_prereleases = ctx.prerelease.unwrap_or(options.prereleases);

        if self.source.is_unreliable() {
            ctx.mark_unreliable_source();
        }

        let releases = self.source.fetch_releases(&reference, include_prereleases)?;
        let project = self.source.fetch_project_info(&reference)?;
        log::debug!("{} lists {} releases for {}", self.source.tag(), releases.len(), reference);

        let selected: Vec<&Release> = releases
            .iter()
            .filter(|r| include_prereleases || !r.prerelease)
            .skip(ctx.release_skip.unwrap_or(0))
            .take(ctx.release_limit.unwrap_or(usize::MAX))
            .collect();

        let mut documents = Vec::with_capacity(selected.len());
        for release in selected.into_iter().rev() {
            match select_download(release, options.asset_match.as_ref()) {
                Some(download) => {
                    documents.push(release_document(&metadata, release, download, project.as_ref())?)
                }
                None => log::warn!(
                    "No download found for {} release {}, skipping",
                    metadata.identifier(),
                    release.tag
                ),
            }
        }

        if documents.is_empty() {
            log::warn!("No usable releases found for {}", reference);
            return passthrough(metadata);
        }
        Ok(documents)
    }
}
