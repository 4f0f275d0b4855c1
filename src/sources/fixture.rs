//! Fixture-backed adapters for offline runs and tests.
//!
//! A fixture file is JSON:
//!
//! ```json
//! {
//!   "releases": { "#/ckan/github/owner/repo": [ { "tag": "v1.0", "assets": [] } ] },
//!   "projects": { "#/ckan/github/owner/repo": { "name": "Repo" } },
//!   "version_files": { "https://example.com/repo-1.0.zip": { "version": "1.0" } },
//!   "texts": { "https://example.com/meta.netkan": "{ ... }" },
//!   "unreliable": ["spacedock"]
//! }
//! ```
//!
//! Raw-text requests missing from `texts` fall back to the local file system
//! (plain paths and `file://` URIs).

use super::{ProjectInfo, Release, ReleaseSource, RawTextSource, VersionFile, VersionFileReader};
use crate::errors::{InflateError, Result};
use crate::metadata::Reference;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub releases: HashMap<String, Vec<Release>>,
    #[serde(default)]
    pub projects: HashMap<String, ProjectInfo>,
    #[serde(default)]
    pub version_files: HashMap<String, VersionFile>,
    #[serde(default)]
    pub texts: HashMap<String, String>,
    #[serde(default)]
    pub unreliable: Vec<String>,
}

/// In-memory answers for every adapter trait.
///
/// ```rust
/// use netkan::sources::{FixtureSources, Release};
///
/// let fixtures = FixtureSources::new()
///     .with_releases("#/ckan/github/owner/repo", vec![Release::new("v1.0")])
///     .with_text("https://example.com/meta.netkan", "{}");
/// assert_eq!(fixtures.release_sources().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixtureSources {
    data: Arc<FixtureData>,
}

impl FixtureSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: FixtureData) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(Self::from_data(serde_json::from_str(contents)?))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded fixtures from {}", path.display());
        Self::from_json(&contents)
    }

    fn data_mut(&mut self) -> &mut FixtureData {
        Arc::make_mut(&mut self.data)
    }

    /// Releases for a `$kref`, newest first.
    pub fn with_releases(mut self, kref: &str, releases: Vec<Release>) -> Self {
        self.data_mut().releases.insert(kref.to_string(), releases);
        self
    }

    pub fn with_project(mut self, kref: &str, project: ProjectInfo) -> Self {
        self.data_mut().projects.insert(kref.to_string(), project);
        self
    }

    pub fn with_version_file(mut self, download: &str, file: VersionFile) -> Self {
        self.data_mut()
            .version_files
            .insert(download.to_string(), file);
        self
    }

    pub fn with_text(mut self, uri: &str, text: &str) -> Self {
        self.data_mut()
            .texts
            .insert(uri.to_string(), text.to_string());
        self
    }

    pub fn with_unreliable(mut self, tag: &str) -> Self {
        self.data_mut().unreliable.push(tag.to_string());
        self
    }

    /// One release source per `$kref` source tag mentioned in the fixtures.
    pub fn release_sources(&self) -> Vec<Arc<dyn ReleaseSource>> {
        let tags: BTreeSet<String> = self
            .data
            .releases
            .keys()
            .chain(self.data.projects.keys())
            .filter_map(|kref| Reference::parse(kref))
            .map(|reference| reference.source)
            .chain(self.data.unreliable.iter().cloned())
            .filter(|tag| tag != "netkan")
            .collect();

        tags.into_iter()
            .map(|tag| Arc::new(self.release_source(&tag)) as Arc<dyn ReleaseSource>)
            .collect()
    }

    pub fn release_source(&self, tag: &str) -> FixtureReleaseSource {
        FixtureReleaseSource {
            tag: tag.to_string(),
            unreliable: self.data.unreliable.iter().any(|t| t == tag),
            data: self.data.clone(),
        }
    }
}

impl RawTextSource for FixtureSources {
    fn fetch_raw_text(&self, uri: &str) -> Result<String> {
        if let Some(text) = self.data.texts.get(uri) {
            return Ok(text.clone());
        }

        let path = uri.strip_prefix("file://").unwrap_or(uri);
        if Path::new(path).is_file() {
            return Ok(std::fs::read_to_string(path)?);
        }
        Err(InflateError::adapter_failure(
            "raw text",
            uri,
            "no fixture text and no local file",
        ))
    }
}

impl VersionFileReader for FixtureSources {
    fn read_version_file(&self, download: &str, locator: Option<&str>) -> Result<Option<VersionFile>> {
        let file = self.data.version_files.get(download);
        Ok(match (file, locator) {
            (Some(file), Some(locator)) => file
                .path
                .as_deref()
                .filter(|path| path.ends_with(locator))
                .map(|_| file.clone()),
            (file, None) => file.cloned(),
            (None, Some(_)) => None,
        })
    }
}

/// The release-listing view of a [`FixtureSources`] for one source tag.
#[derive(Debug, Clone)]
pub struct FixtureReleaseSource {
    tag: String,
    unreliable: bool,
    data: Arc<FixtureData>,
}

impl ReleaseSource for FixtureReleaseSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn fetch_releases(&self, reference: &Reference, include_prereleases: bool) -> Result<Vec<Release>> {
        let releases = self
            .data
            .releases
            .get(&reference.to_string())
            .map(|releases| {
                releases
                    .iter()
                    .filter(|r| include_prereleases || !r.prerelease)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(releases)
    }

    fn fetch_project_info(&self, reference: &Reference) -> Result<Option<ProjectInfo>> {
        Ok(self.data.projects.get(&reference.to_string()).cloned())
    }

    fn is_unreliable(&self) -> bool {
        self.unreliable
    }
}
