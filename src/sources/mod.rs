//! External data adapters consumed by the pipeline.
//!
//! The pipeline never talks to a hosting service directly. Release listings,
//! raw remote files and in-package version files arrive through the narrow
//! traits below, so each host can be swapped for a fixture in tests or in
//! offline runs.
//!
//! Retry and backoff belong to the adapter. The only thing the pipeline
//! learns about a host's reliability is [`ReleaseSource::is_unreliable`].

pub mod fixture;

pub use fixture::{FixtureData, FixtureSources};

use crate::errors::Result;
use crate::metadata::Reference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub url: String,
}

/// An upstream release as reported by a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    #[serde(default, alias = "url")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub prerelease: bool,
}

impl Release {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            download_url: None,
            published: None,
            uploader: None,
            assets: Vec::new(),
            prerelease: false,
        }
    }

    pub fn with_asset(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.assets.push(Asset {
            name: name.into(),
            url: url.into(),
        });
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = Some(uploader.into());
        self
    }

    pub fn as_prerelease(mut self) -> Self {
        self.prerelease = true;
        self
    }
}

/// Descriptive project data a host knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "abstract")]
    pub summary: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub bugtracker: Option<String>,
}

/// The parts of an in-package version file the pipeline uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFile {
    /// Path of the file inside the archive
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ksp_version: Option<String>,
    #[serde(default)]
    pub ksp_version_min: Option<String>,
    #[serde(default)]
    pub ksp_version_max: Option<String>,
}

/// Lists releases for a `$kref` whose source tag is [`ReleaseSource::tag`].
pub trait ReleaseSource: Send + Sync {
    /// The `$kref` source this adapter answers, e.g. `github`.
    fn tag(&self) -> &str;

    /// Releases newest first.
    fn fetch_releases(&self, reference: &Reference, include_prereleases: bool)
        -> Result<Vec<Release>>;

    fn fetch_project_info(&self, reference: &Reference) -> Result<Option<ProjectInfo>>;

    /// Hosts known to return stale or duplicate releases.
    fn is_unreliable(&self) -> bool {
        false
    }
}

/// Fetches a remote text file, e.g. a metanetkan target.
pub trait RawTextSource: Send + Sync {
    fn fetch_raw_text(&self, uri: &str) -> Result<String>;
}

/// Reads a version file out of a downloaded archive.
pub trait VersionFileReader: Send + Sync {
    fn read_version_file(&self, download: &str, locator: Option<&str>)
        -> Result<Option<VersionFile>>;
}

/// Every adapter an inflator needs.
#[derive(Clone)]
pub struct Sources {
    pub releases: Vec<Arc<dyn ReleaseSource>>,
    pub raw_text: Arc<dyn RawTextSource>,
    pub version_files: Arc<dyn VersionFileReader>,
}

impl Sources {
    pub fn from_fixtures(fixtures: FixtureSources) -> Self {
        let fixtures = Arc::new(fixtures);
        Self {
            releases: fixtures.release_sources(),
            raw_text: fixtures.clone(),
            version_files: fixtures,
        }
    }

    /// Tags of every registered release source.
    pub fn release_tags(&self) -> Vec<&str> {
        self.releases.iter().map(|s| s.tag()).collect()
    }
}
