// Test utility module for netkan integration tests
#![allow(dead_code)]

use netkan::sources::{FixtureSources, ProjectInfo, Release, VersionFile};
use netkan::{Metadata, RunContext};
use serde_json::Value;

pub const GITHUB_KREF: &str = "#/ckan/github/owner/mod";
pub const SPACEDOCK_KREF: &str = "#/ckan/spacedock/1234";

pub fn zip_release(tag: &str) -> Release {
    Release::new(tag).with_asset(
        format!("Mod-{}.zip", tag),
        format!("https://github.com/owner/mod/releases/download/{}/Mod-{}.zip", tag, tag),
    )
}

/// A repository with three stable releases and one prerelease, newest first.
pub fn github_fixtures() -> FixtureSources {
    FixtureSources::new()
        .with_releases(
            GITHUB_KREF,
            vec![
                zip_release("1.3").with_uploader("owner"),
                zip_release("1.3-rc1").as_prerelease(),
                zip_release("1.2"),
                zip_release("1.1"),
            ],
        )
        .with_project(
            GITHUB_KREF,
            ProjectInfo {
                name: Some("The Mod".into()),
                summary: Some("Does things".into()),
                license: Some("MIT".into()),
                homepage: Some("https://example.com/mod".into()),
                repository: Some("https://github.com/owner/mod".into()),
                bugtracker: Some("https://github.com/owner/mod/issues".into()),
            },
        )
        .with_version_file(
            "https://github.com/owner/mod/releases/download/1.3/Mod-1.3.zip",
            VersionFile {
                path: Some("GameData/Mod/Mod.version".into()),
                version: Some("1.3.0".into()),
                ksp_version_min: Some("1.8".into()),
                ksp_version_max: Some("1.12".into()),
                ..VersionFile::default()
            },
        )
}

pub fn netkan(value: Value) -> Metadata {
    Metadata::from_value(value).expect("netkan must be an object")
}

pub fn version_of(metadata: &Metadata) -> String {
    metadata
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn all_releases() -> RunContext {
    RunContext::new().with_release_limit(None)
}
