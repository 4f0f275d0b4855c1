//! `$vref: "#/ckan/ksp-avc[/<path>]"` reads the version file shipped inside
//! the download.

use crate::context::RunContext;
use crate::errors::{InflateError, Result};
use crate::metadata::{Metadata, VREF};
use crate::pipeline::stage::{passthrough, Stage};
use crate::sources::{VersionFile, VersionFileReader};
use crate::version::{apply_game_compatibility, CompatibilityMode, GameCompatibility, GameVersion};
use serde_json::Value;
use std::sync::Arc;

pub const VERSION_FILE_SOURCE: &str = "ksp-avc";

const TRUST_VERSION_FILE_KEY: &str = "x_netkan_trust_version_file";

pub struct VersionFileStage {
    reader: Arc<dyn VersionFileReader>,
}

impl VersionFileStage {
    pub fn new(reader: Arc<dyn VersionFileReader>) -> Self {
        Self { reader }
    }
}

fn compatibility(file: &VersionFile) -> std::result::Result<GameCompatibility, String> {
    let parse = |value: &Option<String>| value.as_deref().map(GameVersion::parse).transpose();
    Ok(GameCompatibility {
        exact: parse(&file.ksp_version)?,
        min: parse(&file.ksp_version_min)?,
        max: parse(&file.ksp_version_max)?,
    })
}

impl Stage for VersionFileStage {
    fn name(&self) -> &str {
        "version_file"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let reference = match metadata.vref()? {
            Some(reference) if reference.source == VERSION_FILE_SOURCE => reference,
            _ => return passthrough(metadata),
        };

        let download = metadata.download().ok_or_else(|| {
            InflateError::reference_not_found(
                metadata.identifier(),
                reference.to_string(),
                "no download to read a version file from",
            )
        })?;
        let file = self
            .reader
            .read_version_file(&download, reference.locator())?
            .ok_or_else(|| {
                InflateError::reference_not_found(
                    metadata.identifier(),
                    reference.to_string(),
                    format!("no version file found in {}", download),
                )
            })?;
        let compat = compatibility(&file).map_err(|e| metadata.bad(e))?;

        let trust = metadata.flag(TRUST_VERSION_FILE_KEY);
        let take_version = file
            .version
            .clone()
            .filter(|_| trust || !metadata.contains("version"));

        log::debug!(
            "Version file for {}: version {:?}, game {:?}",
            metadata.identifier(),
            file.version,
            compat
        );
        let updated = metadata.edit(|json| {
            json.remove(VREF);
            if let Some(version) = take_version {
                json.insert("version".into(), Value::String(version));
            }
            if !compat.is_empty() {
                apply_game_compatibility(json, &compat, CompatibilityMode::Widen)
                    .map_err(|e| metadata.bad(e))?;
            }
            Ok(())
        })?;
        Ok(vec![updated])
    }
}
