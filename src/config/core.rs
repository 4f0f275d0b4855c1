use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_INDENT: usize = 4;
pub const MAX_INDENT: usize = 8;

/// How many upstream releases to inflate: a count, or `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReleaseCount {
    Count(usize),
    All(AllReleases),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllReleases {
    All,
}

impl ReleaseCount {
    pub fn limit(self) -> Option<usize> {
        match self {
            ReleaseCount::Count(n) => Some(n),
            ReleaseCount::All(_) => None,
        }
    }
}

impl Default for ReleaseCount {
    fn default() -> Self {
        ReleaseCount::Count(1)
    }
}

/// `[inflate]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InflateConfig {
    pub releases: ReleaseCount,
    pub skip_releases: Option<usize>,
    pub prerelease: Option<bool>,
    pub allow_out_of_order: bool,
    pub staging_links: bool,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self {
            releases: ReleaseCount::default(),
            skip_releases: None,
            prerelease: None,
            allow_out_of_order: false,
            staging_links: true,
        }
    }
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            indent: DEFAULT_INDENT,
        }
    }
}

/// Contents of `.netkan.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetkanConfig {
    pub inflate: InflateConfig,
    pub output: OutputConfig,
}

impl NetkanConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.output.indent > MAX_INDENT {
            return Err(format!(
                "output.indent must be between 0 and {}, got {}",
                MAX_INDENT, self.output.indent
            ));
        }
        Ok(())
    }
}
