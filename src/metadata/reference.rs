use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#/ckan/(?P<source>[^/]+)(?:/(?P<id>.+))?$").unwrap());

/// A `$kref` or `$vref`: which adapter to ask, and what to ask it for.
///
/// `#/ckan/github/owner/repo` has source `github` and id `owner/repo`;
/// `#/ckan/ksp-avc` has source `ksp-avc` and an empty id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub source: String,
    pub id: String,
}

impl Reference {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let caps = REFERENCE_PATTERN.captures(value.trim())?;
        Some(Self {
            source: caps.name("source")?.as_str().to_string(),
            id: caps.name("id").map_or(String::new(), |m| m.as_str().to_string()),
        })
    }

    /// The id, or `None` when the reference names only a source.
    pub fn locator(&self) -> Option<&str> {
        if self.id.is_empty() {
            None
        } else {
            Some(&self.id)
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.locator() {
            Some(id) => write!(f, "#/ckan/{}/{}", self.source, id),
            None => write!(f, "#/ckan/{}", self.source),
        }
    }
}
