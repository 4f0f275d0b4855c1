//! `x_netkan_override` stanzas.
//!
//! ```yaml
//! x_netkan_override:
//!   - version: [">=1.2", "<2.0"]
//!     before: epoch
//!     override:
//!       ksp_version_max: "1.8"
//!     delete: [suggests]
//! ```

use super::{json_type_name, Metadata};
use crate::errors::{InflateError, Result};
use crate::version::{
    apply_game_compatibility, CompatibilityMode, GameCompatibility, GameVersion, ModuleVersion,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const OVERRIDE_KEY: &str = "x_netkan_override";

static CONSTRAINT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(?P<op>[<>=]*)\s*(?P<version>.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl Comparator {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "" | "=" => Some(Self::Equal),
            "<" => Some(Self::Less),
            ">" => Some(Self::Greater),
            "<=" => Some(Self::LessOrEqual),
            ">=" => Some(Self::GreaterOrEqual),
            _ => None,
        }
    }
}

/// One `"[op]version"` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    pub comparator: Comparator,
    pub version: ModuleVersion,
}

impl VersionConstraint {
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        let caps = CONSTRAINT_PATTERN
            .captures(value.trim())
            .ok_or_else(|| format!("Unable to parse x_netkan_override version: {}", value))?;
        let op = caps.name("op").map_or("", |m| m.as_str());
        let version = caps.name("version").map_or("", |m| m.as_str()).trim();

        let comparator = Comparator::parse(op)
            .ok_or_else(|| format!("Unknown x_netkan_override comparator: {}", op))?;
        if version.is_empty() {
            return Err(format!("Can't find version in x_netkan_override constraint: {}", value));
        }

        Ok(Self {
            comparator,
            version: ModuleVersion::parse(version),
        })
    }

    pub fn matches(&self, version: &ModuleVersion) -> bool {
        match self.comparator {
            Comparator::Equal => *version == self.version,
            Comparator::Less => *version < self.version,
            Comparator::Greater => *version > self.version,
            Comparator::LessOrEqual => *version <= self.version,
            Comparator::GreaterOrEqual => *version >= self.version,
        }
    }
}

/// A conditional edit keyed on a build phase and a version range.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideStanza {
    pub before: Option<String>,
    pub after: Option<String>,
    pub constraints: Vec<VersionConstraint>,
    pub properties: Map<String, Value>,
    pub delete: Vec<String>,
}

impl OverrideStanza {
    pub fn from_json(value: &Value) -> std::result::Result<Self, String> {
        let stanza = value
            .as_object()
            .ok_or_else(|| format!("override stanza must be an object, found {}", json_type_name(value)))?;

        let constraints = match stanza.get("version") {
            Some(Value::String(s)) => vec![VersionConstraint::parse(s)?],
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .ok_or_else(|| format!("override version must be a string, found {}", item))
                        .and_then(VersionConstraint::parse)
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            _ => return Err(format!("Can't find version in override stanza {}", value)),
        };

        let properties = match stanza.get("override") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(format!("override must be an object, found {}", json_type_name(other)))
            }
        };

        let delete = match stanza.get("delete") {
            None => Vec::new(),
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(String::from)
                        .ok_or_else(|| format!("delete entries must be strings, found {}", item))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(format!("delete must be a list, found {}", json_type_name(other)))
            }
        };

        Ok(Self {
            before: trigger(stanza, "before")?,
            after: trigger(stanza, "after")?,
            constraints,
            properties,
            delete,
        })
    }

    /// Every constraint must hold.
    pub fn matches_version(&self, version: &ModuleVersion) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Distinct versions pinned with `=`; more than one can never match.
    pub fn pinned_versions(&self) -> Vec<&ModuleVersion> {
        let mut pinned: Vec<&ModuleVersion> = Vec::new();
        for constraint in &self.constraints {
            if constraint.comparator == Comparator::Equal && !pinned.contains(&&constraint.version) {
                pinned.push(&constraint.version);
            }
        }
        pinned
    }

    /// Merge `override`, normalizing game versions, then remove `delete`.
    pub fn apply(&self, json: &mut Map<String, Value>) -> std::result::Result<(), String> {
        let mut compat = GameCompatibility::default();
        for (key, value) in &self.properties {
            match key.as_str() {
                "ksp_version" => compat.exact = Some(GameVersion::from_json(value)?),
                "ksp_version_min" => compat.min = Some(GameVersion::from_json(value)?),
                "ksp_version_max" => compat.max = Some(GameVersion::from_json(value)?),
                _ => {
                    json.insert(key.clone(), value.clone());
                }
            }
        }

        if !compat.is_empty() {
            apply_game_compatibility(json, &compat, CompatibilityMode::Replace)?;
        }

        for key in &self.delete {
            json.remove(key);
        }
        Ok(())
    }
}

fn trigger(stanza: &Map<String, Value>, key: &str) -> std::result::Result<Option<String>, String> {
    match stanza.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!(
            "override {} must be a string, found {}",
            key,
            json_type_name(other)
        )),
    }
}

/// All stanzas of a document, validated up front.
pub fn parse_overrides(metadata: &Metadata) -> Result<Vec<OverrideStanza>> {
    let stanzas = match metadata.get(OVERRIDE_KEY) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(metadata.bad(format!(
                "{} must be a list, found {}",
                OVERRIDE_KEY,
                json_type_name(other)
            )))
        }
    };

    stanzas
        .iter()
        .map(|value| {
            let stanza = OverrideStanza::from_json(value).map_err(|msg| metadata.bad(msg))?;
            let pinned = stanza.pinned_versions();
            if pinned.len() > 1 {
                return Err(InflateError::AmbiguousOverride {
                    identifier: metadata.identifier().to_string(),
                    versions: pinned
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
            Ok(stanza)
        })
        .collect()
}
