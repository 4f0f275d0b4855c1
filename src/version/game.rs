//! Game versions and the compatibility normalization helper.
//!
//! A document states game compatibility through `ksp_version` (exact),
//! `ksp_version_min` and `ksp_version_max`. Every writer of those properties
//! goes through [`apply_game_compatibility`] so the output always uses the
//! smallest representation: one exact version when both bounds agree,
//! otherwise whichever bounds exist.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

pub const GAME_VERSION_KEYS: [&str; 3] = ["ksp_version", "ksp_version_min", "ksp_version_max"];

/// `major[.minor[.patch[.build]]]`, or `any` when it has no components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameVersion {
    components: Vec<u32>,
}

impl GameVersion {
    pub fn any() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("any") {
            return Ok(Self::any());
        }

        let components = trimmed
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| format!("Invalid game version: {}", value))?;

        if components.is_empty() || components.len() > 4 {
            return Err(format!("Invalid game version: {}", value));
        }
        Ok(Self { components })
    }

    /// Read a game version property, which YAML authors often write as a number.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Self::parse(&n.to_string()),
            other => Err(format!("Invalid game version: {}", other)),
        }
    }

    pub fn is_any(&self) -> bool {
        self.components.is_empty()
    }

    /// Ordering as a lower bound: `1.8` admits `1.8.0`, so it sorts below `1.8.1`.
    fn cmp_as_lower(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }

    /// Ordering as an upper bound: `1.8` admits `1.8.9`, so it sorts above `1.8.1`.
    fn cmp_as_upper(&self, other: &Self) -> Ordering {
        for (a, b) in self.components.iter().zip(&other.components) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        other.components.len().cmp(&self.components.len())
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return write!(f, "any");
        }
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// How incoming compatibility combines with what the document already says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityMode {
    /// Incoming bounds win where given (override stanzas)
    Replace,
    /// The union of both ranges (in-package version files)
    Widen,
}

/// The three game-version properties, parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameCompatibility {
    pub exact: Option<GameVersion>,
    pub min: Option<GameVersion>,
    pub max: Option<GameVersion>,
}

impl GameCompatibility {
    pub fn from_json(json: &Map<String, Value>) -> Result<Self, String> {
        let read = |key: &str| json.get(key).map(GameVersion::from_json).transpose();
        Ok(Self {
            exact: read("ksp_version")?,
            min: read("ksp_version_min")?,
            max: read("ksp_version_max")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.min.is_none() && self.max.is_none()
    }

    fn lower(&self) -> Option<GameVersion> {
        self.min.clone().or_else(|| self.exact.clone())
    }

    fn upper(&self) -> Option<GameVersion> {
        self.max.clone().or_else(|| self.exact.clone())
    }
}

/// Merge `incoming` into the game-version properties of `json`.
///
/// `None` means "no claim"; an explicit `any` means unbounded.
pub fn apply_game_compatibility(
    json: &mut Map<String, Value>,
    incoming: &GameCompatibility,
    mode: CompatibilityMode,
) -> Result<(), String> {
    let existing = GameCompatibility::from_json(json)?;

    let (lower, upper) = match mode {
        CompatibilityMode::Replace => (
            incoming.lower().or_else(|| existing.lower()),
            incoming.upper().or_else(|| existing.upper()),
        ),
        CompatibilityMode::Widen => (
            widen(existing.lower(), incoming.lower(), |a, b| a.cmp_as_lower(b)),
            widen(existing.upper(), incoming.upper(), |a, b| b.cmp_as_upper(a)),
        ),
    };

    for key in GAME_VERSION_KEYS {
        json.remove(key);
    }

    match (lower, upper) {
        (Some(lo), Some(hi)) if lo == hi => {
            json.insert("ksp_version".into(), Value::String(lo.to_string()));
        }
        (lower, upper) => {
            if let Some(lo) = lower.filter(|v| !v.is_any()) {
                json.insert("ksp_version_min".into(), Value::String(lo.to_string()));
            }
            if let Some(hi) = upper.filter(|v| !v.is_any()) {
                json.insert("ksp_version_max".into(), Value::String(hi.to_string()));
            }
        }
    }
    Ok(())
}

/// Pick the wider of two bounds; `any` absorbs everything, no claim yields to a claim.
fn widen<F>(a: Option<GameVersion>, b: Option<GameVersion>, lower_first: F) -> Option<GameVersion>
where
    F: Fn(&GameVersion, &GameVersion) -> Ordering,
{
    match (a, b) {
        (Some(a), _) if a.is_any() => Some(a),
        (_, Some(b)) if b.is_any() => Some(b),
        (Some(a), Some(b)) => {
            if lower_first(&a, &b) == Ordering::Greater {
                Some(b)
            } else {
                Some(a)
            }
        }
        (a, b) => a.or(b),
    }
}
