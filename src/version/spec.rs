//! Metadata schema versions (`spec_version`).

use serde_json::Value;
use std::fmt;

/// Schema version a client needs to read a document.
///
/// The baseline is written as the number `1`, later ones as `"v1.N"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecVersion {
    major: u32,
    minor: u32,
}

impl SpecVersion {
    pub const BASELINE: SpecVersion = SpecVersion::new(1, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `1`, `"1"`, `"v1.4"` or `"1.4"`.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let mut parts = body.splitn(2, '.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        Some(Self::new(major, minor))
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|major| u32::try_from(major).ok())
                .map(|major| Self::new(major, 0)),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    pub fn to_json(self) -> Value {
        if self == Self::BASELINE {
            Value::from(1)
        } else {
            Value::String(self.to_string())
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::BASELINE {
            write!(f, "1")
        } else {
            write!(f, "v{}.{}", self.major, self.minor)
        }
    }
}
