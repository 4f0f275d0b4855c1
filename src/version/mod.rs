//! Module version ordering.
//!
//! A module version is `epoch:text` or bare `text` (epoch 0). Comparison
//! looks at the epoch first and then walks both texts in alternating runs:
//! a non-digit run compared as a string, then a digit run compared as an
//! integer, until one side runs out. The side that runs out first is lower,
//! so `1.2 < 1.2.3`.
//!
//! Texts that compare equal segment by segment but are spelled differently
//! (`1.0` and `1.00`) are still distinct versions; their spelling breaks the
//! tie so that equality always means identical epoch and text.

pub mod game;
pub mod spec;

pub use game::{apply_game_compatibility, CompatibilityMode, GameCompatibility, GameVersion};
pub use spec::SpecVersion;

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(?:(?P<epoch>[0-9]+):)?(?P<version>.*)$").unwrap());

/// An epoch-qualified, immutable module version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleVersion {
    epoch: u64,
    text: String,
}

impl ModuleVersion {
    /// Parse `"N:text"` or `"text"`.
    ///
    /// An epoch too large to represent is kept as part of the text.
    pub fn parse(value: &str) -> Self {
        let parsed = VERSION_PATTERN.captures(value).and_then(|caps| {
            let epoch = match caps.name("epoch") {
                Some(m) => m.as_str().parse::<u64>().ok()?,
                None => 0,
            };
            let text = caps.name("version").map_or("", |m| m.as_str());
            Some((epoch, text.to_string()))
        });

        match parsed {
            Some((epoch, text)) => Self { epoch, text },
            None => Self {
                epoch: 0,
                text: value.to_string(),
            },
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The version without its epoch prefix.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Same text, epoch raised by one. `None` once the epoch is at `u64::MAX`.
    pub fn increment_epoch(&self) -> Option<Self> {
        self.epoch.checked_add(1).map(|epoch| self.with_epoch(epoch))
    }

    /// Same text, given epoch.
    pub fn with_epoch(&self, epoch: u64) -> Self {
        Self {
            epoch,
            text: self.text.clone(),
        }
    }
}

impl From<&str> for ModuleVersion {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch == 0 {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{}:{}", self.epoch, self.text)
        }
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_text(&self.text, &other.text))
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (mut a_rest, mut b_rest) = (a, b);
    while !a_rest.is_empty() && !b_rest.is_empty() {
        let (a_str, a_tail) = split_run(a_rest, |c| !c.is_ascii_digit());
        let (b_str, b_tail) = split_run(b_rest, |c| !c.is_ascii_digit());
        let ord = compare_string_runs(a_str, b_str);
        if ord != Ordering::Equal {
            return ord;
        }

        let (a_num, a_tail) = split_run(a_tail, |c| c.is_ascii_digit());
        let (b_num, b_tail) = split_run(b_tail, |c| c.is_ascii_digit());
        let ord = compare_number_runs(a_num, b_num);
        if ord != Ordering::Equal {
            return ord;
        }

        a_rest = a_tail;
        b_rest = b_tail;
    }

    match (a_rest.is_empty(), b_rest.is_empty()) {
        (true, true) => a.cmp(b),
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn split_run(s: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// A run starting with `.` beats any other non-empty run, and a lone `.`
/// beats a longer dotted run (`1.0 > 1.a`).
fn compare_string_runs(a: &str, b: &str) -> Ordering {
    if !a.is_empty() && !b.is_empty() {
        match (a.starts_with('.'), b.starts_with('.')) {
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            (true, true) if a == "." && b.len() > 1 => return Ordering::Greater,
            (true, true) if b == "." && a.len() > 1 => return Ordering::Less,
            _ => {}
        }
    }
    a.cmp(b)
}

/// Integer comparison of digit runs of any length; an empty run counts as 0.
fn compare_number_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
