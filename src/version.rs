//! Tool version parsing and range gating.
//!
//! Scenarios may restrict themselves to a range of tool versions. The gate
//! is a declarative predicate evaluated once against the version the tool
//! reports, before any fixture is extracted.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed tool version: dotted numeric components plus an optional
/// qualifier (`3.9.6`, `4.0.0-rc-1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    components: Vec<u64>,
    qualifier: Option<String>,
}

impl ToolVersion {
    /// Parses a version string.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (numeric, qualifier) = match text.split_once('-') {
            Some((n, q)) => (n, Some(q.to_string())),
            None => (text, None),
        };

        let components = numeric
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| Error::Config(format!("invalid version component in '{}'", text)))
            })
            .collect::<Result<Vec<u64>>>()?;

        if components.is_empty() {
            return Err(Error::Config(format!("empty version: '{}'", text)));
        }

        Ok(Self {
            components,
            qualifier,
        })
    }

    /// Finds the first parseable version token in free-form text, such as
    /// the first line of a tool's `--version` output.
    pub fn find_in(text: &str) -> Option<Self> {
        text.split_whitespace()
            .map(|token| token.trim_matches(|c| matches!(c, '(' | ')' | ',' | ';' | '"')))
            .filter(|token| token.starts_with(|c: char| c.is_ascii_digit()))
            .find_map(|token| Self::parse(token).ok())
    }

    fn component(&self, idx: usize) -> u64 {
        self.components.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for ToolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numeric = self
            .components
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        match &self.qualifier {
            Some(q) => write!(f, "{}-{}", numeric, q),
            None => write!(f, "{}", numeric),
        }
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for idx in 0..len {
            match self.component(idx).cmp(&other.component(idx)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }

        // A qualified version precedes its unqualified base (1.0-rc-1 < 1.0).
        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An interval of tool versions in the conventional bracket syntax:
/// `[1.0,2.0)`, `(2.0.8,)`, `[1.0]`, or the unbounded `(,)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Option<(ToolVersion, bool)>,
    upper: Option<(ToolVersion, bool)>,
}

impl VersionRange {
    /// Parses a range expression. Brackets are inclusive, parentheses
    /// exclusive; an empty side is unbounded.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        let lower_inclusive = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(Self::invalid(text)),
        };
        let upper_inclusive = match text.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(Self::invalid(text)),
        };

        let inner = &text[1..text.len() - 1];

        if let Some((lo, hi)) = inner.split_once(',') {
            let lower = match lo.trim() {
                "" => None,
                v => Some((ToolVersion::parse(v)?, lower_inclusive)),
            };
            let upper = match hi.trim() {
                "" => None,
                v => Some((ToolVersion::parse(v)?, upper_inclusive)),
            };
            Ok(Self { lower, upper })
        } else {
            // A single version is only meaningful as an exact match.
            if !(lower_inclusive && upper_inclusive) {
                return Err(Self::invalid(text));
            }
            let exact = ToolVersion::parse(inner)?;
            Ok(Self {
                lower: Some((exact.clone(), true)),
                upper: Some((exact, true)),
            })
        }
    }

    /// The range containing every version.
    pub fn any() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// Returns whether the version falls inside this range.
    pub fn contains(&self, version: &ToolVersion) -> bool {
        if let Some((lower, inclusive)) = &self.lower {
            match version.cmp(lower) {
                Ordering::Less => return false,
                Ordering::Equal if !inclusive => return false,
                _ => {}
            }
        }
        if let Some((upper, inclusive)) = &self.upper {
            match version.cmp(upper) {
                Ordering::Greater => return false,
                Ordering::Equal if !inclusive => return false,
                _ => {}
            }
        }
        true
    }

    fn invalid(text: &str) -> Error {
        Error::Config(format!("invalid version range: '{}'", text))
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> ToolVersion {
        ToolVersion::parse(text).unwrap()
    }

    #[test]
    fn version_parses_components_and_qualifier() {
        let version = v("4.0.0-rc-1");
        assert_eq!(version.to_string(), "4.0.0-rc-1");

        let plain = v("3.9.6");
        assert_eq!(plain.to_string(), "3.9.6");
    }

    #[test]
    fn version_rejects_garbage() {
        assert!(ToolVersion::parse("not-a-version").is_err());
        assert!(ToolVersion::parse("").is_err());
    }

    #[test]
    fn version_ordering_compares_components() {
        assert!(v("2.0.9") > v("2.0.8"));
        assert!(v("2.0") < v("2.0.1"));
        assert!(v("3.0") > v("2.9.9"));
        assert_eq!(v("1.0"), v("1.0"));
    }

    #[test]
    fn version_ordering_zero_extends() {
        assert_eq!(v("1.0").cmp(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn qualified_version_precedes_base() {
        assert!(v("1.0-rc-1") < v("1.0"));
        assert!(v("1.0-alpha") < v("1.0-beta"));
    }

    #[test]
    fn version_find_in_locates_token() {
        let version = ToolVersion::find_in("Apache Tool 3.9.6 (deadbeef)").unwrap();
        assert_eq!(version, v("3.9.6"));
    }

    #[test]
    fn version_find_in_returns_none_without_version() {
        assert!(ToolVersion::find_in("no numbers here").is_none());
    }

    #[test]
    fn range_open_lower_bound() {
        let range = VersionRange::parse("(2.0.8,)").unwrap();
        assert!(!range.contains(&v("2.0.8")));
        assert!(range.contains(&v("2.0.9")));
        assert!(range.contains(&v("4.0")));
    }

    #[test]
    fn range_closed_interval() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.contains(&v("1.0")));
        assert!(range.contains(&v("1.9.9")));
        assert!(!range.contains(&v("2.0")));
        assert!(!range.contains(&v("0.9")));
    }

    #[test]
    fn range_exact_version() {
        let range = VersionRange::parse("[1.0]").unwrap();
        assert!(range.contains(&v("1.0")));
        assert!(!range.contains(&v("1.0.1")));
    }

    #[test]
    fn range_any_contains_everything() {
        let range = VersionRange::any();
        assert!(range.contains(&v("0.0.1")));
        assert!(range.contains(&v("99.99")));

        let parsed = VersionRange::parse("(,)").unwrap();
        assert_eq!(parsed, range);
    }

    #[test]
    fn range_rejects_malformed_input() {
        assert!(VersionRange::parse("1.0,2.0").is_err());
        assert!(VersionRange::parse("(1.0)").is_err());
        assert!(VersionRange::parse("[oops,)").is_err());
    }
}
