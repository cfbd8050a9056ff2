//! Best-effort semantic version parsing and range satisfaction.
//!
//! Shared-module catalogs in the wild carry version strings like
//! `"2.1.0"`, `"v14"` or `"0.16"`. Parsing here is deliberately
//! permissive: a leading non-digit prefix is stripped, missing
//! components default to zero and unparsable segments are coerced to
//! zero. `Version::parse` therefore never fails. This is a documented
//! policy, not a defect; hosts that need strict validation should
//! validate before registering descriptors.

use std::fmt;

/// A three-part numeric version. Ordering is lexicographic over
/// (major, minor, patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a version from explicit components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string, best effort.
    ///
    /// A leading non-digit prefix (`v`, `^`, whitespace, ...) is
    /// stripped, the remainder is split on `.` and each of the first
    /// three segments is read as its leading decimal digits. Anything
    /// unparsable becomes 0, so this never fails.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let start = trimmed
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let mut parts = trimmed[start..].split('.');

        let mut next = || parse_segment(parts.next().unwrap_or(""));
        Self {
            major: next(),
            minor: next(),
            patch: next(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Leading decimal digits of a segment, 0 when there are none
/// (`"3-beta"` -> 3, `"beta"` -> 0).
fn parse_segment(segment: &str) -> u64 {
    let digits: String = segment
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Check whether version string `version` satisfies range string `range`.
///
/// Rules, evaluated in order:
/// 1. `*` or `latest` always satisfy.
/// 2. `^x.y.z`: same major, and `version >= x.y.z`.
/// 3. `~x.y.z`: same major and minor, and `version >= x.y.z`.
/// 4. `>=x.y.z`: `version >= x.y.z`, no major constraint.
/// 5. Otherwise: exact string equality.
pub fn satisfies(version: &str, range: &str) -> bool {
    let range = range.trim();
    if range == "*" || range == "latest" {
        return true;
    }

    let v = Version::parse(version);
    if let Some(rest) = range.strip_prefix('^') {
        let rv = Version::parse(rest);
        return v.major == rv.major && v >= rv;
    }
    if let Some(rest) = range.strip_prefix('~') {
        let rv = Version::parse(rest);
        return v.major == rv.major && v.minor == rv.minor && v >= rv;
    }
    if let Some(rest) = range.strip_prefix(">=") {
        return v >= Version::parse(rest);
    }

    version.trim() == range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(Version::parse("2.1.0"), Version::new(2, 1, 0));
        assert_eq!(Version::parse("14"), Version::new(14, 0, 0));
        assert_eq!(Version::parse("0.16"), Version::new(0, 16, 0));
    }

    #[test]
    fn test_parse_is_permissive() {
        assert_eq!(Version::parse("v1.2.3"), Version::new(1, 2, 3));
        assert_eq!(Version::parse("1.2.3-beta.1"), Version::new(1, 2, 3));
        assert_eq!(Version::parse("garbage"), Version::new(0, 0, 0));
        assert_eq!(Version::parse(""), Version::new(0, 0, 0));
        assert_eq!(Version::parse("1..5"), Version::new(1, 0, 5));
    }

    #[test]
    fn test_ordering() {
        assert!(Version::parse("2.0.0") > Version::parse("1.9.9"));
        assert!(Version::parse("1.10.0") > Version::parse("1.9.0"));
        assert!(Version::parse("1.2.10") > Version::parse("1.2.9"));
    }

    #[test]
    fn test_wildcard_and_latest() {
        assert!(satisfies("0.0.1", "*"));
        assert!(satisfies("99.0.0", "latest"));
    }

    #[test]
    fn test_caret_range() {
        assert!(satisfies("1.2.0", "^1.2.0"));
        assert!(satisfies("1.9.9", "^1.2.0"));
        assert!(!satisfies("2.0.0", "^1.2.0"));
        assert!(!satisfies("0.9.9", "^1.2.0"));
    }

    #[test]
    fn test_tilde_range() {
        assert!(satisfies("1.2.0", "~1.2.0"));
        assert!(satisfies("1.2.9", "~1.2.0"));
        assert!(!satisfies("1.3.0", "~1.2.0"));
    }

    #[test]
    fn test_gte_range() {
        assert!(satisfies("1.2.0", ">=1.2.0"));
        assert!(satisfies("2.0.0", ">=1.2.0"));
        assert!(!satisfies("1.1.9", ">=1.2.0"));
    }

    #[test]
    fn test_exact_match_is_string_for_string() {
        assert!(satisfies("1.2.3", "1.2.3"));
        assert!(!satisfies("1.2.3", "1.2.4"));
        // Exact matching happens on the raw strings, not parsed tuples.
        assert!(!satisfies("1.2.3", "v1.2.3"));
    }
}
