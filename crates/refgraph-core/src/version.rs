//! Version gate for decoded documents.
//!
//! Runs against the root's version header before anything is decoded. The
//! outcome of a violation depends on the configured [`Severity`]; a
//! violation is never repaired.

use crate::error::{Error, Result};
use crate::node::VersionHeader;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Format version written by this engine
pub const FORMAT_VERSION: u32 = 1;

/// Oldest format version this engine reads
pub const MIN_SUPPORTED_VERSION: u32 = 1;

/// Version assumed for documents without a header
pub const LEGACY_VERSION: u32 = 0;

/// How a version violation is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ignore,
    Warn,
    #[default]
    Fail,
}

/// Result of a version check that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// Incompatible, reported as a warning and let through
    Warned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionPolicy {
    pub current: u32,
    pub min_supported: u32,
    pub severity: Severity,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            current: FORMAT_VERSION,
            min_supported: MIN_SUPPORTED_VERSION,
            severity: Severity::default(),
        }
    }
}

impl VersionPolicy {
    pub fn new(current: u32, min_supported: u32, severity: Severity) -> Self {
        Self {
            current,
            min_supported,
            severity,
        }
    }

    /// Header written at the root of every encoded document
    pub fn header(&self) -> VersionHeader {
        VersionHeader {
            version: self.current,
            min_version: self.min_supported,
        }
    }

    /// The compatibility rule itself, without severity handling.
    ///
    /// A document newer than the engine is accepted when the engine's
    /// minimum supported version is at or below both its version and its
    /// declared minimum. Any other document must be at least the engine's
    /// minimum supported version. A document whose minimum exceeds its own
    /// version is inconsistent and never accepted.
    pub fn accepts(&self, version: u32, min_version: u32) -> bool {
        if min_version > version {
            return false;
        }
        if version > self.current {
            self.min_supported <= version && self.min_supported <= min_version
        } else {
            version >= self.min_supported
        }
    }

    pub fn check(&self, version: u32, min_version: u32) -> Result<Compatibility> {
        if self.accepts(version, min_version) {
            return Ok(Compatibility::Compatible);
        }
        let error = Error::VersionIncompatible {
            version,
            min_version,
            current: self.current,
            min_supported: self.min_supported,
        };
        match self.severity {
            Severity::Ignore => {
                debug!("Ignoring version mismatch: {}", error);
                Ok(Compatibility::Compatible)
            }
            Severity::Warn => {
                warn!("{}", error);
                Ok(Compatibility::Warned)
            }
            Severity::Fail => Err(error),
        }
    }

    /// Check a root header; a missing header counts as [`LEGACY_VERSION`].
    pub fn check_header(&self, header: Option<VersionHeader>) -> Result<Compatibility> {
        let header = header.unwrap_or(VersionHeader {
            version: LEGACY_VERSION,
            min_version: LEGACY_VERSION,
        });
        self.check(header.version, header.min_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1, true)]
    #[case(2, 1, true)]
    #[case(2, 2, true)]
    #[case(3, 1, true)]
    #[case(1, 2, false)]
    #[case(0, 0, false)]
    fn test_accepts(#[case] version: u32, #[case] min_version: u32, #[case] expected: bool) {
        let policy = VersionPolicy::new(2, 1, Severity::Fail);
        assert_eq!(policy.accepts(version, min_version), expected);
    }

    #[test]
    fn test_newer_document_needs_engine_floor_below_its_own() {
        let policy = VersionPolicy::new(2, 2, Severity::Fail);
        assert!(policy.accepts(5, 3));
        assert!(!policy.accepts(5, 1));
    }

    #[rstest]
    #[case(Severity::Ignore, Some(Compatibility::Compatible))]
    #[case(Severity::Warn, Some(Compatibility::Warned))]
    #[case(Severity::Fail, None)]
    fn test_severity(#[case] severity: Severity, #[case] expected: Option<Compatibility>) {
        let policy = VersionPolicy::new(2, 1, severity);
        let outcome = policy.check(1, 2);
        match expected {
            Some(compat) => assert_eq!(outcome.unwrap(), compat),
            None => assert!(matches!(
                outcome,
                Err(Error::VersionIncompatible {
                    version: 1,
                    min_version: 2,
                    ..
                })
            )),
        }
    }

    #[test]
    fn test_missing_header_is_legacy() {
        let policy = VersionPolicy::default();
        assert!(policy.check_header(None).is_err());
        let lenient = VersionPolicy {
            severity: Severity::Warn,
            ..VersionPolicy::default()
        };
        assert_eq!(lenient.check_header(None).unwrap(), Compatibility::Warned);
    }

    #[test]
    fn test_own_header_is_accepted() {
        let policy = VersionPolicy::default();
        assert_eq!(
            policy.check_header(Some(policy.header())).unwrap(),
            Compatibility::Compatible
        );
    }
}
