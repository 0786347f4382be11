//! Result envelope returned by every extractor

use crate::Infrastructure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong with one unit (file, resource kind, attribute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// File ignored because it does not carry the format marker
    SkippedFile,
    /// File failed to parse and `ignore_errors` was set
    FailedFile,
    /// Resource kind scan failed and `ignore_errors` was set
    FailedScan,
    /// Attribute could not be evaluated statically and was left out
    UnresolvedAttribute,
    /// Referenced module or nested template could not be followed
    UnresolvedModule,
}

/// A non-fatal problem recorded during a discovery pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryWarning {
    /// File path, resource kind or resource/attribute address
    pub unit: String,
    pub kind: WarningKind,
    pub message: String,
}

impl DiscoveryWarning {
    pub fn new(unit: impl Into<String>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.message)
    }
}

/// Infrastructure plus every warning collected while building it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub infrastructure: Infrastructure,
    #[serde(default)]
    pub warnings: Vec<DiscoveryWarning>,
}

impl DiscoveryReport {
    pub fn new(infrastructure: Infrastructure) -> Self {
        Self {
            infrastructure,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: DiscoveryWarning) {
        self.warnings.push(warning);
    }

    /// No unit was skipped, dropped or left unresolved
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &DiscoveryWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Fold another report in; its resources win on ID collision
    pub fn merge(&mut self, other: DiscoveryReport) {
        self.infrastructure.merge(other.infrastructure);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provider;

    #[test]
    fn test_empty_report_is_clean() {
        let report = DiscoveryReport::new(Infrastructure::new(Provider::Azure));
        assert!(report.is_clean());
    }

    #[test]
    fn test_warnings_by_kind() {
        let mut report = DiscoveryReport::new(Infrastructure::new(Provider::Azure));
        report.warn(DiscoveryWarning::new("a.tf", WarningKind::FailedFile, "boom"));
        report.warn(DiscoveryWarning::new(
            "azurerm_x.y.name",
            WarningKind::UnresolvedAttribute,
            "references var.name",
        ));

        assert!(!report.is_clean());
        assert_eq!(report.warnings_of(WarningKind::FailedFile).count(), 1);
        assert_eq!(report.warnings[0].to_string(), "a.tf: boom");
    }
}
