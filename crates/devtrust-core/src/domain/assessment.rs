//! Violations, severities, and the overall trust decision.
//!
//! An assessment runs every enabled check, records each failed one as a
//! [`Violation`], and derives a single [`TrustDecision`] from the strongest
//! recommended action.
//!
//! # Severity and enforcement (for beginners)
//!
//! Each check has a fixed severity: emulators and rooted devices are
//! `Critical` because the OS can no longer be trusted to enforce the secure
//! display flag; developer options and debuggable builds are `High` because
//! they widen the attack surface without breaking it.
//!
//! The [`SecurityLevel`] then decides what to *do* about a severity:
//!
//! | Level        | Critical      | High       | Medium/Low |
//! |--------------|---------------|------------|------------|
//! | `Enterprise` | `BlockAccess` | `WarnUser` | `LogOnly`  |
//! | `High`       | `BlockAccess` | `LogOnly`  | `LogOnly`  |
//! | `Medium`     | `WarnUser`    | `LogOnly`  | `LogOnly`  |
//! | `Low`        | `LogOnly`     | `LogOnly`  | `LogOnly`  |

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::verdict::{DetectionCategory, DetectionVerdict};

/// Reason attached to the application-integrity violation.
pub const DEBUGGABLE_BUILD_REASON: &str = "application is in debug mode";

/// The kinds of check an assessment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Emulator,
    Root,
    DeveloperOptions,
    AppIntegrity,
}

impl CheckKind {
    pub const ALL: [CheckKind; 4] = [
        CheckKind::Emulator,
        CheckKind::Root,
        CheckKind::DeveloperOptions,
        CheckKind::AppIntegrity,
    ];

    /// Stable identifier used in logs, config keys, and bridge payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Emulator => "emulator_check",
            CheckKind::Root => "root_check",
            CheckKind::DeveloperOptions => "developer_options_check",
            CheckKind::AppIntegrity => "app_integrity_check",
        }
    }

    /// Severity of a failed check of this kind.
    pub fn severity(self) -> Severity {
        match self {
            CheckKind::Emulator | CheckKind::Root => Severity::Critical,
            CheckKind::DeveloperOptions | CheckKind::AppIntegrity => Severity::High,
        }
    }
}

impl From<DetectionCategory> for CheckKind {
    fn from(category: DetectionCategory) -> Self {
        match category {
            DetectionCategory::Emulator => CheckKind::Emulator,
            DetectionCategory::Root => CheckKind::Root,
            DetectionCategory::DeveloperOptions => CheckKind::DeveloperOptions,
        }
    }
}

/// How serious a violation is.  Ordered from least to most serious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// What the host should do about a violation.  Ordered by strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    LogOnly,
    WarnUser,
    BlockAccess,
}

/// Enforcement strictness.  See the module docs for the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    #[default]
    Enterprise,
    High,
    Medium,
    Low,
}

impl SecurityLevel {
    /// Maps a severity to the action this level enforces.
    pub fn action_for(self, severity: Severity) -> RecommendedAction {
        use RecommendedAction::*;
        match (self, severity) {
            (SecurityLevel::Enterprise, Severity::Critical) => BlockAccess,
            (SecurityLevel::Enterprise, Severity::High) => WarnUser,
            (SecurityLevel::High, Severity::Critical) => BlockAccess,
            (SecurityLevel::Medium, Severity::Critical) => WarnUser,
            _ => LogOnly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SecurityLevel::Enterprise => "enterprise",
            SecurityLevel::High => "high",
            SecurityLevel::Medium => "medium",
            SecurityLevel::Low => "low",
        }
    }
}

/// Overall outcome of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustDecision {
    Trusted,
    Warn,
    Block,
}

impl TrustDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            TrustDecision::Trusted => "trusted",
            TrustDecision::Warn => "warn",
            TrustDecision::Block => "block",
        }
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub check: CheckKind,
    pub severity: Severity,
    pub reason: String,
    pub action: RecommendedAction,
}

/// The result of running every enabled check once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAssessment {
    pub id: Uuid,
    pub timestamp_ms: i64,
    pub level: SecurityLevel,
    pub violations: Vec<Violation>,
    pub decision: TrustDecision,
}

impl SecurityAssessment {
    /// Builds an assessment from `(check, reason)` findings.
    ///
    /// Findings are kept in the order given.
    pub fn from_findings<I>(level: SecurityLevel, findings: I, timestamp_ms: i64) -> Self
    where
        I: IntoIterator<Item = (CheckKind, String)>,
    {
        let violations: Vec<Violation> = findings
            .into_iter()
            .map(|(check, reason)| {
                let severity = check.severity();
                Violation {
                    check,
                    severity,
                    reason,
                    action: level.action_for(severity),
                }
            })
            .collect();

        let decision = decide(&violations);

        Self {
            id: Uuid::new_v4(),
            timestamp_ms,
            level,
            violations,
            decision,
        }
    }

    /// Caps the action of every violation from an advisory check at
    /// [`RecommendedAction::WarnUser`] and re-derives the decision.
    ///
    /// Advisory checks are those a deployment does not require: they may
    /// warn, but never block on their own.
    pub fn with_advisory<F>(mut self, is_advisory: F) -> Self
    where
        F: Fn(CheckKind) -> bool,
    {
        for v in self.violations.iter_mut().filter(|v| is_advisory(v.check)) {
            v.action = v.action.min(RecommendedAction::WarnUser);
        }
        self.decision = decide(&self.violations);
        self
    }

    /// Returns the violation recorded for `check`, if any.
    pub fn violation(&self, check: CheckKind) -> Option<&Violation> {
        self.violations.iter().find(|v| v.check == check)
    }

    /// Violations at `Critical` severity.
    pub fn critical(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
    }
}

/// The decision follows the strongest recommended action.
fn decide(violations: &[Violation]) -> TrustDecision {
    match violations.iter().map(|v| v.action).max() {
        Some(RecommendedAction::BlockAccess) => TrustDecision::Block,
        Some(RecommendedAction::WarnUser) => TrustDecision::Warn,
        Some(RecommendedAction::LogOnly) | None => TrustDecision::Trusted,
    }
}

/// Turns a positive verdict into an assessment finding.
pub fn finding_for(verdict: &DetectionVerdict) -> Option<(CheckKind, String)> {
    verdict
        .detected
        .then(|| (CheckKind::from(verdict.category), verdict.reason.clone()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_findings_is_trusted() {
        let a = SecurityAssessment::from_findings(SecurityLevel::Enterprise, Vec::new(), 0);
        assert_eq!(a.decision, TrustDecision::Trusted);
        assert!(a.violations.is_empty());
    }

    #[test]
    fn test_enterprise_blocks_on_root() {
        // Arrange
        let findings = vec![(CheckKind::Root, "root binary found: /sbin/su".to_string())];

        // Act
        let a = SecurityAssessment::from_findings(SecurityLevel::Enterprise, findings, 1);

        // Assert
        assert_eq!(a.decision, TrustDecision::Block);
        let v = a.violation(CheckKind::Root).unwrap();
        assert_eq!(v.severity, Severity::Critical);
        assert_eq!(v.action, RecommendedAction::BlockAccess);
    }

    #[test]
    fn test_enterprise_warns_on_developer_options_only() {
        let findings = vec![(CheckKind::DeveloperOptions, "USB debugging enabled".to_string())];
        let a = SecurityAssessment::from_findings(SecurityLevel::Enterprise, findings, 1);
        assert_eq!(a.decision, TrustDecision::Warn);
    }

    #[test]
    fn test_strongest_action_wins() {
        let findings = vec![
            (CheckKind::AppIntegrity, DEBUGGABLE_BUILD_REASON.to_string()),
            (CheckKind::Emulator, "x".to_string()),
        ];
        let a = SecurityAssessment::from_findings(SecurityLevel::Enterprise, findings, 1);
        assert_eq!(a.decision, TrustDecision::Block);
        assert_eq!(a.critical().count(), 1);
    }

    #[test]
    fn test_medium_level_downgrades_critical_to_warn() {
        let findings = vec![(CheckKind::Emulator, "x".to_string())];
        let a = SecurityAssessment::from_findings(SecurityLevel::Medium, findings, 1);
        assert_eq!(a.decision, TrustDecision::Warn);
    }

    #[test]
    fn test_low_level_only_logs() {
        let findings = vec![
            (CheckKind::Emulator, "x".to_string()),
            (CheckKind::Root, "y".to_string()),
        ];
        let a = SecurityAssessment::from_findings(SecurityLevel::Low, findings, 1);
        assert_eq!(a.decision, TrustDecision::Trusted);
        assert_eq!(a.violations.len(), 2);
        assert!(a
            .violations
            .iter()
            .all(|v| v.action == RecommendedAction::LogOnly));
    }

    #[test]
    fn test_advisory_check_warns_instead_of_blocking() {
        // Arrange
        let findings = vec![(CheckKind::Emulator, "x".to_string())];

        // Act
        let a = SecurityAssessment::from_findings(SecurityLevel::Enterprise, findings, 1)
            .with_advisory(|c| c == CheckKind::Emulator);

        // Assert
        assert_eq!(a.decision, TrustDecision::Warn);
        assert_eq!(
            a.violation(CheckKind::Emulator).map(|v| v.action),
            Some(RecommendedAction::WarnUser)
        );
    }

    #[test]
    fn test_advisory_never_raises_log_only() {
        let findings = vec![(CheckKind::Root, "y".to_string())];
        let a = SecurityAssessment::from_findings(SecurityLevel::Low, findings, 1)
            .with_advisory(|_| true);
        assert_eq!(a.decision, TrustDecision::Trusted);
    }

    #[test]
    fn test_finding_for_clear_verdict_is_none() {
        let v = DetectionVerdict::clear(DetectionCategory::Root);
        assert!(finding_for(&v).is_none());
    }

    #[test]
    fn test_finding_for_detected_verdict_carries_reason() {
        let v = DetectionVerdict::detected(DetectionCategory::Emulator, "hardware name matches");
        assert_eq!(
            finding_for(&v),
            Some((CheckKind::Emulator, "hardware name matches".to_string()))
        );
    }

    #[test]
    fn test_security_level_deserializes_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: SecurityLevel,
        }
        let w: Wrapper = toml::from_str("level = \"medium\"").unwrap();
        assert_eq!(w.level, SecurityLevel::Medium);
    }
}
