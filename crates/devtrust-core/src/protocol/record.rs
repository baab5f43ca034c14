//! Flat key/value payloads.
//!
//! Bridge payloads deliberately have no nested schema: every value is a
//! boolean, a string, or an integer, so any host runtime can marshal them
//! without knowing Rust types.  Keys use the camelCase names host code
//! already expects (`isRooted`, `buildTags`, `sdkInt`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::assessment::SecurityAssessment;
use crate::domain::snapshot::{DeviceSnapshot, SelfCheckStatus};
use crate::domain::verdict::DetectionVerdict;

/// A single payload value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for FlatValue {
    fn from(v: bool) -> Self {
        FlatValue::Bool(v)
    }
}

impl From<i64> for FlatValue {
    fn from(v: i64) -> Self {
        FlatValue::Int(v)
    }
}

impl From<String> for FlatValue {
    fn from(v: String) -> Self {
        FlatValue::Str(v)
    }
}

impl From<&str> for FlatValue {
    fn from(v: &str) -> Self {
        FlatValue::Str(v.to_string())
    }
}

/// An ordered flat record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord(BTreeMap<String, FlatValue>);

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<FlatValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(FlatValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(FlatValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(FlatValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes the record as a JSON object.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── Domain → record conversions ───────────────────────────────────────────────

impl From<&DetectionVerdict> for FlatRecord {
    /// `{ <flagKey>: bool, reason: string, ...evidence }`.
    ///
    /// Evidence keys never overwrite the flag or the reason.
    fn from(v: &DetectionVerdict) -> Self {
        let mut r = FlatRecord::new();
        for (k, val) in &v.evidence {
            r.put(k.clone(), val.clone());
        }
        r.put(v.category.flag_key(), v.detected);
        r.put("reason", v.reason.clone());
        r
    }
}

impl From<&DeviceSnapshot> for FlatRecord {
    fn from(s: &DeviceSnapshot) -> Self {
        let mut r = FlatRecord::new();
        r.put("manufacturer", s.manufacturer.clone())
            .put("model", s.model.clone())
            .put("brand", s.brand.clone())
            .put("device", s.device.clone())
            .put("product", s.product.clone())
            .put("fingerprint", s.fingerprint.clone())
            .put("sdkInt", s.sdk_version)
            .put("release", s.os_release.clone())
            .put("isDebuggable", s.is_debuggable_build)
            .put(
                "screenshotProtectionEnabled",
                s.protection_state.is_protected(),
            )
            .put("buildTags", s.build_tags.clone())
            .put("buildType", s.build_type.clone());
        r
    }
}

impl From<&SelfCheckStatus> for FlatRecord {
    fn from(s: &SelfCheckStatus) -> Self {
        let mut r = FlatRecord::new();
        r.put("moduleAvailable", s.module_available)
            .put(
                "screenshotProtectionEnabled",
                s.protection_state.is_protected(),
            )
            .put("moduleVersion", s.module_version.clone())
            .put("platform", s.platform.clone())
            .put("timestamp", s.timestamp_ms);
        r
    }
}

impl From<&SecurityAssessment> for FlatRecord {
    /// Flattens each violation into `<check>` (reason), `<check>Severity`,
    /// and `<check>Action` keys, e.g. `root_check`, `root_checkSeverity`.
    fn from(a: &SecurityAssessment) -> Self {
        let mut r = FlatRecord::new();
        r.put("assessmentId", a.id.to_string())
            .put("timestamp", a.timestamp_ms)
            .put("securityLevel", a.level.as_str())
            .put("decision", a.decision.as_str())
            .put("violationCount", a.violations.len() as i64);
        for v in &a.violations {
            let key = v.check.as_str();
            r.put(key, v.reason.clone());
            r.put(format!("{key}Severity"), enum_str(&v.severity));
            r.put(format!("{key}Action"), enum_str(&v.action));
        }
        r
    }
}

/// Renders a unit enum through its serde name (`"critical"`, `"block_access"`).
fn enum_str<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::{CheckKind, SecurityLevel};
    use crate::domain::protection::ProtectionState;
    use crate::domain::verdict::DetectionCategory;

    #[test]
    fn test_verdict_record_has_flag_reason_and_evidence() {
        // Arrange
        let v = DetectionVerdict::clear(DetectionCategory::Root)
            .with_evidence("buildTags", "release-keys");

        // Act
        let r = FlatRecord::from(&v);

        // Assert
        assert_eq!(r.get_bool("isRooted"), Some(false));
        assert_eq!(r.get_str("reason"), Some("device not rooted"));
        assert_eq!(r.get_str("buildTags"), Some("release-keys"));
    }

    #[test]
    fn test_evidence_cannot_shadow_reason() {
        let v = DetectionVerdict::detected(DetectionCategory::Emulator, "real reason")
            .with_evidence("reason", "spoofed");
        let r = FlatRecord::from(&v);
        assert_eq!(r.get_str("reason"), Some("real reason"));
    }

    #[test]
    fn test_snapshot_record_reports_protection_as_bool() {
        let s = DeviceSnapshot {
            sdk_version: 34,
            protection_state: ProtectionState::Protected,
            ..Default::default()
        };
        let r = FlatRecord::from(&s);
        assert_eq!(r.get_bool("screenshotProtectionEnabled"), Some(true));
        assert_eq!(r.get_int("sdkInt"), Some(34));
    }

    #[test]
    fn test_record_json_is_flat_object() {
        let mut r = FlatRecord::new();
        r.put("a", true).put("b", 7i64).put("c", "x");
        assert_eq!(r.to_json().unwrap(), r#"{"a":true,"b":7,"c":"x"}"#);
    }

    #[test]
    fn test_assessment_record_flattens_violations() {
        let a = SecurityAssessment::from_findings(
            SecurityLevel::Enterprise,
            vec![(CheckKind::Root, "root binary found: /sbin/su".to_string())],
            42,
        );
        let r = FlatRecord::from(&a);
        assert_eq!(r.get_str("decision"), Some("block"));
        assert_eq!(r.get_int("violationCount"), Some(1));
        assert_eq!(r.get_str("root_check"), Some("root binary found: /sbin/su"));
        assert_eq!(r.get_str("root_checkSeverity"), Some("critical"));
        assert_eq!(r.get_str("root_checkAction"), Some("block_access"));
    }
}
