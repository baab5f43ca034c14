//! Probe results and per-category verdicts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of a single signal probe.
///
/// `detail` is a human-readable reason and is empty when the probe did not
/// trigger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalResult {
    pub triggered: bool,
    pub detail: String,
}

impl SignalResult {
    /// A probe that found its indicator.
    pub fn triggered(detail: impl Into<String>) -> Self {
        Self {
            triggered: true,
            detail: detail.into(),
        }
    }

    /// A probe that found nothing, or could not determine its signal.
    pub fn clear() -> Self {
        Self::default()
    }
}

/// The three independent detection questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionCategory {
    Emulator,
    Root,
    DeveloperOptions,
}

impl DetectionCategory {
    /// Reason reported when no probe in the category triggered.
    pub fn clear_reason(self) -> &'static str {
        match self {
            DetectionCategory::Emulator => "genuine device",
            DetectionCategory::Root => "device not rooted",
            DetectionCategory::DeveloperOptions => "developer options disabled",
        }
    }

    /// Key carrying the boolean verdict in bridge payloads.
    pub fn flag_key(self) -> &'static str {
        match self {
            DetectionCategory::Emulator => "isEmulator",
            DetectionCategory::Root => "isRooted",
            DetectionCategory::DeveloperOptions => "isDeveloperOptionsEnabled",
        }
    }
}

/// The verdict for one detection category.
///
/// `evidence` holds the raw attributes the policy consulted, attached whether
/// or not detection triggered.  A `BTreeMap` keeps key order stable so audit
/// output is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub category: DetectionCategory,
    pub detected: bool,
    pub reason: String,
    pub evidence: BTreeMap<String, String>,
}

impl DetectionVerdict {
    /// A positive verdict with the given reason.
    pub fn detected(category: DetectionCategory, reason: impl Into<String>) -> Self {
        Self {
            category,
            detected: true,
            reason: reason.into(),
            evidence: BTreeMap::new(),
        }
    }

    /// A negative verdict carrying the category's fixed sentinel reason.
    pub fn clear(category: DetectionCategory) -> Self {
        Self {
            category,
            detected: false,
            reason: category.clear_reason().to_string(),
            evidence: BTreeMap::new(),
        }
    }

    /// Attaches one evidence attribute.
    pub fn with_evidence(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_signal_has_empty_detail() {
        let r = SignalResult::clear();
        assert!(!r.triggered);
        assert!(r.detail.is_empty());
    }

    #[test]
    fn test_clear_verdict_uses_category_sentinel() {
        let v = DetectionVerdict::clear(DetectionCategory::Root);
        assert!(!v.detected);
        assert_eq!(v.reason, "device not rooted");
    }

    #[test]
    fn test_with_evidence_overwrites_same_key() {
        let v = DetectionVerdict::clear(DetectionCategory::Emulator)
            .with_evidence("model", "a")
            .with_evidence("model", "b");
        assert_eq!(v.evidence.len(), 1);
        assert_eq!(v.evidence["model"], "b");
    }
}
