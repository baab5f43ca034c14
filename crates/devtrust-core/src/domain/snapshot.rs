//! Device snapshot and module self-check records.

use serde::{Deserialize, Serialize};

use super::protection::ProtectionState;

/// A point-in-time view of device, build, and application attributes.
///
/// Built fresh on every request and never cached: build attributes only change
/// with a reinstall, but the protection state changes at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub manufacturer: String,
    pub model: String,
    pub brand: String,
    pub device: String,
    pub product: String,
    pub fingerprint: String,
    /// API level; `0` when unreadable.
    pub sdk_version: i64,
    pub os_release: String,
    /// Whether the hosting application was built debuggable.
    pub is_debuggable_build: bool,
    pub protection_state: ProtectionState,
    pub build_tags: String,
    pub build_type: String,
}

/// Liveness record returned by the module self-check.
///
/// Fixed shape; producing it never runs a detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfCheckStatus {
    pub module_available: bool,
    pub protection_state: ProtectionState,
    pub module_version: String,
    pub platform: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}
