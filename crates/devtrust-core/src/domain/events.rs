//! Security event names.
//!
//! Events are emitted to the structured log with a stable `event` field so
//! that log pipelines can filter on them.  They are never persisted here.

use super::verdict::DetectionCategory;

/// A security-relevant occurrence worth a structured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityEvent {
    InitializationSuccess,
    InitializationFailed,
    ScreenshotProtectionEnabled,
    ScreenshotProtectionDisabled,
    EmulatorDetected,
    RootDetected,
    DeveloperOptionsEnabled,
    SecurityViolation,
    CriticalViolation,
}

impl SecurityEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityEvent::InitializationSuccess => "initialization_success",
            SecurityEvent::InitializationFailed => "initialization_failed",
            SecurityEvent::ScreenshotProtectionEnabled => "screenshot_protection_enabled",
            SecurityEvent::ScreenshotProtectionDisabled => "screenshot_protection_disabled",
            SecurityEvent::EmulatorDetected => "emulator_detected",
            SecurityEvent::RootDetected => "root_detected",
            SecurityEvent::DeveloperOptionsEnabled => "developer_options_enabled",
            SecurityEvent::SecurityViolation => "security_violation",
            SecurityEvent::CriticalViolation => "critical_violation",
        }
    }

    /// The event raised when a category's detection fires.
    pub fn for_detection(category: DetectionCategory) -> Self {
        match category {
            DetectionCategory::Emulator => SecurityEvent::EmulatorDetected,
            DetectionCategory::Root => SecurityEvent::RootDetected,
            DetectionCategory::DeveloperOptions => SecurityEvent::DeveloperOptionsEnabled,
        }
    }
}

impl std::fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
