//! Stable error codes reported across the bridge boundary.
//!
//! Internally every failure is a typed error; it is converted to one of these
//! codes only at the boundary.  The string forms are part of the public
//! contract with host code and must never change.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code attached to a failed bridge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No live display surface is attached.
    NoActivity,
    /// The platform rejected the secure-display flag mutation.
    ScreenshotProtectionError,
    EmulatorDetectionError,
    RootDetectionError,
    DeveloperOptionsError,
    DeviceInfoError,
    SecuritySelfCheckError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 7] = [
        ErrorCode::NoActivity,
        ErrorCode::ScreenshotProtectionError,
        ErrorCode::EmulatorDetectionError,
        ErrorCode::RootDetectionError,
        ErrorCode::DeveloperOptionsError,
        ErrorCode::DeviceInfoError,
        ErrorCode::SecuritySelfCheckError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoActivity => "NO_ACTIVITY",
            ErrorCode::ScreenshotProtectionError => "SCREENSHOT_PROTECTION_ERROR",
            ErrorCode::EmulatorDetectionError => "EMULATOR_DETECTION_ERROR",
            ErrorCode::RootDetectionError => "ROOT_DETECTION_ERROR",
            ErrorCode::DeveloperOptionsError => "DEVELOPER_OPTIONS_ERROR",
            ErrorCode::DeviceInfoError => "DEVICE_INFO_ERROR",
            ErrorCode::SecuritySelfCheckError => "SECURITY_SELF_CHECK_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a string that is not a known [`ErrorCode`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}
