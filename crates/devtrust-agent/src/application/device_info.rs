//! Info collector: a fresh [`DeviceSnapshot`] per request.
//!
//! Collection never fails.  Any attribute the platform cannot supply is
//! replaced by its empty/zero value, and the fault is logged at `debug`.

use std::sync::Arc;

use devtrust_core::{BuildProperty, DeviceSnapshot, ProtectionState};
use tracing::debug;

use super::platform::PlatformAccessor;

#[derive(Clone)]
pub struct InfoCollector {
    platform: Arc<dyn PlatformAccessor>,
}

impl InfoCollector {
    pub fn new(platform: Arc<dyn PlatformAccessor>) -> Self {
        Self { platform }
    }

    /// Reads every attribute and pairs it with `protection`.
    pub fn snapshot(&self, protection: ProtectionState) -> DeviceSnapshot {
        DeviceSnapshot {
            manufacturer: self.read(BuildProperty::Manufacturer),
            model: self.read(BuildProperty::Model),
            brand: self.read(BuildProperty::Brand),
            device: self.read(BuildProperty::Device),
            product: self.read(BuildProperty::Product),
            fingerprint: self.read(BuildProperty::Fingerprint),
            sdk_version: self.read(BuildProperty::SdkInt).trim().parse().unwrap_or(0),
            os_release: self.read(BuildProperty::Release),
            is_debuggable_build: self.platform.app_is_debuggable().unwrap_or_else(|e| {
                debug!(error = %e, "debuggable flag unreadable");
                false
            }),
            protection_state: protection,
            build_tags: self.read(BuildProperty::Tags),
            build_type: self.read(BuildProperty::Type),
        }
    }

    fn read(&self, property: BuildProperty) -> String {
        self.platform.build_property(property).unwrap_or_else(|e| {
            let key = property.system_property_key();
            debug!(property = key, error = %e, "build property unreadable");
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::mock::MockPlatform;

    #[test]
    fn test_snapshot_reads_all_build_fields() {
        // Arrange
        let platform = Arc::new(MockPlatform::pixel());
        platform.set_debuggable(true);
        let collector = InfoCollector::new(platform);

        // Act
        let s = collector.snapshot(ProtectionState::Protected);

        // Assert
        assert_eq!(s.model, "Pixel 8");
        assert_eq!(s.sdk_version, 34);
        assert_eq!(s.os_release, "14");
        assert_eq!(s.build_tags, "release-keys");
        assert_eq!(s.build_type, "user");
        assert!(s.is_debuggable_build);
        assert_eq!(s.protection_state, ProtectionState::Protected);
    }

    #[test]
    fn test_unreadable_fields_become_empty_or_zero() {
        let platform = Arc::new(MockPlatform::pixel());
        platform.fail_property(BuildProperty::Model);
        platform.fail_property(BuildProperty::SdkInt);
        let s = InfoCollector::new(platform).snapshot(ProtectionState::Unprotected);
        assert_eq!(s.model, "");
        assert_eq!(s.sdk_version, 0);
        assert_eq!(s.manufacturer, "Google");
    }

    #[test]
    fn test_non_numeric_sdk_is_zero() {
        let platform = Arc::new(MockPlatform::pixel());
        platform.set_property(BuildProperty::SdkInt, "UpsideDownCake");
        let s = InfoCollector::new(platform).snapshot(ProtectionState::Unprotected);
        assert_eq!(s.sdk_version, 0);
    }
}
