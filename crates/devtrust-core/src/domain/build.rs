//! Android build metadata.
//!
//! Every field the evaluator reads from the platform's build identity is named
//! by a [`BuildProperty`].  The platform adapter resolves each property
//! independently so one unreadable field never hides the others.

use serde::{Deserialize, Serialize};

/// A single build metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildProperty {
    Manufacturer,
    Model,
    Brand,
    Device,
    Product,
    Fingerprint,
    /// Comma-separated signing tags, e.g. `release-keys` or `test-keys`.
    Tags,
    /// Build variant: `user`, `userdebug` or `eng`.
    Type,
    /// User-visible OS release string, e.g. `"14"`.
    Release,
    /// API level as a decimal string, e.g. `"34"`.
    SdkInt,
}

impl BuildProperty {
    /// All properties, in snapshot order.
    pub const ALL: [BuildProperty; 10] = [
        BuildProperty::Manufacturer,
        BuildProperty::Model,
        BuildProperty::Brand,
        BuildProperty::Device,
        BuildProperty::Product,
        BuildProperty::Fingerprint,
        BuildProperty::Tags,
        BuildProperty::Type,
        BuildProperty::Release,
        BuildProperty::SdkInt,
    ];

    /// The Android system property (`getprop`) key holding this field.
    pub fn system_property_key(self) -> &'static str {
        match self {
            BuildProperty::Manufacturer => "ro.product.manufacturer",
            BuildProperty::Model => "ro.product.model",
            BuildProperty::Brand => "ro.product.brand",
            BuildProperty::Device => "ro.product.device",
            BuildProperty::Product => "ro.product.name",
            BuildProperty::Fingerprint => "ro.build.fingerprint",
            BuildProperty::Tags => "ro.build.tags",
            BuildProperty::Type => "ro.build.type",
            BuildProperty::Release => "ro.build.version.release",
            BuildProperty::SdkInt => "ro.build.version.sdk",
        }
    }
}

/// The build identity fields consulted by the emulator probes.
///
/// Missing fields are empty strings; matchers treat an empty field as
/// "no evidence", never as a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildIdentity {
    pub fingerprint: String,
    pub model: String,
    pub manufacturer: String,
    pub brand: String,
    pub device: String,
    pub product: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_property_has_a_distinct_system_key() {
        let keys: HashSet<&str> = BuildProperty::ALL
            .iter()
            .map(|p| p.system_property_key())
            .collect();
        assert_eq!(keys.len(), BuildProperty::ALL.len());
    }

    #[test]
    fn test_fingerprint_maps_to_ro_build_fingerprint() {
        assert_eq!(
            BuildProperty::Fingerprint.system_property_key(),
            "ro.build.fingerprint"
        );
    }

    #[test]
    fn test_default_identity_is_all_empty() {
        let id = BuildIdentity::default();
        assert!(id.fingerprint.is_empty());
        assert!(id.product.is_empty());
    }
}
