//! Versioned indicator data supplied to the detection policies.
//!
//! The probes never hard-code the strings they look for.  They receive an
//! [`IndicatorSet`] at construction time, so the lists can be updated (for
//! example from the `[indicators]` table of the config file) without touching
//! probe control flow.
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = ...)]` pointing at the built-in
//! list.  A config file that overrides only `root_binary_paths` keeps the
//! built-in values for everything else.

use serde::{Deserialize, Serialize};

/// The indicator lists consulted by every signal probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Revision of the indicator data; bump whenever a list changes.
    #[serde(default = "default_version")]
    pub version: String,

    // ── Emulator ──────────────────────────────────────────────────────────────
    /// Case-insensitive substrings of the build fingerprint.
    #[serde(default = "default_fingerprint_markers")]
    pub fingerprint_markers: Vec<String>,
    /// Case-insensitive substrings of the model name.
    #[serde(default = "default_model_markers")]
    pub model_markers: Vec<String>,
    /// Case-insensitive substrings of the manufacturer name.
    #[serde(default = "default_manufacturer_markers")]
    pub manufacturer_markers: Vec<String>,
    /// Prefix that, when carried by brand *and* device together, marks a
    /// generic emulator image.
    #[serde(default = "default_generic_prefix")]
    pub generic_prefix: String,
    /// Product ids that belong to emulator images (exact, case-insensitive).
    #[serde(default = "default_emulator_products")]
    pub emulator_products: Vec<String>,
    /// Case-insensitive substrings of the device or product name.
    #[serde(default = "default_emulator_hardware")]
    pub emulator_hardware: Vec<String>,
    /// Telephony operator name reported by emulator radio stubs.
    #[serde(default = "default_operator_sentinel")]
    pub operator_sentinel: String,

    // ── Root ──────────────────────────────────────────────────────────────────
    /// Filesystem locations of privileged binaries, checked in order.
    #[serde(default = "default_root_binary_paths")]
    pub root_binary_paths: Vec<String>,
    /// Build tag carried by images signed with the public test keys.
    #[serde(default = "default_test_keys_tag")]
    pub test_keys_tag: String,
    /// Package ids of root-management applications, checked in order.
    #[serde(default = "default_root_packages")]
    pub root_packages: Vec<String>,
    /// Binary name resolved by the privileged-shell probe.
    #[serde(default = "default_privileged_shell")]
    pub privileged_shell: String,
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IndicatorSet {
    /// The indicator lists shipped with this release.
    pub fn builtin() -> Self {
        Self {
            version: default_version(),
            fingerprint_markers: default_fingerprint_markers(),
            model_markers: default_model_markers(),
            manufacturer_markers: default_manufacturer_markers(),
            generic_prefix: default_generic_prefix(),
            emulator_products: default_emulator_products(),
            emulator_hardware: default_emulator_hardware(),
            operator_sentinel: default_operator_sentinel(),
            root_binary_paths: default_root_binary_paths(),
            test_keys_tag: default_test_keys_tag(),
            root_packages: default_root_packages(),
            privileged_shell: default_privileged_shell(),
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_version() -> String {
    "1".to_string()
}
fn default_fingerprint_markers() -> Vec<String> {
    strings(&["generic", "vbox"])
}
fn default_model_markers() -> Vec<String> {
    strings(&["google_sdk", "emulator", "android sdk built for x86"])
}
fn default_manufacturer_markers() -> Vec<String> {
    strings(&["genymotion"])
}
fn default_generic_prefix() -> String {
    "generic".to_string()
}
fn default_emulator_products() -> Vec<String> {
    strings(&["google_sdk"])
}
fn default_emulator_hardware() -> Vec<String> {
    strings(&["goldfish", "ranchu", "sdk_gphone", "vbox86", "emulator"])
}
fn default_operator_sentinel() -> String {
    "Android".to_string()
}
fn default_root_binary_paths() -> Vec<String> {
    strings(&[
        "/system/app/Superuser.apk",
        "/sbin/su",
        "/system/bin/su",
        "/system/xbin/su",
        "/data/local/xbin/su",
        "/data/local/bin/su",
        "/system/sd/xbin/su",
        "/system/bin/failsafe/su",
        "/data/local/su",
        "/su/bin/su",
    ])
}
fn default_test_keys_tag() -> String {
    "test-keys".to_string()
}
fn default_root_packages() -> Vec<String> {
    strings(&[
        "com.noshufou.android.su",
        "com.noshufou.android.su.elite",
        "eu.chainfire.supersu",
        "com.koushikdutta.superuser",
        "com.thirdparty.superuser",
        "com.yellowes.su",
    ])
}
fn default_privileged_shell() -> String {
    "su".to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_root_paths_start_with_superuser_apk() {
        let set = IndicatorSet::builtin();
        assert_eq!(set.root_binary_paths[0], "/system/app/Superuser.apk");
        assert_eq!(set.root_binary_paths.len(), 10);
    }

    #[test]
    fn test_builtin_fingerprint_markers_exclude_test_keys() {
        // test-keys is a root signal, not an emulator signal
        let set = IndicatorSet::builtin();
        assert!(!set
            .fingerprint_markers
            .iter()
            .any(|m| m.contains("test-keys")));
    }

    #[test]
    fn test_empty_toml_table_yields_builtin_lists() {
        // Arrange / Act
        let set: IndicatorSet = toml::from_str("").expect("empty table must deserialize");

        // Assert
        assert_eq!(set, IndicatorSet::builtin());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        // Arrange
        let src = r#"
version = "2"
root_binary_paths = ["/magisk/su"]
"#;

        // Act
        let set: IndicatorSet = toml::from_str(src).expect("deserialize partial");

        // Assert
        assert_eq!(set.version, "2");
        assert_eq!(set.root_binary_paths, vec!["/magisk/su".to_string()]);
        assert_eq!(set.root_packages, IndicatorSet::builtin().root_packages);
        assert_eq!(set.operator_sentinel, "Android");
    }
}
