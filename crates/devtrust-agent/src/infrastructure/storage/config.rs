//! TOML-based configuration persistence for the trust agent.
//!
//! Reads and writes [`AgentConfig`] at the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DevTrust\config.toml`
//! - Linux:    `~/.config/devtrust/config.toml` (or `$XDG_CONFIG_HOME`)
//! - macOS:    `~/Library/Application Support/DevTrust/config.toml`
//!
//! # Example
//!
//! ```toml
//! [agent]
//! log_level = "debug"
//!
//! [detection]
//! shell_probe_timeout_ms = 300
//! query_timeout_ms = 1500
//! security_level = "high"
//!
//! [checks.developer_options_check]
//! enabled = true
//! required = false
//!
//! [indicators]
//! root_packages = ["com.example.rootmanager"]
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = ...)]`, so the file above is
//! complete: anything it leaves out keeps its built-in value.  The
//! `[indicators]` table is an [`IndicatorSet`] and follows the same rule per
//! list.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devtrust_core::{CheckKind, IndicatorSet, SecurityLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::evaluator::{CheckSettings, EvaluatorSettings};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A `[checks]` key does not name a known check.
    #[error("unknown check '{0}' in [checks]")]
    UnknownCheck(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub detection: DetectionSection,
    /// Per-check switches keyed by check id (`emulator_check`, ...).
    #[serde(default = "default_checks")]
    pub checks: BTreeMap<String, CheckEntry>,
    #[serde(default)]
    pub indicators: IndicatorSet,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Schema version string; bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Platform tag reported by the self-check.
    #[serde(default = "default_platform_tag")]
    pub platform_tag: String,
    /// Whether start-up fails when capture protection cannot be enabled.
    #[serde(default = "default_true")]
    pub protection_required: bool,
}

/// Detection tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionSection {
    /// Upper bound on the privileged-shell lookup, in milliseconds.
    #[serde(default = "default_shell_probe_timeout_ms")]
    pub shell_probe_timeout_ms: u64,
    /// Deadline for each `getprop`/`settings`/`pm` query, in milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default)]
    pub security_level: SecurityLevel,
}

/// Switches for one assessment check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CheckEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub required: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_platform_tag() -> String {
    "android".to_string()
}
fn default_true() -> bool {
    true
}
fn default_shell_probe_timeout_ms() -> u64 {
    500
}
fn default_query_timeout_ms() -> u64 {
    2_000
}
fn default_checks() -> BTreeMap<String, CheckEntry> {
    CheckKind::ALL
        .into_iter()
        .map(|k| {
            let entry = CheckEntry {
                enabled: true,
                // Developer options warn but never block on their own.
                required: k != CheckKind::DeveloperOptions,
            };
            (k.as_str().to_string(), entry)
        })
        .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent: AgentSection::default(),
            detection: DetectionSection::default(),
            checks: default_checks(),
            indicators: IndicatorSet::builtin(),
        }
    }
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
            platform_tag: default_platform_tag(),
            protection_required: default_true(),
        }
    }
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            shell_probe_timeout_ms: default_shell_probe_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            security_level: SecurityLevel::default(),
        }
    }
}

impl AgentConfig {
    /// Converts the file settings into evaluator settings.
    ///
    /// Checks the file does not mention keep their built-in switches.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCheck`] for a `[checks]` key that is not
    /// a known check id.
    pub fn evaluator_settings(&self) -> Result<EvaluatorSettings, ConfigError> {
        let mut merged = default_checks();
        merged.extend(self.checks.iter().map(|(k, v)| (k.clone(), *v)));

        let mut checks = std::collections::HashMap::new();
        for (name, entry) in &merged {
            let kind = CheckKind::ALL
                .into_iter()
                .find(|k| k.as_str() == name)
                .ok_or_else(|| ConfigError::UnknownCheck(name.clone()))?;
            checks.insert(
                kind,
                CheckSettings {
                    enabled: entry.enabled,
                    required: entry.required,
                },
            );
        }
        Ok(EvaluatorSettings {
            platform_tag: self.agent.platform_tag.clone(),
            shell_probe_timeout: Duration::from_millis(self.detection.shell_probe_timeout_ms),
            security_level: self.detection.security_level,
            checks,
            protection_required: self.agent.protection_required,
            ..EvaluatorSettings::default()
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)?
        .join("config.toml"))
}

/// Loads [`AgentConfig`] from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AgentConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AgentConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `DevTrust` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DevTrust"))
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("devtrust"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DevTrust")
        })
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "linux",
        target_os = "android",
        target_os = "macos"
    )))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_expected_detection_settings() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.detection.shell_probe_timeout_ms, 500);
        assert_eq!(cfg.detection.query_timeout_ms, 2_000);
        assert_eq!(cfg.detection.security_level, SecurityLevel::Enterprise);
        assert_eq!(cfg.agent.log_level, "info");
        assert_eq!(cfg.agent.platform_tag, "android");
    }

    #[test]
    fn test_empty_file_parses_to_defaults() {
        let cfg: AgentConfig = toml::from_str("").expect("parse");
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(cfg.checks.len(), 4);
    }

    #[test]
    fn test_partial_indicator_override_keeps_other_lists() {
        // Arrange
        let text = r#"
            [indicators]
            root_packages = ["com.example.rootmanager"]
        "#;

        // Act
        let cfg: AgentConfig = toml::from_str(text).expect("parse");

        // Assert
        assert_eq!(cfg.indicators.root_packages, vec!["com.example.rootmanager"]);
        assert_eq!(
            cfg.indicators.root_binary_paths,
            IndicatorSet::builtin().root_binary_paths
        );
    }

    #[test]
    fn test_evaluator_settings_carry_timeout_and_checks() {
        // Arrange
        let text = r#"
            [detection]
            shell_probe_timeout_ms = 250
            security_level = "medium"

            [checks.emulator_check]
            enabled = false
        "#;
        let cfg: AgentConfig = toml::from_str(text).expect("parse");

        // Act
        let settings = cfg.evaluator_settings().expect("settings");

        // Assert
        assert_eq!(settings.shell_probe_timeout, Duration::from_millis(250));
        assert_eq!(settings.security_level, SecurityLevel::Medium);
        assert!(!settings.check(CheckKind::Emulator).enabled);
        assert!(settings.check(CheckKind::Root).enabled);
    }

    #[test]
    fn test_overriding_one_check_keeps_builtin_switches_for_others() {
        let cfg: AgentConfig =
            toml::from_str("[checks.root_check]\nrequired = false").expect("parse");
        let settings = cfg.evaluator_settings().expect("settings");
        assert!(!settings.check(CheckKind::Root).required);
        assert!(!settings.check(CheckKind::DeveloperOptions).required);
        assert!(settings.check(CheckKind::Emulator).required);
    }

    #[test]
    fn test_unknown_check_is_rejected() {
        let cfg: AgentConfig = toml::from_str("[checks.tamper_check]\nenabled = true").unwrap();
        assert!(matches!(
            cfg.evaluator_settings(),
            Err(ConfigError::UnknownCheck(name)) if name == "tamper_check"
        ));
    }

    #[test]
    fn test_developer_options_not_required_by_default() {
        let settings = AgentConfig::default().evaluator_settings().unwrap();
        assert!(!settings.check(CheckKind::DeveloperOptions).required);
        assert!(settings.check(CheckKind::Root).required);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("devtrust-test-missing-config.toml");
        let _ = std::fs::remove_file(&path);
        assert_eq!(load_config_from(&path).unwrap(), AgentConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("devtrust-cfg-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");
        let mut cfg = AgentConfig::default();
        cfg.detection.shell_probe_timeout_ms = 900;

        // Act
        save_config_to(&cfg, &path).expect("save");
        let restored = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(restored, cfg);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
