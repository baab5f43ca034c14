//! Signal probes: one platform attribute, one indicator check.
//!
//! Every probe follows the same contract:
//!
//! - it reads platform state through [`PlatformAccessor`] and compares it
//!   against the [`IndicatorSet`] it was built with;
//! - it never fails past its boundary.  A platform fault (permission denied,
//!   a failed call) or even a panic inside the probe is downgraded to
//!   [`SignalResult::clear`], so an undeterminable signal can neither raise a
//!   false positive nor abort the policy that owns it.
//!
//! Local probes implement the synchronous [`SignalProbe`] trait.  The one
//! probe that spawns a subprocess implements [`BoundedProbe`] and is always
//! run through [`run_bounded`], which enforces a timeout.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devtrust_core::domain::matching::{match_build_identity, match_hardware_name};
use devtrust_core::{BuildIdentity, BuildProperty, IndicatorSet, SignalResult};
use tracing::{debug, warn};

use super::platform::{PlatformAccessor, PlatformError};

// ── Probe traits ──────────────────────────────────────────────────────────────

/// A check that only touches local state and returns promptly.
pub trait SignalProbe: Send + Sync {
    /// Short stable name used in log fields.
    fn name(&self) -> &'static str;

    /// Inspects the platform.  Errors are handled by [`run_guarded`].
    fn inspect(&self) -> Result<SignalResult, PlatformError>;
}

/// A check that performs I/O beyond local state and must be time-bounded.
#[async_trait]
pub trait BoundedProbe: Send + Sync {
    fn name(&self) -> &'static str;

    async fn inspect(&self) -> Result<SignalResult, PlatformError>;
}

/// Runs a local probe, mapping faults and panics to "not triggered".
pub fn run_guarded(probe: &dyn SignalProbe) -> SignalResult {
    match panic::catch_unwind(AssertUnwindSafe(|| probe.inspect())) {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            debug!(probe = probe.name(), error = %e, "probe fault; treating as not triggered");
            SignalResult::clear()
        }
        Err(_) => {
            debug!(probe = probe.name(), "probe panicked; treating as not triggered");
            SignalResult::clear()
        }
    }
}

/// Runs a bounded probe on its own task under `limit`.
///
/// A probe that does not finish in time is aborted (which kills any child
/// process it owns) and reported as not triggered.  Timeouts add nothing to
/// the verdict evidence.
pub async fn run_bounded(probe: Arc<dyn BoundedProbe>, limit: Duration) -> SignalResult {
    let name = probe.name();
    let mut handle = tokio::spawn(async move { probe.inspect().await });

    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(e))) => {
            debug!(probe = name, error = %e, "probe fault; treating as not triggered");
            SignalResult::clear()
        }
        Ok(Err(join_err)) => {
            debug!(probe = name, error = %join_err, "probe task failed; treating as not triggered");
            SignalResult::clear()
        }
        Err(_) => {
            handle.abort();
            warn!(
                probe = name,
                timeout_ms = limit.as_millis() as u64,
                "probe timed out; treating as not triggered"
            );
            SignalResult::clear()
        }
    }
}

/// Reads the build identity fields, substituting empty strings for any
/// field the platform cannot supply.
pub fn read_build_identity(platform: &dyn PlatformAccessor) -> BuildIdentity {
    let read = |p: BuildProperty| {
        platform.build_property(p).unwrap_or_else(|e| {
            debug!(property = p.system_property_key(), error = %e, "build property unreadable");
            String::new()
        })
    };
    BuildIdentity {
        fingerprint: read(BuildProperty::Fingerprint),
        model: read(BuildProperty::Model),
        manufacturer: read(BuildProperty::Manufacturer),
        brand: read(BuildProperty::Brand),
        device: read(BuildProperty::Device),
        product: read(BuildProperty::Product),
    }
}

// ── Emulator probes ───────────────────────────────────────────────────────────

/// Matches the build identity against the emulator markers.
pub struct BuildFingerprintProbe {
    platform: Arc<dyn PlatformAccessor>,
    indicators: Arc<IndicatorSet>,
}

impl BuildFingerprintProbe {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        Self {
            platform,
            indicators,
        }
    }
}

impl SignalProbe for BuildFingerprintProbe {
    fn name(&self) -> &'static str {
        "build_fingerprint"
    }

    fn inspect(&self) -> Result<SignalResult, PlatformError> {
        let identity = read_build_identity(self.platform.as_ref());
        Ok(match match_build_identity(&identity, &self.indicators) {
            Some(detail) => SignalResult::triggered(detail),
            None => SignalResult::clear(),
        })
    }
}

/// Matches the device and product names against emulator hardware names.
pub struct HardwareNameProbe {
    platform: Arc<dyn PlatformAccessor>,
    indicators: Arc<IndicatorSet>,
}

impl HardwareNameProbe {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        Self {
            platform,
            indicators,
        }
    }
}

impl SignalProbe for HardwareNameProbe {
    fn name(&self) -> &'static str {
        "hardware_name"
    }

    fn inspect(&self) -> Result<SignalResult, PlatformError> {
        let device = self.platform.build_property(BuildProperty::Device)?;
        let product = self.platform.build_property(BuildProperty::Product)?;
        Ok(
            match match_hardware_name(&device, &product, &self.indicators.emulator_hardware) {
                Some(i) => SignalResult::triggered(format!("emulator hardware detected: {i}")),
                None => SignalResult::clear(),
            },
        )
    }
}

/// Compares the telephony operator name with the emulator radio sentinel.
///
/// Devices without telephony report no operator and never trigger.
pub struct NetworkOperatorProbe {
    platform: Arc<dyn PlatformAccessor>,
    indicators: Arc<IndicatorSet>,
}

impl NetworkOperatorProbe {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        Self {
            platform,
            indicators,
        }
    }
}

impl SignalProbe for NetworkOperatorProbe {
    fn name(&self) -> &'static str {
        "network_operator"
    }

    fn inspect(&self) -> Result<SignalResult, PlatformError> {
        let sentinel = &self.indicators.operator_sentinel;
        Ok(match self.platform.network_operator_name()? {
            Some(name) if !sentinel.is_empty() && name == *sentinel => {
                SignalResult::triggered("network operator matches emulator sentinel")
            }
            _ => SignalResult::clear(),
        })
    }
}

// ── Root probes ───────────────────────────────────────────────────────────────

/// Looks for privileged binaries at the known filesystem locations.
pub struct RootBinaryProbe {
    platform: Arc<dyn PlatformAccessor>,
    indicators: Arc<IndicatorSet>,
}

impl RootBinaryProbe {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        Self {
            platform,
            indicators,
        }
    }
}

impl SignalProbe for RootBinaryProbe {
    fn name(&self) -> &'static str {
        "root_binary"
    }

    fn inspect(&self) -> Result<SignalResult, PlatformError> {
        for path in &self.indicators.root_binary_paths {
            // One unreadable path must not hide the ones after it.
            match self.platform.file_exists(path) {
                Ok(true) => {
                    return Ok(SignalResult::triggered(format!("root binary found: {path}")));
                }
                Ok(false) => {}
                Err(e) => debug!(path = %path, error = %e, "root path unreadable"),
            }
        }
        Ok(SignalResult::clear())
    }
}

/// Checks whether the system image is signed with the public test keys.
pub struct BuildTagProbe {
    platform: Arc<dyn PlatformAccessor>,
    indicators: Arc<IndicatorSet>,
}

impl BuildTagProbe {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        Self {
            platform,
            indicators,
        }
    }
}

impl SignalProbe for BuildTagProbe {
    fn name(&self) -> &'static str {
        "build_tags"
    }

    fn inspect(&self) -> Result<SignalResult, PlatformError> {
        let tags = self.platform.build_property(BuildProperty::Tags)?;
        let marker = &self.indicators.test_keys_tag;
        Ok(if !marker.is_empty() && tags.contains(marker.as_str()) {
            SignalResult::triggered(format!("build signed with {marker}"))
        } else {
            SignalResult::clear()
        })
    }
}

/// Looks up known root-management applications by package id.
pub struct RootAppProbe {
    platform: Arc<dyn PlatformAccessor>,
    indicators: Arc<IndicatorSet>,
}

impl RootAppProbe {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        Self {
            platform,
            indicators,
        }
    }
}

impl SignalProbe for RootAppProbe {
    fn name(&self) -> &'static str {
        "root_app"
    }

    fn inspect(&self) -> Result<SignalResult, PlatformError> {
        for package in &self.indicators.root_packages {
            match self.platform.package_installed(package) {
                Ok(true) => {
                    return Ok(SignalResult::triggered(format!(
                        "root management app installed: {package}"
                    )))
                }
                Ok(false) => {}
                Err(e) => debug!(package = %package, error = %e, "package lookup failed"),
            }
        }
        Ok(SignalResult::clear())
    }
}

/// Resolves the privileged shell binary with `which`.
///
/// Triggered when the lookup exits successfully and prints a path.
pub struct PrivilegedShellProbe {
    platform: Arc<dyn PlatformAccessor>,
    indicators: Arc<IndicatorSet>,
}

impl PrivilegedShellProbe {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        Self {
            platform,
            indicators,
        }
    }
}

#[async_trait]
impl BoundedProbe for PrivilegedShellProbe {
    fn name(&self) -> &'static str {
        "privileged_shell"
    }

    async fn inspect(&self) -> Result<SignalResult, PlatformError> {
        let shell = self.indicators.privileged_shell.as_str();
        if shell.is_empty() {
            return Ok(SignalResult::clear());
        }
        let output = self.platform.run_command("which", &[shell]).await?;
        Ok(if output.success && !output.stdout.trim().is_empty() {
            SignalResult::triggered(format!("privileged shell '{shell}' is executable"))
        } else {
            SignalResult::clear()
        })
    }
}

// ── Developer-options probes ──────────────────────────────────────────────────

/// Reads one boolean global setting (non-zero means enabled).
#[derive(Clone)]
pub struct SettingFlagProbe {
    platform: Arc<dyn PlatformAccessor>,
    name: &'static str,
    key: &'static str,
    detail: &'static str,
}

impl SettingFlagProbe {
    pub fn new(
        platform: Arc<dyn PlatformAccessor>,
        name: &'static str,
        key: &'static str,
        detail: &'static str,
    ) -> Self {
        Self {
            platform,
            name,
            key,
            detail,
        }
    }

    /// The setting key this probe reads.
    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl SignalProbe for SettingFlagProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn inspect(&self) -> Result<SignalResult, PlatformError> {
        let enabled = self.platform.global_setting_int(self.key)?.unwrap_or(0) != 0;
        Ok(if enabled {
            SignalResult::triggered(self.detail)
        } else {
            SignalResult::clear()
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
