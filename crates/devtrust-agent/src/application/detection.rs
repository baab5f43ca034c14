//! Detection policies: one per category, each an ordered list of probes.
//!
//! A policy is built once from a platform accessor and an [`IndicatorSet`].
//! Its probe order is fixed at construction and never changes, so for a
//! given device state the reported reason is always the same.
//!
//! | Policy                     | Probes (in order)                                          | Mode         |
//! |----------------------------|------------------------------------------------------------|--------------|
//! | [`EmulatorPolicy`]         | build fingerprint, hardware name, network operator          | first match  |
//! | [`RootPolicy`]             | root binary, build tags, root app, privileged shell (timed) | first match  |
//! | [`DeveloperOptionsPolicy`] | USB debugging, development settings                         | all active   |
//!
//! Every policy attaches a fixed whitelist of raw attributes to the verdict
//! evidence whether or not anything triggered.

use std::sync::Arc;
use std::time::Duration;

use devtrust_core::domain::policy::{evaluate, first_match, verdict_from};
use devtrust_core::{BuildProperty, DetectionCategory, DetectionVerdict, IndicatorSet};
use tracing::debug;

use super::platform::{PlatformAccessor, SETTING_ADB_ENABLED, SETTING_DEVELOPMENT_ENABLED};
use super::probes::{
    read_build_identity, run_bounded, run_guarded, BoundedProbe, BuildFingerprintProbe,
    BuildTagProbe, HardwareNameProbe, NetworkOperatorProbe, PrivilegedShellProbe, RootAppProbe,
    RootBinaryProbe, SettingFlagProbe, SignalProbe,
};

/// Default bound on the privileged-shell lookup.
pub const DEFAULT_SHELL_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

// ── Emulator ──────────────────────────────────────────────────────────────────

/// Answers "is this a simulated environment?".
///
/// Cloning is cheap and shares the probes, so a clone can be moved onto the
/// blocking pool.
#[derive(Clone)]
pub struct EmulatorPolicy {
    platform: Arc<dyn PlatformAccessor>,
    probes: Arc<[Box<dyn SignalProbe>]>,
}

impl EmulatorPolicy {
    pub fn new(platform: Arc<dyn PlatformAccessor>, indicators: Arc<IndicatorSet>) -> Self {
        let probes: Vec<Box<dyn SignalProbe>> = vec![
            Box::new(BuildFingerprintProbe::new(platform.clone(), indicators.clone())),
            Box::new(HardwareNameProbe::new(platform.clone(), indicators.clone())),
            Box::new(NetworkOperatorProbe::new(platform.clone(), indicators)),
        ];
        Self {
            platform,
            probes: probes.into(),
        }
    }

    /// Runs the probes in order and stops at the first one that triggers.
    pub fn evaluate(&self) -> DetectionVerdict {
        let verdict = evaluate(
            DetectionCategory::Emulator,
            self.probes.iter().map(|p| run_guarded(p.as_ref())),
        );
        let identity = read_build_identity(self.platform.as_ref());
        verdict
            .with_evidence("fingerprint", identity.fingerprint)
            .with_evidence("model", identity.model)
            .with_evidence("manufacturer", identity.manufacturer)
    }
}

// ── Root ──────────────────────────────────────────────────────────────────────

/// Answers "has the privilege model been subverted?".
///
/// The three local probes run first, on the blocking pool: they shell out
/// to synchronous tools (`pm`, `getprop`) that may stall, and the runtime
/// thread must stay free meanwhile.  The privileged-shell lookup only runs
/// when none of them triggered, and is bounded by `shell_timeout`.
pub struct RootPolicy {
    platform: Arc<dyn PlatformAccessor>,
    local: Arc<[Box<dyn SignalProbe>]>,
    shell: Arc<dyn BoundedProbe>,
    shell_timeout: Duration,
}

impl RootPolicy {
    pub fn new(
        platform: Arc<dyn PlatformAccessor>,
        indicators: Arc<IndicatorSet>,
        shell_timeout: Duration,
    ) -> Self {
        let local: Vec<Box<dyn SignalProbe>> = vec![
            Box::new(RootBinaryProbe::new(platform.clone(), indicators.clone())),
            Box::new(BuildTagProbe::new(platform.clone(), indicators.clone())),
            Box::new(RootAppProbe::new(platform.clone(), indicators.clone())),
        ];
        let shell: Arc<dyn BoundedProbe> =
            Arc::new(PrivilegedShellProbe::new(platform.clone(), indicators));
        Self {
            platform,
            local: local.into(),
            shell,
            shell_timeout,
        }
    }

    pub async fn evaluate(&self) -> DetectionVerdict {
        let local = Arc::clone(&self.local);
        let platform = Arc::clone(&self.platform);
        let (local_hit, build_tags) = tokio::task::spawn_blocking(move || {
            let hit = first_match(local.iter().map(|p| run_guarded(p.as_ref())));
            (hit, read_build_tags(platform.as_ref()))
        })
        .await
        .unwrap_or_else(|e| {
            debug!(error = %e, "local root probes did not complete");
            (None, String::new())
        });

        let hit = match local_hit {
            Some(hit) => Some(hit),
            None => {
                let shell = run_bounded(self.shell.clone(), self.shell_timeout).await;
                if shell.triggered {
                    Some(shell)
                } else {
                    None
                }
            }
        };

        verdict_from(DetectionCategory::Root, hit.map(|h| h.detail))
            .with_evidence("buildTags", build_tags)
    }
}

fn read_build_tags(platform: &dyn PlatformAccessor) -> String {
    platform
        .build_property(BuildProperty::Tags)
        .unwrap_or_else(|e| {
            debug!(error = %e, "build tags unreadable for evidence");
            String::new()
        })
}

// ── Developer options ─────────────────────────────────────────────────────────

/// Answers "is the device in a developer configuration?".
///
/// Both setting probes always run; the reason joins every active one.
#[derive(Clone)]
pub struct DeveloperOptionsPolicy {
    usb_debugging: SettingFlagProbe,
    development_settings: SettingFlagProbe,
}

impl DeveloperOptionsPolicy {
    pub fn new(platform: Arc<dyn PlatformAccessor>) -> Self {
        Self {
            usb_debugging: SettingFlagProbe::new(
                platform.clone(),
                "usb_debugging",
                SETTING_ADB_ENABLED,
                "USB debugging enabled",
            ),
            development_settings: SettingFlagProbe::new(
                platform,
                "development_settings",
                SETTING_DEVELOPMENT_ENABLED,
                "developer options enabled",
            ),
        }
    }

    pub fn evaluate(&self) -> DetectionVerdict {
        let usb = run_guarded(&self.usb_debugging);
        let dev = run_guarded(&self.development_settings);
        let (usb_on, dev_on) = (usb.triggered, dev.triggered);

        evaluate(DetectionCategory::DeveloperOptions, [usb, dev])
            .with_evidence("usbDebuggingEnabled", usb_on.to_string())
            .with_evidence("developmentSettingsEnabled", dev_on.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
