//! Trust evaluator: the public operation surface of the agent.
//!
//! # Operations
//!
//! | Operation                   | Sync/async | Returns                  |
//! |-----------------------------|------------|--------------------------|
//! | [`check_emulator`]          | sync       | [`DetectionVerdict`]     |
//! | [`check_root`]              | async      | [`DetectionVerdict`]     |
//! | [`check_developer_options`] | sync       | [`DetectionVerdict`]     |
//! | [`get_device_info`]         | sync       | [`DeviceSnapshot`]       |
//! | [`self_check`]              | sync       | [`SelfCheckStatus`]      |
//! | [`enable_protection`]       | async      | [`ApplyOutcome`]         |
//! | [`disable_protection`]      | async      | [`ApplyOutcome`]         |
//! | [`assess`]                  | async      | [`SecurityAssessment`]   |
//! | [`summary`]                 | sync       | [`SecuritySummary`]      |
//! | [`initialize`]              | async      | [`InitializationReport`] |
//!
//! `check_root` is async because its last probe spawns a subprocess; the
//! subprocess is bounded by the configured timeout, so the operation always
//! resolves.  The synchronous checks read the platform through blocking
//! calls; the async operations that reuse them (`assess`, `initialize`) run
//! them on the blocking pool so the runtime threads never stall.  Detection
//! operations share no mutable state and may run concurrently.  Only the protection operations can fail.
//!
//! [`check_emulator`]: TrustEvaluator::check_emulator
//! [`check_root`]: TrustEvaluator::check_root
//! [`check_developer_options`]: TrustEvaluator::check_developer_options
//! [`get_device_info`]: TrustEvaluator::get_device_info
//! [`self_check`]: TrustEvaluator::self_check
//! [`enable_protection`]: TrustEvaluator::enable_protection
//! [`disable_protection`]: TrustEvaluator::disable_protection
//! [`assess`]: TrustEvaluator::assess
//! [`summary`]: TrustEvaluator::summary
//! [`initialize`]: TrustEvaluator::initialize

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use devtrust_core::domain::assessment::{finding_for, DEBUGGABLE_BUILD_REASON};
use devtrust_core::{
    CheckKind, DetectionCategory, DetectionVerdict, DeviceSnapshot, ErrorCode, IndicatorSet,
    ProtectionState, SecurityAssessment, SecurityEvent, SecurityLevel, SelfCheckStatus, Severity,
};
use thiserror::Error;
use tracing::{info, warn};

use super::detection::{
    DeveloperOptionsPolicy, EmulatorPolicy, RootPolicy, DEFAULT_SHELL_PROBE_TIMEOUT,
};
use super::device_info::InfoCollector;
use super::platform::{PlatformAccessor, SurfaceHost, UiDispatcher};
use super::protection::{ApplyOutcome, ProtectionError, ProtectionManager};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure of an evaluator operation, mapped 1:1 onto an [`ErrorCode`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("no active display surface is attached")]
    NoActiveSurface,

    #[error("screenshot protection failed: {0}")]
    Protection(String),

    #[error("emulator detection failed: {0}")]
    EmulatorDetection(String),

    #[error("root detection failed: {0}")]
    RootDetection(String),

    #[error("developer options check failed: {0}")]
    DeveloperOptions(String),

    #[error("device info collection failed: {0}")]
    DeviceInfo(String),

    #[error("security self-check failed: {0}")]
    SelfCheck(String),
}

impl TrustError {
    /// The stable code reported across the bridge.
    pub fn code(&self) -> ErrorCode {
        match self {
            TrustError::NoActiveSurface => ErrorCode::NoActivity,
            TrustError::Protection(_) => ErrorCode::ScreenshotProtectionError,
            TrustError::EmulatorDetection(_) => ErrorCode::EmulatorDetectionError,
            TrustError::RootDetection(_) => ErrorCode::RootDetectionError,
            TrustError::DeveloperOptions(_) => ErrorCode::DeveloperOptionsError,
            TrustError::DeviceInfo(_) => ErrorCode::DeviceInfoError,
            TrustError::SelfCheck(_) => ErrorCode::SecuritySelfCheckError,
        }
    }
}

impl From<ProtectionError> for TrustError {
    fn from(e: ProtectionError) -> Self {
        match e {
            ProtectionError::NoActiveSurface => TrustError::NoActiveSurface,
            // Keep the underlying platform message for the caller.
            ProtectionError::Platform(p) => TrustError::Protection(p.to_string()),
        }
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Per-check switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSettings {
    /// Disabled checks are skipped by [`TrustEvaluator::assess`].
    pub enabled: bool,
    /// Violations of a check that is not required never block on their own.
    pub required: bool,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            required: true,
        }
    }
}

/// Everything the evaluator needs besides its ports.
#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    pub module_version: String,
    pub platform_tag: String,
    pub shell_probe_timeout: Duration,
    pub security_level: SecurityLevel,
    /// Checks missing from the map use [`CheckSettings::default`].
    pub checks: HashMap<CheckKind, CheckSettings>,
    /// Whether a failure to enable protection fails initialization.
    pub protection_required: bool,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            module_version: env!("CARGO_PKG_VERSION").to_string(),
            platform_tag: "android".to_string(),
            shell_probe_timeout: DEFAULT_SHELL_PROBE_TIMEOUT,
            security_level: SecurityLevel::default(),
            checks: HashMap::new(),
            protection_required: true,
        }
    }
}

impl EvaluatorSettings {
    pub fn check(&self, kind: CheckKind) -> CheckSettings {
        self.checks.get(&kind).copied().unwrap_or_default()
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// Running totals exposed by [`TrustEvaluator::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySummary {
    pub platform: String,
    pub protection_state: ProtectionState,
    pub security_level: SecurityLevel,
    /// Assessments so far that found at least one violation.  An
    /// assessment counts once however many checks it failed.
    pub violation_count: u64,
    /// Timestamp of the last assessment, in Unix milliseconds.
    pub last_check_ms: Option<i64>,
    /// Timestamp of the last [`TrustEvaluator::initialize`] call.
    pub initialized_at_ms: Option<i64>,
}

/// Outcome of the start-up sequence.
#[derive(Debug, Clone)]
pub struct InitializationReport {
    pub snapshot: DeviceSnapshot,
    pub assessment: SecurityAssessment,
    /// Result of enabling capture protection; failure does not abort start-up.
    pub protection: Result<ApplyOutcome, TrustError>,
    /// `false` when required protection could not be enabled.
    pub success: bool,
}

#[derive(Debug, Default)]
struct Stats {
    violation_count: u64,
    last_check_ms: Option<i64>,
    initialized_at_ms: Option<i64>,
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

/// Orchestrates the detection policies, the protection manager, and the
/// info collector.
pub struct TrustEvaluator {
    emulator: EmulatorPolicy,
    root: RootPolicy,
    developer_options: DeveloperOptionsPolicy,
    info: InfoCollector,
    protection: ProtectionManager,
    settings: EvaluatorSettings,
    stats: Mutex<Stats>,
}

impl TrustEvaluator {
    pub fn new(
        platform: Arc<dyn PlatformAccessor>,
        surfaces: Arc<dyn SurfaceHost>,
        dispatcher: Arc<dyn UiDispatcher>,
        indicators: IndicatorSet,
        settings: EvaluatorSettings,
    ) -> Self {
        let indicators = Arc::new(indicators);
        Self {
            emulator: EmulatorPolicy::new(platform.clone(), indicators.clone()),
            root: RootPolicy::new(
                platform.clone(),
                indicators,
                settings.shell_probe_timeout,
            ),
            developer_options: DeveloperOptionsPolicy::new(platform.clone()),
            info: InfoCollector::new(platform),
            protection: ProtectionManager::new(surfaces, dispatcher),
            settings,
            stats: Mutex::new(Stats::default()),
        }
    }

    pub fn settings(&self) -> &EvaluatorSettings {
        &self.settings
    }

    // ── Detection ─────────────────────────────────────────────────────────────

    pub fn check_emulator(&self) -> DetectionVerdict {
        report(self.emulator.evaluate())
    }

    pub async fn check_root(&self) -> DetectionVerdict {
        report(self.root.evaluate().await)
    }

    pub fn check_developer_options(&self) -> DetectionVerdict {
        report(self.developer_options.evaluate())
    }

    // ── Info ──────────────────────────────────────────────────────────────────

    pub fn get_device_info(&self) -> DeviceSnapshot {
        self.info.snapshot(self.protection.state())
    }

    /// [`get_device_info`](Self::get_device_info) on the blocking pool.
    async fn snapshot_off_runtime(&self) -> DeviceSnapshot {
        let info = self.info.clone();
        let protection = self.protection.state();
        off_runtime(move || info.snapshot(protection))
            .await
            .unwrap_or_else(|| DeviceSnapshot {
                protection_state: protection,
                ..DeviceSnapshot::default()
            })
    }

    /// Liveness record.  Never runs a detection.
    pub fn self_check(&self) -> SelfCheckStatus {
        SelfCheckStatus {
            module_available: true,
            protection_state: self.protection.state(),
            module_version: self.settings.module_version.clone(),
            platform: self.settings.platform_tag.clone(),
            timestamp_ms: now_ms(),
        }
    }

    // ── Protection ────────────────────────────────────────────────────────────

    pub fn protection_state(&self) -> ProtectionState {
        self.protection.state()
    }

    pub async fn enable_protection(&self) -> Result<ApplyOutcome, TrustError> {
        let outcome = self.protection.enable().await?;
        if outcome == ApplyOutcome::Applied {
            emit(SecurityEvent::ScreenshotProtectionEnabled, "secure display flag set");
        }
        Ok(outcome)
    }

    pub async fn disable_protection(&self) -> Result<ApplyOutcome, TrustError> {
        let outcome = self.protection.disable().await?;
        if outcome == ApplyOutcome::Applied {
            emit(SecurityEvent::ScreenshotProtectionDisabled, "secure display flag cleared");
        }
        Ok(outcome)
    }

    // ── Assessment ────────────────────────────────────────────────────────────

    /// Runs every enabled check once and derives a trust decision.
    pub async fn assess(&self) -> SecurityAssessment {
        let enabled = |k: CheckKind| self.settings.check(k).enabled;
        let mut findings = Vec::new();

        if enabled(CheckKind::Emulator) {
            let policy = self.emulator.clone();
            let verdict = off_runtime(move || policy.evaluate())
                .await
                .unwrap_or_else(|| DetectionVerdict::clear(DetectionCategory::Emulator));
            findings.extend(finding_for(&report(verdict)));
        }
        if enabled(CheckKind::Root) {
            findings.extend(finding_for(&self.check_root().await));
        }
        if enabled(CheckKind::DeveloperOptions) {
            let policy = self.developer_options.clone();
            let verdict = off_runtime(move || policy.evaluate())
                .await
                .unwrap_or_else(|| DetectionVerdict::clear(DetectionCategory::DeveloperOptions));
            findings.extend(finding_for(&report(verdict)));
        }
        if enabled(CheckKind::AppIntegrity)
            && self.snapshot_off_runtime().await.is_debuggable_build
        {
            findings.push((CheckKind::AppIntegrity, DEBUGGABLE_BUILD_REASON.to_string()));
        }

        let assessment =
            SecurityAssessment::from_findings(self.settings.security_level, findings, now_ms())
                .with_advisory(|k| !self.settings.check(k).required);

        for v in &assessment.violations {
            let event = if v.severity == Severity::Critical {
                SecurityEvent::CriticalViolation
            } else {
                SecurityEvent::SecurityViolation
            };
            warn!(
                event = %event,
                check = v.check.as_str(),
                action = ?v.action,
                reason = %v.reason,
                "security violation"
            );
        }
        info!(
            assessment_id = %assessment.id,
            decision = assessment.decision.as_str(),
            violations = assessment.violations.len(),
            "assessment complete"
        );

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if !assessment.violations.is_empty() {
            stats.violation_count += 1;
        }
        stats.last_check_ms = Some(assessment.timestamp_ms);
        drop(stats);

        assessment
    }

    pub fn summary(&self) -> SecuritySummary {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        SecuritySummary {
            platform: self.settings.platform_tag.clone(),
            protection_state: self.protection.state(),
            security_level: self.settings.security_level,
            violation_count: stats.violation_count,
            last_check_ms: stats.last_check_ms,
            initialized_at_ms: stats.initialized_at_ms,
        }
    }

    /// Start-up sequence: snapshot, assessment, then capture protection.
    pub async fn initialize(&self) -> InitializationReport {
        let snapshot = self.snapshot_off_runtime().await;
        info!(
            manufacturer = %snapshot.manufacturer,
            model = %snapshot.model,
            sdk = snapshot.sdk_version,
            "initializing trust evaluator"
        );

        let assessment = self.assess().await;
        let protection = self.enable_protection().await;

        let success = protection.is_ok() || !self.settings.protection_required;
        match &protection {
            Err(e) if success => warn!(error = %e, "capture protection unavailable; continuing"),
            Err(e) => emit(SecurityEvent::InitializationFailed, &e.to_string()),
            Ok(_) => {}
        }
        if success {
            emit(SecurityEvent::InitializationSuccess, "trust evaluator ready");
        }

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .initialized_at_ms = Some(now_ms());

        InitializationReport {
            snapshot,
            assessment,
            protection,
            success,
        }
    }
}

/// Runs blocking platform work on the blocking pool.  `None` if it panicked.
async fn off_runtime<T, F>(f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| warn!(error = %e, "blocking platform read failed"))
        .ok()
}

/// Logs a verdict, raising the category's event when it detected something.
fn report(verdict: DetectionVerdict) -> DetectionVerdict {
    if verdict.detected {
        emit(SecurityEvent::for_detection(verdict.category), &verdict.reason);
    } else {
        info!(category = ?verdict.category, reason = %verdict.reason, "check clear");
    }
    verdict
}

/// Emits a security event as a structured log line.
fn emit(event: SecurityEvent, detail: &str) {
    match event {
        SecurityEvent::InitializationSuccess
        | SecurityEvent::ScreenshotProtectionEnabled
        | SecurityEvent::ScreenshotProtectionDisabled => {
            info!(event = %event, detail, "security event")
        }
        _ => warn!(event = %event, detail, "security event"),
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
