//! Host bridge: exposes the evaluator's operations to a host runtime.
//!
//! The host (a JavaScript runtime through JNI, the CLI, a test harness)
//! names an operation and receives a [`BridgeResponse`].  Internal Rust types
//! never cross this boundary: results are flat [`FlatRecord`]s and failures
//! carry one of the stable [`ErrorCode`] strings.
//!
//! # `BridgeResponse` wrapper
//!
//! Every call returns the same shape:
//! `{ success: bool, data: {...} | null, error: { code, message } | null }`.
//! The host can always read `success` without guarding the call.
//!
//! # Isolation
//!
//! Each call runs on its own task: synchronous operations on the blocking
//! pool, asynchronous ones on the runtime.  A panic inside an operation is
//! caught at the task boundary and reported with that operation's error
//! code, so no single check can take the host down.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use devtrust_core::{ErrorCode, FlatRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error};

use crate::application::evaluator::{
    InitializationReport, SecuritySummary, TrustError, TrustEvaluator,
};
use crate::application::protection::ApplyOutcome;

// ── Operations ────────────────────────────────────────────────────────────────

/// Every operation the host may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeOperation {
    CheckEmulator,
    CheckRoot,
    CheckDeveloperOptions,
    GetDeviceInfo,
    SelfCheck,
    EnableProtection,
    DisableProtection,
    Assess,
    Summary,
    Initialize,
}

impl BridgeOperation {
    pub const ALL: [BridgeOperation; 10] = [
        BridgeOperation::CheckEmulator,
        BridgeOperation::CheckRoot,
        BridgeOperation::CheckDeveloperOptions,
        BridgeOperation::GetDeviceInfo,
        BridgeOperation::SelfCheck,
        BridgeOperation::EnableProtection,
        BridgeOperation::DisableProtection,
        BridgeOperation::Assess,
        BridgeOperation::Summary,
        BridgeOperation::Initialize,
    ];

    /// The name the host uses for this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeOperation::CheckEmulator => "checkEmulator",
            BridgeOperation::CheckRoot => "checkRoot",
            BridgeOperation::CheckDeveloperOptions => "checkDeveloperOptions",
            BridgeOperation::GetDeviceInfo => "getDeviceInfo",
            BridgeOperation::SelfCheck => "selfCheck",
            BridgeOperation::EnableProtection => "enableProtection",
            BridgeOperation::DisableProtection => "disableProtection",
            BridgeOperation::Assess => "assess",
            BridgeOperation::Summary => "summary",
            BridgeOperation::Initialize => "initialize",
        }
    }

    /// Wraps an unexpected failure in this operation's error variant.
    fn failure(self, message: String) -> TrustError {
        match self {
            BridgeOperation::CheckEmulator => TrustError::EmulatorDetection(message),
            BridgeOperation::CheckRoot => TrustError::RootDetection(message),
            BridgeOperation::CheckDeveloperOptions => TrustError::DeveloperOptions(message),
            BridgeOperation::GetDeviceInfo => TrustError::DeviceInfo(message),
            BridgeOperation::EnableProtection | BridgeOperation::DisableProtection => {
                TrustError::Protection(message)
            }
            BridgeOperation::SelfCheck
            | BridgeOperation::Assess
            | BridgeOperation::Summary
            | BridgeOperation::Initialize => TrustError::SelfCheck(message),
        }
    }
}

impl fmt::Display for BridgeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when the host names an operation that does not exist.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown bridge operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for BridgeOperation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BridgeOperation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

// ── Response DTOs ─────────────────────────────────────────────────────────────

/// Error half of a [`BridgeResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
}

/// Uniform response shape for every bridge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub success: bool,
    pub data: Option<FlatRecord>,
    pub error: Option<BridgeError>,
}

impl BridgeResponse {
    pub fn ok(data: FlatRecord) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: &TrustError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(BridgeError {
                code: error.code(),
                message: error.to_string(),
            }),
        }
    }

    /// The error code string, if the call failed.
    pub fn error_code(&self) -> Option<&'static str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── Record conversions for agent-side reports ─────────────────────────────────

fn summary_record(s: &SecuritySummary) -> FlatRecord {
    let mut r = FlatRecord::new();
    r.put("platform", s.platform.clone())
        .put(
            "screenshotProtectionEnabled",
            s.protection_state.is_protected(),
        )
        .put("securityLevel", s.security_level.as_str())
        .put("violationCount", s.violation_count as i64);
    if let Some(ts) = s.last_check_ms {
        r.put("lastCheck", ts);
    }
    if let Some(ts) = s.initialized_at_ms {
        r.put("initializedAt", ts);
    }
    r
}

fn protection_record(outcome: ApplyOutcome, enabled: bool) -> FlatRecord {
    let mut r = FlatRecord::new();
    r.put("screenshotProtectionEnabled", enabled)
        .put("changed", outcome == ApplyOutcome::Applied);
    r
}

fn initialization_record(report: &InitializationReport) -> FlatRecord {
    let mut r = FlatRecord::from(&report.assessment);
    r.put("initialized", report.success)
        .put("model", report.snapshot.model.clone())
        .put("sdkInt", report.snapshot.sdk_version)
        .put(
            "screenshotProtectionEnabled",
            report.protection.as_ref().is_ok(),
        );
    if let Err(e) = &report.protection {
        r.put("protectionError", e.code().as_str());
    }
    r
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// Dispatches host calls onto a shared [`TrustEvaluator`].
#[derive(Clone)]
pub struct HostBridge {
    evaluator: Arc<TrustEvaluator>,
}

impl HostBridge {
    pub fn new(evaluator: Arc<TrustEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &Arc<TrustEvaluator> {
        &self.evaluator
    }

    /// Calls an operation by its host name.
    pub async fn call_by_name(&self, name: &str) -> Result<BridgeResponse, UnknownOperation> {
        Ok(self.call(name.parse()?).await)
    }

    /// Runs `op` in isolation and wraps the outcome.
    pub async fn call(&self, op: BridgeOperation) -> BridgeResponse {
        debug!(operation = %op, "bridge call");
        let result = self.run(op).await;
        match result {
            Ok(record) => BridgeResponse::ok(record),
            Err(e) => {
                error!(operation = %op, code = e.code().as_str(), error = %e, "bridge call failed");
                BridgeResponse::err(&e)
            }
        }
    }

    async fn run(&self, op: BridgeOperation) -> Result<FlatRecord, TrustError> {
        let ev = Arc::clone(&self.evaluator);
        match op {
            BridgeOperation::CheckEmulator => {
                blocking(op, move || FlatRecord::from(&ev.check_emulator())).await
            }
            BridgeOperation::CheckDeveloperOptions => {
                blocking(op, move || FlatRecord::from(&ev.check_developer_options())).await
            }
            BridgeOperation::GetDeviceInfo => {
                blocking(op, move || FlatRecord::from(&ev.get_device_info())).await
            }
            BridgeOperation::SelfCheck => {
                blocking(op, move || FlatRecord::from(&ev.self_check())).await
            }
            BridgeOperation::Summary => blocking(op, move || summary_record(&ev.summary())).await,
            BridgeOperation::CheckRoot => {
                spawned(op, async move { Ok(FlatRecord::from(&ev.check_root().await)) }).await
            }
            BridgeOperation::Assess => {
                spawned(op, async move { Ok(FlatRecord::from(&ev.assess().await)) }).await
            }
            BridgeOperation::Initialize => {
                spawned(op, async move { Ok(initialization_record(&ev.initialize().await)) })
                    .await
            }
            BridgeOperation::EnableProtection => {
                spawned(op, async move {
                    let outcome = ev.enable_protection().await?;
                    Ok(protection_record(outcome, true))
                })
                .await
            }
            BridgeOperation::DisableProtection => {
                spawned(op, async move {
                    let outcome = ev.disable_protection().await?;
                    Ok(protection_record(outcome, false))
                })
                .await
            }
        }
    }
}

/// Runs a synchronous operation on the blocking pool.
async fn blocking<F>(op: BridgeOperation, f: F) -> Result<FlatRecord, TrustError>
where
    F: FnOnce() -> FlatRecord + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| join_failure(op, e))
}

/// Runs an asynchronous operation on its own task.
async fn spawned<Fut>(op: BridgeOperation, fut: Fut) -> Result<FlatRecord, TrustError>
where
    Fut: std::future::Future<Output = Result<FlatRecord, TrustError>> + Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| join_failure(op, e))?
}

fn join_failure(op: BridgeOperation, e: JoinError) -> TrustError {
    let message = if e.is_panic() {
        format!("{op} panicked")
    } else {
        format!("{op} was cancelled")
    };
    op.failure(message)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
