//! # devtrust-core
//!
//! Shared library for DevTrust containing the detection rules, verdict types,
//! and the payload/error-code vocabulary used at the host bridge boundary.
//!
//! It has zero dependencies on OS APIs, subprocesses, UI frameworks, or async
//! runtimes; every function here is a pure function of its inputs.
//!
//! # Architecture overview (for beginners)
//!
//! DevTrust answers three independent questions about the device an app is
//! running on before the app shows sensitive content:
//!
//! 1. Is this an emulator?
//! 2. Has the privilege model been subverted (rooted)?
//! 3. Is the device in a developer/debuggable configuration?
//!
//! It also manages the "capture prevention" flag that stops screenshots and
//! screen recordings of the active display surface.
//!
//! This crate (`devtrust-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – The business rules: which indicator strings mean
//!   "emulator", how several probe results collapse into one verdict, what a
//!   device snapshot looks like, and how verdicts become an assessment.
//!
//! - **`protocol`** – What crosses the bridge to the host runtime: flat
//!   key/value records and a closed set of stable string error codes.
//!
//! The `devtrust-agent` crate supplies the platform access (files, system
//! properties, subprocesses, the UI thread) and wires everything together.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `devtrust_core::DetectionVerdict` instead of the full module path.
pub use domain::assessment::{
    CheckKind, RecommendedAction, SecurityAssessment, SecurityLevel, Severity, TrustDecision,
    Violation,
};
pub use domain::build::{BuildIdentity, BuildProperty};
pub use domain::events::SecurityEvent;
pub use domain::indicators::IndicatorSet;
pub use domain::protection::ProtectionState;
pub use domain::snapshot::{DeviceSnapshot, SelfCheckStatus};
pub use domain::verdict::{DetectionCategory, DetectionVerdict, SignalResult};
pub use protocol::codes::ErrorCode;
pub use protocol::record::{FlatRecord, FlatValue};
