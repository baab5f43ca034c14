//! Ports between the application layer and the operating system.
//!
//! Everything the evaluator learns about the device comes through
//! [`PlatformAccessor`].  Everything it does to the display goes through
//! [`SurfaceHost`], [`DisplaySurface`] and [`UiDispatcher`].  The traits are
//! deliberately primitive: they expose raw queries, and all interpretation
//! lives in the probes.
//!
//! # Why traits? (for beginners)
//!
//! A trait is Rust's version of an interface.  The probes hold an
//! `Arc<dyn PlatformAccessor>` and never know whether they are talking to a
//! real Android device or to [`MockPlatform`] in a unit test.
//!
//! [`MockPlatform`]: crate::infrastructure::platform::mock::MockPlatform

use std::sync::Arc;

use async_trait::async_trait;
use devtrust_core::BuildProperty;
use thiserror::Error;

/// Errors raised by platform adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The OS refused the query (missing permission, SELinux denial, ...).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The query is not supported on this host.
    #[error("not supported on this platform: {0}")]
    Unsupported(String),

    /// A subprocess or system call failed.
    #[error("platform call failed: {0}")]
    CallFailed(String),

    /// The UI thread is gone or refused the task.
    #[error("UI dispatcher unavailable: {0}")]
    DispatcherUnavailable(String),

    /// The display surface rejected a flag mutation.
    #[error("display flag mutation rejected: {0}")]
    SurfaceRejected(String),
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `true` when the process exited with status 0.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Primitive read-only queries against the host platform.
///
/// Implementations must be cheap to call repeatedly and must not cache
/// answers: the evaluator builds a fresh view on every request.
#[async_trait]
pub trait PlatformAccessor: Send + Sync {
    /// Returns whether `path` exists on the filesystem.
    fn file_exists(&self, path: &str) -> Result<bool, PlatformError>;

    /// Runs `program` with `args` and captures its output.
    ///
    /// This is the only accessor that may block for an unbounded time;
    /// callers are expected to wrap it in a timeout.
    async fn run_command(&self, program: &str, args: &[&str])
        -> Result<CommandOutput, PlatformError>;

    /// Reads one build attribute.  Missing attributes are empty strings.
    fn build_property(&self, property: BuildProperty) -> Result<String, PlatformError>;

    /// Returns whether the package id resolves to an installed package.
    fn package_installed(&self, package_id: &str) -> Result<bool, PlatformError>;

    /// Reads an integer global system setting; `None` when unset.
    fn global_setting_int(&self, key: &str) -> Result<Option<i64>, PlatformError>;

    /// Returns the telephony network operator name, if telephony exists.
    fn network_operator_name(&self) -> Result<Option<String>, PlatformError>;

    /// Returns whether the hosting application was built debuggable.
    fn app_is_debuggable(&self) -> Result<bool, PlatformError>;
}

/// Global setting that enables the debug bridge (USB debugging).
pub const SETTING_ADB_ENABLED: &str = "adb_enabled";

/// Global setting that unlocks the developer options menu.
pub const SETTING_DEVELOPMENT_ENABLED: &str = "development_settings_enabled";

// ── Display ports ─────────────────────────────────────────────────────────────

/// A live rendering surface whose capture flag can be toggled.
///
/// `set_secure_flag` must only be called from the UI thread; the
/// protection manager guarantees this by routing every call through
/// [`UiDispatcher`].
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySurface: Send + Sync {
    /// Sets (`true`) or clears (`false`) the secure-display flag.
    fn set_secure_flag(&self, secure: bool) -> Result<(), PlatformError>;
}

/// Tracks which surface, if any, is currently attached.
pub trait SurfaceHost: Send + Sync {
    fn current_surface(&self) -> Option<Arc<dyn DisplaySurface>>;
}

/// A task queued onto the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs closures on the UI-thread equivalent, one at a time, in order.
pub trait UiDispatcher: Send + Sync {
    /// Queues `task`.  Once accepted, the task runs to completion even if
    /// the caller stops waiting for it.
    fn dispatch(&self, task: UiTask) -> Result<(), PlatformError>;
}
