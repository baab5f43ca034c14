//! Capture-protection state machine.
//!
//! # Responsibilities
//!
//! The [`ProtectionManager`] owns the single [`ProtectionState`] cell of the
//! process and is the only code that toggles the secure-display flag.
//!
//! # Invariants
//!
//! - The recorded state changes **only after** the surface confirms the
//!   mutation.  A rejected mutation leaves the state as it was.
//! - Without an attached surface a request fails with
//!   [`ProtectionError::NoActiveSurface`] before anything is dispatched.
//! - Requesting the state already in force succeeds without touching the
//!   surface ([`ApplyOutcome::AlreadyInState`]).
//!
//! # Threading
//!
//! The compare-and-mutate step runs as one task on the [`UiDispatcher`].
//! Tasks on that dispatcher run one at a time in submission order, so the
//! final state is always the outcome of the mutation that completed last,
//! and a caller that abandons its future cannot leave the state cell out
//! of step with the surface: the dispatched task finishes regardless.
//! Callers are additionally queued on an async mutex so that surface lookup
//! and dispatch happen in the same order as the requests.

use std::sync::{Arc, Mutex, PoisonError};

use devtrust_core::ProtectionState;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use super::platform::{DisplaySurface, PlatformError, SurfaceHost, UiDispatcher};

/// Failure of an enable/disable request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtectionError {
    /// No rendering surface is attached; nothing was attempted.
    #[error("no active display surface is attached")]
    NoActiveSurface,

    /// The dispatch or the flag mutation failed; the state is unchanged.
    #[error("capture protection could not be applied: {0}")]
    Platform(#[from] PlatformError),
}

/// What a successful request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The surface flag was changed.
    Applied,
    /// The requested state was already in force; the surface was not touched.
    AlreadyInState,
}

/// Serialized owner of the process-wide [`ProtectionState`].
pub struct ProtectionManager {
    state: Arc<Mutex<ProtectionState>>,
    turn: tokio::sync::Mutex<()>,
    surfaces: Arc<dyn SurfaceHost>,
    dispatcher: Arc<dyn UiDispatcher>,
}

impl ProtectionManager {
    pub fn new(surfaces: Arc<dyn SurfaceHost>, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProtectionState::Unprotected)),
            turn: tokio::sync::Mutex::new(()),
            surfaces,
            dispatcher,
        }
    }

    /// The last state the surface confirmed.
    pub fn state(&self) -> ProtectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn enable(&self) -> Result<ApplyOutcome, ProtectionError> {
        self.apply(ProtectionState::Protected).await
    }

    pub async fn disable(&self) -> Result<ApplyOutcome, ProtectionError> {
        self.apply(ProtectionState::Unprotected).await
    }

    /// Moves to `target` on the UI thread and waits for the result.
    pub async fn apply(&self, target: ProtectionState) -> Result<ApplyOutcome, ProtectionError> {
        let _turn = self.turn.lock().await;

        let surface = self
            .surfaces
            .current_surface()
            .ok_or(ProtectionError::NoActiveSurface)?;

        let (tx, rx) = oneshot::channel();
        let state = Arc::clone(&self.state);
        self.dispatcher.dispatch(Box::new(move || {
            let result = apply_on_ui_thread(&state, surface.as_ref(), target);
            // The caller may have stopped waiting; the mutation already happened.
            let _ = tx.send(result);
        }))?;

        rx.await.map_err(|_| {
            ProtectionError::Platform(PlatformError::DispatcherUnavailable(
                "UI task ended without reporting a result".to_string(),
            ))
        })?
    }
}

/// The compare-and-mutate step.  Must run on the UI thread.
fn apply_on_ui_thread(
    state: &Mutex<ProtectionState>,
    surface: &dyn DisplaySurface,
    target: ProtectionState,
) -> Result<ApplyOutcome, ProtectionError> {
    let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
    if *current == target {
        debug!(state = ?target, "capture protection already in requested state");
        return Ok(ApplyOutcome::AlreadyInState);
    }
    surface.set_secure_flag(target.secure_flag())?;
    *current = target;
    Ok(ApplyOutcome::Applied)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
