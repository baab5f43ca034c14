//! Display surface registry and the headless surface.
//!
//! The host attaches its live rendering surface (an Android activity window
//! through JNI, a desktop window, ...) with [`SurfaceRegistry::attach`] and
//! detaches it when the surface goes away.  The protection manager asks the
//! registry for the current surface on every request.
//!
//! [`HeadlessSurface`] keeps the secure flag in memory.  The CLI uses it when
//! started with `--headless-surface`, and tests use it to observe mutations.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use crate::application::platform::{DisplaySurface, PlatformError, SurfaceHost};

/// Holds the currently attached surface, if any.
#[derive(Default)]
pub struct SurfaceRegistry {
    current: RwLock<Option<Arc<dyn DisplaySurface>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `surface`, replacing any previous one.
    pub fn attach(&self, surface: Arc<dyn DisplaySurface>) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = Some(surface);
        info!("display surface attached");
    }

    /// Detaches the current surface.  Protection requests fail until the
    /// next `attach`.
    pub fn detach(&self) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = None;
        info!("display surface detached");
    }

    pub fn is_attached(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }
}

impl SurfaceHost for SurfaceRegistry {
    fn current_surface(&self) -> Option<Arc<dyn DisplaySurface>> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

/// An in-memory surface: records the flag and every mutation.
#[derive(Default)]
pub struct HeadlessSurface {
    secure: AtomicBool,
    mutations: AtomicU32,
    rejecting: AtomicBool,
    last_thread: Mutex<Option<String>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_secure(&self) -> bool {
        self.secure.load(Ordering::SeqCst)
    }

    /// Number of accepted flag mutations.
    pub fn mutation_count(&self) -> u32 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Makes every following mutation fail, as a destroyed window would.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Name of the thread that performed the last accepted mutation.
    pub fn last_mutation_thread(&self) -> Option<String> {
        self.last_thread
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl DisplaySurface for HeadlessSurface {
    fn set_secure_flag(&self, secure: bool) -> Result<(), PlatformError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(PlatformError::SurfaceRejected(
                "surface is no longer valid".to_string(),
            ));
        }
        self.secure.store(secure, Ordering::SeqCst);
        self.mutations.fetch_add(1, Ordering::SeqCst);
        *self.last_thread.lock().unwrap_or_else(|p| p.into_inner()) =
            std::thread::current().name().map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_starts_empty() {
        let registry = SurfaceRegistry::new();
        assert!(registry.current_surface().is_none());
        assert!(!registry.is_attached());
    }

    #[test]
    fn test_attach_then_detach() {
        let registry = SurfaceRegistry::new();
        registry.attach(Arc::new(HeadlessSurface::new()));
        assert!(registry.is_attached());

        registry.detach();
        assert!(registry.current_surface().is_none());
    }

    #[test]
    fn test_rejecting_surface_keeps_flag() {
        // Arrange
        let surface = HeadlessSurface::new();
        surface.set_rejecting(true);

        // Act
        let result = surface.set_secure_flag(true);

        // Assert
        assert!(result.is_err());
        assert!(!surface.is_secure());
        assert_eq!(surface.mutation_count(), 0);
    }
}
