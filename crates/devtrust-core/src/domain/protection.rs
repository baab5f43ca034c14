//! Capture-protection state.
//!
//! ```text
//! Unprotected ──enable()──►  Protected
//!      ▲                         │
//!      └──────── disable() ──────┘
//! ```
//!
//! Both transitions are idempotent: requesting the current state is a
//! successful no-op.

use serde::{Deserialize, Serialize};

/// Whether screen capture of the active surface is currently blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtectionState {
    /// Screenshots and screen recording are allowed.
    #[default]
    Unprotected,
    /// The platform's secure-display flag is set on the active surface.
    Protected,
}

impl ProtectionState {
    pub fn is_protected(self) -> bool {
        matches!(self, ProtectionState::Protected)
    }

    /// The secure-display flag value that enforces this state.
    pub fn secure_flag(self) -> bool {
        self.is_protected()
    }
}

impl From<bool> for ProtectionState {
    fn from(protected: bool) -> Self {
        if protected {
            ProtectionState::Protected
        } else {
            ProtectionState::Unprotected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unprotected() {
        assert_eq!(ProtectionState::default(), ProtectionState::Unprotected);
    }

    #[test]
    fn test_bool_conversion_matches_secure_flag() {
        for flag in [true, false] {
            assert_eq!(ProtectionState::from(flag).secure_flag(), flag);
        }
    }
}
