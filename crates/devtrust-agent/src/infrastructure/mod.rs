//! Infrastructure layer for the trust agent.
//!
//! Contains the OS-facing adapters: the platform accessors, the UI-thread
//! executor, the display surface registry, TOML config storage, and the host
//! bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `devtrust_core`, but MUST NOT be imported by the `application` layer or the
//! core crate (the application tests are the one exception: they borrow the
//! always-compiled mocks).

pub mod bridge;
pub mod platform;
pub mod storage;
pub mod surface;
pub mod ui_thread;
