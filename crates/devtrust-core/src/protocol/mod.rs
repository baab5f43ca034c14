//! Protocol module: what crosses the bridge to the host runtime.
//!
//! The host (a JavaScript runtime, a JNI layer, a CLI) never sees internal
//! Rust types.  It receives flat key/value records and, on failure, one of a
//! closed set of stable string error codes.

pub mod codes;
pub mod record;

pub use codes::{ErrorCode, UnknownErrorCode};
pub use record::{FlatRecord, FlatValue};
