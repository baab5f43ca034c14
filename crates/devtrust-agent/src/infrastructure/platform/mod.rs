//! Platform accessor adapters.
//!
//! | Module          | Host                         | How it reads the device                         |
//! |-----------------|------------------------------|-------------------------------------------------|
//! | `android_shell` | Android (or `adb shell`)     | `getprop`, `settings`, `pm`, the filesystem     |
//! | `mock`          | any                          | in-memory state set by the test                 |
//!
//! [`MockPlatform`](mock::MockPlatform) is always compiled (not guarded by
//! `#[cfg(test)]`) so integration tests and non-Android hosts can use it.

pub mod android_shell;
pub mod mock;

pub use android_shell::AndroidShellPlatform;
pub use mock::MockPlatform;
