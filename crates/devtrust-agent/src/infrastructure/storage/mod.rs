//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration from the
//! platform-appropriate directory, writes it back on request, and supplies
//! defaults when the file does not exist yet (first run).
//!
//! Verdicts are never persisted; this module only stores settings.

pub mod config;
