//! DevTrust agent library.
//!
//! The agent turns the pure rules in `devtrust_core` into a running trust
//! evaluator: it queries the platform, runs the detection policies, drives
//! the capture-protection toggle, and answers host bridge requests.
//!
//! # Layers
//!
//! - **`application`** – use cases that depend only on traits (ports):
//!   signal probes, detection policies, the protection manager, the info
//!   collector and the [`TrustEvaluator`](application::evaluator::TrustEvaluator)
//!   that ties them together.
//! - **`infrastructure`** – adapters behind those ports: the Android shell
//!   platform, the UI-thread executor, the surface registry, TOML config
//!   storage, and the host bridge.
//!
//! The binary in `main.rs` wires the two together.

pub mod application;
pub mod infrastructure;
