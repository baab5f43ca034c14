//! Domain entities for DevTrust.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from OS APIs, process spawning, or UI frameworks.
//! - Can be compiled and tested on any platform without an Android device.
//!
//! Here the rules are: which build strings betray an emulator, which file
//! paths betray a rooted device, how a list of probe outcomes turns into one
//! verdict, and how verdicts turn into an allow/warn/block decision.

/// Android build metadata fields and the identity record probes consult.
pub mod build;

/// Fixed indicator lists (paths, package ids, substrings) as versioned data.
pub mod indicators;

/// Case-insensitive matchers for build identity and hardware names.
pub mod matching;

/// Probe results and per-category verdicts.
pub mod verdict;

/// Combinators that collapse ordered probe results into one verdict.
pub mod policy;

/// The capture-protection state.
pub mod protection;

/// Device snapshot and module self-check records.
pub mod snapshot;

/// Violations, severities, and the overall trust decision.
pub mod assessment;

/// Security event names emitted to the log.
pub mod events;
