//! Application layer use cases for the trust agent.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `devtrust_core`) and the infrastructure (OS calls, files,
//! subprocesses, the UI thread).
//!
//! Code in this layer:
//!
//! - **Orchestrates** domain objects to answer a question such as "is this
//!   device rooted?".
//! - **Depends on abstractions** (the traits in [`platform`]) rather than
//!   concrete adapters, so the Android shell adapter can be swapped for the
//!   mock in tests.
//! - **Performs no I/O of its own.**
//!
//! # Sub-modules
//!
//! - **`platform`**    – The ports: platform accessor and display traits.
//! - **`probes`**      – One signal probe per platform attribute.
//! - **`detection`**   – The emulator, root and developer-options policies.
//! - **`protection`**  – The capture-protection state machine.
//! - **`device_info`** – Snapshot of device/build/application attributes.
//! - **`evaluator`**   – The public operation surface.

pub mod detection;
pub mod device_info;
pub mod evaluator;
pub mod platform;
pub mod probes;
pub mod protection;
