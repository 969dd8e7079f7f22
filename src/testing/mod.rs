//! # Redirect Self Test
//!
//! Verifies that clients advertising webp support get a freshly converted
//! webp while others keep getting the original, and explains what went wrong
//! when they don't.
//!
//! - [`SelfTest`] sequences the per-format probes and owns cleanup
//! - [`FormatProbe`] runs one format end to end
//! - [`OutcomeClassifier`] turns response headers into a verdict

pub mod classifier;
pub mod lock;
pub mod orchestrator;
pub mod probe;

#[cfg(test)]
pub(crate) mod fakes;

pub use classifier::{Classification, OutcomeClassifier, SuccessLevel};
pub use lock::{RunGuard, RunRegistry};
pub use orchestrator::{Collaborators, SelfTest};
pub use probe::{FormatProbe, ProbeOutcome};
