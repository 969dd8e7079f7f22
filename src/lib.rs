//! Self test for the "redirect to converter" feature: checks that clients
//! advertising webp support are served a freshly converted webp, and writes
//! a report explaining the outcome.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod paths;
pub mod report;
pub mod rewrite;
pub mod storage;
pub mod testing;

pub use error::{SelfTestError, TransportError};
pub use report::{Narrative, NarrativeLine, TestReport};
pub use testing::{Collaborators, SelfTest, SuccessLevel};

/// Run the self test and return `(success, markdown lines)` for the host UI.
pub async fn run_test(self_test: &SelfTest) -> (bool, Vec<String>) {
    self_test.run().await.into_parts()
}
