//! keyfault scenario driver library.
//!
//! Exposes the driver and its building blocks for the `keyfault-scenario`
//! binary and for integration testing.

pub mod backend;
pub mod driver;
pub mod error;
pub mod report;
pub mod shutdown;
pub mod stage;
pub mod teardown;

pub use backend::{ProcessBackend, ScenarioBackend};
pub use driver::Driver;
pub use error::ScenarioError;
pub use report::{Listing, ScenarioReport, StepOutcome, StepRecord, TeardownRecord};
pub use stage::ScenarioStage;
pub use teardown::Teardown;
