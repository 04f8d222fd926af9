//! E2E test scenarios.

mod conductor_defect;
mod directories;
mod fault_injection;
mod interrupt;
mod readiness;
mod setup_failure;
