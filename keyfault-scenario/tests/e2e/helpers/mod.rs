//! Shared E2E test helpers.

pub mod backend;
pub mod conductor;
pub mod config;
