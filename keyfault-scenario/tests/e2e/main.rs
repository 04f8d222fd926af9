//! E2E tests for keyfault-scenario.
//!
//! The driver runs against an in-process keystore and conductor. The signing
//! proxy between them is the real one, so every conductor signature crosses
//! a real Unix socket and the real denylist.
//!
//! # Test Structure
//!
//! - `helpers/` -- in-process keystore, conductor and backend, test config
//! - `scenarios/` -- one file per scenario
//!
//! # Running
//!
//! ```bash
//! cargo test -p keyfault-scenario --test e2e
//! ```

mod helpers;
mod scenarios;
