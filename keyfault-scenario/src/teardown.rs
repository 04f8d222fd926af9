//! Unconditional teardown of everything a run started.
//!
//! Components are stopped in reverse dependency order, independent of the
//! order in which they were started:
//!
//! 1. signing proxy (no further keystore traffic reaches upstream)
//! 2. conductor
//! 3. keystore
//!
//! Every slot is attempted even if an earlier one failed. Failures are
//! logged and recorded, never returned.

use keyfault_core::lifecycle::DynComponent;
use tracing::{error, info};

use crate::report::TeardownRecord;

/// Components registered for teardown, one slot per role.
#[derive(Default)]
pub struct Teardown {
    proxy: Option<Box<dyn DynComponent>>,
    conductor: Option<Box<dyn DynComponent>>,
    keystore: Option<Box<dyn DynComponent>>,
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("proxy", &self.proxy.as_ref().map(|c| c.name().to_owned()))
            .field("conductor", &self.conductor.as_ref().map(|c| c.name().to_owned()))
            .field("keystore", &self.keystore.as_ref().map(|c| c.name().to_owned()))
            .finish()
    }
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_proxy(&mut self, component: Box<dyn DynComponent>) {
        self.proxy = Some(component);
    }

    pub fn set_conductor(&mut self, component: Box<dyn DynComponent>) {
        self.conductor = Some(component);
    }

    pub fn set_keystore(&mut self, component: Box<dyn DynComponent>) {
        self.keystore = Some(component);
    }

    pub fn has_conductor(&self) -> bool {
        self.conductor.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.proxy.is_none() && self.conductor.is_none() && self.keystore.is_none()
    }

    /// Stops every registered component and reports what happened to each.
    pub async fn run(self) -> Vec<TeardownRecord> {
        let mut records = Vec::new();
        for component in [self.proxy, self.conductor, self.keystore]
            .into_iter()
            .flatten()
        {
            let name = component.name().to_owned();
            let error = match component.shutdown().await {
                Ok(()) => {
                    info!(component = name.as_str(), "teardown step completed");
                    None
                }
                Err(e) => {
                    error!(component = name.as_str(), error = %e, "teardown step failed");
                    Some(e.to_string())
                }
            };
            records.push(TeardownRecord {
                component: name,
                error,
            });
        }
        records
    }
}
