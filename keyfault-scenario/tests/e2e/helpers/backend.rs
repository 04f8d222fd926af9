//! In-process [`ScenarioBackend`] with failure injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use keyfault_conductor_admin::AdminError;
use keyfault_core::config::KeyfaultConfig;
use keyfault_core::error::KeyfaultError;
use keyfault_core::lifecycle::{Component, DynComponent};
use keyfault_scenario::{ScenarioBackend, ScenarioError};
use keyfault_supervisor::SupervisorError;

use super::conductor::{FakeAdmin, FakeConductor};
use super::keystore::FakeKeystore;

/// What the in-process backend should get wrong.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// The keystore "binary" cannot be started.
    pub keystore_spawn_fails: bool,
    /// The keystore starts but never binds its socket.
    pub keystore_never_listens: bool,
    /// Admin connects refused before the first success.
    pub refused_admin_connects: usize,
    /// Every admin connect is refused.
    pub admin_never_listens: bool,
    /// Activation of this app fails inside the conductor.
    pub broken_activation: Option<String>,
}

#[derive(Default)]
pub struct InProcessBackend {
    faults: Faults,
    keystore: Mutex<Option<Arc<FakeKeystore>>>,
    conductor: Mutex<Option<Arc<FakeConductor>>>,
    connect_attempts: AtomicUsize,
}

impl InProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn keystore(&self) -> Arc<FakeKeystore> {
        self.keystore.lock().unwrap().clone().expect("keystore was launched")
    }

    pub fn conductor(&self) -> Arc<FakeConductor> {
        self.conductor.lock().unwrap().clone().expect("conductor was launched")
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }
}

/// Keystore stand-in that never serves anything.
struct Mute;

impl Component for Mute {
    fn name(&self) -> &str {
        "keystore"
    }

    async fn shutdown(&self) -> Result<(), KeyfaultError> {
        Ok(())
    }
}

impl ScenarioBackend for InProcessBackend {
    type Admin = FakeAdmin;

    async fn launch_keystore(
        &self,
        config: &KeyfaultConfig,
    ) -> Result<Box<dyn DynComponent>, ScenarioError> {
        if self.faults.keystore_spawn_fails {
            return Err(SupervisorError::SpawnFailed {
                name: "keystore".to_owned(),
                command: config.keystore.command.clone(),
                reason: "No such file or directory (os error 2)".to_owned(),
            }
            .into());
        }
        if self.faults.keystore_never_listens {
            return Ok(Box::new(Mute));
        }
        let keystore = Arc::new(FakeKeystore::start(&config.keystore_socket()));
        *self.keystore.lock().unwrap() = Some(Arc::clone(&keystore));
        Ok(Box::new(keystore))
    }

    async fn launch_conductor(
        &self,
        config: &KeyfaultConfig,
    ) -> Result<Box<dyn DynComponent>, ScenarioError> {
        let conductor = Arc::new(FakeConductor::new(
            config.proxy_socket(),
            self.faults.broken_activation.clone(),
        ));
        *self.conductor.lock().unwrap() = Some(Arc::clone(&conductor));
        Ok(Box::new(conductor))
    }

    async fn connect_admin(&self, config: &KeyfaultConfig) -> Result<FakeAdmin, AdminError> {
        let attempt = self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.faults.admin_never_listens || attempt < self.faults.refused_admin_connects {
            return Err(AdminError::Connect {
                url: config.conductor.admin_url.clone(),
                reason: "Connection refused (os error 111)".to_owned(),
            });
        }
        Ok(FakeAdmin(self.conductor()))
    }
}
