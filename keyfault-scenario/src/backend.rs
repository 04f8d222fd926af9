//! How the driver starts the keystore and conductor and reaches the admin
//! interface.
//!
//! [`ProcessBackend`] runs the real binaries under the supervisor and talks to
//! the conductor over its admin websocket. Tests substitute an in-process
//! backend.

use std::future::Future;
use std::path::Path;

use keyfault_conductor_admin::{AdminError, AdminWebsocket, ConductorAdmin};
use keyfault_core::config::KeyfaultConfig;
use keyfault_core::lifecycle::DynComponent;
use keyfault_supervisor::{LaunchSpec, launch};

use crate::error::ScenarioError;

/// Process and admin-session factory used by [`crate::Driver`].
pub trait ScenarioBackend: Send + Sync {
    type Admin: ConductorAdmin;

    /// Starts the keystore serving on [`KeyfaultConfig::keystore_socket`].
    fn launch_keystore(
        &self,
        config: &KeyfaultConfig,
    ) -> impl Future<Output = Result<Box<dyn DynComponent>, ScenarioError>> + Send;

    /// Starts the conductor, configured to reach its keystore through
    /// [`KeyfaultConfig::proxy_socket`].
    fn launch_conductor(
        &self,
        config: &KeyfaultConfig,
    ) -> impl Future<Output = Result<Box<dyn DynComponent>, ScenarioError>> + Send;

    /// One attempt to open an admin session. Retried by the driver until the
    /// conductor readiness deadline.
    fn connect_admin(
        &self,
        config: &KeyfaultConfig,
    ) -> impl Future<Output = Result<Self::Admin, AdminError>> + Send;
}

/// Runs `lair-keystore` and `holochain` (or the configured commands) as
/// child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBackend;

impl ProcessBackend {
    /// Keystore invocation: `<command> <data_dir_flag> <scratch>/keystore <extra_args..>`.
    pub fn keystore_spec(config: &KeyfaultConfig) -> LaunchSpec {
        let keystore = &config.keystore;
        LaunchSpec::new("keystore", &keystore.command)
            .arg(&keystore.data_dir_flag)
            .arg(path_arg(&config.keystore_dir()))
            .args(keystore.extra_args.iter().cloned())
            .log_path(config.log_path_for(&keystore.command))
            .grace_period(keystore.grace_period())
    }

    /// Conductor invocation: `<command> <config_flag> <config_path> <extra_args..>`.
    pub fn conductor_spec(config: &KeyfaultConfig) -> LaunchSpec {
        let conductor = &config.conductor;
        LaunchSpec::new("conductor", &conductor.command)
            .arg(&conductor.config_flag)
            .arg(path_arg(&conductor.config_path))
            .args(conductor.extra_args.iter().cloned())
            .log_path(config.log_path_for(&conductor.command))
            .grace_period(conductor.grace_period())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl ScenarioBackend for ProcessBackend {
    type Admin = AdminWebsocket;

    async fn launch_keystore(
        &self,
        config: &KeyfaultConfig,
    ) -> Result<Box<dyn DynComponent>, ScenarioError> {
        let process = launch(Self::keystore_spec(config)).await?;
        Ok(Box::new(process))
    }

    async fn launch_conductor(
        &self,
        config: &KeyfaultConfig,
    ) -> Result<Box<dyn DynComponent>, ScenarioError> {
        let process = launch(Self::conductor_spec(config)).await?;
        Ok(Box::new(process))
    }

    async fn connect_admin(&self, config: &KeyfaultConfig) -> Result<AdminWebsocket, AdminError> {
        AdminWebsocket::connect(&config.conductor.admin_url, config.conductor.request_timeout())
            .await
    }
}
