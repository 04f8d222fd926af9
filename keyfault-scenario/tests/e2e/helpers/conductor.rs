//! In-process conductor.
//!
//! Keeps one keystore connection to the configured (proxy) socket, opened on
//! first use like a real conductor. Installing, activating and deactivating
//! an app each need one signature from the app's agent; a keystore error
//! frame turns into an `internal_error` admin response.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use keyfault_conductor_admin::{AdminError, AppInfo, AppStatus, ConductorAdmin, InstallAppBundle};
use keyfault_core::AgentIdentity;
use keyfault_core::error::KeyfaultError;
use keyfault_core::lifecycle::Component;
use keyfault_signing_proxy::{KeystoreCodec, KeystoreFrame};

use super::keystore::{ERROR, MAX, SIGN, SIGN_REPLY};

struct App {
    agent: AgentIdentity,
    status: AppStatus,
}

pub struct FakeConductor {
    keystore_path: PathBuf,
    keystore: tokio::sync::Mutex<Option<Framed<UnixStream, KeystoreCodec>>>,
    apps: Mutex<BTreeMap<String, App>>,
    next_agent: AtomicU8,
    next_msg_id: AtomicU64,
    /// App whose activation fails regardless of signing.
    broken_activation: Option<String>,
    stopped: AtomicBool,
}

impl FakeConductor {
    pub fn new(keystore_path: PathBuf, broken_activation: Option<String>) -> Self {
        Self {
            keystore_path,
            keystore: tokio::sync::Mutex::new(None),
            apps: Mutex::new(BTreeMap::new()),
            next_agent: AtomicU8::new(1),
            next_msg_id: AtomicU64::new(1),
            broken_activation,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn status_of(&self, app_id: &str) -> Option<AppStatus> {
        self.apps
            .lock()
            .unwrap()
            .get(app_id)
            .map(|app| app.status.clone())
    }

    async fn sign(&self, op: &'static str, agent: &AgentIdentity) -> Result<(), AdminError> {
        let mut guard = self.keystore.lock().await;
        if guard.is_none() {
            let stream = UnixStream::connect(&self.keystore_path)
                .await
                .map_err(|e| AdminError::Transport(e.to_string()))?;
            *guard = Some(Framed::new(stream, KeystoreCodec::new(MAX)));
        }
        let keystore = guard.as_mut().unwrap();

        let msg_id = self.next_msg_id.fetch_add(1, Ordering::SeqCst);
        let mut payload = agent.key().as_bytes().to_vec();
        payload.extend_from_slice(op.as_bytes());
        keystore
            .send(KeystoreFrame::new(SIGN, msg_id, &payload))
            .await
            .map_err(|e| AdminError::Transport(e.to_string()))?;

        let reply = match keystore.next().await {
            Some(Ok(reply)) => reply,
            Some(Err(e)) => return Err(AdminError::Transport(e.to_string())),
            None => return Err(AdminError::Transport("keystore closed".to_owned())),
        };
        assert_eq!(reply.msg_id, msg_id, "keystore reply must echo the message id");

        if let Some(reason) = reply.error_reason(ERROR) {
            return Err(internal_error(op, reason));
        }
        assert_eq!(reply.msg_type, SIGN_REPLY);
        Ok(())
    }

    fn agent_of(&self, op: &'static str, app_id: &str) -> Result<AgentIdentity, AdminError> {
        self.apps
            .lock()
            .unwrap()
            .get(app_id)
            .map(|app| app.agent.clone())
            .ok_or_else(|| internal_error(op, format!("app {app_id} not installed")))
    }

    fn set_status(&self, app_id: &str, status: AppStatus) {
        if let Some(app) = self.apps.lock().unwrap().get_mut(app_id) {
            app.status = status;
        }
    }
}

fn internal_error(op: &'static str, message: impl Into<String>) -> AdminError {
    AdminError::Conductor {
        op,
        kind: "internal_error".to_owned(),
        message: message.into(),
    }
}

impl Component for FakeConductor {
    fn name(&self) -> &str {
        "conductor"
    }

    async fn shutdown(&self) -> Result<(), KeyfaultError> {
        self.stopped.store(true, Ordering::SeqCst);
        self.keystore.lock().await.take();
        Ok(())
    }
}

/// Admin session on a [`FakeConductor`].
#[derive(Clone)]
pub struct FakeAdmin(pub Arc<FakeConductor>);

impl ConductorAdmin for FakeAdmin {
    async fn generate_agent_pub_key(&self) -> Result<AgentIdentity, AdminError> {
        let n = self.0.next_agent.fetch_add(1, Ordering::SeqCst);
        let mut bytes = vec![0x84, 0x20, 0x24];
        bytes.extend_from_slice(&[n; 32]);
        bytes.extend_from_slice(&[0, 0, 0, n]);
        Ok(AgentIdentity::from_bytes(bytes).unwrap())
    }

    async fn install_app_bundle(&self, payload: InstallAppBundle) -> Result<(), AdminError> {
        let op = "install_app_bundle";
        if self.0.apps.lock().unwrap().contains_key(&payload.installed_app_id) {
            return Err(internal_error(op, "app already installed"));
        }
        assert!(payload.membrane_proofs.contains_key("test"));
        self.0.sign(op, &payload.agent_key).await?;
        self.0.apps.lock().unwrap().insert(
            payload.installed_app_id,
            App {
                agent: payload.agent_key,
                status: AppStatus::Inactive,
            },
        );
        Ok(())
    }

    async fn activate_app(&self, installed_app_id: &str) -> Result<(), AdminError> {
        let op = "activate_app";
        let agent = self.0.agent_of(op, installed_app_id)?;
        if self.0.broken_activation.as_deref() == Some(installed_app_id) {
            return Err(internal_error(op, "cell failed to join network"));
        }
        self.0.sign(op, &agent).await?;
        self.0.set_status(installed_app_id, AppStatus::Active);
        Ok(())
    }

    async fn deactivate_app(&self, installed_app_id: &str) -> Result<(), AdminError> {
        let op = "deactivate_app";
        let agent = self.0.agent_of(op, installed_app_id)?;
        self.0.sign(op, &agent).await?;
        self.0.set_status(installed_app_id, AppStatus::Inactive);
        Ok(())
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, AdminError> {
        Ok(self
            .0
            .apps
            .lock()
            .unwrap()
            .iter()
            .map(|(id, app)| AppInfo {
                installed_app_id: id.clone(),
                status: app.status.clone(),
            })
            .collect())
    }
}
