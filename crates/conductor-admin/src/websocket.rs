//! 웹소켓 관리 클라이언트 — 컨덕터의 msgpack 웹소켓 구현

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use keyfault_core::AgentIdentity;

use crate::client::ConductorAdmin;
use crate::error::AdminError;
use crate::types::{AppInfo, InstallAppBundle};
use crate::wire::{AdminRequest, AdminResponse, WireMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 웹소켓 연결 하나 위의 관리 세션
///
/// 요청은 내부 잠금으로 순서대로 처리됩니다. 각 요청은 자기 ID의 응답을
/// 기다리며 시그널과 지난 응답은 건너뜁니다.
pub struct AdminWebsocket {
    url: String,
    socket: Mutex<Socket>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl std::fmt::Debug for AdminWebsocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminWebsocket")
            .field("url", &self.url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl AdminWebsocket {
    /// `url`로 웹소켓을 엽니다.
    ///
    /// `request_timeout`은 핸드셰이크와 이후 모든 요청에 적용됩니다.
    pub async fn connect(url: &str, request_timeout: Duration) -> Result<Self, AdminError> {
        let connect_err = |reason: String| AdminError::Connect {
            url: url.to_owned(),
            reason,
        };

        let (socket, _response) = tokio::time::timeout(request_timeout, connect_async(url))
            .await
            .map_err(|_| connect_err(format!("handshake timed out after {request_timeout:?}")))?
            .map_err(|e| connect_err(e.to_string()))?;

        info!(url, "connected to conductor admin interface");
        Ok(Self {
            url: url.to_owned(),
            socket: Mutex::new(socket),
            next_id: AtomicU64::new(0),
            request_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 종료 프레임을 보냅니다. 에러는 로그로만 남깁니다.
    pub async fn close(&self) {
        let mut socket = self.socket.lock().await;
        if let Err(e) = socket.close(None).await {
            debug!(url = self.url.as_str(), error = %e, "admin websocket close failed");
        }
    }

    /// 요청 하나를 보내고 응답을 기다립니다.
    pub async fn request(&self, request: AdminRequest) -> Result<AdminResponse, AdminError> {
        let op = request.op();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let bytes = WireMessage::request(id, &request)?.to_bytes()?;

        debug!(op, id, "admin request");
        let response = tokio::time::timeout(self.request_timeout, self.round_trip(id, bytes))
            .await
            .map_err(|_| AdminError::Timeout {
                op,
                after: self.request_timeout,
            })??;

        if let AdminResponse::Error(err) = response {
            warn!(
                op,
                id,
                kind = err.kind.as_str(),
                message = err.message(),
                "conductor rejected request"
            );
            return Err(AdminError::Conductor {
                op,
                kind: err.kind,
                message: err.data.unwrap_or_default(),
            });
        }
        debug!(op, id, response = response.kind(), "admin response");
        Ok(response)
    }

    async fn round_trip(&self, id: u64, bytes: Vec<u8>) -> Result<AdminResponse, AdminError> {
        let mut socket = self.socket.lock().await;
        socket
            .send(Message::binary(bytes))
            .await
            .map_err(|e| AdminError::Transport(e.to_string()))?;

        loop {
            let message = match socket.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(AdminError::Transport(e.to_string())),
                None => return Err(AdminError::Closed),
            };

            let payload = match message {
                Message::Binary(payload) => payload,
                Message::Ping(payload) => {
                    socket
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| AdminError::Transport(e.to_string()))?;
                    continue;
                }
                Message::Close(_) => return Err(AdminError::Closed),
                other => {
                    debug!(kind = ?other, "ignoring non-binary admin message");
                    continue;
                }
            };

            match WireMessage::from_bytes(&payload)? {
                WireMessage::Response { id: got, data } if got == id => {
                    let data = data.ok_or_else(|| {
                        AdminError::Decode(format!("response {id} carries no data"))
                    })?;
                    return AdminResponse::from_bytes(&data);
                }
                WireMessage::Response { id: got, .. } => {
                    debug!(expected = id, got, "discarding stale admin response");
                }
                WireMessage::Signal { .. } => debug!("ignoring conductor signal"),
                WireMessage::Request { id: got, .. } => {
                    debug!(id = got, "ignoring request from conductor");
                }
            }
        }
    }
}

fn unexpected(op: &'static str, response: AdminResponse) -> AdminError {
    AdminError::UnexpectedResponse {
        op,
        got: response.kind().to_owned(),
    }
}

impl ConductorAdmin for AdminWebsocket {
    async fn generate_agent_pub_key(&self) -> Result<AgentIdentity, AdminError> {
        match self.request(AdminRequest::GenerateAgentPubKey).await? {
            AdminResponse::AgentPubKeyGenerated(agent) => Ok(agent),
            other => Err(unexpected("generate_agent_pub_key", other)),
        }
    }

    async fn install_app_bundle(&self, payload: InstallAppBundle) -> Result<(), AdminError> {
        match self.request(AdminRequest::InstallAppBundle(payload)).await? {
            AdminResponse::AppBundleInstalled(_) => Ok(()),
            other => Err(unexpected("install_app_bundle", other)),
        }
    }

    async fn activate_app(&self, installed_app_id: &str) -> Result<(), AdminError> {
        let request = AdminRequest::ActivateApp {
            installed_app_id: installed_app_id.to_owned(),
        };
        match self.request(request).await? {
            AdminResponse::AppActivated => Ok(()),
            other => Err(unexpected("activate_app", other)),
        }
    }

    async fn deactivate_app(&self, installed_app_id: &str) -> Result<(), AdminError> {
        let request = AdminRequest::DeactivateApp {
            installed_app_id: installed_app_id.to_owned(),
        };
        match self.request(request).await? {
            AdminResponse::AppDeactivated => Ok(()),
            other => Err(unexpected("deactivate_app", other)),
        }
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, AdminError> {
        match self
            .request(AdminRequest::ListApps {
                status_filter: None,
            })
            .await?
        {
            AdminResponse::AppsListed(apps) => Ok(apps),
            other => Err(unexpected("list_apps", other)),
        }
    }
}
