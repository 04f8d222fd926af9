//! 와이어 메시지 — 관리 웹소켓 메시지 형식
//!
//! 웹소켓 바이너리 메시지마다 [`WireMessage`] 하나가 담깁니다. 요청/응답의
//! `data`는 다시 [`AdminRequest`] 또는 [`AdminResponse`]의 msgpack입니다.
//! 모든 인코딩은 이름 있는 필드를 사용합니다.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use keyfault_core::AgentIdentity;

use crate::error::AdminError;
use crate::types::{AppInfo, InstallAppBundle};

/// 모든 웹소켓 메시지의 바깥 봉투
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Request {
        id: u64,
        data: ByteBuf,
    },
    Response {
        id: u64,
        data: Option<ByteBuf>,
    },
    /// 컨덕터가 먼저 보내는 알림 (관리 클라이언트는 무시)
    Signal {
        data: ByteBuf,
    },
}

impl WireMessage {
    pub fn request(id: u64, request: &AdminRequest) -> Result<Self, AdminError> {
        Ok(Self::Request {
            id,
            data: ByteBuf::from(encode(request)?),
        })
    }

    pub fn response(id: u64, response: &AdminResponse) -> Result<Self, AdminError> {
        Ok(Self::Response {
            id,
            data: Some(ByteBuf::from(encode(response)?)),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AdminError> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AdminError> {
        decode(bytes)
    }
}

/// 시나리오가 보내는 관리 작업
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AdminRequest {
    GenerateAgentPubKey,
    InstallAppBundle(InstallAppBundle),
    ActivateApp { installed_app_id: String },
    DeactivateApp { installed_app_id: String },
    ListApps { status_filter: Option<String> },
}

impl AdminRequest {
    /// 로그와 에러에 쓰는 작업 이름
    pub fn op(&self) -> &'static str {
        match self {
            Self::GenerateAgentPubKey => "generate_agent_pub_key",
            Self::InstallAppBundle(_) => "install_app_bundle",
            Self::ActivateApp { .. } => "activate_app",
            Self::DeactivateApp { .. } => "deactivate_app",
            Self::ListApps { .. } => "list_apps",
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AdminError> {
        decode(bytes)
    }
}

/// [`AdminRequest`]에 대한 컨덕터 응답
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AdminResponse {
    AgentPubKeyGenerated(AgentIdentity),
    AppBundleInstalled(AppInfo),
    AppActivated,
    AppDeactivated,
    AppsListed(Vec<AppInfo>),
    Error(ExternalApiWireError),
}

impl AdminResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentPubKeyGenerated(_) => "agent_pub_key_generated",
            Self::AppBundleInstalled(_) => "app_bundle_installed",
            Self::AppActivated => "app_activated",
            Self::AppDeactivated => "app_deactivated",
            Self::AppsListed(_) => "apps_listed",
            Self::Error(_) => "error",
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AdminError> {
        decode(bytes)
    }
}

/// [`AdminResponse::Error`]의 에러 페이로드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalApiWireError {
    /// 에러 분류 (예: `internal_error`)
    #[serde(rename = "type")]
    pub kind: String,
    /// 사람이 읽는 상세 내용
    #[serde(default)]
    pub data: Option<String>,
}

impl ExternalApiWireError {
    pub fn new(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: Some(data.into()),
        }
    }

    pub fn message(&self) -> &str {
        self.data.as_deref().unwrap_or("")
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, AdminError> {
    rmp_serde::to_vec_named(value).map_err(|e| AdminError::Encode(e.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, AdminError> {
    rmp_serde::from_slice(bytes).map_err(|e| AdminError::Decode(e.to_string()))
}
