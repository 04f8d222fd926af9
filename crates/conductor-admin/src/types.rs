//! 관리 요청 페이로드 및 레코드 타입

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_bytes::ByteBuf;

use keyfault_core::AgentIdentity;

/// `install_app_bundle` 페이로드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallAppBundle {
    /// 호출자가 정한 ID (예: `happ-1`)
    pub installed_app_id: String,
    /// 앱의 셀이 묶이는 에이전트
    pub agent_key: AgentIdentity,
    /// 증명 이름 → 원시 바이트 (msgpack `bin`으로 인코딩)
    pub membrane_proofs: BTreeMap<String, ByteBuf>,
    /// 컨덕터 기준 번들 파일 경로
    pub path: PathBuf,
}

impl InstallAppBundle {
    pub fn new(
        installed_app_id: impl Into<String>,
        agent_key: AgentIdentity,
        membrane_proofs: BTreeMap<String, Vec<u8>>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            installed_app_id: installed_app_id.into(),
            agent_key,
            membrane_proofs: membrane_proofs
                .into_iter()
                .map(|(name, proof)| (name, ByteBuf::from(proof)))
                .collect(),
            path: path.into(),
        }
    }
}

/// `list_apps`가 보고하는 설치된 앱 하나
///
/// ID와 상태 외의 필드는 무시합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub installed_app_id: String,
    pub status: AppStatus,
}

/// 앱 상태
///
/// 컨덕터는 상태를 문자열(`"active"`) 또는 키 하나짜리 맵
/// (`{ "disabled": { "reason": ... } }`)으로 보고하며, 둘 다 키 이름으로
/// 디코딩됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    Active,
    Inactive,
    Running,
    Paused,
    Disabled,
    Other(String),
}

impl AppStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Disabled => "disabled",
            Self::Other(name) => name,
        }
    }

    /// 앱의 셀이 호출을 처리하는 상태인지 확인합니다.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active | Self::Running)
    }

    fn from_name(name: &str) -> Self {
        match name {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "disabled" => Self::Disabled,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AppStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Name(String),
    Tagged(BTreeMap<String, IgnoredAny>),
}

impl<'de> Deserialize<'de> for AppStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawStatus::deserialize(deserializer)? {
            RawStatus::Name(name) => Ok(Self::from_name(&name.to_lowercase())),
            RawStatus::Tagged(map) => match map.keys().next() {
                Some(name) if map.len() == 1 => Ok(Self::from_name(&name.to_lowercase())),
                _ => Err(serde::de::Error::custom(
                    "app status map must have exactly one key",
                )),
            },
        }
    }
}
