//! 에이전트 식별자 — 키스토어가 발급한 공개키 표현
//!
//! 컨덕터 관리 RPC는 39바이트 접두어 형식(타입 접두어 3 + ed25519 키 32 + 위치 4)을
//! 돌려주고, 키스토어 채널의 서명 요청은 32바이트 원시 키만 담습니다.
//! [`AgentIdentity::key`]로 두 표현을 같은 [`AgentKey`]로 맞춥니다.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AgentError;

/// ed25519 공개키 길이
pub const AGENT_KEY_LEN: usize = 32;

/// 접두어 형식 식별자 길이
pub const PREFIXED_IDENTITY_LEN: usize = 39;

/// 접두어 형식에서 키가 시작하는 위치
const PREFIX_LEN: usize = 3;

/// 키스토어 채널에서 보이는 32바이트 원시 공개키
///
/// 차단 목록의 키로 사용됩니다.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentKey([u8; AGENT_KEY_LEN]);

impl AgentKey {
    /// 원시 바이트로 키를 생성합니다.
    pub const fn new(bytes: [u8; AGENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// 슬라이스 앞부분 32바이트로 키를 생성합니다.
    ///
    /// 슬라이스가 32바이트보다 짧으면 `None`을 반환합니다.
    pub fn from_prefix(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..AGENT_KEY_LEN)?;
        let mut key = [0u8; AGENT_KEY_LEN];
        key.copy_from_slice(head);
        Some(Self(key))
    }

    /// 원시 바이트를 반환합니다.
    pub fn as_bytes(&self) -> &[u8; AGENT_KEY_LEN] {
        &self.0
    }

    /// 로그용 짧은 16진수 표현 (앞 8바이트)
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentKey({})", self.short_hex())
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// 키스토어가 발급한 에이전트 식별자
///
/// 발급된 바이트를 그대로 보관하며 생성 후 변경되지 않습니다.
/// 직렬화 시 MessagePack `bin` 타입으로 인코딩됩니다.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AgentIdentity {
    bytes: Vec<u8>,
    key: AgentKey,
}

impl AgentIdentity {
    /// 바이트열에서 식별자를 생성합니다.
    ///
    /// 32바이트(원시 키) 또는 39바이트(접두어 형식)만 허용합니다.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, AgentError> {
        let bytes = bytes.into();
        let key_bytes = match bytes.len() {
            AGENT_KEY_LEN => &bytes[..],
            PREFIXED_IDENTITY_LEN => &bytes[PREFIX_LEN..PREFIX_LEN + AGENT_KEY_LEN],
            len => return Err(AgentError::InvalidLength { len }),
        };
        let key = AgentKey::from_prefix(key_bytes).ok_or(AgentError::InvalidLength {
            len: bytes.len(),
        })?;
        Ok(Self { bytes, key })
    }

    /// 서명 요청에서 사용되는 원시 키
    pub fn key(&self) -> AgentKey {
        self.key
    }

    /// 발급된 원본 바이트
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<AgentKey> for AgentIdentity {
    fn from(key: AgentKey) -> Self {
        Self {
            bytes: key.as_bytes().to_vec(),
            key,
        }
    }
}

impl fmt::Debug for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentIdentity({})", hex::encode(&self.bytes))
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.bytes))
    }
}

impl Serialize for AgentIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.bytes)
    }
}

impl<'de> Deserialize<'de> for AgentIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let buf = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Self::from_bytes(buf.into_vec()).map_err(serde::de::Error::custom)
    }
}
