//! 서명 프록시 설정
//!
//! [`ProxyConfig`]는 core의 [`KeyfaultConfig`]에서 소켓 경로와
//! 와이어 상수를 뽑아 만듭니다.
//!
//! # 사용 예시
//! ```ignore
//! use keyfault_core::config::KeyfaultConfig;
//! use keyfault_signing_proxy::config::ProxyConfig;
//!
//! let core_config = KeyfaultConfig::default();
//! let config = ProxyConfig::from_core(&core_config);
//! ```

use std::path::PathBuf;

use keyfault_core::config::{KeyfaultConfig, SigningProxyConfig};

/// 키스토어 와이어 상수
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    /// 공개키 서명 요청 메시지 타입
    pub sign_request_type: u32,
    /// 에러 응답 메시지 타입
    pub error_response_type: u32,
    /// 최대 프레임 크기 (바이트)
    pub max_frame_len: usize,
}

impl WireConfig {
    /// core 프록시 섹션에서 와이어 상수를 생성합니다.
    pub fn from_core(core: &SigningProxyConfig) -> Self {
        Self {
            sign_request_type: core.sign_request_type,
            error_response_type: core.error_response_type,
            max_frame_len: core.max_frame_len,
        }
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        Self::from_core(&SigningProxyConfig::default())
    }
}

/// 서명 프록시 설정
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// 실제 키스토어 소켓 경로
    pub upstream: PathBuf,
    /// 프록시가 바인드할 소켓 경로
    pub listen: PathBuf,
    /// 와이어 상수
    pub wire: WireConfig,
}

impl ProxyConfig {
    /// core 설정에서 프록시 설정을 생성합니다.
    pub fn from_core(core: &KeyfaultConfig) -> Self {
        Self {
            upstream: core.keystore_socket(),
            listen: core.proxy_socket(),
            wire: WireConfig::from_core(&core.proxy),
        }
    }
}
