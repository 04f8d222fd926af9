//! 서명 프록시 에러 타입
//!
//! [`ProxyError`]는 프록시 내부에서 발생하는 에러를 표현합니다.
//! `From<ProxyError> for KeyfaultError` 변환이 구현되어 있어
//! 정리 단계에서 `?` 연산자로 전파할 수 있습니다.

use keyfault_core::error::KeyfaultError;

/// 서명 프록시 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// 리스너 바인드 실패
    #[error("failed to bind proxy socket {path}: {reason}")]
    Bind {
        /// 소켓 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 선언된 프레임 길이가 헤더보다 짧음
    #[error("frame length {len} is shorter than the {min}-byte header")]
    FrameTooShort {
        /// 선언된 길이
        len: usize,
        /// 최소 길이
        min: usize,
    },

    /// 선언된 프레임 길이가 최대값을 초과함
    #[error("frame length {len} exceeds maximum {max}")]
    FrameTooLarge {
        /// 선언된 길이
        len: usize,
        /// 최대 길이
        max: usize,
    },

    /// 소켓 정리 실패
    #[error("failed to remove proxy socket {path}: {reason}")]
    Cleanup {
        /// 소켓 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProxyError> for KeyfaultError {
    fn from(err: ProxyError) -> Self {
        KeyfaultError::Shutdown {
            name: "signing-proxy".to_owned(),
            reason: err.to_string(),
        }
    }
}
