//! 에러 타입 — 관리 클라이언트 에러 정의

use std::time::Duration;

/// 관리 RPC 호출 에러
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdminError {
    /// 웹소켓 핸드셰이크 실패
    #[error("failed to connect to admin interface {url}: {reason}")]
    Connect { url: String, reason: String },

    /// 웹소켓 읽기/쓰기 실패
    #[error("admin websocket transport error: {0}")]
    Transport(String),

    /// 컨덕터가 웹소켓을 닫음
    #[error("admin websocket closed by conductor")]
    Closed,

    /// 제한 시간 안에 응답 없음
    #[error("admin request '{op}' timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("failed to encode admin request: {0}")]
    Encode(String),

    #[error("failed to decode admin response: {0}")]
    Decode(String),

    /// 컨덕터가 에러 응답을 보냄
    #[error("conductor rejected '{op}': {kind}: {message}")]
    Conductor {
        op: &'static str,
        kind: String,
        message: String,
    },

    /// 컨덕터가 다른 종류의 응답을 보냄
    #[error("unexpected response to '{op}': {got}")]
    UnexpectedResponse { op: &'static str, got: String },
}

impl AdminError {
    /// 전송이나 인코딩 실패가 아니라 컨덕터가 요청을 거부했는지 확인합니다.
    pub fn is_conductor_rejection(&self) -> bool {
        matches!(self, Self::Conductor { .. })
    }
}
