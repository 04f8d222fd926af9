//! 서명 정책 — 요청별 전달/거부 결정
//!
//! [`SigningPolicy`]는 서명 요청 프레임마다 동기적으로 호출됩니다.
//! 기본 구현:
//! - [`AlwaysForward`]: 모든 요청을 전달
//! - [`DenylistPolicy`]: [`Denylist`]에 있는 에이전트의 요청을 거부
//! - `Fn(&SigningRequest) -> Decision` 클로저

use keyfault_core::{AGENT_KEY_LEN, AgentKey};

use crate::codec::KeystoreFrame;
use crate::denylist::Denylist;

/// 차단된 에이전트에 돌려주는 기본 사유
pub const DEFAULT_REJECT_REASON: &str = "purposeful signing error";

/// 서명 요청 프레임의 빌린 뷰
///
/// `payload`는 키 뒤의 서명 대상 데이터이며 해석하지 않습니다.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    /// 서명할 에이전트 키
    pub agent: AgentKey,
    /// 서명 대상 데이터
    pub payload: &'a [u8],
    /// 요청 메시지 ID
    pub msg_id: u64,
}

impl<'a> SigningRequest<'a> {
    /// 공개키 서명 요청 프레임에서 요청을 추출합니다.
    ///
    /// 타입이 다르거나 키를 꺼낼 수 없으면 `None`을 반환합니다.
    pub fn from_frame(frame: &'a KeystoreFrame, sign_request_type: u32) -> Option<Self> {
        if frame.msg_type != sign_request_type {
            return None;
        }
        let body = frame.payload();
        let agent = AgentKey::from_prefix(body)?;
        Some(Self {
            agent,
            payload: &body[AGENT_KEY_LEN..],
            msg_id: frame.msg_id,
        })
    }
}

/// 정책 결정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// 업스트림 키스토어로 전달
    Forward,
    /// 에러 프레임으로 응답
    Reject(String),
}

/// 서명 정책 trait
pub trait SigningPolicy: Send + Sync {
    /// 요청에 대한 결정을 반환합니다.
    fn decide(&self, request: &SigningRequest<'_>) -> Decision;
}

impl<F> SigningPolicy for F
where
    F: Fn(&SigningRequest<'_>) -> Decision + Send + Sync,
{
    fn decide(&self, request: &SigningRequest<'_>) -> Decision {
        self(request)
    }
}

/// 모든 요청을 전달하는 정책
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysForward;

impl SigningPolicy for AlwaysForward {
    fn decide(&self, _request: &SigningRequest<'_>) -> Decision {
        Decision::Forward
    }
}

/// 차단 목록 기반 정책
#[derive(Debug, Clone)]
pub struct DenylistPolicy {
    denylist: Denylist,
    reason: String,
}

impl DenylistPolicy {
    /// 공유 차단 목록으로 정책을 생성합니다.
    pub fn new(denylist: Denylist) -> Self {
        Self {
            denylist,
            reason: DEFAULT_REJECT_REASON.to_owned(),
        }
    }

    /// 거부 사유를 변경합니다.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// 정책이 조회하는 차단 목록
    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }
}

impl SigningPolicy for DenylistPolicy {
    fn decide(&self, request: &SigningRequest<'_>) -> Decision {
        if self.denylist.contains(&request.agent) {
            Decision::Reject(self.reason.clone())
        } else {
            Decision::Forward
        }
    }
}
