//! 키스토어 채널 결함 주입 서명 프록시
//!
//! 컨덕터와 키스토어 사이의 Unix 소켓에 끼어들어 프레임을 그대로 중계하고,
//! 차단 목록에 오른 에이전트의 서명 요청에는 키스토어와 같은 형태의 에러 프레임으로 응답합니다.
//!
//! # 모듈 구성
//!
//! - [`codec`]: 길이 접두 키스토어 프레임 코덱
//! - [`denylist`]: 드라이버와 공유하는 에이전트 차단 목록
//! - [`policy`]: 서명 요청별 전달/거부 결정 trait
//! - [`stats`]: 연결/프레임 카운터
//! - [`proxy`]: 수락 루프와 연결별 중계 태스크
//! - [`config`]: 프록시 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! conductor ──▶ shim/socket ──▶ SigningPolicy ──Forward──▶ keystore/socket
//!                                     │
//!                                  Reject
//!                                     ▼
//!                               error frame (same msg id)
//! ```

pub mod codec;
pub mod config;
pub mod denylist;
pub mod error;
pub mod policy;
pub mod proxy;
pub mod stats;

// --- 주요 타입 re-export ---

// 프록시
pub use proxy::{ProxyHandle, SigningOutcome, SigningProxy};

// 설정
pub use config::{ProxyConfig, WireConfig};

// 에러
pub use error::ProxyError;

// 코덱
pub use codec::{KeystoreCodec, KeystoreFrame};

// 정책
pub use denylist::Denylist;
pub use policy::{AlwaysForward, Decision, DenylistPolicy, SigningPolicy, SigningRequest};

// 통계
pub use stats::{ProxyStats, ProxyStatsSnapshot};
