//! keyfault 공통 크레이트
//!
//! 서명 프록시, 프로세스 관리자, 컨덕터 관리 클라이언트, 시나리오 드라이버가
//! 공유하는 도메인 타입, 설정, 에러, 생명주기 trait, 메트릭 이름을 제공합니다.

pub mod agent;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{AgentError, ConfigError, KeyfaultError};

// 설정
pub use config::KeyfaultConfig;

// 도메인 타입
pub use agent::{AGENT_KEY_LEN, AgentIdentity, AgentKey};

// 생명주기
pub use lifecycle::{BoxFuture, Component, DynComponent};
