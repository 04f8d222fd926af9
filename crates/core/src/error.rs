//! 에러 타입 — 도메인별 에러 정의

/// keyfault 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum KeyfaultError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 에이전트 식별자 에러
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// 컴포넌트 정지 실패
    #[error("component '{name}' failed to stop: {reason}")]
    Shutdown { name: String, reason: String },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 에이전트 식별자 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// 지원하지 않는 길이의 식별자
    #[error("agent identity has unsupported length {len} (expected 32 or 39 bytes)")]
    InvalidLength { len: usize },
}
