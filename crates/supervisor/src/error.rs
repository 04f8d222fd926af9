//! 에러 타입 — 프로세스 감독 에러 정의

use std::time::Duration;

use keyfault_core::error::KeyfaultError;

/// 프로세스 시작, 정지, 대기 중 발생하는 에러
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// 프로세스를 시작할 수 없음
    #[error("failed to spawn '{name}' ({command}): {reason}")]
    SpawnFailed {
        name: String,
        command: String,
        reason: String,
    },

    /// 로그 파일을 열 수 없음
    #[error("failed to open log file {path}: {reason}")]
    LogFile { path: String, reason: String },

    /// 프로세스 대기 또는 종료 실패
    #[error("failed to terminate '{name}': {reason}")]
    Terminate { name: String, reason: String },

    /// 기한 안에 준비 확인이 성공하지 못함
    #[error("{target} not ready after {waited:?}: {last_error}")]
    NotReady {
        target: String,
        waited: Duration,
        last_error: String,
    },
}

impl From<SupervisorError> for KeyfaultError {
    fn from(err: SupervisorError) -> Self {
        let name = match &err {
            SupervisorError::SpawnFailed { name, .. } | SupervisorError::Terminate { name, .. } => {
                name.clone()
            }
            SupervisorError::NotReady { target, .. } => target.clone(),
            SupervisorError::LogFile { .. } => "supervisor".to_owned(),
        };
        KeyfaultError::Shutdown {
            name,
            reason: err.to_string(),
        }
    }
}
