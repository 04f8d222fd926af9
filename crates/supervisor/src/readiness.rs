//! 준비 확인 — 지수 백오프 재시도
//!
//! [`wait_until_ready`]는 비동기 확인이 성공하거나 전체 기한이 지날 때까지
//! 재시도합니다:
//! - 첫 대기는 [`ReadinessPolicy::initial_delay`]
//! - 시도마다 2배, 최대 [`ReadinessPolicy::max_delay`]
//! - 마지막 시도가 기한에 맞도록 마지막 대기를 줄임

use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::net::UnixStream;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use keyfault_core::config::ReadinessConfig;

use crate::error::SupervisorError;

/// 준비 대기 한 번의 백오프 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl ReadinessPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, deadline: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            deadline,
        }
    }

    /// 공통 백오프 설정과 대상별 기한으로 정책을 만듭니다.
    pub fn from_core(config: &ReadinessConfig, deadline_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            Duration::from_millis(deadline_ms),
        )
    }
}

/// `probe`가 `Ok`를 반환할 때까지 재시도합니다.
///
/// 기한이 지나면 마지막 에러를 담은 [`SupervisorError::NotReady`]를 반환합니다.
pub async fn wait_until_ready<T, E, F, Fut>(
    target: &str,
    policy: ReadinessPolicy,
    mut probe: F,
) -> Result<T, SupervisorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start = Instant::now();
    let mut delay = policy.initial_delay;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match probe().await {
            Ok(value) => {
                info!(
                    component = target,
                    attempts,
                    waited_ms = start.elapsed().as_millis() as u64,
                    "ready"
                );
                return Ok(value);
            }
            Err(e) => {
                let elapsed = start.elapsed();
                if elapsed >= policy.deadline {
                    warn!(
                        component = target,
                        attempts,
                        error = %e,
                        "readiness deadline elapsed"
                    );
                    return Err(SupervisorError::NotReady {
                        target: target.to_owned(),
                        waited: elapsed,
                        last_error: e.to_string(),
                    });
                }

                let pause = delay.min(policy.deadline - elapsed);
                debug!(
                    component = target,
                    attempts,
                    error = %e,
                    retry_in_ms = pause.as_millis() as u64,
                    "not ready yet"
                );
                sleep(pause).await;
                delay = delay.saturating_mul(2).min(policy.max_delay);
            }
        }
    }
}

/// `path`의 Unix 소켓이 연결을 받으면 성공합니다.
pub async fn probe_unix_socket(path: &Path) -> std::io::Result<()> {
    UnixStream::connect(path).await.map(drop)
}
