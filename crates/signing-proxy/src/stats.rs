//! 프록시 통계 카운터
//!
//! 각 증가는 `metrics` 파사드로도 내보냅니다.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use serde::Serialize;

use keyfault_core::metrics as names;

/// 프록시 카운터
#[derive(Debug, Default)]
pub struct ProxyStats {
    connections_accepted: AtomicU64,
    frames_forwarded: AtomicU64,
    synthetic_failures: AtomicU64,
    forward_failures: AtomicU64,
}

/// 카운터 시점 값
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProxyStatsSnapshot {
    /// 수락한 연결 수
    pub connections_accepted: u64,
    /// 업스트림으로 전달한 프레임 수
    pub frames_forwarded: u64,
    /// 차단 목록으로 거부한 요청 수
    pub synthetic_failures: u64,
    /// 업스트림 연결 실패 수
    pub forward_failures: u64,
}

impl ProxyStats {
    pub(crate) fn record_connection(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        counter!(names::PROXY_CONNECTIONS_ACCEPTED_TOTAL).increment(1);
    }

    pub(crate) fn record_forwarded(&self) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
        counter!(names::PROXY_FRAMES_FORWARDED_TOTAL).increment(1);
    }

    pub(crate) fn record_synthetic(&self) {
        self.synthetic_failures.fetch_add(1, Ordering::Relaxed);
        counter!(names::PROXY_SYNTHETIC_FAILURES_TOTAL).increment(1);
    }

    pub(crate) fn record_forward_failure(&self) {
        self.forward_failures.fetch_add(1, Ordering::Relaxed);
        counter!(names::PROXY_FORWARD_FAILURES_TOTAL).increment(1);
    }

    /// 현재 카운터 값
    pub fn snapshot(&self) -> ProxyStatsSnapshot {
        ProxyStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            synthetic_failures: self.synthetic_failures.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
        }
    }
}
