//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수로 `metrics::counter!()` 매크로를 호출합니다.
//! 익스포터는 설치하지 않으므로 기본 recorder에서는 아무 일도 일어나지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `keyfault_`
//! - 컴포넌트명: `proxy_`, `process_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(keyfault_core::metrics::PROXY_FRAMES_FORWARDED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 프로세스 이름 레이블 키 (keystore, conductor)
pub const LABEL_PROCESS: &str = "process";

/// 종료 방식 레이블 키 (graceful, forced, already_exited)
pub const LABEL_TERMINATION: &str = "termination";

// ─── Signing Proxy 메트릭 ──────────────────────────────────────────

/// Proxy: 수락한 연결 수 (counter)
pub const PROXY_CONNECTIONS_ACCEPTED_TOTAL: &str = "keyfault_proxy_connections_accepted_total";

/// Proxy: 업스트림으로 전달한 프레임 수 (counter)
pub const PROXY_FRAMES_FORWARDED_TOTAL: &str = "keyfault_proxy_frames_forwarded_total";

/// Proxy: 차단 목록으로 거부한 서명 요청 수 (counter)
pub const PROXY_SYNTHETIC_FAILURES_TOTAL: &str = "keyfault_proxy_synthetic_failures_total";

/// Proxy: 업스트림 연결 실패로 응답한 에러 프레임 수 (counter)
pub const PROXY_FORWARD_FAILURES_TOTAL: &str = "keyfault_proxy_forward_failures_total";

// ─── Supervisor 메트릭 ─────────────────────────────────────────────

/// Supervisor: 실행한 프로세스 수 (counter)
pub const PROCESS_LAUNCHES_TOTAL: &str = "keyfault_process_launches_total";

/// Supervisor: 종료시킨 프로세스 수 (counter)
pub const PROCESS_TERMINATIONS_TOTAL: &str = "keyfault_process_terminations_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder를 설치한 뒤 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    // Signing Proxy
    describe_counter!(
        PROXY_CONNECTIONS_ACCEPTED_TOTAL,
        "Total number of keystore client connections accepted by the signing proxy"
    );
    describe_counter!(
        PROXY_FRAMES_FORWARDED_TOTAL,
        "Total number of keystore frames relayed to the upstream keystore"
    );
    describe_counter!(
        PROXY_SYNTHETIC_FAILURES_TOTAL,
        "Total number of sign requests answered with a synthetic error frame"
    );
    describe_counter!(
        PROXY_FORWARD_FAILURES_TOTAL,
        "Total number of frames answered with an error because upstream was unreachable"
    );

    // Supervisor
    describe_counter!(
        PROCESS_LAUNCHES_TOTAL,
        "Total number of child processes launched"
    );
    describe_counter!(
        PROCESS_TERMINATIONS_TOTAL,
        "Total number of child processes terminated, labelled by termination mode"
    );
}
