//! 컨덕터 관리 클라이언트 trait — 전송 계층 추상화
//!
//! 시나리오 드라이버를 메모리 내 컨덕터로 테스트할 수 있도록 관리 전송을
//! 추상화합니다. 실제 구현은 [`crate::AdminWebsocket`]입니다.

use std::future::Future;

use keyfault_core::AgentIdentity;

use crate::error::AdminError;
use crate::types::{AppInfo, InstallAppBundle};

/// 실행 중인 컨덕터에 대한 관리 작업
///
/// 시나리오는 호출을 하나씩 보내므로 구현체가 파이프라이닝을 지원할 필요는
/// 없습니다.
pub trait ConductorAdmin: Send + Sync {
    /// 컨덕터의 키스토어에 새 에이전트 키 생성을 요청합니다.
    fn generate_agent_pub_key(
        &self,
    ) -> impl Future<Output = Result<AgentIdentity, AdminError>> + Send;

    /// `payload.agent_key`용 앱 번들을 설치합니다.
    fn install_app_bundle(
        &self,
        payload: InstallAppBundle,
    ) -> impl Future<Output = Result<(), AdminError>> + Send;

    fn activate_app(
        &self,
        installed_app_id: &str,
    ) -> impl Future<Output = Result<(), AdminError>> + Send;

    fn deactivate_app(
        &self,
        installed_app_id: &str,
    ) -> impl Future<Output = Result<(), AdminError>> + Send;

    /// 상태와 관계없이 설치된 모든 앱을 나열합니다.
    fn list_apps(&self) -> impl Future<Output = Result<Vec<AppInfo>, AdminError>> + Send;
}
