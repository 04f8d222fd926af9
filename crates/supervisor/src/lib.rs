//! keyfault 시나리오용 자식 프로세스 감독
//!
//! - [`process`]: 이름 붙은 프로세스를 시작하고 출력을 로그 파일로 보냅니다.
//!   종료는 SIGTERM, 유예 시간, SIGKILL 순서입니다.
//! - [`readiness`]: 기한까지 지수 백오프로 준비 확인을 재시도합니다.
//!
//! 재시작 정책은 없습니다. 조기 종료는 [`ManagedProcess::try_exit_status`]로
//! 관찰할 수 있지만 에러로 취급하지 않습니다.

pub mod error;
pub mod process;
pub mod readiness;

pub use error::SupervisorError;
pub use process::{LaunchSpec, ManagedProcess, launch};
pub use readiness::{ReadinessPolicy, probe_unix_socket, wait_until_ready};
