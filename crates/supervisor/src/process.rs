//! 프로세스 시작과 종료
//!
//! [`launch`]는 stdin을 닫고 stdout과 stderr를 하나의 로그 파일에 이어 쓰도록
//! 자식 프로세스를 즉시 시작합니다. 반환되는 [`ManagedProcess`]는 복제 가능한
//! 핸들입니다. 자식 핸들은 [`ManagedProcess::terminate`]로 종료가 관찰된 뒤에만
//! 해제됩니다.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use keyfault_core::error::KeyfaultError;
use keyfault_core::lifecycle::Component;
use keyfault_core::metrics as names;

use crate::error::SupervisorError;

/// SIGTERM과 SIGKILL 사이 기본 유예 시간
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// 실행할 프로그램과 출력 위치
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// 로그와 에러에 쓰는 이름
    pub name: String,
    /// 실행할 프로그램 (`PATH`에서 탐색)
    pub command: String,
    /// 그대로 전달되는 인자
    pub args: Vec<String>,
    /// stdout과 stderr를 이어 쓰는 로그 파일
    pub log_path: PathBuf,
    /// SIGTERM 후 SIGKILL까지 기다리는 시간
    pub grace_period: Duration,
}

impl LaunchSpec {
    /// 인자 없이, 작업 디렉토리의 `<name>.txt`에 로그를 남기는 설정을 만듭니다.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            log_path: PathBuf::from(format!("{name}.txt")),
            name,
            command: command.into(),
            args: Vec::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

/// `spec`에 따라 프로세스를 시작합니다.
///
/// 로그 파일의 상위 디렉토리를 만들고, 파일을 추가 모드로 열어 stdout과
/// stderr가 함께 씁니다.
///
/// # Errors
///
/// 로그 파일을 열 수 없으면 [`SupervisorError::LogFile`],
/// 프로그램을 시작할 수 없으면 [`SupervisorError::SpawnFailed`]를 반환합니다.
pub async fn launch(spec: LaunchSpec) -> Result<ManagedProcess, SupervisorError> {
    let (stdout, stderr) = open_log_sink(&spec.log_path).await?;

    let spawn_err = |reason: String| SupervisorError::SpawnFailed {
        name: spec.name.clone(),
        command: spec.command.clone(),
        reason,
    };

    let child = Command::new(&spec.command)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_err(e.to_string()))?;

    let pid = child
        .id()
        .ok_or_else(|| spawn_err("failed to get process ID".to_owned()))?;

    counter!(names::PROCESS_LAUNCHES_TOTAL, names::LABEL_PROCESS => spec.name.clone())
        .increment(1);
    info!(
        process = spec.name.as_str(),
        pid,
        command = spec.command.as_str(),
        args = ?spec.args,
        log = %spec.log_path.display(),
        "process launched"
    );

    Ok(ManagedProcess {
        inner: Arc::new(Inner {
            name: spec.name,
            pid,
            log_path: spec.log_path,
            grace_period: spec.grace_period,
            state: Mutex::new(ProcessState::Running(child)),
        }),
    })
}

async fn open_log_sink(path: &Path) -> Result<(Stdio, Stdio), SupervisorError> {
    let log_err = |e: std::io::Error| SupervisorError::LogFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(log_err)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(log_err)?;
    let err_file = file.try_clone().map_err(log_err)?;
    Ok((Stdio::from(file), Stdio::from(err_file)))
}

enum ProcessState {
    Running(Child),
    Exited(ExitStatus),
}

struct Inner {
    name: String,
    pid: u32,
    log_path: PathBuf,
    grace_period: Duration,
    state: Mutex<ProcessState>,
}

/// 시작된 자식 프로세스 핸들
///
/// 복제본은 같은 자식을 공유합니다. 자식이 실행 중일 때 모든 핸들이
/// 드롭되면 자식은 강제 종료됩니다.
#[derive(Clone)]
pub struct ManagedProcess {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("name", &self.inner.name)
            .field("pid", &self.inner.pid)
            .finish()
    }
}

impl ManagedProcess {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    pub fn log_path(&self) -> &Path {
        &self.inner.log_path
    }

    /// 자식이 이미 종료했다면 종료 상태를 반환합니다.
    ///
    /// 블로킹하지 않습니다. 실행 중이거나 종료 처리 중이면 `None`입니다.
    pub fn try_exit_status(&self) -> Option<ExitStatus> {
        let mut state = self.inner.state.try_lock().ok()?;
        match &mut *state {
            ProcessState::Exited(status) => Some(*status),
            ProcessState::Running(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    info!(process = self.name(), pid = self.pid(), %status, "process exited on its own");
                    *state = ProcessState::Exited(status);
                    Some(status)
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(process = self.name(), error = %e, "failed to poll process status");
                    None
                }
            },
        }
    }

    /// 자식을 정지하고 종료를 기다립니다.
    ///
    /// SIGTERM을 보내고 유예 시간만큼 기다린 뒤 SIGKILL을 보냅니다.
    /// 종료가 관찰되어야 반환하며 SIGKILL 이후에는 타임아웃이 없습니다.
    /// 이후 호출은 첫 호출의 종료 상태를 그대로 반환합니다.
    pub async fn terminate(&self) -> Result<ExitStatus, SupervisorError> {
        let mut state = self.inner.state.lock().await;
        let child = match &mut *state {
            ProcessState::Exited(status) => return Ok(*status),
            ProcessState::Running(child) => child,
        };

        let terminate_err = |e: std::io::Error| SupervisorError::Terminate {
            name: self.inner.name.clone(),
            reason: e.to_string(),
        };

        let (status, mode) = match child.try_wait().map_err(terminate_err)? {
            Some(status) => (status, "already_exited"),
            None => {
                self.send_sigterm();
                match tokio::time::timeout(self.inner.grace_period, child.wait()).await {
                    Ok(result) => (result.map_err(terminate_err)?, "graceful"),
                    Err(_) => {
                        warn!(
                            process = self.name(),
                            pid = self.pid(),
                            grace_ms = self.inner.grace_period.as_millis() as u64,
                            "process ignored SIGTERM, sending SIGKILL"
                        );
                        child.kill().await.map_err(terminate_err)?;
                        (child.wait().await.map_err(terminate_err)?, "forced")
                    }
                }
            }
        };

        *state = ProcessState::Exited(status);
        counter!(
            names::PROCESS_TERMINATIONS_TOTAL,
            names::LABEL_PROCESS => self.inner.name.clone(),
            names::LABEL_TERMINATION => mode
        )
        .increment(1);
        info!(process = self.name(), pid = self.pid(), %status, mode, "process terminated");
        Ok(status)
    }

    fn send_sigterm(&self) {
        let Ok(pid) = libc::pid_t::try_from(self.inner.pid) else {
            warn!(process = self.name(), pid = self.pid(), "pid out of range for kill(2)");
            return;
        };
        // SAFETY: kill(2)에는 메모리 안전 전제 조건이 없습니다. pid는 아직 회수되지
        // 않은 자식의 것이므로 재사용되었을 수 없습니다.
        let result = unsafe { libc::kill(pid, libc::SIGTERM) };
        if result != 0 {
            let err = std::io::Error::last_os_error();
            debug!(process = self.name(), pid, error = %err, "SIGTERM not delivered");
        }
    }
}

impl Component for ManagedProcess {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn shutdown(&self) -> Result<(), KeyfaultError> {
        self.terminate().await.map(|_| ()).map_err(KeyfaultError::from)
    }
}
