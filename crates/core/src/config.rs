//! 설정 관리 — keyfault.toml 파싱 및 런타임 설정
//!
//! [`KeyfaultConfig`]는 시나리오 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`KEYFAULT_CONDUCTOR_ADMIN_URL=ws://...` 형식)
//! 3. 설정 파일 (`keyfault.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), keyfault_core::error::KeyfaultError> {
//! use keyfault_core::config::KeyfaultConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = KeyfaultConfig::load("keyfault.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = KeyfaultConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, KeyfaultError};

/// 프레임 헤더 길이 (길이 4 + 타입 4 + 메시지 ID 8)
pub const FRAME_HEADER_LEN: usize = 16;

/// keyfault 통합 설정
///
/// `keyfault.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyfaultConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 작업 디렉토리 설정
    #[serde(default)]
    pub paths: PathsConfig,
    /// 키스토어 프로세스 설정
    #[serde(default)]
    pub keystore: KeystoreConfig,
    /// 컨덕터 프로세스 및 관리 RPC 설정
    #[serde(default)]
    pub conductor: ConductorConfig,
    /// 서명 프록시 설정
    #[serde(default)]
    pub proxy: SigningProxyConfig,
    /// 준비 상태 확인 설정
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// 시나리오 설정
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl KeyfaultConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, KeyfaultError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, KeyfaultError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KeyfaultError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                KeyfaultError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, KeyfaultError> {
        toml::from_str(toml_str).map_err(|e| {
            KeyfaultError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `KEYFAULT_{SECTION}_{FIELD}`
    /// 예: `KEYFAULT_CONDUCTOR_ADMIN_URL=ws://127.0.0.1:4444/`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "KEYFAULT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "KEYFAULT_GENERAL_LOG_FORMAT");

        // Paths
        override_path(&mut self.paths.scratch_dir, "KEYFAULT_PATHS_SCRATCH_DIR");
        override_path(&mut self.paths.log_dir, "KEYFAULT_PATHS_LOG_DIR");

        // Keystore
        override_string(&mut self.keystore.command, "KEYFAULT_KEYSTORE_COMMAND");
        override_string(
            &mut self.keystore.data_dir_flag,
            "KEYFAULT_KEYSTORE_DATA_DIR_FLAG",
        );
        override_csv(&mut self.keystore.extra_args, "KEYFAULT_KEYSTORE_EXTRA_ARGS");
        override_u64(
            &mut self.keystore.grace_period_ms,
            "KEYFAULT_KEYSTORE_GRACE_PERIOD_MS",
        );

        // Conductor
        override_string(&mut self.conductor.command, "KEYFAULT_CONDUCTOR_COMMAND");
        override_string(
            &mut self.conductor.config_flag,
            "KEYFAULT_CONDUCTOR_CONFIG_FLAG",
        );
        override_path(
            &mut self.conductor.config_path,
            "KEYFAULT_CONDUCTOR_CONFIG_PATH",
        );
        override_string(&mut self.conductor.admin_url, "KEYFAULT_CONDUCTOR_ADMIN_URL");
        override_u64(
            &mut self.conductor.request_timeout_ms,
            "KEYFAULT_CONDUCTOR_REQUEST_TIMEOUT_MS",
        );
        override_u64(
            &mut self.conductor.grace_period_ms,
            "KEYFAULT_CONDUCTOR_GRACE_PERIOD_MS",
        );

        // Proxy
        override_u32(
            &mut self.proxy.sign_request_type,
            "KEYFAULT_PROXY_SIGN_REQUEST_TYPE",
        );
        override_u32(
            &mut self.proxy.error_response_type,
            "KEYFAULT_PROXY_ERROR_RESPONSE_TYPE",
        );
        override_usize(&mut self.proxy.max_frame_len, "KEYFAULT_PROXY_MAX_FRAME_LEN");

        // Readiness
        override_u64(
            &mut self.readiness.initial_delay_ms,
            "KEYFAULT_READINESS_INITIAL_DELAY_MS",
        );
        override_u64(
            &mut self.readiness.max_delay_ms,
            "KEYFAULT_READINESS_MAX_DELAY_MS",
        );
        override_u64(
            &mut self.readiness.keystore_deadline_ms,
            "KEYFAULT_READINESS_KEYSTORE_DEADLINE_MS",
        );
        override_u64(
            &mut self.readiness.proxy_deadline_ms,
            "KEYFAULT_READINESS_PROXY_DEADLINE_MS",
        );
        override_u64(
            &mut self.readiness.conductor_deadline_ms,
            "KEYFAULT_READINESS_CONDUCTOR_DEADLINE_MS",
        );

        // Scenario
        override_path(&mut self.scenario.bundle_path, "KEYFAULT_SCENARIO_BUNDLE_PATH");
        override_string(
            &mut self.scenario.app_id_prefix,
            "KEYFAULT_SCENARIO_APP_ID_PREFIX",
        );
        override_u64(
            &mut self.scenario.settle_before_teardown_ms,
            "KEYFAULT_SCENARIO_SETTLE_BEFORE_TEARDOWN_MS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), KeyfaultError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.keystore.command.trim().is_empty() {
            return Err(invalid("keystore.command", "must not be empty"));
        }
        if self.conductor.command.trim().is_empty() {
            return Err(invalid("conductor.command", "must not be empty"));
        }

        let url = self.conductor.admin_url.as_str();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(invalid(
                "conductor.admin_url",
                "must start with ws:// or wss://",
            ));
        }

        if self.proxy.max_frame_len < FRAME_HEADER_LEN {
            return Err(invalid(
                "proxy.max_frame_len",
                format!("must be at least {FRAME_HEADER_LEN} bytes"),
            ));
        }
        if self.proxy.sign_request_type == self.proxy.error_response_type {
            return Err(invalid(
                "proxy.error_response_type",
                "must differ from proxy.sign_request_type",
            ));
        }

        if self.readiness.initial_delay_ms == 0 {
            return Err(invalid("readiness.initial_delay_ms", "must be greater than 0"));
        }
        for (field, deadline) in [
            ("readiness.keystore_deadline_ms", self.readiness.keystore_deadline_ms),
            ("readiness.proxy_deadline_ms", self.readiness.proxy_deadline_ms),
            ("readiness.conductor_deadline_ms", self.readiness.conductor_deadline_ms),
        ] {
            if deadline < self.readiness.initial_delay_ms {
                return Err(invalid(field, "must not be shorter than initial_delay_ms"));
            }
        }

        if self.scenario.app_id_prefix.is_empty() {
            return Err(invalid("scenario.app_id_prefix", "must not be empty"));
        }
        self.scenario.decoded_membrane_proofs()?;

        Ok(())
    }

    /// 키스토어 데이터 디렉토리 (`<scratch>/keystore`)
    pub fn keystore_dir(&self) -> PathBuf {
        self.paths.scratch_dir.join(&self.keystore.data_dir_name)
    }

    /// 키스토어 소켓 경로 (`<scratch>/keystore/socket`)
    pub fn keystore_socket(&self) -> PathBuf {
        self.keystore_dir().join(&self.keystore.socket_name)
    }

    /// 프록시 소켓 디렉토리 (`<scratch>/shim`)
    pub fn proxy_dir(&self) -> PathBuf {
        self.paths.scratch_dir.join(&self.proxy.dir_name)
    }

    /// 프록시 소켓 경로 (`<scratch>/shim/socket`)
    pub fn proxy_socket(&self) -> PathBuf {
        self.proxy_dir().join(&self.proxy.socket_name)
    }

    /// 명령 이름을 딴 로그 파일 경로 (`<log_dir>/<command>.txt`)
    pub fn log_path_for(&self, command: &str) -> PathBuf {
        let stem = Path::new(command)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| command.to_owned());
        self.paths.log_dir.join(format!("{stem}.txt"))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> KeyfaultError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 작업 디렉토리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// 실행마다 새로 만드는 임시 루트
    pub scratch_dir: PathBuf,
    /// 프로세스 출력 로그 디렉토리 (지우지 않음)
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("./tmp"),
            log_dir: PathBuf::from("./log"),
        }
    }
}

/// 키스토어 프로세스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// 실행 명령
    pub command: String,
    /// 데이터 디렉토리 플래그
    pub data_dir_flag: String,
    /// 추가 인자
    pub extra_args: Vec<String>,
    /// scratch 아래 데이터 디렉토리 이름
    pub data_dir_name: String,
    /// 데이터 디렉토리 아래 소켓 파일 이름
    pub socket_name: String,
    /// SIGTERM 후 SIGKILL까지 대기 시간 (밀리초)
    pub grace_period_ms: u64,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            command: "lair-keystore".to_owned(),
            data_dir_flag: "--lair-dir".to_owned(),
            extra_args: Vec::new(),
            data_dir_name: "keystore".to_owned(),
            socket_name: "socket".to_owned(),
            grace_period_ms: 5_000,
        }
    }
}

impl KeystoreConfig {
    /// 종료 유예 시간
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// 컨덕터 프로세스 및 관리 RPC 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    /// 실행 명령
    pub command: String,
    /// 설정 파일 플래그
    pub config_flag: String,
    /// 컨덕터 설정 파일 경로
    pub config_path: PathBuf,
    /// 추가 인자
    pub extra_args: Vec<String>,
    /// 관리 웹소켓 주소
    pub admin_url: String,
    /// RPC 요청 타임아웃 (밀리초)
    pub request_timeout_ms: u64,
    /// SIGTERM 후 SIGKILL까지 대기 시간 (밀리초)
    pub grace_period_ms: u64,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            command: "holochain".to_owned(),
            config_flag: "--config-path".to_owned(),
            config_path: PathBuf::from("holochain-config.yml"),
            extra_args: Vec::new(),
            admin_url: "ws://127.0.0.1:4444/".to_owned(),
            request_timeout_ms: 15_000,
            grace_period_ms: 5_000,
        }
    }
}

impl ConductorConfig {
    /// RPC 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 종료 유예 시간
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// 서명 프록시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningProxyConfig {
    /// scratch 아래 프록시 디렉토리 이름
    pub dir_name: String,
    /// 프록시 소켓 파일 이름
    pub socket_name: String,
    /// 공개키 서명 요청 메시지 타입
    pub sign_request_type: u32,
    /// 에러 응답 메시지 타입
    pub error_response_type: u32,
    /// 최대 프레임 크기 (바이트)
    pub max_frame_len: usize,
}

impl Default for SigningProxyConfig {
    fn default() -> Self {
        Self {
            dir_name: "shim".to_owned(),
            socket_name: "socket".to_owned(),
            sign_request_type: 0x0000_0261,
            error_response_type: 0x0000_00fe,
            max_frame_len: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// 준비 상태 확인 설정
///
/// 지수 백오프(2배)로 재시도하며, 대상별 최대 대기 시간을 가집니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// 첫 재시도 지연 (밀리초)
    pub initial_delay_ms: u64,
    /// 재시도 지연 상한 (밀리초)
    pub max_delay_ms: u64,
    /// 키스토어 소켓 대기 한도 (밀리초)
    pub keystore_deadline_ms: u64,
    /// 프록시 소켓 대기 한도 (밀리초)
    pub proxy_deadline_ms: u64,
    /// 컨덕터 관리 포트 대기 한도 (밀리초)
    pub conductor_deadline_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            keystore_deadline_ms: 10_000,
            proxy_deadline_ms: 5_000,
            conductor_deadline_ms: 30_000,
        }
    }
}

/// 시나리오 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// 설치할 앱 번들 경로
    pub bundle_path: PathBuf,
    /// 앱 ID 접두어 (`happ-` → `happ-1`, `happ-2`, `happ-3`)
    pub app_id_prefix: String,
    /// 정리 단계 전 대기 시간 (밀리초)
    pub settle_before_teardown_ms: u64,
    /// 멤브레인 증명 (이름 → base64)
    pub membrane_proofs: BTreeMap<String, String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let mut membrane_proofs = BTreeMap::new();
        membrane_proofs.insert("test".to_owned(), "rGpvaW5pbmcgY29kZQ==".to_owned());
        Self {
            bundle_path: PathBuf::from("./test.happ"),
            app_id_prefix: "happ-".to_owned(),
            settle_before_teardown_ms: 3_000,
            membrane_proofs,
        }
    }
}

impl ScenarioConfig {
    /// `n`번째 앱 ID
    pub fn app_id(&self, n: usize) -> String {
        format!("{}{}", self.app_id_prefix, n)
    }

    /// base64 멤브레인 증명을 디코딩합니다.
    pub fn decoded_membrane_proofs(&self) -> Result<BTreeMap<String, Vec<u8>>, ConfigError> {
        self.membrane_proofs
            .iter()
            .map(|(name, encoded)| {
                STANDARD
                    .decode(encoded)
                    .map(|bytes| (name.clone(), bytes))
                    .map_err(|e| ConfigError::InvalidValue {
                        field: format!("scenario.membrane_proofs.{name}"),
                        reason: format!("invalid base64: {e}"),
                    })
            })
            .collect()
    }

    /// 정리 전 대기 시간
    pub fn settle_before_teardown(&self) -> Duration {
        Duration::from_millis(self.settle_before_teardown_ms)
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_path(target: &mut PathBuf, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = PathBuf::from(val);
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let parsed = match val.strip_prefix("0x") {
            Some(hex_digits) => u32::from_str_radix(hex_digits, 16),
            None => val.parse::<u32>(),
        };
        match parsed {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
