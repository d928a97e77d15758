//! 설정 관리 -- appcert.toml 파싱 및 런타임 설정
//!
//! [`AppcertConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`APPCERT_TARGET_HOST=10.0.0.5` 형식)
//! 3. 설정 파일 (`appcert.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), appcert_core::error::AppcertError> {
//! use appcert_core::config::AppcertConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = AppcertConfig::load("appcert.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = AppcertConfig::parse("[target]\nhost = \"10.0.0.5\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppcertError, ConfigError};

/// 앱 파라미터 환경변수 접두어 (`APPCERT_PARAM_ONEAPP_N8N_PORT=5678`)
pub const PARAM_ENV_PREFIX: &str = "APPCERT_PARAM_";

/// 설정 상한값 상수
const MAX_CONNECT_TIMEOUT_SECS: u64 = 300;
const MAX_COMMAND_TIMEOUT_SECS: u64 = 3600;
const MAX_POLL_TIMEOUT_SECS: u64 = 86_400;
const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// appcert 통합 설정
///
/// `appcert.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 크레이트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppcertConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 검증 대상 VM 접속 설정
    #[serde(default)]
    pub target: TargetConfig,
    /// 기본 폴링 설정
    #[serde(default)]
    pub poll: PollSection,
    /// 스위트 설정
    #[serde(default)]
    pub suites: SuitesConfig,
    /// 앱 컨텍스트 파라미터 (`${NAME}` 치환에 사용)
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl AppcertConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AppcertError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AppcertError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppcertError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AppcertError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, AppcertError> {
        toml::from_str(toml_str).map_err(|e| {
            AppcertError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `APPCERT_{SECTION}_{FIELD}`
    /// 예: `APPCERT_POLL_TIMEOUT_SECS=120`
    ///
    /// 앱 파라미터는 `APPCERT_PARAM_{NAME}` 형식으로 추가/덮어씁니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "APPCERT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "APPCERT_GENERAL_LOG_FORMAT");

        // Target
        override_string(&mut self.target.host, "APPCERT_TARGET_HOST");
        override_string(&mut self.target.user, "APPCERT_TARGET_USER");
        override_u16(&mut self.target.port, "APPCERT_TARGET_PORT");
        override_string(&mut self.target.ssh_key, "APPCERT_TARGET_SSH_KEY");
        override_u64(
            &mut self.target.connect_timeout_secs,
            "APPCERT_TARGET_CONNECT_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.target.command_timeout_secs,
            "APPCERT_TARGET_COMMAND_TIMEOUT_SECS",
        );
        override_csv(&mut self.target.ssh_options, "APPCERT_TARGET_SSH_OPTIONS");

        // Poll
        override_u64(&mut self.poll.timeout_secs, "APPCERT_POLL_TIMEOUT_SECS");
        override_u64(&mut self.poll.interval_secs, "APPCERT_POLL_INTERVAL_SECS");
        override_string(&mut self.poll.fault_policy, "APPCERT_POLL_FAULT_POLICY");
        override_string(&mut self.poll.backoff, "APPCERT_POLL_BACKOFF");
        override_f64(
            &mut self.poll.backoff_multiplier,
            "APPCERT_POLL_BACKOFF_MULTIPLIER",
        );
        override_u64(
            &mut self.poll.max_interval_secs,
            "APPCERT_POLL_MAX_INTERVAL_SECS",
        );
        override_u32(&mut self.poll.max_attempts, "APPCERT_POLL_MAX_ATTEMPTS");

        // Suites
        override_string(&mut self.suites.dir, "APPCERT_SUITES_DIR");
        override_bool(&mut self.suites.fail_fast, "APPCERT_SUITES_FAIL_FAST");

        // Params
        override_params(&mut self.params, PARAM_ENV_PREFIX);
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AppcertError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // target 검증
        if self.target.user.is_empty() {
            return Err(invalid("target.user", "user must not be empty".to_owned()));
        }
        if self.target.port == 0 {
            return Err(invalid("target.port", "port must be 1-65535".to_owned()));
        }
        if self.target.connect_timeout_secs == 0
            || self.target.connect_timeout_secs > MAX_CONNECT_TIMEOUT_SECS
        {
            return Err(invalid(
                "target.connect_timeout_secs",
                format!("must be 1-{MAX_CONNECT_TIMEOUT_SECS}"),
            ));
        }
        if self.target.command_timeout_secs == 0
            || self.target.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS
        {
            return Err(invalid(
                "target.command_timeout_secs",
                format!("must be 1-{MAX_COMMAND_TIMEOUT_SECS}"),
            ));
        }

        self.poll.validate()?;

        // params 키 검증
        for key in self.params.keys() {
            if !is_valid_param_name(key) {
                return Err(invalid(
                    "params",
                    format!("'{key}' is not a valid parameter name (expected [A-Za-z_][A-Za-z0-9_]*)"),
                ));
            }
        }

        Ok(())
    }
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

/// 검증 대상 VM 접속 설정
///
/// `host`가 비어 있으면 CLI에서 `--host` 또는 `--local`로 지정해야 합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// 대상 호스트 (IP 또는 DNS 이름)
    pub host: String,
    /// SSH 사용자
    pub user: String,
    /// SSH 포트
    pub port: u16,
    /// SSH 개인키 경로 (비어 있으면 ssh 기본값 사용)
    pub ssh_key: String,
    /// SSH 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 명령 하나당 최대 실행 시간 (초)
    pub command_timeout_secs: u64,
    /// 추가 ssh `-o` 옵션 (`Key=Value`)
    pub ssh_options: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: "root".to_owned(),
            port: 22,
            ssh_key: String::new(),
            connect_timeout_secs: 10,
            command_timeout_secs: 60,
            ssh_options: Vec::new(),
        }
    }
}

/// 기본 폴링 설정
///
/// 스위트의 `wait` 블록에서 지정하지 않은 값은 여기서 가져옵니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSection {
    /// 전체 대기 시간 (초). 0이면 한 번만 평가
    pub timeout_secs: u64,
    /// 시도 간격 (초)
    pub interval_secs: u64,
    /// 프로브 장애 처리 정책 (fatal, retry)
    pub fault_policy: String,
    /// 백오프 전략 (fixed, exponential)
    pub backoff: String,
    /// 지수 백오프 배수
    pub backoff_multiplier: f64,
    /// 지수 백오프 최대 간격 (초)
    pub max_interval_secs: u64,
    /// 최대 시도 횟수 (0 = 무제한)
    pub max_attempts: u32,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            interval_secs: 5,
            fault_policy: "fatal".to_owned(),
            backoff: "fixed".to_owned(),
            backoff_multiplier: 2.0,
            max_interval_secs: 60,
            max_attempts: 0,
        }
    }
}

impl PollSection {
    /// 폴링 섹션의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AppcertError> {
        if self.timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(invalid(
                "poll.timeout_secs",
                format!("must be 0-{MAX_POLL_TIMEOUT_SECS}"),
            ));
        }
        if self.interval_secs == 0 || self.interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(invalid(
                "poll.interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }

        let valid_policies = ["fatal", "retry"];
        if !valid_policies.contains(&self.fault_policy.as_str()) {
            return Err(invalid(
                "poll.fault_policy",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }

        let valid_backoffs = ["fixed", "exponential"];
        if !valid_backoffs.contains(&self.backoff.as_str()) {
            return Err(invalid(
                "poll.backoff",
                format!("must be one of: {}", valid_backoffs.join(", ")),
            ));
        }

        // 지수 백오프일 때만 배수/상한 검증
        if self.backoff == "exponential" {
            if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
                return Err(invalid(
                    "poll.backoff_multiplier",
                    "must be a finite number >= 1.0".to_owned(),
                ));
            }
            if self.max_interval_secs < self.interval_secs {
                return Err(invalid(
                    "poll.max_interval_secs",
                    "must be >= poll.interval_secs".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

/// 스위트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitesConfig {
    /// 스위트 YAML 파일 디렉토리
    pub dir: String,
    /// 첫 hard 실패에서 남은 체크를 건너뛸지 여부
    pub fail_fast: bool,
}

impl Default for SuitesConfig {
    fn default() -> Self {
        Self {
            dir: "suites".to_owned(),
            fail_fast: false,
        }
    }
}

/// 파라미터 이름이 `[A-Za-z_][A-Za-z0-9_]*` 형식인지 확인합니다.
pub fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid(field: &str, reason: String) -> AppcertError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
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

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
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

fn override_params(target: &mut BTreeMap<String, String>, prefix: &str) {
    for (key, value) in std::env::vars() {
        if let Some(name) = key.strip_prefix(prefix) {
            if is_valid_param_name(name) {
                target.insert(name.to_owned(), value);
            } else {
                warn!(env_key = key.as_str(), "invalid parameter name in env var, ignoring");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = AppcertConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.target.user, "root");
        assert_eq!(config.target.port, 22);
        assert_eq!(config.poll.timeout_secs, 60);
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.poll.fault_policy, "fatal");
        assert_eq!(config.suites.dir, "suites");
        assert!(config.params.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        AppcertConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = AppcertConfig::parse("").unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.target.command_timeout_secs, 60);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml_str = r#"
[target]
host = "10.0.0.5"

[poll]
timeout_secs = 180
"#;
        let config = AppcertConfig::parse(toml_str).unwrap();
        assert_eq!(config.target.host, "10.0.0.5");
        assert_eq!(config.target.user, "root");
        assert_eq!(config.poll.timeout_secs, 180);
        assert_eq!(config.poll.interval_secs, 5);
    }

    #[test]
    fn from_str_params_table() {
        let toml_str = r#"
[params]
ONEAPP_RABBITMQ_DEFAULT_USER = "admin"
ONEAPP_RABBITMQ_DEFAULT_PASS = "secret"
"#;
        let config = AppcertConfig::parse(toml_str).unwrap();
        assert_eq!(
            config.params.get("ONEAPP_RABBITMQ_DEFAULT_USER").map(String::as_str),
            Some("admin")
        );
        assert_eq!(config.params.len(), 2);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = AppcertConfig::parse("[target\nhost = 1");
        assert!(matches!(
            result,
            Err(AppcertError::Config(ConfigError::ParseFailed { .. }))
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = AppcertConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut config = AppcertConfig::default();
        config.target.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target.port"));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = AppcertConfig::default();
        config.poll.interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll.interval_secs"));
    }

    #[test]
    fn validate_accepts_zero_timeout() {
        let mut config = AppcertConfig::default();
        config.poll.timeout_secs = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_unknown_fault_policy() {
        let mut config = AppcertConfig::default();
        config.poll.fault_policy = "ignore".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fault_policy"));
    }

    #[test]
    fn validate_rejects_small_multiplier_only_for_exponential() {
        let mut config = AppcertConfig::default();
        config.poll.backoff_multiplier = 0.5;
        // fixed 백오프면 배수는 무시됨
        config.validate().unwrap();

        config.poll.backoff = "exponential".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backoff_multiplier"));
    }

    #[test]
    fn validate_rejects_max_interval_below_interval() {
        let mut config = AppcertConfig::default();
        config.poll.backoff = "exponential".to_owned();
        config.poll.interval_secs = 10;
        config.poll.max_interval_secs = 5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_interval_secs"));
    }

    #[test]
    fn validate_rejects_bad_param_name() {
        let mut config = AppcertConfig::default();
        config.params.insert("1BAD-NAME".to_owned(), "x".to_owned());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("1BAD-NAME"));
    }

    #[test]
    fn param_name_rules() {
        assert!(is_valid_param_name("ONEAPP_N8N_PORT"));
        assert!(is_valid_param_name("_private"));
        assert!(is_valid_param_name("item"));
        assert!(!is_valid_param_name(""));
        assert!(!is_valid_param_name("9LIVES"));
        assert!(!is_valid_param_name("WITH-DASH"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe { std::env::set_var("TEST_APPCERT_STR", "overridden") };
        override_string(&mut val, "TEST_APPCERT_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_APPCERT_STR") };
    }

    #[test]
    #[serial]
    fn env_override_u64_invalid_keeps_original() {
        let mut val = 60u64;
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe { std::env::set_var("TEST_APPCERT_U64_BAD", "sixty") };
        override_u64(&mut val, "TEST_APPCERT_U64_BAD");
        assert_eq!(val, 60);
        unsafe { std::env::remove_var("TEST_APPCERT_U64_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_f64() {
        let mut val = 2.0f64;
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe { std::env::set_var("TEST_APPCERT_F64", "1.5") };
        override_f64(&mut val, "TEST_APPCERT_F64");
        assert!((val - 1.5).abs() < f64::EPSILON);
        unsafe { std::env::remove_var("TEST_APPCERT_F64") };
    }

    #[test]
    #[serial]
    fn env_override_csv_skips_empty_entries() {
        let mut val = Vec::new();
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe { std::env::set_var("TEST_APPCERT_CSV", "ServerAliveInterval=5, ,LogLevel=ERROR") };
        override_csv(&mut val, "TEST_APPCERT_CSV");
        assert_eq!(val, vec!["ServerAliveInterval=5", "LogLevel=ERROR"]);
        unsafe { std::env::remove_var("TEST_APPCERT_CSV") };
    }

    #[test]
    #[serial]
    fn env_override_params_with_prefix() {
        let mut params = BTreeMap::new();
        params.insert("ONEAPP_N8N_PORT".to_owned(), "5678".to_owned());
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe {
            std::env::set_var("TEST_APPCERT_PARAM_ONEAPP_N8N_PORT", "8080");
            std::env::set_var("TEST_APPCERT_PARAM_EXTRA", "yes");
        }
        override_params(&mut params, "TEST_APPCERT_PARAM_");
        assert_eq!(params.get("ONEAPP_N8N_PORT").map(String::as_str), Some("8080"));
        assert_eq!(params.get("EXTRA").map(String::as_str), Some("yes"));
        unsafe {
            std::env::remove_var("TEST_APPCERT_PARAM_ONEAPP_N8N_PORT");
            std::env::remove_var("TEST_APPCERT_PARAM_EXTRA");
        }
    }

    #[test]
    fn config_serialize_roundtrip() {
        let mut config = AppcertConfig::default();
        config.params.insert("ONEAPP_SITE_TITLE".to_owned(), "demo".to_owned());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = AppcertConfig::parse(&toml_str).unwrap();
        assert_eq!(config.target.port, parsed.target.port);
        assert_eq!(config.poll.fault_policy, parsed.poll.fault_policy);
        assert_eq!(config.params, parsed.params);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = AppcertConfig::from_file("/nonexistent/path/appcert.toml").await;
        assert!(matches!(
            result,
            Err(AppcertError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
