//! 에러 타입 -- 도메인별 에러 정의

/// appcert 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum AppcertError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 원격 명령 실행 에러
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// 조건 폴링 에러
    #[error("polling error: {0}")]
    Polling(#[from] PollingError),

    /// 스위트 로딩/실행 에러
    #[error("suite error: {0}")]
    Suite(#[from] SuiteError),

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

/// 명령 실행기 에러
///
/// 명령이 "실행되었지만 실패한" 경우(0이 아닌 종료 코드)는 에러가 아닙니다.
/// 이 타입은 명령을 아예 실행할 수 없었던 경우만 나타냅니다.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// 프로세스 생성 실패 (ssh 바이너리 없음 등)
    #[error("failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// 대상 호스트에 연결할 수 없음
    #[error("transport to {target} failed: {reason}")]
    Transport { target: String, reason: String },

    /// 명령 실행 시간 초과
    #[error("command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },

    /// 실행할 수 없는 명령 (빈 문자열, NUL 바이트 포함 등)
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

/// 조건 폴링 에러
#[derive(Debug, thiserror::Error)]
pub enum PollingError {
    /// 폴링 설정이 유효하지 않음
    #[error("invalid poll config '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    /// 프로브가 치명적 장애를 보고함
    #[error("probe fault after {attempts} attempt(s): {reason}")]
    ProbeFault { attempts: u32, reason: String },
}

/// 스위트 에러
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// 스위트 파일 로딩 실패
    #[error("failed to load suite {path}: {reason}")]
    Load { path: String, reason: String },

    /// 스위트 정의가 유효하지 않음
    #[error("invalid suite '{suite}': {reason}")]
    Validation { suite: String, reason: String },

    /// 스위트 실행 중단
    #[error("suite execution failed: {0}")]
    Execution(String),
}

impl ExecutorError {
    /// 대상 호스트 도달 불가 계열 에러인지 확인합니다.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: AppcertError = ConfigError::InvalidValue {
            field: "poll.interval_secs".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, AppcertError::Config(_)));
        assert!(err.to_string().contains("poll.interval_secs"));
    }

    #[test]
    fn executor_timeout_display_includes_command() {
        let err = ExecutorError::Timeout {
            command: "systemctl is-active docker".to_owned(),
            secs: 30,
        };
        let msg = err.to_string();
        assert!(msg.contains("30s"));
        assert!(msg.contains("systemctl is-active docker"));
    }

    #[test]
    fn only_transport_is_transport() {
        let transport = ExecutorError::Transport {
            target: "root@10.0.0.5".to_owned(),
            reason: "Connection refused".to_owned(),
        };
        assert!(transport.is_transport());
        assert!(!ExecutorError::InvalidCommand(String::new()).is_transport());
    }
}
