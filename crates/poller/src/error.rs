//! 폴러 에러 타입
//!
//! [`ProbeFault`]는 프로브 한 번의 평가가 "준비 안 됨"이 아니라 아예
//! 실패했음을 나타내고, [`PollError`]는 폴링 세션 자체의 실패를 나타냅니다.
//! 타임아웃과 취소는 에러가 아니라 [`PollOutcome`](crate::PollOutcome) 값입니다.
//!
//! `From<PollError> for AppcertError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use std::time::Duration;

use appcert_core::error::{AppcertError, ExecutorError, PollingError};

/// 프로브 장애
///
/// 대상에 도달할 수 없거나 명령을 실행할 수 없었던 경우입니다.
/// 조건이 아직 거짓인 것(준비 안 됨)과는 구분됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeFault {
    /// 대상 호스트 도달 불가
    #[error("transport failure: {0}")]
    Transport(String),

    /// 명령 실행 불가 (spawn 실패, 명령 타임아웃 등)
    #[error("execution failure: {0}")]
    Execution(String),

    /// 그 밖의 프로브 정의 장애
    #[error("{0}")]
    Other(String),
}

impl ProbeFault {
    /// 전송 계층 장애인지 확인합니다.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ExecutorError> for ProbeFault {
    fn from(err: ExecutorError) -> Self {
        if err.is_transport() {
            Self::Transport(err.to_string())
        } else {
            Self::Execution(err.to_string())
        }
    }
}

/// 폴링 세션 에러
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// 설정 에러
    #[error("invalid poll config '{field}': {reason}")]
    InvalidConfig {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// `FaultPolicy::Fatal`에서 프로브 장애 발생
    #[error("probe fault on attempt {attempts} after {elapsed:?}: {source}")]
    ProbeFault {
        /// 장애가 난 시도 번호 (1부터)
        attempts: u32,
        /// 세션 시작부터 경과 시간
        elapsed: Duration,
        /// 원인 장애
        source: ProbeFault,
    },
}

impl From<PollError> for AppcertError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::InvalidConfig { field, reason } => {
                AppcertError::Polling(PollingError::InvalidConfig { field, reason })
            }
            PollError::ProbeFault {
                attempts, source, ..
            } => AppcertError::Polling(PollingError::ProbeFault {
                attempts,
                reason: source.to_string(),
            }),
        }
    }
}
