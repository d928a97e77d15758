//! 스위트 에러 타입
//!
//! [`SuiteRunnerError`]는 스위트 로딩, 검증, 템플릿 치환에서 발생하는 에러입니다.
//! 체크 실패 자체는 에러가 아니라 [`CheckResult`](crate::report::CheckResult)로 보고됩니다.
//! `From<SuiteRunnerError> for AppcertError` 변환이 구현되어 있습니다.

use appcert_core::error::{AppcertError, SuiteError};

use crate::template::TemplateError;

/// 스위트 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SuiteRunnerError {
    /// 스위트 파일 로딩 실패
    #[error("suite load error: {path}: {reason}")]
    Load {
        /// 파일 또는 디렉토리 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 스위트 정의 검증 실패
    #[error("suite validation error: suite '{suite}': {reason}")]
    Validation {
        /// 문제가 된 스위트 이름
        suite: String,
        /// 실패 사유
        reason: String,
    },

    /// `${NAME}` 치환 실패
    #[error("placeholder error: {0}")]
    Placeholder(#[from] TemplateError),

    /// 정규식 컴파일 실패
    #[error("invalid stdout_matches pattern '{pattern}': {reason}")]
    Pattern {
        /// 원본 패턴
        pattern: String,
        /// 컴파일 에러
        reason: String,
    },
}

impl From<SuiteRunnerError> for AppcertError {
    fn from(err: SuiteRunnerError) -> Self {
        match err {
            SuiteRunnerError::Load { path, reason } => {
                AppcertError::Suite(SuiteError::Load { path, reason })
            }
            SuiteRunnerError::Validation { suite, reason } => {
                AppcertError::Suite(SuiteError::Validation { suite, reason })
            }
            other @ (SuiteRunnerError::Placeholder(_) | SuiteRunnerError::Pattern { .. }) => {
                AppcertError::Suite(SuiteError::Execution(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_display() {
        let err = SuiteRunnerError::Load {
            path: "suites/n8n.yaml".to_owned(),
            reason: "file too large".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("suites/n8n.yaml"));
        assert!(msg.contains("file too large"));
    }

    #[test]
    fn validation_maps_to_core_validation() {
        let err: AppcertError = SuiteRunnerError::Validation {
            suite: "rabbitmq".to_owned(),
            reason: "no checks".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            AppcertError::Suite(SuiteError::Validation { .. })
        ));
    }

    #[test]
    fn placeholder_maps_to_execution() {
        let err: AppcertError = SuiteRunnerError::Placeholder(TemplateError::Unknown {
            name: "ONEAPP_MISSING".to_owned(),
        })
        .into();
        assert!(matches!(err, AppcertError::Suite(SuiteError::Execution(_))));
        assert!(err.to_string().contains("ONEAPP_MISSING"));
    }
}
