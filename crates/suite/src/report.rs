//! 실행 리포트
//!
//! [`SuiteReport`]는 스위트 한 번 실행의 결과입니다. CLI가 사람이 읽는 형식이나
//! JSON으로 출력합니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{CheckSeverity, CheckSpec};

/// 체크 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// 기대 결과 충족
    Passed,
    /// hard 체크 실패
    Failed,
    /// soft 체크 실패
    Warned,
    /// 실행하지 않음 (취소 또는 fail-fast)
    Skipped,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Warned => "warned",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 체크 하나의 결과
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// 체크 이름
    pub name: String,
    /// 결과 상태
    pub status: CheckStatus,
    /// 심각도
    pub severity: CheckSeverity,
    /// 모든 항목에 걸친 총 시도 횟수
    pub attempts: u32,
    /// 소요 시간 (밀리초)
    pub elapsed_ms: u64,
    /// 실패/건너뜀 사유
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 마지막 명령 출력 요약
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_output: Option<String>,
}

impl CheckResult {
    /// 실행하지 않은 체크
    pub fn skipped(check: &CheckSpec, reason: impl Into<String>) -> Self {
        Self {
            name: check.name.clone(),
            status: CheckStatus::Skipped,
            severity: check.severity,
            attempts: 0,
            elapsed_ms: 0,
            message: Some(reason.into()),
            last_output: None,
        }
    }
}

/// 스위트 실행 리포트
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// 실행 고유 ID
    pub run_id: Uuid,
    /// 스위트 이름
    pub suite: String,
    /// 실행 대상 (`user@host:port` 또는 `local`)
    pub target: String,
    /// 시작 시각
    pub started_at: DateTime<Utc>,
    /// 전체 소요 시간 (밀리초)
    pub elapsed_ms: u64,
    /// 체크 결과 (정의 순서)
    pub checks: Vec<CheckResult>,
    /// 정리 명령 경고
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cleanup_warnings: Vec<String>,
    /// 실행 중 취소되었는지
    pub cancelled: bool,
    /// 대상에 도달할 수 없어 실패한 체크가 있는지
    pub target_unreachable: bool,
}

impl SuiteReport {
    /// 취소되지 않았고 실패한 hard 체크가 없으면 true
    pub fn passed(&self) -> bool {
        !self.cancelled && self.count(CheckStatus::Failed) == 0
    }

    /// 주어진 상태의 체크 수
    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// 실패한 체크
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Failed)
    }
}
