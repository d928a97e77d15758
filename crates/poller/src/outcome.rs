//! 폴링 세션의 종료 결과

use std::time::Duration;

use crate::error::ProbeFault;
use crate::probe::ProbeResult;

/// 세션 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// 프로브 호출 횟수
    pub attempts: u32,
    /// 세션 시작부터 종료까지 경과 시간
    pub elapsed: Duration,
}

/// 폴링 세션 결과
///
/// 타임아웃과 취소는 에러가 아니라 값으로 돌려주므로, 호출자는
/// 마지막 관찰값을 이용해 "Timeout after 60s: X did not contain Y" 같은
/// 메시지를 직접 만들 수 있습니다.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// 조건 충족
    Succeeded {
        /// 조건을 충족한 평가 결과
        result: ProbeResult<T>,
        /// 세션 통계
        stats: PollStats,
    },
    /// 예산(시간 또는 시도 횟수) 소진
    TimedOut {
        /// 마지막으로 관찰한 "준비 안 됨" 결과
        last: Option<ProbeResult<T>>,
        /// 마지막 시도가 장애였다면 그 장애 (`FaultPolicy::Retry`에서만)
        last_fault: Option<ProbeFault>,
        /// 세션 통계
        stats: PollStats,
    },
    /// 취소 토큰에 의해 중단
    Cancelled {
        /// 마지막으로 관찰한 결과
        last: Option<ProbeResult<T>>,
        /// 세션 통계
        stats: PollStats,
    },
}

impl<T> PollOutcome<T> {
    /// 조건이 충족되었는지 확인합니다.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// 세션 통계
    pub fn stats(&self) -> PollStats {
        match self {
            Self::Succeeded { stats, .. }
            | Self::TimedOut { stats, .. }
            | Self::Cancelled { stats, .. } => *stats,
        }
    }

    /// 메트릭/로그용 결과 종류 (`succeeded`, `timed_out`, `cancelled`)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// 가장 최근에 관찰한 출력값
    pub fn last_output(&self) -> Option<&T> {
        match self {
            Self::Succeeded { result, .. } => Some(&result.output),
            Self::TimedOut { last, .. } | Self::Cancelled { last, .. } => {
                last.as_ref().map(|r| &r.output)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(attempts: u32, secs: u64) -> PollStats {
        PollStats {
            attempts,
            elapsed: Duration::from_secs(secs),
        }
    }

    #[test]
    fn accessors_on_succeeded() {
        let outcome = PollOutcome::Succeeded {
            result: ProbeResult::ready("ok"),
            stats: stats(3, 10),
        };
        assert!(outcome.is_succeeded());
        assert_eq!(outcome.kind(), "succeeded");
        assert_eq!(outcome.stats().attempts, 3);
        assert_eq!(outcome.last_output(), Some(&"ok"));
    }

    #[test]
    fn timed_out_without_observation_has_no_output() {
        let outcome: PollOutcome<String> = PollOutcome::TimedOut {
            last: None,
            last_fault: Some(ProbeFault::Transport("unreachable".to_owned())),
            stats: stats(2, 5),
        };
        assert!(!outcome.is_succeeded());
        assert_eq!(outcome.kind(), "timed_out");
        assert!(outcome.last_output().is_none());
    }

    #[test]
    fn cancelled_keeps_last_observation() {
        let outcome = PollOutcome::Cancelled {
            last: Some(ProbeResult::not_ready(7u32)),
            stats: stats(1, 0),
        };
        assert_eq!(outcome.kind(), "cancelled");
        assert_eq!(outcome.last_output(), Some(&7));
    }
}
