//! ConditionPoller -- 조건이 참이 되거나 예산이 소진될 때까지 프로브를 반복 평가
//!
//! # 세션 흐름
//!
//! ```text
//!  start ──▶ cancelled? ──yes──▶ Cancelled
//!               │ no
//!               ▼
//!           probe.check()
//!        ┌──────┼──────────────┐
//!   succeeded  not ready     fault
//!        │      │         Fatal│Retry
//!        ▼      │      Err ◀───┘ │
//!    Succeeded  ▼◀───────────────┘
//!       budget spent? ──yes──▶ TimedOut
//!               │ no
//!               ▼
//!   sleep(min(delay, remaining)) ⟷ cancel ──▶ Cancelled
//!               │
//!   delay > remaining? ──yes──▶ TimedOut
//!               │ no
//!               └──▶ (loop)
//! ```
//!
//! 대기는 `tokio::time::sleep`과 취소 토큰을 `select!`로 경합시키므로
//! 런타임을 막지 않고, 취소 시 대기 중이라도 즉시 반환합니다.
//! 진행 중인 프로브 호출은 중단하지 않습니다.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use appcert_core::metrics as m;

use crate::config::{FaultPolicy, PollConfig};
use crate::error::PollError;
use crate::outcome::{PollOutcome, PollStats};
use crate::probe::{Probe, ProbeResult};

/// 조건 폴러
///
/// 설정과 취소 토큰만 가지며 세션 간 상태를 공유하지 않습니다.
/// `&self`로 호출하므로 여러 태스크에서 공유해 동시에 서로 다른 프로브를 폴링할 수 있습니다.
#[derive(Debug, Clone)]
pub struct ConditionPoller {
    config: PollConfig,
    cancel: CancellationToken,
}

impl ConditionPoller {
    /// 취소 토큰 없이 폴러를 생성합니다.
    ///
    /// # Errors
    ///
    /// 설정이 유효하지 않으면 `PollError::InvalidConfig`를 반환합니다.
    pub fn new(config: PollConfig) -> Result<Self, PollError> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// 외부 취소 토큰과 연결된 폴러를 생성합니다.
    pub fn with_cancellation(
        config: PollConfig,
        cancel: CancellationToken,
    ) -> Result<Self, PollError> {
        config.validate()?;
        Ok(Self { config, cancel })
    }

    /// 폴링 설정
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// 연결된 취소 토큰 (복제본)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 조건이 충족되거나 타임아웃/취소될 때까지 프로브를 평가합니다.
    ///
    /// # Errors
    ///
    /// `FaultPolicy::Fatal`에서 프로브 장애가 나면 남은 예산과 관계없이
    /// 즉시 `PollError::ProbeFault`를 반환합니다.
    pub async fn poll<P: Probe>(&self, probe: &mut P) -> Result<PollOutcome<P::Output>, PollError> {
        run_session(&self.config, &self.cancel, probe).await
    }
}

/// 취소 없이 한 번의 폴링 세션을 실행합니다.
///
/// # Errors
///
/// 설정이 유효하지 않거나 치명적 프로브 장애가 나면 에러를 반환합니다.
pub async fn poll_until<P: Probe>(
    probe: &mut P,
    config: &PollConfig,
) -> Result<PollOutcome<P::Output>, PollError> {
    config.validate()?;
    run_session(config, &CancellationToken::new(), probe).await
}

async fn run_session<P: Probe>(
    config: &PollConfig,
    cancel: &CancellationToken,
    probe: &mut P,
) -> Result<PollOutcome<P::Output>, PollError> {
    let start = Instant::now();
    let mut attempts: u32 = 0;
    let mut last: Option<ProbeResult<P::Output>> = None;
    let mut last_fault = None;

    loop {
        if cancel.is_cancelled() {
            return Ok(finish(PollOutcome::Cancelled {
                last,
                stats: stats(attempts, start),
            }));
        }

        attempts = attempts.saturating_add(1);
        metrics::counter!(m::POLLER_ATTEMPTS_TOTAL).increment(1);

        match probe.check().await {
            Ok(result) if result.succeeded => {
                return Ok(finish(PollOutcome::Succeeded {
                    result,
                    stats: stats(attempts, start),
                }));
            }
            Ok(result) => {
                debug!(
                    attempt = attempts,
                    elapsed_ms = millis(start.elapsed()),
                    "condition not met yet"
                );
                last = Some(result);
                last_fault = None;
            }
            Err(fault) => {
                metrics::counter!(m::POLLER_PROBE_FAULTS_TOTAL).increment(1);
                match config.fault_policy {
                    FaultPolicy::Fatal => {
                        let elapsed = start.elapsed();
                        warn!(attempt = attempts, error = %fault, "probe fault, aborting poll");
                        record("fault", elapsed);
                        return Err(PollError::ProbeFault {
                            attempts,
                            elapsed,
                            source: fault,
                        });
                    }
                    FaultPolicy::Retry => {
                        warn!(attempt = attempts, error = %fault, "probe fault, treating as not ready");
                        last_fault = Some(fault);
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        let attempts_spent = config.max_attempts.is_some_and(|max| attempts >= max);
        if elapsed >= config.timeout || attempts_spent {
            return Ok(finish(PollOutcome::TimedOut {
                last,
                last_fault,
                stats: stats(attempts, start),
            }));
        }

        let delay = config.backoff.delay(config.interval, attempts - 1);
        let remaining = config.timeout - elapsed;
        let exhausted = delay > remaining;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(finish(PollOutcome::Cancelled {
                    last,
                    stats: stats(attempts, start),
                }));
            }
            _ = tokio::time::sleep(delay.min(remaining)) => {}
        }

        // 남은 예산이 다음 간격보다 짧으면 예산 끝까지 기다린 뒤 추가 시도 없이 종료
        if exhausted {
            return Ok(finish(PollOutcome::TimedOut {
                last,
                last_fault,
                stats: stats(attempts, start),
            }));
        }
    }
}

fn stats(attempts: u32, start: Instant) -> PollStats {
    PollStats {
        attempts,
        elapsed: start.elapsed(),
    }
}

fn finish<T>(outcome: PollOutcome<T>) -> PollOutcome<T> {
    let stats = outcome.stats();
    debug!(
        outcome = outcome.kind(),
        attempts = stats.attempts,
        elapsed_ms = millis(stats.elapsed),
        "poll finished"
    );
    record(outcome.kind(), stats.elapsed);
    outcome
}

fn record(kind: &'static str, elapsed: std::time::Duration) {
    metrics::counter!(m::POLLER_SESSIONS_TOTAL, m::LABEL_OUTCOME => kind).increment(1);
    metrics::histogram!(m::POLLER_SESSION_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
