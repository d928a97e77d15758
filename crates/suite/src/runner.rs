//! 스위트 러너
//!
//! 체크를 정의 순서대로 실행하고 [`SuiteReport`]를 만듭니다.
//!
//! - `wait`가 없는 체크는 [`PollConfig::once`]로 한 번만 평가합니다 (장애는 즉시 실패).
//! - `wait`가 있는 체크는 컨텍스트의 기본 폴링 설정 위에 재정의를 덮어써 폴링합니다.
//! - `each`가 있으면 항목마다 따로 폴링하고, 하나라도 실패하면 체크 실패입니다.
//! - soft 체크의 실패는 `Warned`로 기록되고 스위트 결과에 영향을 주지 않습니다.
//! - 취소되면 남은 체크는 `Skipped`로 기록하고, 정리 명령은 항상 실행합니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appcert_core::executor::CommandExecutor;
use appcert_core::metrics as m;
use appcert_core::types::CommandOutput;
use appcert_poller::{CommandProbe, ConditionPoller, PollConfig, PollError, PollOutcome, PollStats};

use crate::context::TestContext;
use crate::report::{CheckResult, CheckStatus, SuiteReport};
use crate::types::{CheckSeverity, CheckSpec, Suite};

/// 스위트 러너
pub struct SuiteRunner<E> {
    ctx: TestContext<E>,
    fail_fast: bool,
}

/// 항목 하나의 실행 결과
struct ItemOutcome {
    passed: bool,
    cancelled: bool,
    unreachable: bool,
    stats: PollStats,
    message: Option<String>,
    last_output: Option<String>,
}

impl ItemOutcome {
    fn error(message: String) -> Self {
        Self {
            passed: false,
            cancelled: false,
            unreachable: false,
            stats: PollStats::default(),
            message: Some(message),
            last_output: None,
        }
    }
}

impl<E: CommandExecutor> SuiteRunner<E> {
    pub fn new(ctx: TestContext<E>) -> Self {
        Self {
            ctx,
            fail_fast: false,
        }
    }

    /// 첫 hard 실패 이후 남은 체크를 건너뜁니다.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn context(&self) -> &TestContext<E> {
        &self.ctx
    }

    /// 스위트를 실행합니다.
    ///
    /// 체크 실패는 리포트에 담기며 에러로 반환되지 않습니다.
    pub async fn run(&self, suite: &Suite) -> SuiteReport {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            suite = %suite.name,
            host = self.ctx.target(),
            checks = suite.checks.len(),
            "running suite"
        );

        let mut checks = Vec::with_capacity(suite.checks.len());
        let mut hard_failure = false;
        let mut unreachable = false;

        for check in &suite.checks {
            let result = if self.ctx.is_cancelled() {
                CheckResult::skipped(check, "run cancelled")
            } else if self.fail_fast && hard_failure {
                CheckResult::skipped(check, "skipped after earlier failure")
            } else {
                let (result, check_unreachable) = self.run_check(&suite.name, check).await;
                unreachable |= check_unreachable;
                result
            };

            if result.status == CheckStatus::Failed {
                hard_failure = true;
            }
            metrics::counter!(
                m::SUITE_CHECKS_TOTAL,
                m::LABEL_SUITE => suite.name.clone(),
                m::LABEL_STATUS => result.status.as_str()
            )
            .increment(1);
            checks.push(result);
        }

        let cleanup_warnings = self.run_cleanup(suite).await;
        let elapsed = start.elapsed();

        let report = SuiteReport {
            run_id: Uuid::new_v4(),
            suite: suite.name.clone(),
            target: self.ctx.target().to_owned(),
            started_at,
            elapsed_ms: millis(elapsed),
            checks,
            cleanup_warnings,
            cancelled: self.ctx.is_cancelled(),
            target_unreachable: unreachable,
        };

        let result = if report.passed() { "passed" } else { "failed" };
        info!(
            suite = %report.suite,
            run_id = %report.run_id,
            result,
            passed = report.count(CheckStatus::Passed),
            failed = report.count(CheckStatus::Failed),
            warned = report.count(CheckStatus::Warned),
            skipped = report.count(CheckStatus::Skipped),
            elapsed_ms = report.elapsed_ms,
            "suite finished"
        );
        metrics::counter!(
            m::SUITE_RUNS_TOTAL,
            m::LABEL_SUITE => suite.name.clone(),
            m::LABEL_RESULT => result
        )
        .increment(1);
        metrics::histogram!(m::SUITE_RUN_DURATION_SECONDS, m::LABEL_SUITE => suite.name.clone())
            .record(elapsed.as_secs_f64());

        report
    }

    async fn run_check(&self, suite: &str, check: &CheckSpec) -> (CheckResult, bool) {
        let start = Instant::now();
        let items: Vec<Option<&str>> = if check.each.is_empty() {
            vec![None]
        } else {
            check.each.iter().map(|item| Some(item.as_str())).collect()
        };

        let mut attempts = 0u32;
        let mut failures = Vec::new();
        let mut cancelled = false;
        let mut unreachable = false;
        let mut last_output = None;

        for item in items {
            if self.ctx.is_cancelled() {
                cancelled = true;
                break;
            }
            let outcome = self.run_item(check, item).await;
            attempts = attempts.saturating_add(outcome.stats.attempts);
            unreachable |= outcome.unreachable;
            if outcome.last_output.is_some() {
                last_output = outcome.last_output;
            }
            if outcome.cancelled {
                cancelled = true;
                break;
            }
            if !outcome.passed {
                let message = outcome.message.unwrap_or_else(|| "check failed".to_owned());
                failures.push(match item {
                    Some(item) => format!("[{item}] {message}"),
                    None => message,
                });
            }
        }

        let (status, message) = if !failures.is_empty() {
            let status = match check.severity {
                CheckSeverity::Hard => CheckStatus::Failed,
                CheckSeverity::Soft => CheckStatus::Warned,
            };
            (status, Some(failures.join("; ")))
        } else if cancelled {
            (CheckStatus::Skipped, Some("cancelled while running".to_owned()))
        } else {
            (CheckStatus::Passed, None)
        };

        let result = CheckResult {
            name: check.name.clone(),
            status,
            severity: check.severity,
            attempts,
            elapsed_ms: millis(start.elapsed()),
            message,
            last_output,
        };

        match status {
            CheckStatus::Passed => info!(
                suite,
                check = %result.name,
                attempts,
                elapsed_ms = result.elapsed_ms,
                "check passed"
            ),
            CheckStatus::Skipped => info!(suite, check = %result.name, "check skipped"),
            _ => warn!(
                suite,
                check = %result.name,
                status = %status,
                attempts,
                message = result.message.as_deref().unwrap_or_default(),
                "check did not pass"
            ),
        }

        (result, unreachable)
    }

    async fn run_item(&self, check: &CheckSpec, item: Option<&str>) -> ItemOutcome {
        let command = match self.ctx.expand(&check.run, item) {
            Ok(command) => command,
            Err(e) => return ItemOutcome::error(format!("'run': {e}")),
        };
        let expectation = match check.expect.compile(|text| self.ctx.expand(text, item)) {
            Ok(expectation) => Arc::new(expectation),
            Err(e) => return ItemOutcome::error(format!("'expect': {e}")),
        };
        let waiting = check.wait.is_some();
        let config = match &check.wait {
            Some(wait) => match wait.to_poll_config(self.ctx.defaults()) {
                Ok(config) => config,
                Err(e) => return ItemOutcome::error(e.to_string()),
            },
            None => PollConfig::once(),
        };
        let poller = match ConditionPoller::with_cancellation(config, self.ctx.cancellation_token())
        {
            Ok(poller) => poller,
            Err(e) => return ItemOutcome::error(e.to_string()),
        };
        let timeout_secs = poller.config().timeout.as_secs();

        debug!(check = %check.name, command = %command, waiting, "running check command");

        let matcher = {
            let expectation = Arc::clone(&expectation);
            move |output: &CommandOutput| expectation.is_met(output)
        };
        let mut probe = CommandProbe::new(Arc::clone(self.ctx.executor()), command.as_str(), matcher);

        match poller.poll(&mut probe).await {
            Ok(PollOutcome::Succeeded { result, stats }) => ItemOutcome {
                passed: true,
                cancelled: false,
                unreachable: false,
                stats,
                message: None,
                last_output: Some(result.output.summary()),
            },
            Ok(PollOutcome::TimedOut {
                last,
                last_fault,
                stats,
            }) => {
                let reason = match (&last_fault, &last) {
                    (Some(fault), _) => fault.to_string(),
                    (None, Some(last)) => expectation
                        .evaluate(&last.output)
                        .err()
                        .unwrap_or_else(|| "condition not met".to_owned()),
                    (None, None) => "condition not met".to_owned(),
                };
                let message = if waiting {
                    format!(
                        "Timeout after {timeout_secs}s ({} attempts): `{command}`: {reason}",
                        stats.attempts
                    )
                } else {
                    format!("`{command}`: {reason}")
                };
                ItemOutcome {
                    passed: false,
                    cancelled: false,
                    unreachable: last.is_none() && last_fault.is_some_and(|f| f.is_transport()),
                    stats,
                    message: Some(message),
                    last_output: last.map(|r| r.output.summary()),
                }
            }
            Ok(PollOutcome::Cancelled { last, stats }) => ItemOutcome {
                passed: false,
                cancelled: true,
                unreachable: false,
                stats,
                message: None,
                last_output: last.map(|r| r.output.summary()),
            },
            Err(PollError::ProbeFault {
                attempts,
                elapsed,
                source,
            }) => ItemOutcome {
                passed: false,
                cancelled: false,
                unreachable: source.is_transport(),
                stats: PollStats { attempts, elapsed },
                message: Some(format!("could not run `{command}`: {source}")),
                last_output: None,
            },
            Err(e) => ItemOutcome::error(e.to_string()),
        }
    }

    /// 정리 명령을 한 번씩 실행합니다. 실패는 경고로만 남깁니다.
    async fn run_cleanup(&self, suite: &Suite) -> Vec<String> {
        let mut warnings = Vec::new();
        for template in &suite.cleanup {
            let command = match self.ctx.expand(template, None) {
                Ok(command) => command,
                Err(e) => {
                    warnings.push(format!("cleanup '{template}': {e}"));
                    continue;
                }
            };
            match self.ctx.executor().run(&command).await {
                Ok(output) if output.success() => {
                    debug!(suite = %suite.name, command = %command, "cleanup done");
                }
                Ok(output) => warnings.push(format!("cleanup `{command}`: {}", output.summary())),
                Err(e) => warnings.push(format!("cleanup `{command}`: {e}")),
            }
        }
        for warning in &warnings {
            warn!(suite = %suite.name, "{warning}");
        }
        warnings
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
