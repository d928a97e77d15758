//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//! 레코더는 설치하지 않으므로, 임베딩하는 쪽에서 원하는 exporter를 붙이면 됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `appcert_`
//! - 영역: `executor_`, `poller_`, `suite_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use appcert_core::metrics as m;
//!
//! metrics::counter!(m::POLLER_SESSIONS_TOTAL, m::LABEL_OUTCOME => "succeeded").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure, timeout, transport_error, spawn_error)
pub const LABEL_RESULT: &str = "result";

/// 폴링 결과 레이블 키 (succeeded, timed_out, cancelled, fault)
pub const LABEL_OUTCOME: &str = "outcome";

/// 체크 상태 레이블 키 (passed, failed, warned, skipped)
pub const LABEL_STATUS: &str = "status";

/// 스위트 이름 레이블 키
pub const LABEL_SUITE: &str = "suite";

// ─── Executor 메트릭 ────────────────────────────────────────────────

/// Executor: 실행한 명령 수 (counter, label: result)
pub const EXECUTOR_COMMANDS_TOTAL: &str = "appcert_executor_commands_total";

/// Executor: 명령 실행 시간 (histogram, 초)
pub const EXECUTOR_COMMAND_DURATION_SECONDS: &str = "appcert_executor_command_duration_seconds";

// ─── Poller 메트릭 ──────────────────────────────────────────────────

/// Poller: 종료된 폴링 세션 수 (counter, label: outcome)
pub const POLLER_SESSIONS_TOTAL: &str = "appcert_poller_sessions_total";

/// Poller: 프로브 호출 수 (counter)
pub const POLLER_ATTEMPTS_TOTAL: &str = "appcert_poller_attempts_total";

/// Poller: 프로브 장애 수 (counter)
pub const POLLER_PROBE_FAULTS_TOTAL: &str = "appcert_poller_probe_faults_total";

/// Poller: 세션 소요 시간 (histogram, 초)
pub const POLLER_SESSION_DURATION_SECONDS: &str = "appcert_poller_session_duration_seconds";

// ─── Suite 메트릭 ───────────────────────────────────────────────────

/// Suite: 평가된 체크 수 (counter, labels: suite, status)
pub const SUITE_CHECKS_TOTAL: &str = "appcert_suite_checks_total";

/// Suite: 완료된 스위트 실행 수 (counter, labels: suite, result)
pub const SUITE_RUNS_TOTAL: &str = "appcert_suite_runs_total";

/// Suite: 스위트 실행 시간 (histogram, 초)
pub const SUITE_RUN_DURATION_SECONDS: &str = "appcert_suite_run_duration_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    // Executor
    describe_counter!(
        EXECUTOR_COMMANDS_TOTAL,
        "Commands executed against the target, by result"
    );
    describe_histogram!(
        EXECUTOR_COMMAND_DURATION_SECONDS,
        "Wall-clock duration of executed commands in seconds"
    );

    // Poller
    describe_counter!(
        POLLER_SESSIONS_TOTAL,
        "Finished polling sessions, by outcome"
    );
    describe_counter!(POLLER_ATTEMPTS_TOTAL, "Probe evaluations across all sessions");
    describe_counter!(
        POLLER_PROBE_FAULTS_TOTAL,
        "Probe faults (transport or execution failures)"
    );
    describe_histogram!(
        POLLER_SESSION_DURATION_SECONDS,
        "Polling session duration in seconds"
    );

    // Suite
    describe_counter!(SUITE_CHECKS_TOTAL, "Evaluated checks, by suite and status");
    describe_counter!(SUITE_RUNS_TOTAL, "Completed suite runs, by suite and result");
    describe_histogram!(SUITE_RUN_DURATION_SECONDS, "Suite run duration in seconds");
}
