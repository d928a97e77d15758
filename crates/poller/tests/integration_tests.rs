//! ConditionPoller 통합 테스트
//!
//! 시간에 따라 상태가 바뀌는 가상 어플라이언스를 mock 실행기로 두고
//! `CommandProbe`와 폴러를 함께 검증합니다. 모든 테스트는 일시정지된 tokio 시계를 사용합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use appcert_core::error::ExecutorError;
use appcert_core::executor::CommandExecutor;
use appcert_core::types::CommandOutput;
use appcert_poller::{
    CommandProbe, ConditionPoller, FaultPolicy, PollConfig, PollConfigBuilder, PollError,
    PollOutcome, stdout_contains,
};

const READY_BANNER: &str = "All set and ready to serve";

/// 부팅 중인 어플라이언스 흉내
///
/// - `ssh_up_after` 전: ssh 전송 실패
/// - `ready_after` 전: MOTD에 배너 없음
/// - 이후: MOTD에 배너 표시
struct BootingAppliance {
    booted_at: Instant,
    ssh_up_after: Duration,
    ready_after: Duration,
    calls: AtomicU32,
}

impl BootingAppliance {
    fn new(ssh_up_after: Duration, ready_after: Duration) -> Self {
        Self {
            booted_at: Instant::now(),
            ssh_up_after,
            ready_after,
            calls: AtomicU32::new(0),
        }
    }
}

impl CommandExecutor for BootingAppliance {
    async fn run(&self, command: &str) -> Result<CommandOutput, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let up = self.booted_at.elapsed();
        if up < self.ssh_up_after {
            return Err(ExecutorError::Transport {
                target: "root@10.0.0.5:22".to_owned(),
                reason: "ssh: connect to host 10.0.0.5 port 22: Connection refused".to_owned(),
            });
        }
        match command {
            "cat /etc/motd" if up >= self.ready_after => Ok(CommandOutput::new(
                0,
                format!("\n    ___   _ __    ___\n\n {READY_BANNER}\n"),
                "",
            )),
            "cat /etc/motd" => Ok(CommandOutput::new(
                0,
                "\n Contextualization in progress...\n",
                "",
            )),
            "systemctl is-active docker" if up >= self.ready_after => {
                Ok(CommandOutput::new(0, "active\n", ""))
            }
            "systemctl is-active docker" => Ok(CommandOutput::new(3, "activating\n", "")),
            _ => Ok(CommandOutput::new(127, "", "command not found")),
        }
    }

    fn target(&self) -> &str {
        "root@10.0.0.5:22"
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn waits_through_boot_with_retry_policy() {
    let vm = Arc::new(BootingAppliance::new(secs(12), secs(40)));
    let mut probe = stdout_contains(Arc::clone(&vm), "cat /etc/motd", READY_BANNER);
    let config = PollConfigBuilder::new()
        .timeout(secs(60))
        .interval(secs(5))
        .fault_policy(FaultPolicy::Retry)
        .build()
        .expect("valid config");

    let poller = ConditionPoller::new(config).expect("poller");
    let outcome = poller.poll(&mut probe).await.expect("no fatal fault");

    match outcome {
        PollOutcome::Succeeded { result, stats } => {
            assert!(result.output.stdout.contains(READY_BANNER));
            assert_eq!(stats.attempts, 9, "attempts at 0,5,...,40");
            assert_eq!(stats.elapsed, secs(40));
        }
        other => panic!("expected Succeeded, got {}", other.kind()),
    }
    assert_eq!(vm.calls.load(Ordering::SeqCst), 9);
}

#[tokio::test(start_paused = true)]
async fn fatal_policy_aborts_while_ssh_is_down() {
    let vm = Arc::new(BootingAppliance::new(secs(12), secs(40)));
    let mut probe = CommandProbe::exit_success(Arc::clone(&vm), "systemctl is-active docker");

    let err = appcert_poller::poll_until(&mut probe, &PollConfig::new(secs(60), secs(5)))
        .await
        .expect_err("transport failure should be fatal");

    match err {
        PollError::ProbeFault {
            attempts, source, ..
        } => {
            assert_eq!(attempts, 1);
            assert!(source.is_transport());
        }
        other => panic!("expected ProbeFault, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_reports_last_observed_output() {
    let vm = Arc::new(BootingAppliance::new(Duration::ZERO, secs(600)));
    let mut probe = stdout_contains(vm, "cat /etc/motd", READY_BANNER);

    let outcome = appcert_poller::poll_until(&mut probe, &PollConfig::new(secs(30), secs(5)))
        .await
        .expect("no fault");

    match outcome {
        PollOutcome::TimedOut { last, stats, .. } => {
            assert_eq!(stats.attempts, 7);
            assert_eq!(stats.elapsed, secs(30));
            let last = last.expect("observed output");
            assert!(last.output.stdout.contains("Contextualization in progress"));
            let message = format!(
                "Timeout after {} seconds: MOTD did not contain '{}'",
                stats.elapsed.as_secs(),
                READY_BANNER
            );
            assert_eq!(
                message,
                "Timeout after 30 seconds: MOTD did not contain 'All set and ready to serve'"
            );
        }
        other => panic!("expected TimedOut, got {}", other.kind()),
    }
}

#[tokio::test(start_paused = true)]
async fn shared_poller_runs_independent_sessions_concurrently() {
    let vm = Arc::new(BootingAppliance::new(Duration::ZERO, secs(20)));
    let poller = ConditionPoller::new(PollConfig::new(secs(60), secs(5))).expect("poller");

    let mut motd = stdout_contains(Arc::clone(&vm), "cat /etc/motd", READY_BANNER);
    let mut docker = CommandProbe::new(
        Arc::clone(&vm),
        "systemctl is-active docker",
        |out: &CommandOutput| out.stdout_trimmed() == "active",
    );

    let (a, b) = tokio::join!(poller.poll(&mut motd), poller.poll(&mut docker));
    let a = a.expect("motd session");
    let b = b.expect("docker session");

    assert!(a.is_succeeded());
    assert!(b.is_succeeded());
    assert_eq!(a.stats().attempts, 5);
    assert_eq!(b.stats().attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn cancellation_token_stops_waiting_session() {
    let vm = Arc::new(BootingAppliance::new(Duration::ZERO, secs(3600)));
    let poller = ConditionPoller::new(PollConfig::new(secs(300), secs(10))).expect("poller");
    let token = poller.cancellation_token();

    let handle = {
        let poller = poller.clone();
        let vm = Arc::clone(&vm);
        tokio::spawn(async move {
            let mut probe = stdout_contains(vm, "cat /etc/motd", READY_BANNER);
            poller.poll(&mut probe).await
        })
    };

    tokio::time::sleep(secs(25)).await;
    token.cancel();

    let outcome = handle.await.expect("task joined").expect("no fault");
    match outcome {
        PollOutcome::Cancelled { last, stats } => {
            assert_eq!(stats.attempts, 3, "attempts at 0,10,20");
            assert_eq!(stats.elapsed, secs(25));
            assert!(last.is_some());
        }
        other => panic!("expected Cancelled, got {}", other.kind()),
    }
}
