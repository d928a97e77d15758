//! 프로브 -- "조건이 지금 참인가?"를 한 번 평가하는 단위
//!
//! [`Probe`] trait은 폴러가 의존하는 유일한 협력자입니다.
//! - [`FnProbe`] / [`probe_fn`]: 임의의 비동기 클로저를 프로브로 변환
//! - [`CommandProbe`]: 원격 명령 한 번 + 성공 판정 함수
//!
//! 프로브는 세 가지 결과 중 하나를 돌려줍니다.
//! - `Ok(ProbeResult { succeeded: true, .. })` -- 조건 충족
//! - `Ok(ProbeResult { succeeded: false, .. })` -- 아직 준비 안 됨
//! - `Err(ProbeFault)` -- 평가 자체가 불가능

use std::future::Future;
use std::sync::Arc;

use appcert_core::executor::CommandExecutor;
use appcert_core::types::CommandOutput;

use crate::error::ProbeFault;

/// 프로브 한 번의 평가 결과
///
/// `output`은 폴러가 해석하지 않고 그대로 호출자에게 전달합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult<T> {
    /// 조건 충족 여부
    pub succeeded: bool,
    /// 평가 시 관찰한 값 (명령 프로브라면 `CommandOutput`)
    pub output: T,
}

impl<T> ProbeResult<T> {
    /// 결과를 생성합니다.
    pub fn new(succeeded: bool, output: T) -> Self {
        Self { succeeded, output }
    }

    /// 조건 충족 결과
    pub fn ready(output: T) -> Self {
        Self::new(true, output)
    }

    /// 아직 준비되지 않은 결과
    pub fn not_ready(output: T) -> Self {
        Self::new(false, output)
    }
}

/// 조건 평가 trait
///
/// 폴러는 한 세션에서 `check()`를 순차적으로만 호출합니다.
/// 호출이 진행 중일 때는 취소하지 않으므로 구현체는 부분 실행을 고려할 필요가 없습니다.
pub trait Probe: Send {
    /// 평가 결과에 실려 전달되는 값
    type Output: Send;

    /// 조건을 한 번 평가합니다.
    fn check(
        &mut self,
    ) -> impl Future<Output = Result<ProbeResult<Self::Output>, ProbeFault>> + Send;
}

/// 비동기 클로저 기반 프로브
pub struct FnProbe<F> {
    f: F,
}

/// 클로저를 프로브로 감쌉니다.
///
/// ```
/// use appcert_poller::{ProbeResult, probe_fn};
///
/// let mut ticks = 0u32;
/// let probe = probe_fn(move || {
///     ticks += 1;
///     let n = ticks;
///     async move { Ok(ProbeResult::new(n >= 3, n)) }
/// });
/// # let _ = probe;
/// ```
pub fn probe_fn<F, Fut, T>(f: F) -> FnProbe<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<ProbeResult<T>, ProbeFault>> + Send,
    T: Send,
{
    FnProbe { f }
}

impl<F, Fut, T> Probe for FnProbe<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<ProbeResult<T>, ProbeFault>> + Send,
    T: Send,
{
    type Output = T;

    fn check(&mut self) -> impl Future<Output = Result<ProbeResult<T>, ProbeFault>> + Send {
        (self.f)()
    }
}

/// 원격 명령 프로브
///
/// 명령을 한 번 실행하고 `matcher`로 성공 여부를 판정합니다.
/// 0이 아닌 종료 코드는 장애가 아니라 평범한 "준비 안 됨" 결과입니다.
/// 실행기 에러만 [`ProbeFault`]로 변환됩니다.
pub struct CommandProbe<E, M> {
    executor: Arc<E>,
    command: String,
    matcher: M,
}

impl<E, M> CommandProbe<E, M>
where
    E: CommandExecutor,
    M: Fn(&CommandOutput) -> bool + Send + Sync,
{
    /// 실행기, 명령, 판정 함수로 프로브를 생성합니다.
    pub fn new(executor: Arc<E>, command: impl Into<String>, matcher: M) -> Self {
        Self {
            executor,
            command: command.into(),
            matcher,
        }
    }

    /// 실행할 명령
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl<E: CommandExecutor> CommandProbe<E, fn(&CommandOutput) -> bool> {
    /// 종료 코드 0을 성공으로 보는 프로브
    pub fn exit_success(executor: Arc<E>, command: impl Into<String>) -> Self {
        Self::new(executor, command, CommandOutput::success)
    }
}

/// 종료 코드 0이고 stdout에 `needle`이 포함되면 성공인 프로브를 생성합니다.
pub fn stdout_contains<E: CommandExecutor>(
    executor: Arc<E>,
    command: impl Into<String>,
    needle: impl Into<String>,
) -> CommandProbe<E, impl Fn(&CommandOutput) -> bool + Send + Sync> {
    let needle = needle.into();
    CommandProbe::new(executor, command, move |out: &CommandOutput| {
        out.success() && out.stdout.contains(needle.as_str())
    })
}

impl<E, M> Probe for CommandProbe<E, M>
where
    E: CommandExecutor,
    M: Fn(&CommandOutput) -> bool + Send + Sync,
{
    type Output = CommandOutput;

    async fn check(&mut self) -> Result<ProbeResult<CommandOutput>, ProbeFault> {
        let output = self.executor.run(&self.command).await?;
        let succeeded = (self.matcher)(&output);
        Ok(ProbeResult::new(succeeded, output))
    }
}
