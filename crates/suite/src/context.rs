//! 스위트 실행 컨텍스트
//!
//! 실행기, 파라미터, 기본 폴링 설정, 취소 토큰을 묶어 러너에 전달합니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use appcert_core::executor::CommandExecutor;
use appcert_poller::PollConfig;

use crate::error::SuiteRunnerError;
use crate::template;
use crate::types::ITEM_PLACEHOLDER;

/// 스위트 실행 컨텍스트
pub struct TestContext<E> {
    executor: Arc<E>,
    params: BTreeMap<String, String>,
    defaults: PollConfig,
    cancel: CancellationToken,
}

impl<E: CommandExecutor> TestContext<E> {
    /// 기본 폴링 설정과 빈 파라미터로 컨텍스트를 생성합니다.
    pub fn new(executor: Arc<E>) -> Self {
        Self {
            executor,
            params: BTreeMap::new(),
            defaults: PollConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// `${NAME}` 치환에 쓸 파라미터를 설정합니다.
    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// `wait` 블록이 재정의하지 않은 값에 쓰일 기본 폴링 설정
    pub fn with_defaults(mut self, defaults: PollConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// 외부 취소 토큰을 연결합니다.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn defaults(&self) -> &PollConfig {
        &self.defaults
    }

    pub fn target(&self) -> &str {
        self.executor.target()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 템플릿을 치환합니다. `item`이 주어지면 `${item}`에 바인딩됩니다.
    pub fn expand(&self, text: &str, item: Option<&str>) -> Result<String, SuiteRunnerError> {
        let expanded = template::expand(text, |name| {
            if name == ITEM_PLACEHOLDER {
                if let Some(item) = item {
                    return Some(item);
                }
            }
            self.params.get(name).map(String::as_str)
        })?;
        Ok(expanded)
    }
}
