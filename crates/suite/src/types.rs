//! 스위트 타입 정의
//!
//! YAML 스위트 파일이 역직렬화되는 타입들입니다.
//!
//! # YAML 형식
//!
//! ```yaml
//! name: rabbitmq
//! description: RabbitMQ appliance
//! checks:
//!   - name: MOTD reports ready
//!     run: cat /etc/motd
//!     expect:
//!       stdout_contains: All set and ready to serve
//!     wait:
//!       timeout_secs: 300
//!       interval_secs: 5
//!       fault_policy: retry
//!   - name: default user exists
//!     run: rabbitmqctl list_users
//!     expect:
//!       stdout_contains: ${ONEAPP_RABBITMQ_DEFAULT_USER}
//!   - name: config file present
//!     run: test -f ${item}
//!     each:
//!       - /etc/rabbitmq/rabbitmq.conf
//!     severity: soft
//! cleanup:
//!   - docker rm -f probe || true
//! ```

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use appcert_core::types::{CommandOutput, truncate};
use appcert_poller::{Backoff, FaultPolicy, PollConfig, PollConfigBuilder, PollError};

use crate::error::SuiteRunnerError;
use crate::template::{TemplateError, placeholders};

/// `each` 항목 플레이스홀더 이름
pub const ITEM_PLACEHOLDER: &str = "item";

/// 불일치 메시지에 싣는 stdout 최대 길이
const MISMATCH_STDOUT_CHARS: usize = 120;

/// 검증 스위트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    /// 스위트 이름 (디렉토리 안에서 고유)
    pub name: String,
    /// 설명
    #[serde(default)]
    pub description: String,
    /// 순서대로 실행되는 체크 목록
    pub checks: Vec<CheckSpec>,
    /// 체크 이후 항상 실행되는 정리 명령
    #[serde(default)]
    pub cleanup: Vec<String>,
}

impl Suite {
    /// 스위트 정의를 검증합니다.
    ///
    /// 파라미터 값은 실행 시점에 결정되므로 여기서는 플레이스홀더 문법만 확인합니다.
    pub fn validate(&self) -> Result<(), SuiteRunnerError> {
        let invalid = |reason: String| SuiteRunnerError::Validation {
            suite: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("suite name must not be empty".to_owned()));
        }
        if self.checks.is_empty() {
            return Err(invalid("suite must contain at least one check".to_owned()));
        }

        let mut seen = HashSet::new();
        for check in &self.checks {
            if !seen.insert(check.name.as_str()) {
                return Err(invalid(format!("duplicate check name '{}'", check.name)));
            }
            check
                .validate()
                .map_err(|reason| invalid(format!("check '{}': {reason}", check.name)))?;
        }

        for command in &self.cleanup {
            if command.trim().is_empty() {
                return Err(invalid("cleanup command must not be empty".to_owned()));
            }
            check_template(command, false)
                .map_err(|e| invalid(format!("cleanup '{command}': {e}")))?;
        }

        Ok(())
    }
}

/// 체크 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckSeverity {
    /// 실패하면 스위트 실패
    #[default]
    Hard,
    /// 실패해도 경고만 남김
    Soft,
}

/// 단일 체크 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckSpec {
    /// 체크 이름 (스위트 안에서 고유)
    pub name: String,
    /// 대상에서 실행할 셸 명령 (`${NAME}` 치환)
    pub run: String,
    /// 비어 있지 않으면 항목마다 `${item}`을 바인딩해 반복 실행
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub each: Vec<String>,
    /// 기대 결과
    #[serde(default)]
    pub expect: Expectation,
    /// 있으면 조건이 충족될 때까지 폴링, 없으면 한 번만 실행
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitSpec>,
    /// 심각도
    #[serde(default)]
    pub severity: CheckSeverity,
}

impl CheckSpec {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("check name must not be empty".to_owned());
        }
        if self.run.trim().is_empty() {
            return Err("'run' must not be empty".to_owned());
        }
        if self.each.iter().any(|item| item.is_empty()) {
            return Err("'each' items must not be empty".to_owned());
        }

        let with_item = !self.each.is_empty();
        check_template(&self.run, with_item).map_err(|e| format!("'run': {e}"))?;
        self.expect.validate(with_item)?;

        if let Some(wait) = &self.wait {
            wait.to_poll_config(&PollConfig::default())
                .map_err(|e| format!("'wait': {e}"))?;
        }
        Ok(())
    }
}

/// 기대 결과
///
/// 모든 조건을 동시에 만족해야 성공입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    /// 기대 종료 코드 (기본 0, `null`이면 검사 안 함)
    #[serde(default = "default_exit_code")]
    pub exit_code: Option<i32>,
    /// stdout에 모두 포함되어야 하는 문자열 (문자열 하나 또는 목록)
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub stdout_contains: Vec<String>,
    /// stdout에 없어야 하는 문자열
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub stdout_not_contains: Vec<String>,
    /// 앞뒤 공백을 제거한 stdout과 정확히 일치
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_equals: Option<String>,
    /// stdout이 매칭되어야 하는 정규식
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_matches: Option<String>,
}

fn default_exit_code() -> Option<i32> {
    Some(0)
}

impl Default for Expectation {
    fn default() -> Self {
        Self {
            exit_code: default_exit_code(),
            stdout_contains: Vec::new(),
            stdout_not_contains: Vec::new(),
            stdout_equals: None,
            stdout_matches: None,
        }
    }
}

impl Expectation {
    fn validate(&self, with_item: bool) -> Result<(), String> {
        for template in self.templates() {
            check_template(template, with_item).map_err(|e| format!("'expect': {e}"))?;
        }
        if let Some(pattern) = &self.stdout_matches {
            // 플레이스홀더가 있는 패턴은 치환 후에야 컴파일할 수 있음
            let has_placeholders = placeholders(pattern).is_ok_and(|p| !p.is_empty());
            if !has_placeholders {
                compile_pattern(pattern).map_err(|e| e.to_string())?;
            }
        }
        Ok(())
    }

    fn templates(&self) -> impl Iterator<Item = &String> {
        self.stdout_contains
            .iter()
            .chain(&self.stdout_not_contains)
            .chain(&self.stdout_equals)
            .chain(&self.stdout_matches)
    }

    /// 모든 문자열에 `expand`를 적용하고 정규식을 컴파일합니다.
    pub fn compile<F>(&self, expand: F) -> Result<CompiledExpectation, SuiteRunnerError>
    where
        F: Fn(&str) -> Result<String, SuiteRunnerError>,
    {
        let expand_all = |values: &[String]| -> Result<Vec<String>, SuiteRunnerError> {
            values.iter().map(|v| expand(v)).collect()
        };

        let matches = match &self.stdout_matches {
            Some(pattern) => Some(compile_pattern(&expand(pattern)?)?),
            None => None,
        };

        Ok(CompiledExpectation {
            exit_code: self.exit_code,
            contains: expand_all(&self.stdout_contains)?,
            not_contains: expand_all(&self.stdout_not_contains)?,
            equals: self.stdout_equals.as_deref().map(&expand).transpose()?,
            matches,
        })
    }
}

/// 치환과 컴파일이 끝난 기대 결과
#[derive(Debug, Clone)]
pub struct CompiledExpectation {
    exit_code: Option<i32>,
    contains: Vec<String>,
    not_contains: Vec<String>,
    equals: Option<String>,
    matches: Option<Regex>,
}

impl CompiledExpectation {
    /// 명령 출력을 판정합니다. 실패 시 첫 번째 불일치 설명을 돌려줍니다.
    pub fn evaluate(&self, output: &CommandOutput) -> Result<(), String> {
        if let Some(expected) = self.exit_code {
            if output.exit_code != expected {
                return Err(format!(
                    "expected exit code {expected}, got {}",
                    output.exit_code
                ));
            }
        }
        for needle in &self.contains {
            if !output.stdout.contains(needle.as_str()) {
                return Err(format!("stdout did not contain '{needle}'"));
            }
        }
        for needle in &self.not_contains {
            if output.stdout.contains(needle.as_str()) {
                return Err(format!("stdout unexpectedly contained '{needle}'"));
            }
        }
        if let Some(expected) = &self.equals {
            let actual = output.stdout_trimmed();
            if actual != expected {
                return Err(format!(
                    "expected stdout '{expected}', got '{}'",
                    truncate(actual, MISMATCH_STDOUT_CHARS)
                ));
            }
        }
        if let Some(re) = &self.matches {
            if !re.is_match(&output.stdout) {
                return Err(format!("stdout did not match /{}/", re.as_str()));
            }
        }
        Ok(())
    }

    /// 판정만 필요한 경우
    pub fn is_met(&self, output: &CommandOutput) -> bool {
        self.evaluate(output).is_ok()
    }
}

/// 폴링 설정 재정의
///
/// 지정하지 않은 필드는 `[poll]` 설정 섹션의 값을 따릅니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitSpec {
    /// 전체 대기 시간 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// 시도 간격 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// 프로브 장애 처리 정책
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_policy: Option<FaultPolicy>,
    /// 최대 시도 횟수
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// 대기 전략
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffKind>,
    /// 지수 backoff 배수
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_multiplier: Option<f64>,
    /// 지수 backoff 대기 상한 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_interval_secs: Option<u64>,
}

/// YAML에서 선택하는 backoff 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// 고정 간격
    Fixed,
    /// 지수 증가
    Exponential,
}

const DEFAULT_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);

impl WaitSpec {
    /// `defaults` 위에 이 재정의를 덮어쓴 폴링 설정을 만듭니다.
    pub fn to_poll_config(&self, defaults: &PollConfig) -> Result<PollConfig, PollError> {
        let mut builder = PollConfigBuilder::from_config(defaults.clone());

        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let interval = self
            .interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);
        builder = builder.interval(interval);

        if let Some(policy) = self.fault_policy {
            builder = builder.fault_policy(policy);
        }
        if let Some(max) = self.max_attempts {
            builder = builder.max_attempts(max);
        }

        let (base_multiplier, base_max) = match defaults.backoff {
            Backoff::Exponential {
                multiplier,
                max_interval,
            } => (multiplier, max_interval.max(interval)),
            Backoff::Fixed => (DEFAULT_MULTIPLIER, DEFAULT_MAX_INTERVAL.max(interval)),
        };
        let exponential = match self.backoff {
            Some(BackoffKind::Fixed) => false,
            Some(BackoffKind::Exponential) => true,
            None => matches!(defaults.backoff, Backoff::Exponential { .. }),
        };

        builder = if exponential {
            builder.exponential_backoff(
                self.backoff_multiplier.unwrap_or(base_multiplier),
                self.max_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(base_max),
            )
        } else {
            builder.backoff(Backoff::Fixed)
        };

        builder.build()
    }
}

fn check_template(template: &str, with_item: bool) -> Result<(), TemplateError> {
    for name in placeholders(template)? {
        if name == ITEM_PLACEHOLDER && !with_item {
            return Err(TemplateError::Unknown {
                name: name.to_owned(),
            });
        }
    }
    Ok(())
}

fn compile_pattern(pattern: &str) -> Result<Regex, SuiteRunnerError> {
    Regex::new(pattern).map_err(|e| SuiteRunnerError::Pattern {
        pattern: pattern.to_owned(),
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
