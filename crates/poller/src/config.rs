//! 폴링 세션 설정
//!
//! [`PollConfig`]는 한 번의 폴링 세션을 위한 불변 설정입니다.
//! core의 [`PollSection`](appcert_core::config::PollSection)에서 만들거나
//! [`PollConfigBuilder`]로 직접 구성합니다.
//!
//! # 사용 예시
//! ```
//! use std::time::Duration;
//! use appcert_poller::{FaultPolicy, PollConfigBuilder};
//!
//! let config = PollConfigBuilder::new()
//!     .timeout(Duration::from_secs(180))
//!     .interval(Duration::from_secs(5))
//!     .fault_policy(FaultPolicy::Retry)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.timeout, Duration::from_secs(180));
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use appcert_core::config::PollSection;

use crate::error::PollError;

/// 프로브 장애 처리 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// 첫 장애에서 세션을 즉시 중단
    #[default]
    Fatal,
    /// 장애를 "준비 안 됨"으로 취급하고 계속 시도
    Retry,
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => f.write_str("fatal"),
            Self::Retry => f.write_str("retry"),
        }
    }
}

impl FromStr for FaultPolicy {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fatal" => Ok(Self::Fatal),
            "retry" => Ok(Self::Retry),
            other => Err(PollError::InvalidConfig {
                field: "fault_policy".to_owned(),
                reason: format!("unknown policy '{other}' (expected fatal or retry)"),
            }),
        }
    }
}

/// 시도 사이 대기 시간 전략
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Backoff {
    /// 매번 `interval`만큼 대기
    #[default]
    Fixed,
    /// `interval * multiplier^n`, `max_interval`에서 상한
    Exponential {
        /// 배수 (1.0 이상)
        multiplier: f64,
        /// 대기 시간 상한
        max_interval: Duration,
    },
}

impl Backoff {
    /// `step`번째(0부터) 대기 시간을 계산합니다.
    pub fn delay(&self, interval: Duration, step: u32) -> Duration {
        match *self {
            Self::Fixed => interval,
            Self::Exponential {
                multiplier,
                max_interval,
            } => {
                let exp = i32::try_from(step).unwrap_or(i32::MAX);
                let secs = interval.as_secs_f64() * multiplier.powi(exp);
                Duration::try_from_secs_f64(secs)
                    .map(|d| d.min(max_interval))
                    .unwrap_or(max_interval)
            }
        }
    }
}

/// 폴링 세션 설정
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// 전체 대기 예산. `Duration::ZERO`면 정확히 한 번 평가
    pub timeout: Duration,
    /// 시도 간 기본 대기 시간 (0보다 커야 함)
    pub interval: Duration,
    /// 프로브 장애 처리 정책
    pub fault_policy: FaultPolicy,
    /// 대기 시간 전략
    pub backoff: Backoff,
    /// 최대 시도 횟수 (None = 무제한)
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(5),
            fault_policy: FaultPolicy::Fatal,
            backoff: Backoff::Fixed,
            max_attempts: None,
        }
    }
}

impl PollConfig {
    /// 타임아웃과 간격만 지정한 설정을 생성합니다.
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            ..Self::default()
        }
    }

    /// 조건을 한 번만 평가하는 설정 (단발성 체크)
    pub fn once() -> Self {
        Self {
            timeout: Duration::ZERO,
            ..Self::default()
        }
    }

    /// core의 `[poll]` 섹션에서 설정을 생성합니다.
    pub fn from_core(section: &PollSection) -> Result<Self, PollError> {
        let fault_policy = section.fault_policy.parse()?;
        let backoff = match section.backoff.as_str() {
            "fixed" => Backoff::Fixed,
            "exponential" => Backoff::Exponential {
                multiplier: section.backoff_multiplier,
                max_interval: Duration::from_secs(section.max_interval_secs),
            },
            other => {
                return Err(PollError::InvalidConfig {
                    field: "backoff".to_owned(),
                    reason: format!("unknown backoff '{other}' (expected fixed or exponential)"),
                });
            }
        };

        let config = Self {
            timeout: Duration::from_secs(section.timeout_secs),
            interval: Duration::from_secs(section.interval_secs),
            fault_policy,
            backoff,
            max_attempts: (section.max_attempts > 0).then_some(section.max_attempts),
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PollError> {
        if self.interval.is_zero() {
            return Err(PollError::InvalidConfig {
                field: "interval".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }

        if let Backoff::Exponential {
            multiplier,
            max_interval,
        } = self.backoff
        {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(PollError::InvalidConfig {
                    field: "backoff.multiplier".to_owned(),
                    reason: format!("must be a finite number >= 1.0, got {multiplier}"),
                });
            }
            if max_interval < self.interval {
                return Err(PollError::InvalidConfig {
                    field: "backoff.max_interval".to_owned(),
                    reason: "must be >= interval".to_owned(),
                });
            }
        }

        if self.max_attempts == Some(0) {
            return Err(PollError::InvalidConfig {
                field: "max_attempts".to_owned(),
                reason: "must be at least 1 when set".to_owned(),
            });
        }

        Ok(())
    }
}

/// 폴링 설정 빌더
#[derive(Default)]
pub struct PollConfigBuilder {
    config: PollConfig,
}

impl PollConfigBuilder {
    /// 기본값(60초/5초, fatal, fixed)으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 설정에서 시작하는 빌더를 생성합니다.
    pub fn from_config(config: PollConfig) -> Self {
        Self { config }
    }

    /// 전체 대기 예산을 설정합니다.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// 시도 간격을 설정합니다.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// 장애 처리 정책을 설정합니다.
    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.config.fault_policy = policy;
        self
    }

    /// 백오프 전략을 설정합니다.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// 지수 백오프를 설정합니다.
    pub fn exponential_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.config.backoff = Backoff::Exponential {
            multiplier,
            max_interval,
        };
        self
    }

    /// 최대 시도 횟수를 설정합니다.
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.config.max_attempts = Some(max);
        self
    }

    /// 설정을 검증하고 `PollConfig`를 생성합니다.
    pub fn build(self) -> Result<PollConfig, PollError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
