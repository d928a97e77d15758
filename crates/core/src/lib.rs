#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{AppcertError, ConfigError, ExecutorError, PollingError, SuiteError};

// 설정
pub use config::AppcertConfig;

// 실행기
pub use executor::{CommandExecutor, LocalExecutor, SshExecutor};

// 도메인 타입
pub use types::CommandOutput;
