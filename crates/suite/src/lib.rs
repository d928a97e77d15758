#![doc = include_str!("../README.md")]

pub mod context;
pub mod error;
pub mod loader;
pub mod report;
pub mod runner;
pub mod template;
pub mod types;

pub use context::TestContext;
pub use error::SuiteRunnerError;
pub use loader::SuiteLoader;
pub use report::{CheckResult, CheckStatus, SuiteReport};
pub use runner::SuiteRunner;
pub use template::TemplateError;
pub use types::{BackoffKind, CheckSeverity, CheckSpec, CompiledExpectation, Expectation, Suite, WaitSpec};
