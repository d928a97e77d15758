#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod outcome;
pub mod poller;
pub mod probe;

pub use config::{Backoff, FaultPolicy, PollConfig, PollConfigBuilder};
pub use error::{PollError, ProbeFault};
pub use outcome::{PollOutcome, PollStats};
pub use poller::{ConditionPoller, poll_until};
pub use probe::{CommandProbe, FnProbe, Probe, ProbeResult, probe_fn, stdout_contains};
