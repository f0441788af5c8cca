//! Micro-benchmark and regression harness for comparing virtual dispatch,
//! stored-closure dispatch and composed-object message dispatch.
//! Run `cargo run --release --bin dispatchbench` for the report, or
//! `cargo bench` for the Criterion comparison under `target/criterion`.

pub mod baseline;
pub mod cli;
pub mod dispatch;
pub mod errors;
pub mod registry;
pub mod regression;
pub mod report;
pub mod runner;
pub mod timer;
pub mod workload;

pub use crate::baseline::{BaselineRecord, BaselineStore, JsonBaselineStore, MemoryBaselines};
pub use crate::dispatch::{DispatchStrategy, register_dispatch_suites};
pub use crate::errors::BenchError;
pub use crate::registry::{CaseOptions, SuiteRegistry};
pub use crate::regression::{CasePair, RegressionTester, Verdict};
pub use crate::report::Report;
pub use crate::runner::{Measurement, Runner, RunnerConfig};
pub use crate::workload::{Operation, Workload};
