//! Sequential execution of registered cases.
//!
//! For every case, every iteration count, every sample: build a fresh
//! workload, run setup (untimed), run the body `iterations` times inside one
//! timed region, run teardown (untimed), record one [`Measurement`]. Cases run
//! in registration order on the calling thread; nothing overlaps.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    BenchError,
    registry::{Case, SuiteRegistry},
    report::Report,
    timer::{Timer, WallTimer},
    workload::Workload,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    pub samples: u32,
    pub iterations: Vec<usize>,
    pub suite_filter: Option<String>,
    pub case_filter: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::new(1, vec![5_000, 10_000])
        } else {
            Self::new(3, vec![20_000, 50_000])
        }
    }
}

impl RunnerConfig {
    pub fn new(samples: u32, iterations: Vec<usize>) -> Self {
        Self {
            samples,
            iterations,
            suite_filter: None,
            case_filter: None,
        }
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.samples == 0 {
            return Err(BenchError::invalid_input("samples must be positive"));
        }
        if self.iterations.is_empty() {
            return Err(BenchError::invalid_input(
                "at least one iteration count is required",
            ));
        }
        if self.iterations.contains(&0) {
            return Err(BenchError::invalid_input("iteration counts must be positive"));
        }
        Ok(())
    }

    fn selects(&self, suite: &str, case: &str) -> bool {
        let suite_ok = self.suite_filter.as_deref().is_none_or(|f| f == suite);
        let case_ok = self.case_filter.as_deref().is_none_or(|f| case.contains(f));
        suite_ok && case_ok
    }
}

/// Elapsed time for one sample of `iterations` timed calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub iterations: usize,
    pub sample: u32,
    pub elapsed: Duration,
}

impl Measurement {
    pub fn new(iterations: usize, sample: u32, elapsed: Duration) -> Self {
        Self {
            iterations,
            sample,
            elapsed,
        }
    }

    pub fn ns_per_iter(&self) -> f64 {
        self.elapsed.as_nanos() as f64 / self.iterations as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Body,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFailure {
    pub iterations: usize,
    pub sample: u32,
    pub phase: Phase,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseRun {
    pub case: String,
    pub measurements: Vec<Measurement>,
    pub failures: Vec<CaseFailure>,
    pub teardown_errors: u32,
}

impl CaseRun {
    pub fn new(case: &str) -> Self {
        Self {
            case: case.to_string(),
            measurements: Vec::new(),
            failures: Vec::new(),
            teardown_errors: 0,
        }
    }

    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuiteRun {
    pub name: String,
    pub baseline: Option<String>,
    pub cases: Vec<CaseRun>,
}

/// Unaggregated runner output, in registration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRun {
    pub suites: Vec<SuiteRun>,
}

pub struct Runner<T: Timer = WallTimer> {
    config: RunnerConfig,
    timer: T,
}

impl Runner<WallTimer> {
    pub fn new(config: RunnerConfig) -> Result<Self, BenchError> {
        Self::with_timer(config, WallTimer::new())
    }
}

impl<T: Timer> Runner<T> {
    pub fn with_timer(config: RunnerConfig, timer: T) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self { config, timer })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn run(&mut self, registry: &SuiteRegistry) -> Report {
        Report::aggregate(self.measure(registry))
    }

    pub fn measure(&mut self, registry: &SuiteRegistry) -> RawRun {
        let mut raw = RawRun::default();
        for suite in registry.suites() {
            let mut cases = Vec::new();
            for case in suite.cases() {
                if !self.config.selects(suite.name(), case.name()) {
                    continue;
                }
                cases.push(self.run_case(suite.name(), case));
            }
            if cases.is_empty() {
                continue;
            }
            raw.suites.push(SuiteRun {
                name: suite.name().to_string(),
                baseline: suite.baseline().map(|c| c.name().to_string()),
                cases,
            });
        }
        raw
    }

    fn run_case(&mut self, suite: &str, case: &Case) -> CaseRun {
        let samples = case.options().samples.unwrap_or(self.config.samples);
        let iterations = case
            .options()
            .iterations
            .clone()
            .unwrap_or_else(|| self.config.iterations.clone());
        let mut run = CaseRun::new(case.name());
        for iters in iterations {
            debug!(suite, case = case.name(), iterations = iters, samples, "running case");
            for sample in 0..samples {
                match self.run_sample(case, iters, sample, &mut run.teardown_errors) {
                    Ok(measurement) => run.measurements.push(measurement),
                    Err(failure) => {
                        error!(
                            suite,
                            case = case.name(),
                            iterations = iters,
                            sample,
                            phase = ?failure.phase,
                            message = %failure.message,
                            "case execution failed"
                        );
                        run.failures.push(failure);
                        break;
                    }
                }
            }
        }
        run
    }

    fn run_sample(
        &mut self,
        case: &Case,
        iterations: usize,
        sample: u32,
        teardown_errors: &mut u32,
    ) -> Result<Measurement, CaseFailure> {
        let failure = |phase, message| CaseFailure {
            iterations,
            sample,
            phase,
            message,
        };
        let mut workload = panic::catch_unwind(AssertUnwindSafe(|| case.build()))
            .map_err(|payload| failure(Phase::Setup, panic_message(payload)))?;

        if let Err(message) = guarded(|| workload.setup(iterations)) {
            finish(case.name(), &mut *workload, teardown_errors);
            return Err(failure(Phase::Setup, message));
        }

        self.timer.start();
        let outcome = guarded(|| {
            for index in 0..iterations {
                workload.invoke(index)?;
            }
            Ok(())
        });
        let elapsed = self.timer.stop();

        finish(case.name(), &mut *workload, teardown_errors);
        outcome.map_err(|message| failure(Phase::Body, message))?;
        debug!(
            case = case.name(),
            iterations,
            sample,
            elapsed_ns = elapsed.as_nanos() as u64,
            "sample recorded"
        );
        Ok(Measurement::new(iterations, sample, elapsed))
    }
}

/// Runs every selected case of `registry` with wall-clock timing.
pub fn run(registry: &SuiteRegistry, config: RunnerConfig) -> Result<Report, BenchError> {
    let mut runner = Runner::new(config)?;
    Ok(runner.run(registry))
}

fn finish(case: &str, workload: &mut dyn Workload, teardown_errors: &mut u32) {
    if let Err(message) = guarded(|| workload.teardown()) {
        *teardown_errors += 1;
        warn!(case, message = %message, "teardown failed");
    }
}

fn guarded<F>(f: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), BenchError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload)),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}
