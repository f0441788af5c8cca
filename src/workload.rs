//! Workload abstraction driven by the runner.
//!
//! A workload is constructed fresh for every sample. The runner calls
//! [`Workload::setup`] once with the sample's iteration count, then
//! [`Workload::invoke`] exactly `iterations` times inside the timed region
//! (indices `0..iterations`), then [`Workload::teardown`].

use std::fmt;

use crate::BenchError;

pub trait Workload {
    /// Untimed preparation sized to the iteration count of the sample.
    fn setup(&mut self, _iterations: usize) -> Result<(), BenchError> {
        Ok(())
    }

    /// One timed call. `index` is always below the `iterations` passed to setup.
    fn invoke(&mut self, index: usize) -> Result<(), BenchError>;

    /// Untimed cleanup. Errors are logged by the runner and never propagate.
    fn teardown(&mut self) -> Result<(), BenchError> {
        Ok(())
    }
}

impl<W: Workload + ?Sized> Workload for Box<W> {
    fn setup(&mut self, iterations: usize) -> Result<(), BenchError> {
        (**self).setup(iterations)
    }

    fn invoke(&mut self, index: usize) -> Result<(), BenchError> {
        (**self).invoke(index)
    }

    fn teardown(&mut self) -> Result<(), BenchError> {
        (**self).teardown()
    }
}

/// The operation a dispatch case exercises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Noop,
    Setter,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Noop => "noop",
            Operation::Setter => "setter",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type SetupFn<S> = fn(&mut S, usize) -> Result<(), BenchError>;
pub type BodyFn<S> = fn(&mut S, usize) -> Result<(), BenchError>;
pub type TeardownFn<S> = fn(&mut S) -> Result<(), BenchError>;

/// Workload assembled from three plain functions over a shared state value.
#[derive(Clone)]
pub struct Phases<S> {
    state: S,
    setup: SetupFn<S>,
    body: BodyFn<S>,
    teardown: TeardownFn<S>,
}

impl<S> Phases<S> {
    pub fn new(state: S, setup: SetupFn<S>, body: BodyFn<S>, teardown: TeardownFn<S>) -> Self {
        Self {
            state,
            setup,
            body,
            teardown,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S> Workload for Phases<S> {
    fn setup(&mut self, iterations: usize) -> Result<(), BenchError> {
        (self.setup)(&mut self.state, iterations)
    }

    fn invoke(&mut self, index: usize) -> Result<(), BenchError> {
        (self.body)(&mut self.state, index)
    }

    fn teardown(&mut self) -> Result<(), BenchError> {
        (self.teardown)(&mut self.state)
    }
}
