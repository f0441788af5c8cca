use std::fmt;

use ahash::AHashMap;

use crate::{
    BenchError,
    workload::{BodyFn, Phases, SetupFn, TeardownFn, Workload},
};

pub type WorkloadFactory = Box<dyn Fn() -> Box<dyn Workload>>;

/// Per-case overrides of the runner defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseOptions {
    pub samples: Option<u32>,
    pub iterations: Option<Vec<usize>>,
}

impl CaseOptions {
    pub fn samples(mut self, samples: u32) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn iterations(mut self, iterations: Vec<usize>) -> Self {
        self.iterations = Some(iterations);
        self
    }

    fn validate(&self) -> Result<(), BenchError> {
        if self.samples == Some(0) {
            return Err(BenchError::registration("sample override must be positive"));
        }
        if let Some(iterations) = &self.iterations {
            if iterations.is_empty() || iterations.contains(&0) {
                return Err(BenchError::registration(
                    "iteration override must list positive counts",
                ));
            }
        }
        Ok(())
    }
}

pub struct Case {
    name: String,
    factory: WorkloadFactory,
    options: CaseOptions,
}

impl Case {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CaseOptions {
        &self.options
    }

    /// Fresh workload instance for one sample.
    pub fn build(&self) -> Box<dyn Workload> {
        (self.factory)()
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Suite {
    name: String,
    cases: Vec<Case>,
    case_index: AHashMap<String, usize>,
    baseline: Option<usize>,
}

impl Suite {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cases: Vec::new(),
            case_index: AHashMap::new(),
            baseline: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cases in registration order.
    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn case(&self, name: &str) -> Option<&Case> {
        self.case_index.get(name).map(|idx| &self.cases[*idx])
    }

    pub fn baseline(&self) -> Option<&Case> {
        self.baseline.map(|idx| &self.cases[idx])
    }
}

/// Suites and their cases, populated before any run and read-only afterwards.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: Vec<Suite>,
    index: AHashMap<String, usize>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `case_name` to `suite_name`, creating the suite on first use.
    pub fn register_case<F>(
        &mut self,
        suite_name: &str,
        case_name: &str,
        factory: F,
        options: CaseOptions,
    ) -> Result<(), BenchError>
    where
        F: Fn() -> Box<dyn Workload> + 'static,
    {
        if suite_name.is_empty() {
            return Err(BenchError::registration("suite name must not be empty"));
        }
        if case_name.is_empty() {
            return Err(BenchError::registration(format!(
                "case name in suite {suite_name} must not be empty"
            )));
        }
        options.validate()?;
        if let Some(suite) = self.suite(suite_name) {
            if suite.case_index.contains_key(case_name) {
                return Err(BenchError::registration(format!(
                    "case {case_name} already registered in suite {suite_name}"
                )));
            }
        }
        let suite = self.suite_entry(suite_name);
        suite
            .case_index
            .insert(case_name.to_string(), suite.cases.len());
        suite.cases.push(Case {
            name: case_name.to_string(),
            factory: Box::new(factory),
            options,
        });
        Ok(())
    }

    /// Registers a workload that is cloned from `prototype` for every sample.
    pub fn register_workload<W>(
        &mut self,
        suite_name: &str,
        case_name: &str,
        prototype: W,
        options: CaseOptions,
    ) -> Result<(), BenchError>
    where
        W: Workload + Clone + 'static,
    {
        self.register_case(
            suite_name,
            case_name,
            move || -> Box<dyn Workload> { Box::new(prototype.clone()) },
            options,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn register_phases<S>(
        &mut self,
        suite_name: &str,
        case_name: &str,
        state: S,
        setup: SetupFn<S>,
        body: BodyFn<S>,
        teardown: TeardownFn<S>,
        options: CaseOptions,
    ) -> Result<(), BenchError>
    where
        S: Clone + 'static,
    {
        let phases = Phases::new(state, setup, body, teardown);
        self.register_workload(suite_name, case_name, phases, options)
    }

    pub fn mark_as_baseline(&mut self, suite_name: &str, case_name: &str) -> Result<(), BenchError> {
        let slot = *self.index.get(suite_name).ok_or_else(|| {
            BenchError::registration(format!("unknown suite {suite_name}"))
        })?;
        let suite = &mut self.suites[slot];
        let case_idx = *suite.case_index.get(case_name).ok_or_else(|| {
            BenchError::registration(format!(
                "case {case_name} does not belong to suite {suite_name}"
            ))
        })?;
        match suite.baseline {
            Some(existing) if existing != case_idx => Err(BenchError::registration(format!(
                "suite {suite_name} already has baseline {}",
                suite.cases[existing].name
            ))),
            _ => {
                suite.baseline = Some(case_idx);
                Ok(())
            }
        }
    }

    /// Suites in registration order.
    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.index.get(name).map(|idx| &self.suites[*idx])
    }

    pub fn case_count(&self) -> usize {
        self.suites.iter().map(|s| s.cases.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    fn suite_entry(&mut self, name: &str) -> &mut Suite {
        let slot = match self.index.get(name).copied() {
            Some(slot) => slot,
            None => {
                self.suites.push(Suite::new(name));
                let slot = self.suites.len() - 1;
                self.index.insert(name.to_string(), slot);
                slot
            }
        };
        &mut self.suites[slot]
    }
}
