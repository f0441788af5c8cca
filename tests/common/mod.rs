#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc, time::Duration};

use dispatchbench::{
    BenchError, CaseOptions, Report, RunnerConfig, SuiteRegistry, Workload,
    runner::{CaseRun, Measurement, RawRun, Runner, SuiteRun},
    timer::ScriptedTimer,
};

pub type Log = Rc<RefCell<Vec<String>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    None,
    Setup,
    Body { at: usize },
    BodyPanic,
    Teardown,
}

/// Workload that records every phase call into a shared log.
pub struct Probe {
    name: String,
    log: Log,
    fault: Fault,
    prepared: usize,
}

impl Probe {
    pub fn new(name: &str, log: &Log, fault: Fault) -> Self {
        Self {
            name: name.to_string(),
            log: Rc::clone(log),
            fault,
            prepared: 0,
        }
    }
}

impl Workload for Probe {
    fn setup(&mut self, iterations: usize) -> Result<(), BenchError> {
        self.log
            .borrow_mut()
            .push(format!("{}:setup:{iterations}", self.name));
        self.prepared = iterations;
        if self.fault == Fault::Setup {
            return Err(BenchError::case_execution("setup refused"));
        }
        Ok(())
    }

    fn invoke(&mut self, index: usize) -> Result<(), BenchError> {
        assert!(index < self.prepared);
        match self.fault {
            Fault::Body { at } if at == index => Err(BenchError::case_execution("body refused")),
            Fault::BodyPanic => panic!("probe body panicked"),
            _ => Ok(()),
        }
    }

    fn teardown(&mut self) -> Result<(), BenchError> {
        self.log.borrow_mut().push(format!("{}:teardown", self.name));
        if self.fault == Fault::Teardown {
            return Err(BenchError::teardown("teardown refused"));
        }
        Ok(())
    }
}

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn register_probe(
    registry: &mut SuiteRegistry,
    suite: &str,
    case: &str,
    log: &Log,
    fault: Fault,
    options: CaseOptions,
) {
    let log = Rc::clone(log);
    let name = case.to_string();
    registry
        .register_case(
            suite,
            case,
            move || -> Box<dyn Workload> { Box::new(Probe::new(&name, &log, fault)) },
            options,
        )
        .expect("register probe");
}

pub fn scripted_runner(config: RunnerConfig, script: &[u64]) -> Runner<ScriptedTimer> {
    let timer = ScriptedTimer::new(script.iter().map(|ns| Duration::from_nanos(*ns)));
    Runner::with_timer(config, timer).expect("runner")
}

pub fn constant_runner(config: RunnerConfig, ns: u64) -> Runner<ScriptedTimer> {
    Runner::with_timer(config, ScriptedTimer::constant(Duration::from_nanos(ns))).expect("runner")
}

/// Report with one sample per case at `iterations`, each case taking the
/// given ns/iteration.
pub fn fixed_report(suite: &str, baseline: Option<&str>, cases: &[(&str, u64)], iterations: usize) -> Report {
    let cases = cases
        .iter()
        .map(|(name, ns_per_iter)| {
            let mut run = CaseRun::new(name);
            run.measurements.push(Measurement::new(
                iterations,
                0,
                Duration::from_nanos(ns_per_iter * iterations as u64),
            ));
            run
        })
        .collect();
    Report::aggregate(RawRun {
        suites: vec![SuiteRun {
            name: suite.to_string(),
            baseline: baseline.map(str::to_string),
            cases,
        }],
    })
}
