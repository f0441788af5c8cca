mod common;

use common::{Fault, constant_runner, new_log, register_probe, scripted_runner};
use dispatchbench::{
    CaseOptions, RunnerConfig, SuiteRegistry,
    runner::{Phase, Runner},
};

fn two_suite_registry(log: &common::Log) -> SuiteRegistry {
    let mut registry = SuiteRegistry::new();
    register_probe(&mut registry, "noop", "a", log, Fault::None, CaseOptions::default());
    register_probe(&mut registry, "noop", "b", log, Fault::None, CaseOptions::default());
    register_probe(&mut registry, "setter", "c", log, Fault::None, CaseOptions::default());
    registry
}

#[test]
fn test_cases_run_in_registration_order_one_sample_at_a_time() {
    let log = new_log();
    let registry = two_suite_registry(&log);
    let mut runner = constant_runner(RunnerConfig::new(2, vec![3, 5]), 10);
    runner.measure(&registry);
    let expected: Vec<String> = [
        "a:setup:3", "a:teardown", "a:setup:3", "a:teardown", "a:setup:5", "a:teardown",
        "a:setup:5", "a:teardown", "b:setup:3", "b:teardown", "b:setup:3", "b:teardown",
        "b:setup:5", "b:teardown", "b:setup:5", "b:teardown", "c:setup:3", "c:teardown",
        "c:setup:3", "c:teardown", "c:setup:5", "c:teardown", "c:setup:5", "c:teardown",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(*log.borrow(), expected);
}

#[test]
fn test_one_measurement_per_sample_and_iteration_count() {
    let log = new_log();
    let registry = two_suite_registry(&log);
    let mut runner = constant_runner(RunnerConfig::new(3, vec![10, 20]), 100);
    let raw = runner.measure(&registry);
    assert_eq!(raw.suites.len(), 2);
    let case = &raw.suites[0].cases[0];
    assert_eq!(case.measurements.len(), 6);
    let order: Vec<(usize, u32)> = case
        .measurements
        .iter()
        .map(|m| (m.iterations, m.sample))
        .collect();
    assert_eq!(order, vec![(10, 0), (10, 1), (10, 2), (20, 0), (20, 1), (20, 2)]);
}

#[test]
fn test_case_options_override_defaults() {
    let log = new_log();
    let mut registry = SuiteRegistry::new();
    register_probe(
        &mut registry,
        "s",
        "narrow",
        &log,
        Fault::None,
        CaseOptions::default().samples(1).iterations(vec![7]),
    );
    let mut runner = constant_runner(RunnerConfig::new(4, vec![100, 200]), 1);
    let raw = runner.measure(&registry);
    let case = &raw.suites[0].cases[0];
    assert_eq!(case.measurements.len(), 1);
    assert_eq!(case.measurements[0].iterations, 7);
}

#[test]
fn test_setup_failure_aborts_only_that_iteration_count() {
    let log = new_log();
    let mut registry = SuiteRegistry::new();
    register_probe(&mut registry, "s", "broken", &log, Fault::Setup, CaseOptions::default());
    register_probe(&mut registry, "s", "healthy", &log, Fault::None, CaseOptions::default());
    let mut runner = constant_runner(RunnerConfig::new(3, vec![4, 8]), 1);
    let raw = runner.measure(&registry);

    let broken = &raw.suites[0].cases[0];
    assert!(broken.failed());
    assert!(broken.measurements.is_empty());
    assert_eq!(broken.failures.len(), 2);
    assert!(broken.failures.iter().all(|f| f.phase == Phase::Setup && f.sample == 0));
    assert_eq!(broken.failures[1].iterations, 8);

    let healthy = &raw.suites[0].cases[1];
    assert!(!healthy.failed());
    assert_eq!(healthy.measurements.len(), 6);
}

#[test]
fn test_body_error_and_panic_are_contained() {
    let log = new_log();
    let mut registry = SuiteRegistry::new();
    register_probe(&mut registry, "s", "errs", &log, Fault::Body { at: 2 }, CaseOptions::default());
    register_probe(&mut registry, "s", "panics", &log, Fault::BodyPanic, CaseOptions::default());
    register_probe(&mut registry, "s", "fine", &log, Fault::None, CaseOptions::default());
    let mut runner = constant_runner(RunnerConfig::new(2, vec![5]), 1);
    let raw = runner.measure(&registry);
    let cases = &raw.suites[0].cases;
    assert_eq!(cases.len(), 3);
    assert_eq!(cases[0].failures[0].phase, Phase::Body);
    assert!(cases[0].failures[0].message.contains("body refused"));
    assert_eq!(cases[1].failures[0].phase, Phase::Body);
    assert!(cases[1].failures[0].message.contains("probe body panicked"));
    assert_eq!(cases[2].measurements.len(), 2);
    // teardown still runs after a failed body
    assert!(log.borrow().iter().any(|entry| entry == "errs:teardown"));
}

#[test]
fn test_body_error_only_hits_large_enough_samples() {
    let log = new_log();
    let mut registry = SuiteRegistry::new();
    register_probe(&mut registry, "s", "late", &log, Fault::Body { at: 50 }, CaseOptions::default());
    let mut runner = constant_runner(RunnerConfig::new(2, vec![10, 100]), 1);
    let raw = runner.measure(&registry);
    let case = &raw.suites[0].cases[0];
    assert_eq!(case.measurements.len(), 2);
    assert_eq!(case.failures.len(), 1);
    assert_eq!(case.failures[0].iterations, 100);
}

#[test]
fn test_teardown_errors_are_swallowed() {
    let log = new_log();
    let mut registry = SuiteRegistry::new();
    register_probe(&mut registry, "s", "leaky", &log, Fault::Teardown, CaseOptions::default());
    let mut runner = constant_runner(RunnerConfig::new(2, vec![3]), 1);
    let raw = runner.measure(&registry);
    let case = &raw.suites[0].cases[0];
    assert!(!case.failed());
    assert_eq!(case.measurements.len(), 2);
    assert_eq!(case.teardown_errors, 2);
}

#[test]
fn test_filters_skip_unselected_cases() {
    let log = new_log();
    let registry = two_suite_registry(&log);
    let mut config = RunnerConfig::new(1, vec![1]);
    config.suite_filter = Some("noop".into());
    config.case_filter = Some("b".into());
    let mut runner = constant_runner(config, 1);
    let report = runner.run(&registry);
    assert_eq!(
        report.keys(),
        vec![("noop".to_string(), "b".to_string())]
    );
}

#[test]
fn test_scripted_durations_land_in_measurements() {
    let log = new_log();
    let mut registry = SuiteRegistry::new();
    register_probe(&mut registry, "s", "x", &log, Fault::None, CaseOptions::default());
    let mut runner = scripted_runner(RunnerConfig::new(2, vec![10]), &[1_000, 3_000]);
    let raw = runner.measure(&registry);
    let per_iter: Vec<f64> = raw.suites[0].cases[0]
        .measurements
        .iter()
        .map(|m| m.ns_per_iter())
        .collect();
    assert_eq!(per_iter, vec![100.0, 300.0]);
}

#[test]
fn test_repeated_runs_have_identical_structure() {
    let log = new_log();
    let registry = two_suite_registry(&log);
    let first = constant_runner(RunnerConfig::new(2, vec![4]), 5).run(&registry);
    let second = constant_runner(RunnerConfig::new(2, vec![4]), 9).run(&registry);
    assert_eq!(first.keys(), second.keys());
}

#[test]
fn test_invalid_config_rejected_before_running() {
    assert!(Runner::new(RunnerConfig::new(0, vec![10])).is_err());
    assert!(Runner::new(RunnerConfig::new(1, vec![])).is_err());
}
