use std::{env, process};

use dispatchbench::{
    BenchError, JsonBaselineStore, RegressionTester, Report, Runner, SuiteRegistry, Verdict,
    baseline::baseline_file,
    cli::{CommandLineConfig, OutputFormat, RUNNER_PREFIX},
    register_dispatch_suites,
};

const USAGE_ERROR: i32 = 2;

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs, RUNNER_PREFIX) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("{}", CommandLineConfig::help());
            process::exit(USAGE_ERROR);
        }
    };
    if config.show_help {
        println!("{}", CommandLineConfig::help());
        return;
    }

    let mut registry = SuiteRegistry::new();
    if let Err(err) = register_dispatch_suites(&mut registry) {
        eprintln!("{err}");
        process::exit(USAGE_ERROR);
    }

    let mut runner = match Runner::new(config.runner.clone()) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(USAGE_ERROR);
        }
    };
    let report = runner.run(&registry);
    match config.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("cannot render report: {err}"),
        },
    }

    if !config.test_regression {
        return;
    }
    // In JSON mode stdout carries only the report.
    let to_stderr = config.format == OutputFormat::Json;
    emit(to_stderr, "");
    match check_regressions(&config, &report) {
        Ok(verdicts) => {
            for verdict in &verdicts {
                emit(to_stderr, &verdict.to_string());
            }
            if !verdicts.iter().all(|v| v.passed) {
                eprintln!("Some performance regression tests failed!");
                process::exit(1);
            }
        }
        Err(err) => {
            emit(to_stderr, &format!("Performance regression test error: {err}"));
            process::exit(1);
        }
    }
}

fn check_regressions(config: &CommandLineConfig, report: &Report) -> Result<Vec<Verdict>, BenchError> {
    let path = baseline_file(config.baseline_file.as_deref());
    let store = JsonBaselineStore::open(&path)?;
    let tester = RegressionTester::new(store, config.tolerance)?;
    tester.check_each(report, &config.checks)
}

fn emit(to_stderr: bool, line: &str) {
    if to_stderr {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
