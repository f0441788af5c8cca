use std::path::PathBuf;

use crate::{
    regression::{CasePair, DEFAULT_TOLERANCE},
    runner::RunnerConfig,
};

pub const RUNNER_PREFIX: &str = "--pb";
pub const REGRESSION_FLAG: &str = "--test-perf-regression";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandLineConfig {
    pub runner: RunnerConfig,
    pub format: OutputFormat,
    pub show_help: bool,
    pub test_regression: bool,
    pub baseline_file: Option<PathBuf>,
    pub tolerance: f64,
    pub checks: Vec<CasePair>,
}

impl Default for CommandLineConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            format: OutputFormat::Text,
            show_help: false,
            test_regression: false,
            baseline_file: None,
            tolerance: DEFAULT_TOLERANCE,
            checks: Vec::new(),
        }
    }
}

impl CommandLineConfig {
    /// Parses `args` (program name first). Runner options use `prefix`,
    /// e.g. `--pb-samples=3` for prefix `--pb`.
    pub fn from_args(args: &[&str], prefix: &str) -> Result<Self, String> {
        let mut config = Self::default();
        for arg in args.iter().skip(1) {
            let (flag, value) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (*arg, None),
            };
            if let Some(option) = flag.strip_prefix(prefix) {
                config.apply_runner_option(option, value, arg)?;
                continue;
            }
            match flag {
                REGRESSION_FLAG => config.test_regression = true,
                "--baseline-file" => {
                    config.baseline_file = Some(PathBuf::from(require(flag, value)?));
                }
                "--tolerance" => {
                    let raw = require(flag, value)?;
                    let tolerance: f64 = raw
                        .parse()
                        .map_err(|_| format!("--tolerance expects a number, got {raw}"))?;
                    if !tolerance.is_finite() || tolerance < 0.0 {
                        return Err(format!("--tolerance must be non-negative, got {raw}"));
                    }
                    config.tolerance = tolerance;
                }
                "--check" => {
                    let pair = CasePair::parse(require(flag, value)?).map_err(|e| e.to_string())?;
                    config.checks.push(pair);
                }
                other => return Err(format!("unknown flag {other}")),
            }
        }
        if config.checks.is_empty() {
            config.checks.push(CasePair::new("setter", "msg_setter"));
        }
        config.runner.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    fn apply_runner_option(
        &mut self,
        option: &str,
        value: Option<&str>,
        arg: &str,
    ) -> Result<(), String> {
        match option {
            "-samples" => {
                let raw = require(arg, value)?;
                self.runner.samples = raw
                    .parse()
                    .map_err(|_| format!("{arg}: expected a positive integer"))?;
            }
            "-iters" => {
                let raw = require(arg, value)?;
                self.runner.iterations = raw
                    .split(',')
                    .map(|part| part.trim().parse::<usize>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| format!("{arg}: expected comma-separated integers"))?;
            }
            "-suite" => self.runner.suite_filter = Some(require(arg, value)?.to_string()),
            "-filter" => self.runner.case_filter = Some(require(arg, value)?.to_string()),
            "-format" => {
                self.format = match require(arg, value)? {
                    "text" => OutputFormat::Text,
                    "json" => OutputFormat::Json,
                    other => return Err(format!("unknown report format {other}")),
                };
            }
            "-help" => self.show_help = true,
            _ => return Err(format!("unknown flag {arg}")),
        }
        Ok(())
    }

    pub fn help() -> &'static str {
        "Usage: dispatchbench [OPTIONS]\n\
         \n\
         Runner options:\n\
         \x20 --pb-samples=N         samples per case and iteration count\n\
         \x20 --pb-iters=A,B,...     iteration counts to run\n\
         \x20 --pb-suite=NAME        run only this suite\n\
         \x20 --pb-filter=TEXT       run only cases whose name contains TEXT\n\
         \x20 --pb-format=text|json  report format\n\
         \x20 --pb-help              show this help\n\
         \n\
         Regression options:\n\
         \x20 --test-perf-regression compare results against stored baselines\n\
         \x20 --baseline-file=PATH   baseline records (JSON)\n\
         \x20 --tolerance=X          allowed relative slowdown (default 0.10)\n\
         \x20 --check=SUITE/CASE     pair to check, repeatable (default setter/msg_setter)\n"
    }
}

fn require<'a>(flag: &str, value: Option<&'a str>) -> Result<&'a str, String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("{flag} requires a value")),
    }
}
