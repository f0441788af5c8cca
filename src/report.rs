//! Aggregated runner output.
//!
//! Statistics are computed per (suite, case, iteration count) over the
//! time-per-iteration of each sample. Ordering always follows registration
//! order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    BenchError,
    runner::{CaseFailure, CaseRun, Measurement, Phase, RawRun, SuiteRun},
};

const RULE: &str =
    "===============================================================================";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    pub iterations: usize,
    pub samples: usize,
    pub median_ns: f64,
    pub min_ns: f64,
    pub mean_ns: f64,
    pub ops_per_sec: Option<f64>,
    /// Median relative to the suite baseline's median at the same iteration count.
    pub baseline_ratio: Option<f64>,
}

impl IterationStats {
    fn from_samples(iterations: usize, mut per_iter: Vec<f64>) -> Self {
        per_iter.sort_by(f64::total_cmp);
        let samples = per_iter.len();
        let median_ns = median(&per_iter);
        let min_ns = per_iter.first().copied().unwrap_or(0.0);
        let mean_ns = if samples == 0 {
            0.0
        } else {
            per_iter.iter().sum::<f64>() / samples as f64
        };
        let ops_per_sec = (median_ns > 0.0).then(|| 1e9 / median_ns);
        Self {
            iterations,
            samples,
            median_ns,
            min_ns,
            mean_ns,
            ops_per_sec,
            baseline_ratio: None,
        }
    }

    /// Median wall time of one sample at this iteration count.
    pub fn sample_ms(&self) -> f64 {
        self.median_ns * self.iterations as f64 / 1e6
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub is_baseline: bool,
    pub measurements: Vec<Measurement>,
    pub stats: Vec<IterationStats>,
    pub failures: Vec<CaseFailure>,
    pub teardown_errors: u32,
}

impl CaseReport {
    fn from_run(run: CaseRun, is_baseline: bool) -> Self {
        let mut groups: Vec<(usize, Vec<f64>)> = Vec::new();
        for m in &run.measurements {
            match groups.iter_mut().find(|(iters, _)| *iters == m.iterations) {
                Some((_, values)) => values.push(m.ns_per_iter()),
                None => groups.push((m.iterations, vec![m.ns_per_iter()])),
            }
        }
        let stats = groups
            .into_iter()
            .map(|(iters, values)| IterationStats::from_samples(iters, values))
            .collect();
        Self {
            name: run.case,
            is_baseline,
            measurements: run.measurements,
            stats,
            failures: run.failures,
            teardown_errors: run.teardown_errors,
        }
    }

    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn stats_for(&self, iterations: usize) -> Option<&IterationStats> {
        self.stats.iter().find(|s| s.iterations == iterations)
    }

    /// Median ns/iteration at the largest iteration count measured.
    pub fn headline_ns(&self) -> Option<f64> {
        self.stats
            .iter()
            .max_by_key(|s| s.iterations)
            .map(|s| s.median_ns)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub name: String,
    pub baseline: Option<String>,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    fn from_run(run: SuiteRun) -> Self {
        let baseline = run.baseline;
        let mut cases: Vec<CaseReport> = run
            .cases
            .into_iter()
            .map(|case| {
                let is_baseline = baseline.as_deref() == Some(case.case.as_str());
                CaseReport::from_run(case, is_baseline)
            })
            .collect();
        let reference: Option<Vec<(usize, f64)>> = cases
            .iter()
            .find(|c| c.is_baseline)
            .map(|c| c.stats.iter().map(|s| (s.iterations, s.median_ns)).collect());
        if let Some(reference) = reference {
            for case in &mut cases {
                let is_baseline = case.is_baseline;
                for stat in &mut case.stats {
                    stat.baseline_ratio = if is_baseline {
                        Some(1.0)
                    } else {
                        reference
                            .iter()
                            .find(|(iters, _)| *iters == stat.iterations)
                            .filter(|(_, base)| *base > 0.0)
                            .map(|(_, base)| stat.median_ns / base)
                    };
                }
            }
        }
        Self {
            name: run.name,
            baseline,
            cases,
        }
    }

    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    suites: Vec<SuiteReport>,
}

impl Report {
    pub fn aggregate(raw: RawRun) -> Self {
        Self {
            suites: raw.suites.into_iter().map(SuiteReport::from_run).collect(),
        }
    }

    pub fn suites(&self) -> &[SuiteReport] {
        &self.suites
    }

    pub fn suite(&self, name: &str) -> Option<&SuiteReport> {
        self.suites.iter().find(|s| s.name == name)
    }

    pub fn case(&self, suite: &str, case: &str) -> Option<&CaseReport> {
        self.suite(suite).and_then(|s| s.case(case))
    }

    /// (suite, case) pairs in report order.
    pub fn keys(&self) -> Vec<(String, String)> {
        self.suites
            .iter()
            .flat_map(|s| s.cases.iter().map(|c| (s.name.clone(), c.name.clone())))
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.suites.iter().any(|s| s.cases.iter().any(|c| c.failed()))
    }

    /// Figure compared against regression baselines. Absent, failed or empty
    /// cases are lookup errors.
    pub fn current_ns_per_iter(&self, suite: &str, case: &str) -> Result<f64, BenchError> {
        let entry = self
            .case(suite, case)
            .ok_or_else(|| BenchError::lookup(format!("no measurement for {suite}/{case}")))?;
        if let Some(failure) = entry.failures.first() {
            return Err(BenchError::lookup(format!(
                "{suite}/{case} failed during the run: {}",
                failure.message
            )));
        }
        entry
            .headline_ns()
            .ok_or_else(|| BenchError::lookup(format!("{suite}/{case} produced no measurements")))
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> Result<String, BenchError> {
        serde_json::to_string_pretty(self).map_err(|e| BenchError::invalid_input(e.to_string()))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for suite in &self.suites {
            writeln!(f, "{RULE}")?;
            writeln!(f, "Suite: {}", suite.name)?;
            writeln!(f, "{RULE}")?;
            writeln!(
                f,
                "   {:<28}|{:>9} |{:>10} |{:>9} |{:>9} |{:>14}",
                "Name (* = baseline)", "Dim", "Total ms", "ns/op", "Baseline", "Ops/second"
            )?;
            writeln!(f, "{RULE}")?;
            for case in &suite.cases {
                write_case(f, case)?;
            }
            writeln!(f, "{RULE}")?;
        }
        Ok(())
    }
}

fn write_case(f: &mut fmt::Formatter<'_>, case: &CaseReport) -> fmt::Result {
    let label = if case.is_baseline {
        format!("{} *", case.name)
    } else {
        case.name.clone()
    };
    for stat in &case.stats {
        let ratio = stat
            .baseline_ratio
            .map(|r| format!("{r:.3}"))
            .unwrap_or_else(|| "-".to_string());
        let ops = stat
            .ops_per_sec
            .map(|o| format!("{o:.1}"))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            f,
            "   {:<28}|{:>9} |{:>10.3} |{:>9.2} |{:>9} |{:>14}",
            label,
            stat.iterations,
            stat.sample_ms(),
            stat.median_ns,
            ratio,
            ops
        )?;
    }
    for failure in &case.failures {
        let phase = match failure.phase {
            Phase::Setup => "setup",
            Phase::Body => "body",
        };
        writeln!(
            f,
            "   {:<28}| FAILED in {phase} at {} iterations, sample {}: {}",
            label, failure.iterations, failure.sample, failure.message
        )?;
    }
    if case.stats.is_empty() && case.failures.is_empty() {
        writeln!(f, "   {label:<28}| no measurements")?;
    }
    Ok(())
}

fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}
