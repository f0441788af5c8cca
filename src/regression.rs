//! Regression checks of report figures against stored baselines.
//!
//! A pair passes when `current <= baseline * (1 + tolerance)`. Improvements
//! always pass. A pair without a current measurement or without a baseline is
//! a lookup error, never a pass.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{BenchError, baseline::BaselineStore, report::Report};

pub const DEFAULT_TOLERANCE: f64 = 0.10;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CasePair {
    pub suite: String,
    pub case: String,
}

impl CasePair {
    pub fn new(suite: &str, case: &str) -> Self {
        Self {
            suite: suite.to_string(),
            case: case.to_string(),
        }
    }

    /// Parses `suite/case`.
    pub fn parse(text: &str) -> Result<Self, BenchError> {
        match text.split_once('/') {
            Some((suite, case)) if !suite.is_empty() && !case.is_empty() => {
                Ok(Self::new(suite, case))
            }
            _ => Err(BenchError::invalid_input(format!(
                "expected SUITE/CASE, got {text:?}"
            ))),
        }
    }
}

impl fmt::Display for CasePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.suite, self.case)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub pair: CasePair,
    pub passed: bool,
    pub current_ns: f64,
    pub baseline_ns: f64,
    pub allowed_ns: f64,
    pub tolerance: f64,
    pub message: String,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Clone, Debug)]
pub struct RegressionTester<S> {
    store: S,
    tolerance: f64,
}

impl<S: BaselineStore> RegressionTester<S> {
    pub fn new(store: S, tolerance: f64) -> Result<Self, BenchError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(BenchError::invalid_input(format!(
                "tolerance must be a non-negative number, got {tolerance}"
            )));
        }
        Ok(Self { store, tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn check(&self, report: &Report, suite: &str, case: &str) -> Result<Verdict, BenchError> {
        let current_ns = report.current_ns_per_iter(suite, case)?;
        let baseline_ns = self.store.lookup(suite, case)?.ns_per_iter;
        let allowed_ns = baseline_ns * (1.0 + self.tolerance);
        let passed = within_allowed(current_ns, allowed_ns);
        let pair = CasePair::new(suite, case);
        let message = if passed {
            format!(
                "{pair}: ok, {current_ns:.2} ns/iter within {allowed_ns:.2} ns/iter \
                 (baseline {baseline_ns:.2} ns/iter, tolerance {:.1}%)",
                self.tolerance * 100.0
            )
        } else {
            format!(
                "{pair}: regression, {current_ns:.2} ns/iter exceeds {allowed_ns:.2} ns/iter \
                 (baseline {baseline_ns:.2} ns/iter, tolerance {:.1}%)",
                self.tolerance * 100.0
            )
        };
        if passed {
            info!(%pair, current_ns, baseline_ns, "regression check passed");
        } else {
            warn!(%pair, current_ns, baseline_ns, allowed_ns, "regression check failed");
        }
        Ok(Verdict {
            pair,
            passed,
            current_ns,
            baseline_ns,
            allowed_ns,
            tolerance: self.tolerance,
            message,
        })
    }

    /// Verdicts in request order. The first lookup error aborts the batch.
    pub fn check_each(&self, report: &Report, pairs: &[CasePair]) -> Result<Vec<Verdict>, BenchError> {
        pairs
            .iter()
            .map(|pair| self.check(report, &pair.suite, &pair.case))
            .collect()
    }

    pub fn check_all(&self, report: &Report, pairs: &[CasePair]) -> Result<bool, BenchError> {
        Ok(self
            .check_each(report, pairs)?
            .iter()
            .all(|verdict| verdict.passed))
    }
}

/// Inclusive comparison that absorbs the rounding of `baseline * (1 + tolerance)`,
/// e.g. `100.0 * 1.15 == 114.99999999999999`.
fn within_allowed(current_ns: f64, allowed_ns: f64) -> bool {
    const RELATIVE_SLACK: f64 = 1e-9;
    current_ns <= allowed_ns + allowed_ns.abs() * RELATIVE_SLACK
}
