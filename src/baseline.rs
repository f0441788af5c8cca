use std::{
    env, fs,
    path::{Path, PathBuf},
};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BenchError;

pub const BASELINE_FILE_ENV: &str = "DISPATCHBENCH_BASELINE_FILE";
pub const DEFAULT_BASELINE_FILE: &str = "perf_baseline.json";

/// Resolves the baseline file: explicit path, then
/// `DISPATCHBENCH_BASELINE_FILE`, then `perf_baseline.json`.
pub fn baseline_file(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var(BASELINE_FILE_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_BASELINE_FILE)
}

/// Historical time-per-iteration for one (suite, case) pair.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BaselineRecord {
    pub suite: String,
    pub case: String,
    pub ns_per_iter: f64,
}

impl BaselineRecord {
    pub fn new(suite: &str, case: &str, ns_per_iter: f64) -> Self {
        Self {
            suite: suite.to_string(),
            case: case.to_string(),
            ns_per_iter,
        }
    }
}

/// Read-only lookup of baseline records.
pub trait BaselineStore {
    fn lookup(&self, suite: &str, case: &str) -> Result<&BaselineRecord, BenchError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryBaselines {
    records: AHashMap<(String, String), BaselineRecord>,
}

impl MemoryBaselines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Result<Self, BenchError>
    where
        I: IntoIterator<Item = BaselineRecord>,
    {
        let mut store = Self::new();
        for record in records {
            if !record.ns_per_iter.is_finite() || record.ns_per_iter < 0.0 {
                return Err(BenchError::invalid_input(format!(
                    "baseline {}/{} has invalid value {}",
                    record.suite, record.case, record.ns_per_iter
                )));
            }
            let key = (record.suite.clone(), record.case.clone());
            if store.records.contains_key(&key) {
                return Err(BenchError::invalid_input(format!(
                    "duplicate baseline {}/{}",
                    record.suite, record.case
                )));
            }
            store.records.insert(key, record);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl BaselineStore for MemoryBaselines {
    fn lookup(&self, suite: &str, case: &str) -> Result<&BaselineRecord, BenchError> {
        self.records
            .get(&(suite.to_string(), case.to_string()))
            .ok_or_else(|| BenchError::lookup(format!("no baseline for {suite}/{case}")))
    }
}

/// Baseline records loaded once from a JSON array on disk.
#[derive(Clone, Debug)]
pub struct JsonBaselineStore {
    path: PathBuf,
    records: MemoryBaselines,
}

impl JsonBaselineStore {
    pub fn open(path: &Path) -> Result<Self, BenchError> {
        let data = fs::read(path).map_err(|e| {
            BenchError::io(format!("cannot read baseline file {}: {e}", path.display()))
        })?;
        let records: Vec<BaselineRecord> = serde_json::from_slice(&data).map_err(|e| {
            BenchError::invalid_input(format!("malformed baseline file {}: {e}", path.display()))
        })?;
        let records = MemoryBaselines::from_records(records)?;
        debug!(path = %path.display(), records = records.len(), "loaded baselines");
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BaselineStore for JsonBaselineStore {
    fn lookup(&self, suite: &str, case: &str) -> Result<&BaselineRecord, BenchError> {
        self.records.lookup(suite, case)
    }
}
