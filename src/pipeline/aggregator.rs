use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Mutex;

/// SHA-256 digest of a file's full byte content, hex-encoded. Byte-identical
/// files always produce equal fingerprints, which is the whole basis of
/// duplicate grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for display, like an abbreviated commit hash.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of processing one file. Owned by the producing worker until it is
/// handed to the aggregator.
#[derive(Debug, Clone)]
pub struct FilterResult {
    pub display_path: String,
    pub index: usize,
    pub lines: Vec<String>,
    pub total_lines: usize,
    pub bytes: u64,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
struct AggregateState {
    results: Vec<FilterResult>,
    groups: BTreeMap<Fingerprint, BTreeSet<String>>,
    failures: Vec<FileFailure>,
}

/// Collects worker output under a single mutex. The lock is held only for
/// the insertion itself, never across file I/O.
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<AggregateState>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: FilterResult) {
        let mut state = self.state.lock().expect("aggregator lock poisoned");
        state
            .groups
            .entry(result.fingerprint.clone())
            .or_default()
            .insert(result.display_path.clone());
        state.results.push(result);
    }

    pub fn record_failure<S: Into<String>, M: Into<String>>(&self, path: S, message: M) {
        let mut state = self.state.lock().expect("aggregator lock poisoned");
        state.failures.push(FileFailure {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Finalizes the run. Results are re-ordered by task index so the
    /// aggregated output is independent of worker completion order.
    pub fn finish(&self) -> RunResults {
        let mut state = self.state.lock().expect("aggregator lock poisoned");
        let state = std::mem::take(&mut *state);

        let mut results = state.results;
        results.sort_by_key(|r| r.index);

        RunResults {
            results,
            groups: state.groups,
            failures: state.failures,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunResults {
    pub results: Vec<FilterResult>,
    pub groups: BTreeMap<Fingerprint, BTreeSet<String>>,
    pub failures: Vec<FileFailure>,
}

impl RunResults {
    /// Fingerprints shared by two or more files.
    pub fn duplicate_groups(
        &self,
    ) -> impl Iterator<Item = (&Fingerprint, &BTreeSet<String>)> + '_ {
        self.groups.iter().filter(|(_, paths)| paths.len() > 1)
    }

    pub fn duplicate_file_count(&self) -> usize {
        self.duplicate_groups().map(|(_, paths)| paths.len()).sum()
    }

    pub fn matched_line_count(&self) -> usize {
        self.results.iter().map(|r| r.lines.len()).sum()
    }

    pub fn total_line_count(&self) -> usize {
        self.results.iter().map(|r| r.total_lines).sum()
    }

    pub fn bytes_processed(&self) -> u64 {
        self.results.iter().map(|r| r.bytes).sum()
    }
}
