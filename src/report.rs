// SPDX-License-Identifier: AGPL-3.0-only

//! JSON reports for validation runs.

use crate::calc::CacheStats;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Machine-readable record of a validation run: cache occupancy,
/// registry counts, and the check tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheReport {
    /// Unix timestamp (seconds) of report creation.
    pub generated_unix_s: u64,
    /// Name of the validation binary that produced this.
    pub source: String,
    /// Model instances the registry tracks.
    pub instances_tracked: usize,
    /// Distinct logical model identities.
    pub logical_identities: usize,
    pub cache: CacheStats,
    pub checks_passed: usize,
    pub checks_total: usize,
}

impl CacheReport {
    #[must_use]
    pub fn new(
        source: &str,
        instances_tracked: usize,
        logical_identities: usize,
        cache: CacheStats,
        checks_passed: usize,
        checks_total: usize,
    ) -> Self {
        let generated_unix_s = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            generated_unix_s,
            source: source.to_string(),
            instances_tracked,
            logical_identities,
            cache,
            checks_passed,
            checks_total,
        }
    }

    /// Write pretty JSON under `dir`; returns the path written.
    ///
    /// # Errors
    ///
    /// Directory creation, serialization, or write failure.
    pub fn save_json(&self, dir: &str) -> std::io::Result<String> {
        std::fs::create_dir_all(dir)?;
        let path = format!("{dir}/{}_{}.json", self.source, self.generated_unix_s);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// One-line occupancy summary for stdout.
    pub fn print_summary(&self) {
        println!(
            "cache: {} model(s), {} IMT row(s), {} rupture(s), {}/{} bins filled; \
             registry: {} instance(s), {} identit(ies)",
            self.cache.logical_models,
            self.cache.unique_imts,
            self.cache.unique_ruptures,
            self.cache.filled_bins,
            self.cache.total_bins,
            self.instances_tracked,
            self.logical_identities,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> CacheStats {
        CacheStats {
            logical_models: 1,
            unique_imts: 2,
            unique_ruptures: 5,
            filled_bins: 12,
            total_bins: 400,
        }
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = CacheReport::new("validate_point_cache", 3, 1, stats(), 10, 10);
        let json = serde_json::to_string(&report).unwrap();
        let back: CacheReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.instances_tracked, 3);
        assert_eq!(back.cache.unique_ruptures, 5);
        assert_eq!(back.checks_passed, 10);
    }

    #[test]
    fn timestamp_is_set() {
        let report = CacheReport::new("x", 0, 0, stats(), 0, 0);
        assert!(report.generated_unix_s > 0);
    }
}
