// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed log-spaced distance bins and quick bin lookup.
//!
//! The cache stores one result per distance bin; a query distance maps
//! to either a single bin (exact match or out-of-range clamp) or two
//! bracketing bins plus an interpolation fraction. The bin count is
//! fixed for the interpolator's lifetime, so every cache array sized
//! against [`DistanceInterpolator::size`] can be indexed without bounds
//! checks after construction.
//!
//! Queries below the smallest bin or above the largest clamp to the
//! edge bin rather than extrapolating — ground motion beyond the table
//! is either saturated (near-field) or negligible (far-field), and
//! unbounded extrapolation of cached curves is never safe.

use crate::tolerances;
use std::sync::LazyLock;

/// Smallest default bin distance (km). Below this, point-source
/// distance metrics are dominated by depth, not horizontal offset.
pub const DEFAULT_MIN_DIST: f64 = 0.1;

/// Largest default bin distance (km). Hazard contributions beyond
/// 1000 km are negligible for every tabulated ground-motion model.
pub const DEFAULT_MAX_DIST: f64 = 1000.0;

/// Default log10 spacing between bins. 0.05 decades ≈ 12% distance
/// steps: fine enough that log-linear interpolation of exceedance
/// probabilities stays within GMM epistemic uncertainty.
pub const DEFAULT_LOG10_STEP: f64 = 0.05;

static SHARED: LazyLock<DistanceInterpolator> = LazyLock::new(DistanceInterpolator::default);

/// Immutable table of log10-spaced distance bins.
#[derive(Debug, Clone)]
pub struct DistanceInterpolator {
    distances: Box<[f64]>,
    log_distances: Box<[f64]>,
}

impl Default for DistanceInterpolator {
    fn default() -> Self {
        let num = ((DEFAULT_MAX_DIST.log10() - DEFAULT_MIN_DIST.log10()) / DEFAULT_LOG10_STEP)
            .round() as usize
            + 1;
        Self::new(DEFAULT_MIN_DIST, DEFAULT_MAX_DIST, num)
    }
}

impl DistanceInterpolator {
    /// Build `num` log10-spaced bins from `min_dist` to `max_dist`
    /// inclusive.
    #[must_use]
    pub fn new(min_dist: f64, max_dist: f64, num: usize) -> Self {
        assert!(num >= 2, "need at least two distance bins");
        assert!(min_dist > 0.0 && max_dist > min_dist);
        let log_min = min_dist.log10();
        let step = (max_dist.log10() - log_min) / (num - 1) as f64;
        let log_distances: Box<[f64]> =
            (0..num).map(|i| log_min + step * i as f64).collect();
        let distances: Box<[f64]> = log_distances.iter().map(|&l| 10f64.powf(l)).collect();
        Self {
            distances,
            log_distances,
        }
    }

    /// Process-wide shared default table (lazily built once).
    #[must_use]
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// Fixed bin count.
    #[must_use]
    pub fn size(&self) -> usize {
        self.distances.len()
    }

    /// Distance (km) of bin `i`.
    #[must_use]
    pub fn distance(&self, i: usize) -> f64 {
        self.distances[i]
    }

    /// Map a query distance to a bin lookup.
    ///
    /// `log_domain` selects whether the continuous-case interpolation
    /// fraction lives in log10-distance space (the right choice for
    /// exceedance probabilities, which are near-linear in log distance)
    /// or in linear distance.
    #[must_use]
    pub fn quick(&self, distance: f64, log_domain: bool) -> QuickInterpolator {
        let n = self.size();
        if distance <= self.distances[0] {
            return QuickInterpolator::discrete(0, self.distances[0]);
        }
        if distance >= self.distances[n - 1] {
            return QuickInterpolator::discrete(n - 1, self.distances[n - 1]);
        }
        let log_d = distance.log10();
        // first index with log_distances[i] >= log_d
        let upper = self.log_distances.partition_point(|&l| l < log_d);
        if upper == 0 {
            // log10 rounding collapsed the query onto the first bin
            return QuickInterpolator::discrete(0, self.distances[0]);
        }
        let lower = upper - 1;
        if (log_d - self.log_distances[lower]).abs() < tolerances::BIN_MATCH_LOG10 {
            return QuickInterpolator::discrete(lower, self.distances[lower]);
        }
        if (self.log_distances[upper] - log_d).abs() < tolerances::BIN_MATCH_LOG10 {
            return QuickInterpolator::discrete(upper, self.distances[upper]);
        }
        let frac = if log_domain {
            (log_d - self.log_distances[lower])
                / (self.log_distances[upper] - self.log_distances[lower])
        } else {
            (distance - self.distances[lower]) / (self.distances[upper] - self.distances[lower])
        };
        QuickInterpolator {
            index1: lower,
            index2: upper,
            distance1: self.distances[lower],
            distance2: self.distances[upper],
            frac,
            discrete: false,
        }
    }
}

/// Result of a bin lookup: one exact bin, or two bracketing bins with
/// an interpolation fraction.
#[derive(Debug, Clone, Copy)]
pub struct QuickInterpolator {
    index1: usize,
    index2: usize,
    distance1: f64,
    distance2: f64,
    frac: f64,
    discrete: bool,
}

impl QuickInterpolator {
    fn discrete(index: usize, distance: f64) -> Self {
        Self {
            index1: index,
            index2: index,
            distance1: distance,
            distance2: distance,
            frac: 0.0,
            discrete: true,
        }
    }

    /// True when the query landed on (or clamped to) a single bin.
    #[must_use]
    pub fn is_discrete(&self) -> bool {
        self.discrete
    }

    /// Lower (or only) bin index.
    #[must_use]
    pub fn index1(&self) -> usize {
        self.index1
    }

    /// Upper bin index; equals [`Self::index1`] for a discrete lookup.
    #[must_use]
    pub fn index2(&self) -> usize {
        self.index2
    }

    /// Distance of the lower bin.
    #[must_use]
    pub fn distance1(&self) -> f64 {
        self.distance1
    }

    /// Distance of the upper bin.
    #[must_use]
    pub fn distance2(&self) -> f64 {
        self.distance2
    }

    /// Linearly interpolate between values at the two bins. For a
    /// discrete lookup this returns `v1` unchanged.
    #[must_use]
    pub fn interpolate(&self, v1: f64, v2: f64) -> f64 {
        if self.discrete {
            v1
        } else {
            v1 + self.frac * (v2 - v1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_spans_four_decades() {
        let interp = DistanceInterpolator::shared();
        assert_eq!(interp.size(), 81);
        assert!((interp.distance(0) - 0.1).abs() < 1e-12);
        assert!((interp.distance(80) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn bins_are_strictly_increasing() {
        let interp = DistanceInterpolator::new(0.5, 500.0, 40);
        for i in 1..interp.size() {
            assert!(interp.distance(i) > interp.distance(i - 1));
        }
    }

    #[test]
    fn exact_bin_distance_is_discrete() {
        let interp = DistanceInterpolator::shared();
        for i in [0, 1, 17, 80] {
            let qi = interp.quick(interp.distance(i), true);
            assert!(qi.is_discrete(), "bin {i} should be an exact match");
            assert_eq!(qi.index1(), i);
            assert_eq!(qi.index2(), i);
        }
    }

    #[test]
    fn between_bins_brackets_correctly() {
        let interp = DistanceInterpolator::shared();
        let d = (interp.distance(10) * interp.distance(11)).sqrt(); // log midpoint
        let qi = interp.quick(d, true);
        assert!(!qi.is_discrete());
        assert_eq!(qi.index1(), 10);
        assert_eq!(qi.index2(), 11);
        // log midpoint interpolates halfway
        let mid = qi.interpolate(4.0, 8.0);
        assert!((mid - 6.0).abs() < 1e-9, "log-midpoint lerp gave {mid}");
    }

    #[test]
    fn below_range_clamps_to_first_bin() {
        let interp = DistanceInterpolator::shared();
        let qi = interp.quick(0.01, true);
        assert!(qi.is_discrete());
        assert_eq!(qi.index1(), 0);
    }

    #[test]
    fn above_range_clamps_to_last_bin() {
        let interp = DistanceInterpolator::shared();
        let qi = interp.quick(5000.0, true);
        assert!(qi.is_discrete());
        assert_eq!(qi.index1(), interp.size() - 1);
    }

    #[test]
    fn linear_domain_fraction_differs_from_log() {
        let interp = DistanceInterpolator::shared();
        let d = interp.distance(40) * 1.06; // inside the bin, off-center
        let log_qi = interp.quick(d, true);
        let lin_qi = interp.quick(d, false);
        let vl = log_qi.interpolate(0.0, 1.0);
        let vn = lin_qi.interpolate(0.0, 1.0);
        assert!((vl - vn).abs() > 1e-6, "log {vl} vs linear {vn}");
    }

    #[test]
    fn interpolated_value_is_bounded() {
        let interp = DistanceInterpolator::shared();
        let d = 37.3;
        let qi = interp.quick(d, true);
        let v = qi.interpolate(0.2, 0.7);
        assert!((0.2..=0.7).contains(&v));
    }
}
