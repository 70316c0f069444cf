// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized tolerances and numerical guards.
//!
//! Every threshold used by the cache engine, the calculators, and the
//! validation binaries is defined here with its origin. No ad-hoc magic
//! numbers at call sites.

// ═══════════════════════════════════════════════════════════════════
// Cache consistency
// ═══════════════════════════════════════════════════════════════════

/// Curve X-axis comparison tolerance (absolute, on min/max x).
///
/// Two curves are "the same sampling" when their sizes match and their
/// first/last x values agree to 1e-10. IML grids are constructed once
/// and shared, so agreement is normally exact; the tolerance only
/// absorbs decimal-literal round-off in independently built grids.
pub const CURVE_X_MATCH: f64 = 1e-10;

/// Distance-to-bin exact-match tolerance (relative, in log10 space).
///
/// A queried distance within this fraction of a bin's log10 coordinate
/// is treated as landing exactly on the bin (discrete lookup, no
/// interpolation). Bin spacing is 0.05 log10 units, eleven orders of
/// magnitude above this threshold, so no real query is misclassified.
pub const BIN_MATCH_LOG10: f64 = 1e-12;

// ═══════════════════════════════════════════════════════════════════
// Weighted branch averaging
// ═══════════════════════════════════════════════════════════════════

/// Normalized weight-sum tolerance for weighted correction lists.
///
/// Branch weights must sum to 1 within 1e-3. Weights typically come
/// from fractile boundaries expressed as short decimals; the slack
/// covers their accumulated representation error without admitting a
/// genuinely unnormalized list.
pub const WEIGHT_SUM: f64 = 1e-3;

// ═══════════════════════════════════════════════════════════════════
// Poisson conversion guard
// ═══════════════════════════════════════════════════════════════════

/// Safety margin for ln(1-p) in probability → rate conversion.
///
/// Once the expected event count over a timespan exceeds ~37,
/// 1 - exp(-n) rounds to exactly 1.0 in f64 and the implied rate is
/// infinite. -30 keeps a safe margin below that precision cliff; a
/// probability whose ln(1-p) falls below it is rejected as an error
/// rather than silently clamped.
pub const POISSON_LN_GUARD: f64 = -30.0;

// ═══════════════════════════════════════════════════════════════════
// Validation thresholds (used by tests and validate_* binaries)
// ═══════════════════════════════════════════════════════════════════

/// Round-trip tolerance for pure-arithmetic inverses (rate↔probability,
/// azimuth projection). A handful of transcendental ops each at ~1 ulp.
pub const ROUND_TRIP: f64 = 1e-12;

/// Geodesy round-trip tolerance in km.
///
/// Projecting a site along a computed azimuth/distance and re-measuring
/// uses the fast flat-earth distance against a spherical projection;
/// for separations under ~300 km the disagreement stays below ~0.1%.
pub const GEO_ROUND_TRIP_REL: f64 = 1e-3;

/// Interpolation boundedness slack.
///
/// An interpolated exceedance probability must lie within the two bin
/// values; the slack covers one rounding step of the lerp itself.
pub const INTERP_BOUNDS_EPS: f64 = 1e-12;

/// Analytical rJB sanity tolerance (km) for closed-form limit checks
/// (zero-length rupture → rJB equals epicentral distance).
pub const RJB_LIMIT_ABS: f64 = 1e-9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_ordering() {
        assert!(BIN_MATCH_LOG10 < CURVE_X_MATCH);
        assert!(CURVE_X_MATCH < WEIGHT_SUM);
        assert!(ROUND_TRIP < GEO_ROUND_TRIP_REL);
    }

    #[test]
    fn guards_are_negative_or_positive_as_documented() {
        assert!(POISSON_LN_GUARD < 0.0);
        assert!(INTERP_BOUNDS_EPS > 0.0);
        assert!(RJB_LIMIT_ABS > 0.0);
    }

    #[test]
    fn poisson_guard_below_precision_cliff() {
        // 1 - exp(-37) == 1.0 in f64; the guard must trip well before.
        assert!(POISSON_LN_GUARD > -37.0);
    }
}
