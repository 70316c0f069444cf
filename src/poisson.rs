// SPDX-License-Identifier: AGPL-3.0-only

//! Poisson rate ↔ probability conversions for hazard combination.
//!
//! The aggregation loop that consumes this crate combines per-rupture
//! exceedance probabilities under the Poisson assumption. Both
//! directions go through log-space (`ln_1p` / `exp_m1`) for stability
//! near small probabilities, and the forward direction rejects
//! probabilities so close to 1 that the implied event count is
//! effectively infinite rather than returning a silently wrong rate.

use crate::error::{HazardError, Result};
use crate::tolerances;

/// Convert an occurrence probability over `duration_years` to an
/// annualized Poisson rate: rate = -ln(1-p) / duration.
///
/// # Errors
///
/// [`HazardError::NearCertainProbability`] when ln(1-p) falls below
/// [`tolerances::POISSON_LN_GUARD`]: past that point 1-exp(-n) rounds
/// to exactly 1.0 in f64, so every IML would be "exceeded" and the
/// rate is numerically infinite.
pub fn prob_to_rate(prob: f64, duration_years: f64) -> Result<f64> {
    debug_assert!(duration_years > 0.0);
    let ln_q = (-prob).ln_1p(); // ln(1 - p), stable for small p
    if ln_q < tolerances::POISSON_LN_GUARD {
        return Err(HazardError::NearCertainProbability { prob });
    }
    Ok(-ln_q / duration_years)
}

/// Convert an annualized Poisson rate to an occurrence probability over
/// `duration_years`: p = 1 - exp(-rate * duration).
#[must_use]
pub fn rate_to_prob(rate: f64, duration_years: f64) -> f64 {
    -(-rate * duration_years).exp_m1()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tolerances::ROUND_TRIP;

    #[test]
    fn round_trip_across_probability_range() {
        for &p in &[1e-12, 1e-6, 0.01, 0.5, 0.9, 0.99] {
            let rate = prob_to_rate(p, 50.0).unwrap();
            let back = rate_to_prob(rate, 50.0);
            assert!(
                (back - p).abs() < ROUND_TRIP,
                "round trip for p={p}: got {back}"
            );
        }
    }

    #[test]
    fn zero_probability_zero_rate() {
        assert_eq!(prob_to_rate(0.0, 1.0).unwrap(), 0.0);
        assert_eq!(rate_to_prob(0.0, 1.0), 0.0);
    }

    #[test]
    fn small_probability_stays_precise() {
        // Naive ln(1-p) loses all digits at p=1e-16; ln_1p keeps them.
        let p = 1e-16;
        let rate = prob_to_rate(p, 1.0).unwrap();
        assert!((rate - p).abs() / p < 1e-10, "rate {rate} for p {p}");
    }

    #[test]
    fn near_certain_probability_is_rejected() {
        // ln(1-p) < -30  ⇔  p > 1 - e^-30
        let p = 1.0 - (-31.0f64).exp();
        let err = prob_to_rate(p, 1.0).unwrap_err();
        assert!(matches!(err, HazardError::NearCertainProbability { .. }));
    }

    #[test]
    fn exactly_one_is_rejected() {
        assert!(prob_to_rate(1.0, 1.0).is_err());
    }

    #[test]
    fn just_inside_guard_is_accepted() {
        let p = 1.0 - (-29.0f64).exp();
        assert!(prob_to_rate(p, 1.0).is_ok());
    }
}
