// SPDX-License-Identifier: AGPL-3.0-only

//! Analytical distance-correction validation.
//!
//! Checks the closed-form rJB against its geometric limits:
//!   - site over the rupture projection → rJB = 0
//!   - zero-length rupture → rJB = epicentral distance
//!   - strike pointed at the site → rJB = rEpi − length/2
//!   - strike perpendicular → rJB ≈ rEpi
//!   - corrected rJB is monotone non-decreasing in rEpi (swept)
//!   - fractiles are ordered and bracket the mean

use faultspring::geo::Location;
use faultspring::ptsrc::{calc_rjb, AnalyticalCorrection, DistanceCorrection};
use faultspring::rupture::PointSurface;
use faultspring::tolerances;
use faultspring::validation::ValidationHarness;
use rayon::prelude::*;
use std::f64::consts::FRAC_PI_2;

fn surface(length: f64, width: f64, dip: f64) -> PointSurface {
    let mut s = PointSurface::plain(Location::new(35.0, -120.0), 2.0, 14.0, dip);
    s.length = length;
    s.width = width;
    s
}

fn main() {
    let mut h = ValidationHarness::new("validate_distance_correction");

    // closed-form limits
    h.check_abs(
        "site over centered rupture",
        calc_rjb(0.0, 10.0, 5.0, FRAC_PI_2, 0.5, 0.5, 0.0),
        0.0,
        tolerances::RJB_LIMIT_ABS,
    );
    h.check_abs(
        "strike toward site shortens by half-length",
        calc_rjb(50.0, 20.0, 0.0, FRAC_PI_2, 0.5, 0.5, 0.0),
        40.0,
        tolerances::RJB_LIMIT_ABS,
    );
    h.check_abs(
        "perpendicular strike keeps distance",
        calc_rjb(50.0, 20.0, 0.0, FRAC_PI_2, 0.5, 0.5, FRAC_PI_2),
        50.0,
        tolerances::RJB_LIMIT_ABS,
    );

    // zero-length surface passes through uncorrected
    let corr = AnalyticalCorrection::mean(false, false);
    let d = corr.corrected_distances(6.0, &surface(0.0, 0.0, 90.0), 37.5);
    h.check_abs("zero-length rJB equals rEpi", d.r_jb, 37.5, tolerances::RJB_LIMIT_ABS);
    h.check_abs(
        "zero-length rRup is the slant distance",
        d.r_rup,
        (37.5f64 * 37.5 + 2.0 * 2.0).sqrt(),
        1e-12,
    );

    // monotonicity in rEpi, swept in parallel
    {
        let surf = surface(30.0, 12.0, 60.0);
        let corr = AnalyticalCorrection::mean(true, true);
        let rjbs: Vec<f64> = (1..200usize)
            .into_par_iter()
            .map(|i| corr.corrected_distances(7.0, &surf, i as f64).r_jb)
            .collect();
        let non_monotone = rjbs.windows(2).filter(|w| w[1] < w[0] - 1e-9).count();
        h.check_abs("mean rJB monotone in rEpi", non_monotone as f64, 0.0, 0.5);
        h.check_that("mean rJB stays below rEpi for extended rupture",
            rjbs.iter().enumerate().all(|(i, &r)| r <= (i + 1) as f64 + 1e-9));
    }

    // fractile ordering around the mean
    {
        let surf = surface(40.0, 15.0, 45.0);
        let p10 = AnalyticalCorrection::fractile(0.1, true, true)
            .corrected_distances(7.5, &surf, 80.0)
            .r_jb;
        let p50 = AnalyticalCorrection::fractile(0.5, true, true)
            .corrected_distances(7.5, &surf, 80.0)
            .r_jb;
        let p90 = AnalyticalCorrection::fractile(0.9, true, true)
            .corrected_distances(7.5, &surf, 80.0)
            .r_jb;
        let mean = AnalyticalCorrection::mean(true, true)
            .corrected_distances(7.5, &surf, 80.0)
            .r_jb;
        h.check_that("p10 <= p50 <= p90", p10 <= p50 && p50 <= p90);
        h.check_that("mean within fractile envelope", mean >= p10 && mean <= p90);
    }

    // evenly weighted fractile branches are normalized
    {
        let branches = AnalyticalCorrection::evenly_weighted_fractiles(5, true, false);
        let sum: f64 = branches.iter().map(|wv| wv.weight).sum();
        h.check_abs("branch weights sum to one", sum, 1.0, 1e-12);
    }

    h.finish();
}
