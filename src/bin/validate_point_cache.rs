// SPDX-License-Identifier: AGPL-3.0-only

//! Point-source cache validation.
//!
//! Exercises the cache engine against the synthetic closed-form model:
//!   - exact-bin parity: cached result bit-identical to direct
//!     evaluation at the bin site
//!   - interpolation boundedness across a swept distance range
//!   - documented log-interpolation semantics (cached output is the
//!     blend of the bin curves, not the direct mid-distance value)
//!   - idempotence: repeat lookups never re-evaluate the model
//!   - concurrent first access: all threads converge on one result
//!   - fallback parity: finite ruptures bypass the cache exactly
//!   - parameterization guard: a drifted instance is rejected
//!
//! Flags: `--threads=N` (default 8), `--report-dir=PATH`
//! (default `validation_results`).

use faultspring::calc::RuptureExceedProbCalculator;
use faultspring::curve::DiscretizedCurve;
use faultspring::geo::{self, Location};
use faultspring::gmm::synthetic::{SyntheticAttenuation, MAX_DIST_PARAM};
use faultspring::gmm::{GroundMotionModel, ParamValue};
use faultspring::interp::DistanceInterpolator;
use faultspring::report::CacheReport;
use faultspring::rupture::{FiniteSurface, PointSurface, Rupture, RuptureSurface};
use faultspring::tolerances;
use faultspring::validation::ValidationHarness;
use rayon::prelude::*;
use std::sync::Arc;

fn flag_value(name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    std::env::args()
        .find(|a| a.starts_with(&prefix))
        .map(|a| a[prefix.len()..].to_string())
}

const SOURCE: Location = Location::new(34.0, -118.0);

fn point_rupture(mag: f64) -> Rupture {
    Rupture {
        mag,
        rake: 0.0,
        hypocenter: None,
        surface: RuptureSurface::Point(PointSurface::plain(SOURCE, 5.0, 12.0, 90.0)),
    }
}

fn iml_curve() -> DiscretizedCurve {
    DiscretizedCurve::log_spaced(0.001, 2.0, 20)
}

/// Site `dist` km due north of the source (keeps the azimuth exact).
fn site_at(dist: f64) -> Location {
    geo::location_at(SOURCE, 0.0, dist)
}

fn main() {
    let threads: usize = flag_value("threads")
        .and_then(|s| s.parse().ok())
        .unwrap_or(8);
    let report_dir = flag_value("report-dir").unwrap_or_else(|| "validation_results".to_string());

    let mut h = ValidationHarness::new("validate_point_cache");
    let interp = Arc::new(DistanceInterpolator::default());
    let calc = RuptureExceedProbCalculator::new(interp.clone());
    let rup = point_rupture(6.5);

    // ── exact-bin parity ─────────────────────────────────────────
    // query from a site whose distance lands exactly on a bin; the
    // cached output must bit-match direct evaluation at that bin site
    {
        let bin = 40;
        let bin_site = site_at(interp.distance(bin));
        let mut gmm = SyntheticAttenuation::new();
        gmm.set_site_location(bin_site);
        let mut out = iml_curve();
        calc.exceed_probabilities(&mut gmm, &rup, &mut out)
            .expect("cache path");

        let mut direct_gmm = SyntheticAttenuation::new();
        let az = geo::azimuth_rad(SOURCE, bin_site);
        direct_gmm.set_site_location(geo::location_at(SOURCE, az, interp.distance(bin)));
        direct_gmm.set_rupture(&rup).expect("set rupture");
        let mut expected = iml_curve();
        direct_gmm
            .exceed_probabilities(&mut expected)
            .expect("direct eval");

        let mut all_bits = true;
        for k in 0..out.len() {
            all_bits &= out.y(k).to_bits() == expected.y(k).to_bits();
        }
        h.check_that("exact-bin parity is bitwise", all_bits);
        h.check_bits("exact-bin parity at first IML", out.y(0), expected.y(0));
    }

    // ── interpolation boundedness, swept in parallel ─────────────
    {
        let violations: usize = (0..500usize)
            .into_par_iter()
            .map(|i| {
                let dist = 1.0 + (i as f64) * 0.37; // off-bin sweep to ~186 km
                let mut gmm = SyntheticAttenuation::new();
                let site = site_at(dist);
                gmm.set_site_location(site);
                let mut out = iml_curve();
                calc.exceed_probabilities(&mut gmm, &rup, &mut out)
                    .expect("sweep eval");

                // bracket with the distance the calculator itself measured
                let qi = interp.quick(geo::horz_distance_fast(SOURCE, site), true);
                if qi.is_discrete() {
                    return 0;
                }
                // bin curves via direct evaluation at the bin sites
                let mut count = 0usize;
                for k in 0..out.len() {
                    let (p1, p2) = direct_pair(&rup, site, qi.index1(), qi.index2(), &interp, k);
                    let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
                    let y = out.y(k);
                    if y < lo - tolerances::INTERP_BOUNDS_EPS
                        || y > hi + tolerances::INTERP_BOUNDS_EPS
                    {
                        count += 1;
                    }
                }
                count
            })
            .sum();
        h.check_abs("interpolated values within bin bounds", violations as f64, 0.0, 0.5);
    }

    // ── documented log-interpolation semantics ───────────────────
    {
        let dist = (interp.distance(40) * interp.distance(41)).sqrt();
        let site = site_at(dist);
        let mut gmm = SyntheticAttenuation::new();
        gmm.set_site_location(site);
        let mut out = iml_curve();
        calc.exceed_probabilities(&mut gmm, &rup, &mut out)
            .expect("mid-bin eval");

        // replicate the calculator's bracketing from the measured distance
        let qi = interp.quick(geo::horz_distance_fast(SOURCE, site), true);
        let k = 0;
        let (p1, p2) = direct_pair(&rup, site, qi.index1(), qi.index2(), &interp, k);
        let blended = qi.interpolate(p1, p2);
        h.check_bits("mid-bin output is the blend of bin curves", out.y(k), blended);

        let p_direct =
            SyntheticAttenuation::direct_exceed_prob(rup.mag, dist, 200.0, out.x(k));
        h.check_that(
            "blend differs from direct mid-distance value",
            (out.y(k) - p_direct).abs() > 0.0,
        );
    }

    // ── idempotence ──────────────────────────────────────────────
    {
        let mut gmm = SyntheticAttenuation::new();
        gmm.set_site_location(site_at(43.7));
        let mut out = iml_curve();
        calc.exceed_probabilities(&mut gmm, &rup, &mut out)
            .expect("fill");
        let evals = gmm.eval_count();
        for _ in 0..100 {
            calc.exceed_probabilities(&mut gmm, &rup, &mut out)
                .expect("reuse");
        }
        h.check_abs(
            "100 repeat lookups add zero evaluations",
            (gmm.eval_count() - evals) as f64,
            0.0,
            0.5,
        );
    }

    // ── concurrent first access ──────────────────────────────────
    {
        let shared = RuptureExceedProbCalculator::new(interp.clone());
        let fresh_rup = point_rupture(7.1);
        let site = site_at(58.9);
        let outputs: Vec<Vec<u64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let shared = &shared;
                    let fresh_rup = &fresh_rup;
                    scope.spawn(move || {
                        let mut gmm = SyntheticAttenuation::new();
                        gmm.set_site_location(site);
                        let mut out = iml_curve();
                        shared
                            .exceed_probabilities(&mut gmm, fresh_rup, &mut out)
                            .expect("threaded eval");
                        out.ys().iter().map(|y| y.to_bits()).collect()
                    })
                })
                .collect();
            handles.into_iter().map(|t| t.join().expect("join")).collect()
        });
        let converged = outputs.windows(2).all(|w| w[0] == w[1]);
        h.check_that("all threads observe identical curves", converged);
        h.check_abs(
            "one rupture entry after concurrent access",
            shared.cache_stats().unique_ruptures as f64,
            1.0,
            0.5,
        );
    }

    // ── fallback parity ──────────────────────────────────────────
    {
        let finite = Rupture {
            mag: 7.2,
            rake: 0.0,
            hypocenter: None,
            surface: RuptureSurface::Finite(FiniteSurface {
                center: SOURCE,
                z_top: 0.0,
                z_bot: 15.0,
                dip: 90.0,
                length: 90.0,
                width: 15.0,
            }),
        };
        let mut gmm = SyntheticAttenuation::new();
        gmm.set_site_location(site_at(30.0));
        let mut out = iml_curve();
        calc.exceed_probabilities(&mut gmm, &finite, &mut out)
            .expect("finite path");

        let mut direct_gmm = SyntheticAttenuation::new();
        direct_gmm.set_site_location(site_at(30.0));
        direct_gmm.set_rupture(&finite).expect("set rupture");
        let mut expected = iml_curve();
        direct_gmm
            .exceed_probabilities(&mut expected)
            .expect("direct");
        h.check_bits("finite-surface fallback is exact", out.y(3), expected.y(3));
    }

    // ── parameterization guard ───────────────────────────────────
    {
        let mut drifted = SyntheticAttenuation::new();
        drifted.set_other_param(MAX_DIST_PARAM, ParamValue::f64(300.0));
        drifted.set_site_location(site_at(25.0));
        let mut out = iml_curve();
        let err = calc.exceed_probabilities(&mut drifted, &rup, &mut out);
        h.check_that("drifted parameterization is rejected", err.is_err());
    }

    let (instances, identities) = calc.registry_counts();
    let report = CacheReport::new(
        "validate_point_cache",
        instances,
        identities,
        calc.cache_stats(),
        h.passed_count(),
        h.total_count(),
    );
    report.print_summary();
    match report.save_json(&report_dir) {
        Ok(path) => println!("report: {path}"),
        Err(e) => eprintln!("  WARNING: could not write report: {e}"),
    }

    h.finish();
}

/// Direct evaluations at the two bin sites bracketing `site`'s azimuth.
fn direct_pair(
    rup: &Rupture,
    site: Location,
    bin1: usize,
    bin2: usize,
    interp: &DistanceInterpolator,
    k: usize,
) -> (f64, f64) {
    let az = geo::azimuth_rad(SOURCE, site);
    let eval = |bin: usize| {
        let mut gmm = SyntheticAttenuation::new();
        gmm.set_site_location(geo::location_at(SOURCE, az, interp.distance(bin)));
        gmm.set_rupture(rup).expect("set rupture");
        let mut curve = iml_curve();
        gmm.exceed_probabilities(&mut curve).expect("bin eval");
        curve.y(k)
    };
    (eval(bin1), eval(bin2))
}
