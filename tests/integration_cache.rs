// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: cache identity, consistency guards, and
//! concurrent behavior through the public calculator API.

use faultspring::calc::RuptureExceedProbCalculator;
use faultspring::curve::DiscretizedCurve;
use faultspring::error::HazardError;
use faultspring::geo::{self, Location};
use faultspring::gmm::synthetic::{SyntheticAttenuation, MAX_DIST_PARAM, VS30_PARAM};
use faultspring::gmm::{GroundMotionModel, ParamValue};
use faultspring::interp::DistanceInterpolator;
use faultspring::rupture::{PointSurface, Rupture, RuptureSurface};
use std::sync::Arc;

const SOURCE: Location = Location::new(34.0, -118.0);

fn point_rupture(mag: f64, z_top: f64) -> Rupture {
    Rupture {
        mag,
        rake: 0.0,
        hypocenter: None,
        surface: RuptureSurface::Point(PointSurface::plain(SOURCE, z_top, 12.0, 90.0)),
    }
}

fn site_at(dist: f64) -> Location {
    geo::location_at(SOURCE, 0.0, dist)
}

fn iml_curve() -> DiscretizedCurve {
    DiscretizedCurve::log_spaced(0.001, 2.0, 20)
}

#[test]
fn equivalent_ruptures_share_one_cache_slot() {
    let calc = RuptureExceedProbCalculator::with_default_bins();
    let mut gmm = SyntheticAttenuation::new();
    gmm.set_site_location(site_at(42.0));

    let mut out = iml_curve();
    calc.exceed_probabilities(&mut gmm, &point_rupture(6.0, 5.0), &mut out)
        .expect("first");
    let evals = gmm.eval_count();

    // a fresh but field-identical rupture object must hit the same slot
    calc.exceed_probabilities(&mut gmm, &point_rupture(6.0, 5.0), &mut out)
        .expect("equivalent");
    assert_eq!(gmm.eval_count(), evals, "identical rupture re-evaluated");
    assert_eq!(calc.cache_stats().unique_ruptures, 1);

    // changing one keyed field must claim a distinct slot
    calc.exceed_probabilities(&mut gmm, &point_rupture(6.0, 6.0), &mut out)
        .expect("different zTOR");
    assert!(gmm.eval_count() > evals, "distinct rupture not evaluated");
    assert_eq!(calc.cache_stats().unique_ruptures, 2);
}

#[test]
fn second_instance_with_matching_params_shares_the_cache() {
    let calc = RuptureExceedProbCalculator::with_default_bins();
    let rup = point_rupture(6.5, 5.0);

    let mut worker_a = SyntheticAttenuation::new();
    worker_a.set_site_location(site_at(42.0));
    let mut out_a = iml_curve();
    calc.exceed_probabilities(&mut worker_a, &rup, &mut out_a)
        .expect("worker a");

    let mut worker_b = SyntheticAttenuation::new();
    worker_b.set_site_location(site_at(42.0));
    let mut out_b = iml_curve();
    calc.exceed_probabilities(&mut worker_b, &rup, &mut out_b)
        .expect("worker b");

    assert_eq!(
        worker_b.eval_count(),
        0,
        "second instance must reuse curves the first one filled"
    );
    assert_eq!(out_a.ys(), out_b.ys());
}

#[test]
fn mismatched_instance_is_rejected_with_the_parameter_name() {
    let calc = RuptureExceedProbCalculator::with_default_bins();
    let rup = point_rupture(6.5, 5.0);

    let mut reference = SyntheticAttenuation::new();
    reference.set_site_location(site_at(30.0));
    let mut out = iml_curve();
    calc.exceed_probabilities(&mut reference, &rup, &mut out)
        .expect("reference");

    let mut rogue = SyntheticAttenuation::new();
    rogue.set_site_param(VS30_PARAM, ParamValue::f64(360.0));
    rogue.set_site_location(site_at(30.0));
    let err = calc
        .exceed_probabilities(&mut rogue, &rup, &mut out)
        .expect_err("incompatible parameterization must fail");
    match err {
        HazardError::ParameterMismatch { param, expected, found, .. } => {
            assert_eq!(param, VS30_PARAM);
            assert_eq!(expected, "760");
            assert_eq!(found, "360");
        }
        other => panic!("expected ParameterMismatch, got {other}"),
    }
}

#[test]
fn post_registration_drift_is_caught_on_next_lookup() {
    let calc = RuptureExceedProbCalculator::with_default_bins();
    let rup = point_rupture(6.5, 5.0);

    let mut anchor = SyntheticAttenuation::new();
    anchor.set_site_location(site_at(30.0));
    let mut out = iml_curve();
    calc.exceed_probabilities(&mut anchor, &rup, &mut out)
        .expect("anchor registers the reference");

    let mut drifter = SyntheticAttenuation::new();
    drifter.set_site_location(site_at(30.0));
    calc.exceed_probabilities(&mut drifter, &rup, &mut out)
        .expect("drifter matches at registration");

    // mutate after registration: the generation counter forces a
    // revalidation on the next lookup, which must fail
    drifter.set_other_param(MAX_DIST_PARAM, ParamValue::f64(500.0));
    assert!(calc
        .exceed_probabilities(&mut drifter, &rup, &mut out)
        .is_err());

    // touching a parameter back to the reference value revalidates
    // silently
    drifter.set_other_param(MAX_DIST_PARAM, ParamValue::f64(200.0));
    calc.exceed_probabilities(&mut drifter, &rup, &mut out)
        .expect("restored value passes revalidation");
}

#[test]
fn concurrent_workers_converge_on_identical_curves() {
    let interp = Arc::new(DistanceInterpolator::default());
    let calc = RuptureExceedProbCalculator::new(interp);
    let rup = point_rupture(7.0, 4.0);
    let site = site_at(63.1);

    let outputs: Vec<(Vec<u64>, u64)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let calc = &calc;
                let rup = &rup;
                scope.spawn(move || {
                    let mut gmm = SyntheticAttenuation::new();
                    gmm.set_site_location(site);
                    let mut out = iml_curve();
                    for _ in 0..5 {
                        calc.exceed_probabilities(&mut gmm, rup, &mut out)
                            .expect("threaded lookup");
                    }
                    (
                        out.ys().iter().map(|y| y.to_bits()).collect(),
                        gmm.eval_count(),
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("join")).collect()
    });

    // every thread sees bit-identical results
    for w in outputs.windows(2) {
        assert_eq!(w[0].0, w[1].0, "threads observed divergent curves");
    }
    // exactly one rupture entry, both bracketing bins filled once
    let stats = calc.cache_stats();
    assert_eq!(stats.unique_ruptures, 1);
    assert_eq!(stats.filled_bins, 2);
    // racing threads may each compute a losing duplicate, but never
    // more than one per bin per thread, and the winners bound it below
    let total_evals: u64 = outputs.iter().map(|(_, e)| e).sum();
    assert!(total_evals >= 2, "at least the two winning fills evaluated");
    assert!(total_evals <= 24, "more duplicates than racers can produce");
}

#[test]
fn cache_stats_report_registry_and_occupancy() {
    let calc = RuptureExceedProbCalculator::with_default_bins();
    let mut gmm = SyntheticAttenuation::new();
    gmm.set_site_location(site_at(20.0));
    let mut out = iml_curve();
    calc.exceed_probabilities(&mut gmm, &point_rupture(5.5, 5.0), &mut out)
        .expect("lookup");

    let (instances, identities) = calc.registry_counts();
    assert_eq!(instances, 1);
    assert_eq!(identities, 1);
    let stats = calc.cache_stats();
    assert_eq!(stats.logical_models, 1);
    assert_eq!(stats.unique_imts, 1);
    assert!(stats.filled_bins >= 1);
    assert_eq!(stats.total_bins, 81);
}
