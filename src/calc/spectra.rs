// SPDX-License-Identifier: AGPL-3.0-only

//! Cache-aware response-spectrum calculator.
//!
//! Same engine as the exceedance calculator, caching spectra (values at
//! the caller's fixed periods) instead of hazard-curve ordinates. The
//! spectral period is excluded from the IMT identity — it is the
//! curve's X axis — and the query IML is folded into it, so spectra at
//! different IMLs occupy distinct cache rows. The model identity
//! includes the IMT name, and the registry additionally tracks
//! IMT-dependent parameters (except the period).
//!
//! Optionally constructed over a fixed registered model set; an
//! instance outside that set fails hard, listing every known identity.

use crate::calc::cache::{BinArray, CacheStats, PointSourceDistanceCache};
use crate::calc::keys::{UniqueGmm, UniqueImt, UniquePointRupture};
use crate::calc::registry::GmmIdentityRegistry;
use crate::curve::DiscretizedCurve;
use crate::error::{HazardError, Result};
use crate::geo::{self, Location};
use crate::gmm::GroundMotionModel;
use crate::interp::DistanceInterpolator;
use crate::rupture::{CorrectionMode, Rupture, RuptureSurface};
use std::collections::HashSet;
use std::sync::Arc;

/// Point-source-optimized spectrum calculator.
pub struct RuptureSpectraCalculator {
    interp: Arc<DistanceInterpolator>,
    registry: GmmIdentityRegistry,
    cache: PointSourceDistanceCache<DiscretizedCurve>,
    /// When present, the only model identities this calculator accepts.
    registered: Option<HashSet<UniqueGmm>>,
}

impl RuptureSpectraCalculator {
    /// Open calculator: models register themselves on first encounter.
    #[must_use]
    pub fn new(interp: Arc<DistanceInterpolator>) -> Self {
        let bins = interp.size();
        Self {
            interp,
            registry: GmmIdentityRegistry::for_spectra(),
            cache: PointSourceDistanceCache::new(bins),
            registered: None,
        }
    }

    /// Calculator over the default bin table.
    #[must_use]
    pub fn with_default_bins() -> Self {
        Self::new(Arc::new(DistanceInterpolator::default()))
    }

    /// Calculator restricted to a fixed model set, registered up
    /// front. Any other model instance later fails with the full list
    /// of known identities.
    ///
    /// # Errors
    ///
    /// Parameterization mismatches among the supplied models.
    pub fn for_models(
        interp: Arc<DistanceInterpolator>,
        models: &[&dyn GroundMotionModel],
    ) -> Result<Self> {
        let calc = Self::new(interp);
        let mut registered = HashSet::with_capacity(models.len());
        for gmm in models {
            registered.insert(calc.registry.resolve(*gmm)?);
        }
        Ok(Self {
            registered: Some(registered),
            ..calc
        })
    }

    /// Fill `out` (X = periods) with P(SA(T) ≥ `iml`) for this rupture
    /// as seen by `gmm` from its current site.
    ///
    /// # Errors
    ///
    /// Unregistered models (fixed-set mode), parameterization and
    /// curve-sampling mismatches, and model evaluation failures.
    pub fn exceed_prob_spectrum(
        &self,
        gmm: &mut dyn GroundMotionModel,
        rup: &Rupture,
        iml: f64,
        out: &mut DiscretizedCurve,
    ) -> Result<()> {
        if let Some(registered) = &self.registered {
            // membership is checked on the side-effect-free identity so
            // an unknown model is rejected before it can register
            let key = self.registry.identity_of(gmm);
            if !registered.contains(&key) {
                return Err(HazardError::UnregisteredModel {
                    model: key.to_string(),
                    known: self.registry.known_identities(),
                });
            }
        }

        let surf = match &rup.surface {
            RuptureSurface::Finite(_) => return direct(gmm, rup, iml, out),
            RuptureSurface::Point(s) => s,
        };
        if matches!(
            surf.correction,
            CorrectionMode::SiteSpecific(_) | CorrectionMode::WeightedBranches(_)
        ) {
            return direct(gmm, rup, iml, out);
        }

        let gmm_key = self.registry.resolve(gmm)?;
        let imt_key = UniqueImt::for_spectrum(gmm.intensity_measure(), iml);
        let rup_key = UniquePointRupture::new(rup)?;

        let site = gmm.site_location();
        let dist = geo::horz_distance_fast(surf.location, site);
        let qi = self.interp.quick(dist, true);
        let bins = self.cache.cached(&gmm_key, &imt_key, &rup_key);

        let mut relocated = false;
        let lower = self.bin_spectrum(
            gmm,
            rup,
            surf.location,
            site,
            &bins,
            qi.index1(),
            iml,
            out,
            &mut relocated,
        )?;
        if qi.is_discrete() {
            out.copy_y_from(&lower);
        } else {
            let upper = self.bin_spectrum(
                gmm,
                rup,
                surf.location,
                site,
                &bins,
                qi.index2(),
                iml,
                out,
                &mut relocated,
            )?;
            for k in 0..out.len() {
                out.set_y(k, qi.interpolate(lower.y(k), upper.y(k)));
            }
        }
        if relocated {
            gmm.set_site_location(site);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn bin_spectrum(
        &self,
        gmm: &mut dyn GroundMotionModel,
        rup: &Rupture,
        source: Location,
        site: Location,
        bins: &BinArray<DiscretizedCurve>,
        bin: usize,
        iml: f64,
        out: &DiscretizedCurve,
        relocated: &mut bool,
    ) -> Result<Arc<DiscretizedCurve>> {
        if let Some(cached) = bins.get(bin) {
            cached.assert_same_x(out)?;
            return Ok(cached.clone());
        }
        let azimuth = geo::azimuth_rad(source, site);
        let bin_site = geo::location_at(source, azimuth, self.interp.distance(bin));
        gmm.set_rupture(rup)?;
        gmm.set_site_location(bin_site);
        *relocated = true;
        let mut fresh = DiscretizedCurve::like(out);
        gmm.exceed_prob_spectrum(iml, &mut fresh)?;
        let stored = bins.fill(bin, Arc::new(fresh));
        stored.assert_same_x(out)?;
        Ok(stored)
    }

    /// Cache occupancy counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn direct(
    gmm: &mut dyn GroundMotionModel,
    rup: &Rupture,
    iml: f64,
    out: &mut DiscretizedCurve,
) -> Result<()> {
    gmm.set_rupture(rup)?;
    gmm.exceed_prob_spectrum(iml, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmm::synthetic::SyntheticAttenuation;
    use crate::gmm::Imt;
    use crate::rupture::PointSurface;

    fn period_curve() -> DiscretizedCurve {
        DiscretizedCurve::new(vec![0.1, 0.2, 0.5, 1.0, 2.0, 4.0])
    }

    fn sa_model() -> SyntheticAttenuation {
        let mut gmm = SyntheticAttenuation::new();
        gmm.set_intensity_measure(Imt::sa(1.0));
        gmm.set_site_location(Location::new(34.4, -118.0));
        gmm
    }

    fn point_rupture(mag: f64) -> Rupture {
        Rupture {
            mag,
            rake: 0.0,
            hypocenter: None,
            surface: RuptureSurface::Point(PointSurface::plain(
                Location::new(34.0, -118.0),
                5.0,
                12.0,
                90.0,
            )),
        }
    }

    #[test]
    fn repeat_spectrum_lookup_is_cached() {
        let calc = RuptureSpectraCalculator::with_default_bins();
        let mut gmm = sa_model();
        let rup = point_rupture(6.5);
        let mut out = period_curve();
        calc.exceed_prob_spectrum(&mut gmm, &rup, 0.1, &mut out)
            .unwrap();
        let evals = gmm.eval_count();
        let mut out2 = period_curve();
        calc.exceed_prob_spectrum(&mut gmm, &rup, 0.1, &mut out2)
            .unwrap();
        assert_eq!(gmm.eval_count(), evals);
        assert_eq!(out.ys(), out2.ys());
    }

    #[test]
    fn different_imls_occupy_distinct_rows() {
        let calc = RuptureSpectraCalculator::with_default_bins();
        let mut gmm = sa_model();
        let rup = point_rupture(6.5);
        let mut a = period_curve();
        let mut b = period_curve();
        calc.exceed_prob_spectrum(&mut gmm, &rup, 0.1, &mut a).unwrap();
        calc.exceed_prob_spectrum(&mut gmm, &rup, 0.4, &mut b).unwrap();
        assert_eq!(calc.cache_stats().unique_imts, 2);
        assert!(a.y(0) > b.y(0), "higher IML must lower exceedance");
    }

    #[test]
    fn fixed_model_set_rejects_strangers() {
        let known = sa_model();
        let calc = RuptureSpectraCalculator::for_models(
            Arc::new(DistanceInterpolator::default()),
            &[&known],
        )
        .unwrap();

        // an equivalent instance of the same logical model is fine
        let mut twin = sa_model();
        let mut out = period_curve();
        calc.exceed_prob_spectrum(&mut twin, &point_rupture(6.0), 0.1, &mut out)
            .unwrap();

        // a model with a different IMT is a different identity
        let mut stranger = SyntheticAttenuation::new(); // PGA
        stranger.set_site_location(Location::new(34.4, -118.0));
        let err = calc
            .exceed_prob_spectrum(&mut stranger, &point_rupture(6.0), 0.1, &mut out)
            .unwrap_err();
        match err {
            HazardError::UnregisteredModel { known, .. } => {
                assert!(!known.is_empty());
                assert!(known.iter().any(|k| k.contains("SA")));
            }
            other => panic!("expected UnregisteredModel, got {other}"),
        }
    }

    #[test]
    fn spectrum_values_decrease_with_period() {
        // the synthetic model attenuates longer periods harder, so the
        // cached spectrum must be monotone decreasing in period
        let calc = RuptureSpectraCalculator::with_default_bins();
        let mut gmm = sa_model();
        let rup = point_rupture(7.0);
        let mut out = period_curve();
        calc.exceed_prob_spectrum(&mut gmm, &rup, 0.1, &mut out)
            .unwrap();
        for k in 1..out.len() {
            assert!(
                out.y(k) <= out.y(k - 1),
                "spectrum should decay with period: y[{k}]={} > y[{}]={}",
                out.y(k),
                k - 1,
                out.y(k - 1)
            );
        }
    }
}
