// SPDX-License-Identifier: AGPL-3.0-only

//! Closed-form synthetic attenuation model.
//!
//! Not a real ground-motion model: a deterministic analytic stand-in
//! used by the validation binaries and tests, with an evaluation
//! counter so cache idempotence is observable. The exceedance form is
//!
//!   P(IML ≥ x | d) = clamp(1 − d / dMax, 0, 1) · exp(−x · 6 / M)
//!
//! which is monotone decreasing in distance and IML and linear in
//! distance — exactly the shape that makes log-distance interpolation
//! error visible and bounded.

use super::{GroundMotionModel, Imt, InstanceId, ParamList, ParamValue};
use crate::curve::DiscretizedCurve;
use crate::error::{HazardError, Result};
use crate::geo::{self, Location};
use crate::ptsrc::SurfaceDistances;
use crate::rupture::{Rupture, RuptureSurface};
use std::sync::atomic::{AtomicU64, Ordering};

/// Display name shared by every instance (they are logically one model).
pub const SYNTHETIC_NAME: &str = "Synthetic Attenuation";

/// Name of the cutoff-distance parameter.
pub const MAX_DIST_PARAM: &str = "Max Distance";

/// Name of the site stiffness parameter.
pub const VS30_PARAM: &str = "Vs30";

#[derive(Debug, Clone)]
struct RuptureState {
    mag: f64,
    source: Location,
    /// Explicit distance metrics installed per correction branch;
    /// cleared by a plain `set_rupture`.
    override_dists: Option<SurfaceDistances>,
}

/// Deterministic analytic model with an evaluation counter.
#[derive(Debug)]
pub struct SyntheticAttenuation {
    id: InstanceId,
    imt: Imt,
    site: Location,
    other_params: ParamList,
    site_params: ParamList,
    state: Option<RuptureState>,
    eval_count: AtomicU64,
}

impl SyntheticAttenuation {
    /// New instance with default parameterization (dMax = 200 km,
    /// Vs30 = 760 m/s).
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: InstanceId::mint(),
            imt: Imt::pga(),
            site: Location::new(0.0, 0.0),
            other_params: ParamList::new().with(MAX_DIST_PARAM, ParamValue::f64(200.0)),
            site_params: ParamList::new().with(VS30_PARAM, ParamValue::f64(760.0)),
            state: None,
            eval_count: AtomicU64::new(0),
        }
    }

    /// Number of underlying model evaluations performed so far. The
    /// cache's job is to keep this from growing.
    #[must_use]
    pub fn eval_count(&self) -> u64 {
        self.eval_count.load(Ordering::Relaxed)
    }

    /// Mutate a configuration parameter (bumps the generation).
    pub fn set_other_param(&mut self, name: &str, value: ParamValue) {
        self.other_params.set(name, value);
    }

    /// Mutate a site parameter (bumps the generation).
    pub fn set_site_param(&mut self, name: &str, value: ParamValue) {
        self.site_params.set(name, value);
    }

    fn max_dist(&self) -> f64 {
        self.other_params
            .get(MAX_DIST_PARAM)
            .and_then(ParamValue::as_f64)
            .unwrap_or(200.0)
    }

    fn current_distance(&self, state: &RuptureState) -> f64 {
        state.override_dists.map_or_else(
            || geo::horz_distance_fast(state.source, self.site),
            |d| d.r_jb,
        )
    }

    /// The closed form evaluated directly — what the cache's output is
    /// validated against.
    #[must_use]
    pub fn direct_exceed_prob(mag: f64, dist: f64, max_dist: f64, iml: f64) -> f64 {
        (1.0 - dist / max_dist).clamp(0.0, 1.0) * (-iml * 6.0 / mag).exp()
    }

    fn state(&self) -> Result<&RuptureState> {
        self.state
            .as_ref()
            .ok_or_else(|| HazardError::ModelFailure("no rupture set".into()))
    }
}

impl Default for SyntheticAttenuation {
    fn default() -> Self {
        Self::new()
    }
}

impl GroundMotionModel for SyntheticAttenuation {
    fn model_kind(&self) -> &'static str {
        "SyntheticAttenuation"
    }

    fn name(&self) -> &str {
        SYNTHETIC_NAME
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn intensity_measure(&self) -> &Imt {
        &self.imt
    }

    fn set_intensity_measure(&mut self, imt: Imt) {
        self.imt = imt;
    }

    fn site_location(&self) -> Location {
        self.site
    }

    fn set_site_location(&mut self, loc: Location) {
        self.site = loc;
    }

    fn set_rupture(&mut self, rup: &Rupture) -> Result<()> {
        let source = match &rup.surface {
            RuptureSurface::Point(s) => s.location,
            RuptureSurface::Finite(s) => s.center,
        };
        self.state = Some(RuptureState {
            mag: rup.mag,
            source,
            override_dists: None,
        });
        Ok(())
    }

    fn set_rupture_with_distances(
        &mut self,
        rup: &Rupture,
        dists: &SurfaceDistances,
    ) -> Result<()> {
        self.set_rupture(rup)?;
        if let Some(state) = self.state.as_mut() {
            state.override_dists = Some(*dists);
        }
        Ok(())
    }

    fn exceed_probabilities(&mut self, curve: &mut DiscretizedCurve) -> Result<()> {
        let state = self.state()?.clone();
        self.eval_count.fetch_add(1, Ordering::Relaxed);
        let dist = self.current_distance(&state);
        let max_dist = self.max_dist();
        for i in 0..curve.len() {
            let p = Self::direct_exceed_prob(state.mag, dist, max_dist, curve.x(i));
            curve.set_y(i, p);
        }
        Ok(())
    }

    fn exceed_prob_spectrum(&mut self, iml: f64, spectrum: &mut DiscretizedCurve) -> Result<()> {
        let state = self.state()?.clone();
        self.eval_count.fetch_add(1, Ordering::Relaxed);
        let dist = self.current_distance(&state);
        let max_dist = self.max_dist();
        for i in 0..spectrum.len() {
            let period = spectrum.x(i);
            // longer periods attenuate the spectral ordinate harder
            let p = Self::direct_exceed_prob(state.mag, dist, max_dist, iml * (1.0 + period));
            spectrum.set_y(i, p);
        }
        Ok(())
    }

    fn other_params(&self) -> &ParamList {
        &self.other_params
    }

    fn site_params(&self) -> &ParamList {
        &self.site_params
    }
}
