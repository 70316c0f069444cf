// SPDX-License-Identifier: AGPL-3.0-only

//! Point-source distance corrections.
//!
//! A point surface erases the finite extent of the real rupture; these
//! corrections put it back statistically. Given a magnitude, surface,
//! and epicentral distance, a correction produces the standard distance
//! metrics (rRup, rJB, rX) for an assumed finite rupture at that
//! offset. The analytical correction computes a closed-form rJB for a
//! rectangular fault, sampled over strike orientation and optionally
//! over along-strike / down-dip epicenter position, reduced to a mean
//! or a fractile.

use crate::rupture::PointSurface;
use std::fmt;
use std::sync::Arc;

use crate::weights::WeightedList;

/// Default number of strike-angle samples.
const NUM_ALPHA_SAMPLES: usize = 20;
/// Default number of along-strike epicenter samples.
const NUM_SAMPLES_ALONG: usize = 10;
/// Default number of down-dip epicenter samples.
const NUM_SAMPLES_DOWN_DIP: usize = 5;

/// The standard site-to-source distance metrics consumed by
/// ground-motion models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDistances {
    /// Closest distance to the rupture plane (km).
    pub r_rup: f64,
    /// Joyner-Boore distance: closest horizontal distance to the
    /// surface projection (km).
    pub r_jb: f64,
    /// Horizontal distance to the top edge, positive on the hanging
    /// wall (km).
    pub r_x: f64,
}

impl SurfaceDistances {
    /// Distances for a true (zero-extent) point at the given top depth
    /// and horizontal offset: rJB is the offset itself, rRup the slant
    /// distance, rX the footwall-signed offset.
    #[must_use]
    pub fn for_plain_point(z_top: f64, horz_dist: f64) -> Self {
        Self {
            r_rup: hypot2(horz_dist, z_top),
            r_jb: horz_dist,
            r_x: if horz_dist == 0.0 { 0.0 } else { -horz_dist },
        }
    }
}

/// `Math.hypot` without the under/overflow ceremony — distances here
/// are km-scale, nowhere near either extreme.
fn hypot2(a: f64, b: f64) -> f64 {
    (a * a + b * b).sqrt()
}

/// A point-source distance correction model.
///
/// Implementations must be pure functions of their inputs: the cache
/// keys corrected ruptures by correction identity, so a correction
/// whose output drifted over time would poison cached curves.
pub trait DistanceCorrection: Send + Sync + fmt::Debug {
    /// Corrected distance metrics for a rupture of magnitude `mag` on
    /// `surf`, seen from `horz_dist` km away.
    fn corrected_distances(&self, mag: f64, surf: &PointSurface, horz_dist: f64)
        -> SurfaceDistances;

    /// Short human-readable label for diagnostics.
    fn label(&self) -> String;
}

/// Closed-form Joyner-Boore distance for a rectangular fault.
///
/// The fault rectangle lies in local (strike, dip) coordinates with the
/// grid node at the origin; the site sits at `(r_epi, 0)` rotated by
/// the strike angle `alpha_rad`. `fract_das` / `fract_depth` place the
/// node fractionally along-strike / down-dip on the rupture (0.5 =
/// centered). Returns the horizontal distance from the site to the
/// rectangle's surface projection (0 when the site is over the
/// rupture).
#[must_use]
pub fn calc_rjb(
    r_epi: f64,
    rup_length: f64,
    rup_width: f64,
    dip_rad: f64,
    fract_das: f64,
    fract_depth: f64,
    alpha_rad: f64,
) -> f64 {
    // horizontal extent of the down-dip direction
    let w_horz = rup_width * dip_rad.cos();

    // fault rectangle: X along strike, Y down-dip in map view
    let x_min = -fract_das * rup_length;
    let x_max = x_min + rup_length;
    let y_min = -fract_depth * w_horz;
    let y_max = y_min + w_horz;

    // site's global (r_epi, 0) in local coordinates
    let cos_a = alpha_rad.cos();
    let sin_a = alpha_rad.sin();
    let x_loc = r_epi * cos_a;
    let y_loc = -r_epi * sin_a;

    // distance to the axis-aligned bounding box
    let dx = if x_loc < x_min {
        x_min - x_loc
    } else if x_loc > x_max {
        x_loc - x_max
    } else {
        0.0
    };
    let dy = if y_loc < y_min {
        y_min - y_loc
    } else if y_loc > y_max {
        y_loc - y_max
    } else {
        0.0
    };

    hypot2(dx, dy)
}

fn build_spaced_samples(min: f64, max: f64, num: usize) -> Vec<f64> {
    // interior samples only: (max-min)/(num+1) spacing, edges excluded
    let delta = (max - min) / (num as f64 + 1.0);
    (0..num).map(|i| min + (i as f64 + 1.0) * delta).collect()
}

const SINGLE_SAMPLE_0P5: [f64; 1] = [0.5];

/// Analytical rectangular-fault distance correction.
///
/// Samples the closed-form rJB over strike orientation (and optionally
/// the epicenter's along-strike / down-dip position) and reduces the
/// sample set to its mean or to one empirical fractile.
#[derive(Debug, Clone)]
pub struct AnalyticalCorrection {
    /// `None` means mean; otherwise the empirical fractile in (0, 1).
    fractile: Option<f64>,
    alpha_rad: Vec<f64>,
    along: Vec<f64>,
    down_dip: Vec<f64>,
}

impl AnalyticalCorrection {
    /// Mean-of-samples correction.
    #[must_use]
    pub fn mean(sample_along: bool, sample_down_dip: bool) -> Self {
        Self::build(None, sample_along, sample_down_dip)
    }

    /// Single-fractile correction; `fractile` must be in (0, 1).
    #[must_use]
    pub fn fractile(fractile: f64, sample_along: bool, sample_down_dip: bool) -> Self {
        assert!(
            fractile > 0.0 && fractile < 1.0,
            "fractile must be in (0,1), got {fractile}"
        );
        Self::build(Some(fractile), sample_along, sample_down_dip)
    }

    fn build(fractile: Option<f64>, sample_along: bool, sample_down_dip: bool) -> Self {
        // with neither epicenter axis sampled the geometry is symmetric
        // across both local axes, so one quadrant of strike angles
        // suffices
        let alpha_deg = if sample_along || sample_down_dip {
            build_spaced_samples(0.0, 360.0, NUM_ALPHA_SAMPLES)
        } else {
            build_spaced_samples(0.0, 90.0, NUM_ALPHA_SAMPLES)
        };
        let along = if sample_along {
            build_spaced_samples(0.0, 1.0, NUM_SAMPLES_ALONG)
        } else {
            SINGLE_SAMPLE_0P5.to_vec()
        };
        let down_dip = if sample_down_dip {
            build_spaced_samples(0.0, 1.0, NUM_SAMPLES_DOWN_DIP)
        } else {
            SINGLE_SAMPLE_0P5.to_vec()
        };
        Self {
            fractile,
            alpha_rad: alpha_deg.into_iter().map(f64::to_radians).collect(),
            along,
            down_dip,
        }
    }

    /// Evenly weighted fractile branch set: `num` corrections at the
    /// centers of `num` equal-probability bins.
    #[must_use]
    pub fn evenly_weighted_fractiles(
        num: usize,
        sample_along: bool,
        sample_down_dip: bool,
    ) -> WeightedList<Arc<dyn DistanceCorrection>> {
        assert!(num > 1, "need more than one fractile branch");
        let corrs: Vec<Arc<dyn DistanceCorrection>> = build_spaced_samples(0.0, 1.0, num)
            .into_iter()
            .map(|f| {
                Arc::new(Self::fractile(f, sample_along, sample_down_dip))
                    as Arc<dyn DistanceCorrection>
            })
            .collect();
        WeightedList::evenly_weighted(corrs)
    }

    fn reduce(&self, mut samples: Vec<f64>) -> f64 {
        match self.fractile {
            None => {
                let n = samples.len() as f64;
                samples.iter().sum::<f64>() / n
            }
            Some(f) => {
                samples.sort_by(f64::total_cmp);
                let pos = f * (samples.len() - 1) as f64;
                let i = pos.floor() as usize;
                let frac = pos - i as f64;
                if i + 1 < samples.len() {
                    samples[i] + frac * (samples[i + 1] - samples[i])
                } else {
                    samples[i]
                }
            }
        }
    }
}

impl DistanceCorrection for AnalyticalCorrection {
    fn corrected_distances(
        &self,
        _mag: f64,
        surf: &PointSurface,
        horz_dist: f64,
    ) -> SurfaceDistances {
        if surf.length == 0.0 || !surf.length.is_finite() {
            // no extent, nothing to correct
            return SurfaceDistances::for_plain_point(surf.z_top, horz_dist);
        }
        let dip_rad = surf.dip.to_radians();
        // negligible axes collapse to their centered single sample
        let along: &[f64] = if surf.length > 1.0 {
            &self.along
        } else {
            &SINGLE_SAMPLE_0P5
        };
        let down_dip: &[f64] = if surf.dip < 85.0 && surf.width > 1.0 {
            &self.down_dip
        } else {
            &SINGLE_SAMPLE_0P5
        };
        let mut samples = Vec::with_capacity(self.alpha_rad.len() * along.len() * down_dip.len());
        for &alpha in &self.alpha_rad {
            for &das in along {
                for &dd in down_dip {
                    samples.push(calc_rjb(
                        horz_dist,
                        surf.length,
                        surf.width,
                        dip_rad,
                        das,
                        dd,
                        alpha,
                    ));
                }
            }
        }
        let r_jb = self.reduce(samples);
        SurfaceDistances {
            r_rup: hypot2(r_jb, surf.z_top),
            r_jb,
            r_x: if r_jb == 0.0 { 0.0 } else { -r_jb },
        }
    }

    fn label(&self) -> String {
        match self.fractile {
            None => "Analytical (mean)".to_string(),
            Some(f) => format!("Analytical p{}", f * 100.0),
        }
    }
}
