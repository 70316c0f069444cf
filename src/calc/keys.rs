// SPDX-License-Identifier: AGPL-3.0-only

//! Value-equality cache keys.
//!
//! These identify "the same logical configuration" across distinct
//! object instances: two worker threads holding separate model objects
//! map to one `UniqueGmm` (parameter agreement is proven separately by
//! the registry), and two ruptures with identical cache-relevant fields
//! map to one `UniquePointRupture`. All floating-point comparison is
//! bit-exact — epsilon-tolerant keys would let almost-equal
//! configurations silently share curves.

use crate::error::{HazardError, Result};
use crate::gmm::{GroundMotionModel, Imt, PERIOD_PARAM};
use crate::rupture::{CorrectionMode, Rupture, RuptureSurface, TectonicRegionType};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

fn finish_hash(h: DefaultHasher) -> u64 {
    h.finish()
}

/// Logical identity of a ground-motion model: implementation kind +
/// display name, optionally + intensity-measure name (the spectra
/// variant). Parameter values are deliberately not part of this key;
/// they are checked against the registry's reference parameterization
/// each time a new instance or a mutated instance is encountered.
#[derive(Debug, Clone)]
pub struct UniqueGmm {
    kind: &'static str,
    name: String,
    imt_name: Option<String>,
    hash: u64,
}

impl UniqueGmm {
    /// Identity without the intensity measure (hazard-curve use: the
    /// IMT is a separate cache axis).
    #[must_use]
    pub fn of(gmm: &dyn GroundMotionModel) -> Self {
        Self::build(gmm, false)
    }

    /// Identity including the intensity-measure name (spectra use).
    #[must_use]
    pub fn of_with_imt(gmm: &dyn GroundMotionModel) -> Self {
        Self::build(gmm, true)
    }

    fn build(gmm: &dyn GroundMotionModel, with_imt: bool) -> Self {
        let kind = gmm.model_kind();
        let name = gmm.name().to_string();
        let imt_name = with_imt.then(|| gmm.intensity_measure().name.clone());
        let mut h = DefaultHasher::new();
        kind.hash(&mut h);
        name.hash(&mut h);
        imt_name.hash(&mut h);
        Self {
            kind,
            name,
            imt_name,
            hash: finish_hash(h),
        }
    }
}

impl PartialEq for UniqueGmm {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.kind == other.kind
            && self.name == other.name
            && self.imt_name == other.imt_name
    }
}

impl Eq for UniqueGmm {}

impl Hash for UniqueGmm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for UniqueGmm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.imt_name {
            Some(imt) => write!(f, "{} '{}' [{}]", self.kind, self.name, imt),
            None => write!(f, "{} '{}'", self.kind, self.name),
        }
    }
}

/// Identity of the current intensity-measure configuration: IMT name
/// plus a canonical string of its independent parameters. The spectral
/// period can be excluded (spectra calculations vary it rapidly and
/// key it out-of-band).
#[derive(Debug, Clone)]
pub struct UniqueImt {
    imt_name: String,
    imt_params: Option<String>,
    hash: u64,
}

impl UniqueImt {
    /// Key the current IMT, tracking the period parameter when
    /// `track_period` (regular hazard curves: yes).
    #[must_use]
    pub fn new(imt: &Imt, track_period: bool) -> Self {
        let params = Self::canonical_params(imt, track_period, None);
        Self::build(imt.name.clone(), params)
    }

    /// Key for a spectrum lookup: period excluded, the query IML folded
    /// in so spectra at different IMLs occupy distinct cache rows.
    #[must_use]
    pub fn for_spectrum(imt: &Imt, iml: f64) -> Self {
        let params = Self::canonical_params(imt, false, Some(iml));
        Self::build(imt.name.clone(), params)
    }

    fn canonical_params(imt: &Imt, track_period: bool, iml: Option<f64>) -> Option<String> {
        let mut s: Option<String> = None;
        let mut push = |name: &str, value: String| {
            let buf = s.get_or_insert_with(String::new);
            if !buf.is_empty() {
                buf.push_str("; ");
            }
            buf.push_str(name);
            buf.push('=');
            buf.push_str(&value);
        };
        for p in imt.params.iter() {
            if !track_period && p.name == PERIOD_PARAM {
                continue;
            }
            push(&p.name, p.value.to_string());
        }
        if let Some(iml) = iml {
            push("IML", iml.to_string());
        }
        s
    }

    fn build(imt_name: String, imt_params: Option<String>) -> Self {
        let mut h = DefaultHasher::new();
        imt_name.hash(&mut h);
        imt_params.hash(&mut h);
        Self {
            imt_name,
            imt_params,
            hash: finish_hash(h),
        }
    }
}

impl PartialEq for UniqueImt {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.imt_name == other.imt_name
            && self.imt_params == other.imt_params
    }
}

impl Eq for UniqueImt {}

impl Hash for UniqueImt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for UniqueImt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.imt_params {
            Some(p) => write!(f, "{} ({p})", self.imt_name),
            None => write!(f, "{}", self.imt_name),
        }
    }
}

/// The rupture fields that determine point-source exceedance
/// probability, and nothing else.
///
/// Any new field that affects exceedance probabilities for a point
/// surface must be added here (and to the equality/hash below) —
/// omitting one means ruptures that produce different curves would
/// share a cache slot, which is a correctness bug, not a performance
/// bug.
#[derive(Debug, Clone)]
pub struct UniquePointRupture {
    mag: f64,
    rake: f64,
    z_tor: f64,
    length: f64,
    width: f64,
    dip: f64,
    z_hyp: f64,
    /// Attached site-independent correction, keyed by identity, with
    /// its tectonic regime. `None` for a plain point surface.
    corr: Option<(usize, TectonicRegionType)>,
    hash: u64,
}

impl UniquePointRupture {
    /// Build the key for a cacheable point rupture.
    ///
    /// # Errors
    ///
    /// [`HazardError::NotAPointSurface`] when the rupture's surface is
    /// finite, or is a point surface whose correction mode is not
    /// cacheable (site-specific or weighted branches) — those must
    /// take the direct path and never be keyed.
    pub fn new(rup: &Rupture) -> Result<Self> {
        let surf = match &rup.surface {
            RuptureSurface::Point(s) => s,
            RuptureSurface::Finite(_) => {
                return Err(HazardError::NotAPointSurface(rup.surface.describe()))
            }
        };
        let corr = match &surf.correction {
            CorrectionMode::None => None,
            CorrectionMode::Attached { correction, trt } => {
                Some((Arc::as_ptr(correction) as *const () as usize, *trt))
            }
            CorrectionMode::SiteSpecific(_) | CorrectionMode::WeightedBranches(_) => {
                return Err(HazardError::NotAPointSurface(format!(
                    "{} carries a non-cacheable distance correction",
                    rup.surface.describe()
                )))
            }
        };
        let (mag, rake) = (rup.mag, rup.rake);
        let (z_tor, length, width, dip) =
            (surf.z_top, surf.length, surf.width, surf.dip);
        let z_hyp = rup.hypocentral_depth();
        let mut h = DefaultHasher::new();
        for v in [mag, rake, z_tor, length, width, dip, z_hyp] {
            h.write_u64(v.to_bits());
        }
        corr.hash(&mut h);
        Ok(Self {
            mag,
            rake,
            z_tor,
            length,
            width,
            dip,
            z_hyp,
            corr,
            hash: finish_hash(h),
        })
    }
}

impl PartialEq for UniquePointRupture {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.corr == other.corr
            && self.mag.to_bits() == other.mag.to_bits()
            && self.rake.to_bits() == other.rake.to_bits()
            && self.z_tor.to_bits() == other.z_tor.to_bits()
            && self.length.to_bits() == other.length.to_bits()
            && self.width.to_bits() == other.width.to_bits()
            && self.dip.to_bits() == other.dip.to_bits()
            && self.z_hyp.to_bits() == other.z_hyp.to_bits()
    }
}

impl Eq for UniquePointRupture {}

impl Hash for UniquePointRupture {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
