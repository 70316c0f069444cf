// SPDX-License-Identifier: AGPL-3.0-only

//! Earthquake ruptures and the surface geometry the cache keys off.
//!
//! The cache only ever sees the geometry/physics fields that determine
//! exceedance probability for a point source; everything else about a
//! forecast rupture lives upstream. Finite surfaces are carried so the
//! calculators can recognize them and fall back to direct computation.

use crate::geo::Location;
use crate::ptsrc::DistanceCorrection;
use crate::weights::WeightedList;
use std::fmt;
use std::sync::Arc;

/// Categorical tectonic regime tag. Affects which model/parameters
/// apply when a distance correction is attached per-regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TectonicRegionType {
    ActiveShallow,
    StableShallow,
    SubductionInterface,
    SubductionSlab,
}

impl fmt::Display for TectonicRegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveShallow => write!(f, "Active Shallow Crust"),
            Self::StableShallow => write!(f, "Stable Shallow Crust"),
            Self::SubductionInterface => write!(f, "Subduction Interface"),
            Self::SubductionSlab => write!(f, "Subduction Slab"),
        }
    }
}

/// How a point surface's site-to-source distances are corrected for
/// the finite extent the point representation erases.
#[derive(Debug, Clone)]
pub enum CorrectionMode {
    /// No correction: true point source. Cacheable.
    None,
    /// A site-independent correction attached to the surface, tagged
    /// with its tectonic regime. Cacheable — both enter the cache key.
    Attached {
        correction: Arc<dyn DistanceCorrection>,
        trt: TectonicRegionType,
    },
    /// A correction already specialized to one site. Never cached: the
    /// corrected distances are not a function of distance alone.
    SiteSpecific(Arc<dyn DistanceCorrection>),
    /// Multiple weighted correction branches (epistemic alternatives).
    /// Never cached: exceedance probabilities are branch-averaged per
    /// call.
    WeightedBranches(WeightedList<Arc<dyn DistanceCorrection>>),
}

/// A rupture represented as a single location.
#[derive(Debug, Clone)]
pub struct PointSurface {
    pub location: Location,
    /// Top-of-rupture depth (km).
    pub z_top: f64,
    /// Bottom-of-rupture depth (km).
    pub z_bot: f64,
    /// Dip (degrees).
    pub dip: f64,
    /// Nominal rupture length (km); 0 for a true point.
    pub length: f64,
    /// Nominal down-dip width (km).
    pub width: f64,
    pub correction: CorrectionMode,
}

impl PointSurface {
    /// Plain uncorrected point surface.
    #[must_use]
    pub fn plain(location: Location, z_top: f64, z_bot: f64, dip: f64) -> Self {
        Self {
            location,
            z_top,
            z_bot,
            dip,
            length: 0.0,
            width: 0.0,
            correction: CorrectionMode::None,
        }
    }
}

/// An extended fault surface, reduced to the scalars the calculators
/// need to recognize and describe it. Exceedance for finite surfaces is
/// always computed directly, never cached.
#[derive(Debug, Clone)]
pub struct FiniteSurface {
    pub center: Location,
    pub z_top: f64,
    pub z_bot: f64,
    pub dip: f64,
    pub length: f64,
    pub width: f64,
}

/// Rupture surface: point or finite.
#[derive(Debug, Clone)]
pub enum RuptureSurface {
    Point(PointSurface),
    Finite(FiniteSurface),
}

impl RuptureSurface {
    #[must_use]
    pub fn z_top(&self) -> f64 {
        match self {
            Self::Point(s) => s.z_top,
            Self::Finite(s) => s.z_top,
        }
    }

    #[must_use]
    pub fn z_bot(&self) -> f64 {
        match self {
            Self::Point(s) => s.z_bot,
            Self::Finite(s) => s.z_bot,
        }
    }

    #[must_use]
    pub fn dip(&self) -> f64 {
        match self {
            Self::Point(s) => s.dip,
            Self::Finite(s) => s.dip,
        }
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        match self {
            Self::Point(s) => s.length,
            Self::Finite(s) => s.length,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        match self {
            Self::Point(s) => s.width,
            Self::Finite(s) => s.width,
        }
    }

    /// Short description for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Point(s) => format!(
                "point surface at ({}, {}), zTop={}",
                s.location.lat, s.location.lon, s.z_top
            ),
            Self::Finite(s) => format!(
                "finite surface ({} x {} km, dip {})",
                s.length, s.width, s.dip
            ),
        }
    }
}

/// An earthquake rupture: magnitude, rake, surface, and optional
/// hypocenter.
#[derive(Debug, Clone)]
pub struct Rupture {
    pub mag: f64,
    /// Average rake (degrees).
    pub rake: f64,
    pub hypocenter: Option<Location>,
    pub surface: RuptureSurface,
}

impl Rupture {
    /// Hypocentral depth: the hypocenter's depth when present, else the
    /// mid-depth of the rupture surface.
    #[must_use]
    pub fn hypocentral_depth(&self) -> f64 {
        self.hypocenter.map_or_else(
            || 0.5 * (self.surface.z_top() + self.surface.z_bot()),
            |h| h.depth,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn hypocentral_depth_defaults_to_mid_surface() {
        let rup = point_rupture(6.0);
        assert_eq!(rup.hypocentral_depth(), 8.5);
    }

    #[test]
    fn hypocentral_depth_uses_hypocenter_when_present() {
        let mut rup = point_rupture(6.0);
        rup.hypocenter = Some(Location::with_depth(34.0, -118.0, 6.25));
        assert_eq!(rup.hypocentral_depth(), 6.25);
    }

    #[test]
    fn describe_names_surface_kind() {
        let rup = point_rupture(5.0);
        assert!(rup.surface.describe().contains("point surface"));
        let fin = RuptureSurface::Finite(FiniteSurface {
            center: Location::new(34.0, -118.0),
            z_top: 0.0,
            z_bot: 15.0,
            dip: 60.0,
            length: 80.0,
            width: 18.0,
        });
        assert!(fin.describe().contains("finite surface"));
    }

    #[test]
    fn trt_display_is_human_readable() {
        assert_eq!(
            TectonicRegionType::SubductionSlab.to_string(),
            "Subduction Slab"
        );
    }
}
