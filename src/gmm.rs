// SPDX-License-Identifier: AGPL-3.0-only

//! The ground-motion model seam.
//!
//! Real ground-motion models live outside this crate; the calculators
//! only need the narrow capability surface defined here: per-call
//! mutable state (site, rupture, intensity measure), exceedance
//! evaluation against a caller-shaped curve, and a *tracked parameter*
//! interface — a canonical ordered sequence of (name, comparable-value)
//! pairs plus a generation counter bumped on every mutation. The
//! parameter interface is what lets one shared cache prove that two
//! model instances on different worker threads are configured
//! identically.

use crate::curve::DiscretizedCurve;
use crate::error::Result;
use crate::geo::Location;
use crate::ptsrc::SurfaceDistances;
use crate::rupture::Rupture;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod synthetic;

/// Name of the spectral-period parameter. Excluded from tracking in
/// spectra calculations, where period varies per sample and is handled
/// as a separate cache axis.
pub const PERIOD_PARAM: &str = "SA Period";

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Stable per-instance identity for a model object.
///
/// Rust has no object identity for trait objects, so every model
/// instance mints one of these at construction; the registry keys its
/// per-instance records off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Mint a fresh, process-unique id.
    #[must_use]
    pub fn mint() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

/// A comparable parameter value. Floats are held by bit pattern so
/// equality and hashing are exact — the cache must never treat two
/// "close" parameterizations as interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    F64(u64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl ParamValue {
    #[must_use]
    pub fn f64(v: f64) -> Self {
        Self::F64(v.to_bits())
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F64(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// A named, comparable parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

/// An ordered list of named parameters with a generation counter.
///
/// The generation is bumped on every mutation; the registry compares it
/// against the generation recorded at validation time to decide whether
/// a revalidation is due. Mutation requires `&mut`, so a plain counter
/// is sound — cross-thread visibility rides on whatever synchronization
/// hands the owning model between threads.
#[derive(Debug, Clone, Default)]
pub struct ParamList {
    params: Vec<Param>,
    generation: u64,
}

impl ParamList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert for construction.
    #[must_use]
    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    /// Set a parameter (inserting it if new) and bump the generation.
    pub fn set(&mut self, name: &str, value: ParamValue) {
        self.generation += 1;
        if let Some(p) = self.params.iter_mut().find(|p| p.name == name) {
            p.value = value;
        } else {
            self.params.push(Param {
                name: name.to_string(),
                value,
            });
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Mutations since construction.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }
}

/// Intensity measure type: a name plus its independent parameters
/// (period, damping, ...).
#[derive(Debug, Clone)]
pub struct Imt {
    pub name: String,
    pub params: ParamList,
}

impl Imt {
    /// Peak ground acceleration.
    #[must_use]
    pub fn pga() -> Self {
        Self {
            name: "PGA".to_string(),
            params: ParamList::new(),
        }
    }

    /// Spectral acceleration at `period` seconds, 5% damping.
    #[must_use]
    pub fn sa(period: f64) -> Self {
        Self {
            name: "SA".to_string(),
            params: ParamList::new()
                .with(PERIOD_PARAM, ParamValue::f64(period))
                .with("SA Damping", ParamValue::f64(5.0)),
        }
    }
}

/// A ground-motion model instance: mutable per-call state plus the
/// tracked-parameter capability the cache's consistency checks need.
///
/// Implementations typically live one-per-worker-thread while sharing a
/// single calculator; the registry proves their parameterizations
/// match before letting them share cached curves.
pub trait GroundMotionModel {
    /// Implementation type name (stands in for the class name).
    fn model_kind(&self) -> &'static str;

    /// Display name of the model.
    fn name(&self) -> &str;

    /// This instance's stable identity.
    fn instance_id(&self) -> InstanceId;

    fn intensity_measure(&self) -> &Imt;

    fn set_intensity_measure(&mut self, imt: Imt);

    fn site_location(&self) -> Location;

    fn set_site_location(&mut self, loc: Location);

    /// Install a rupture, clearing any distance override left by
    /// [`Self::set_rupture_with_distances`].
    ///
    /// # Errors
    ///
    /// Model-specific failure to accept the rupture.
    fn set_rupture(&mut self, rup: &Rupture) -> Result<()>;

    /// Install a rupture with explicit pre-computed distance metrics
    /// (used per-branch for weighted distance corrections).
    ///
    /// # Errors
    ///
    /// Model-specific failure to accept the rupture.
    fn set_rupture_with_distances(
        &mut self,
        rup: &Rupture,
        dists: &SurfaceDistances,
    ) -> Result<()>;

    /// Fill `curve`'s Y values with P(IML ≥ x) for the current site,
    /// rupture, and intensity measure, at the caller's X sampling.
    ///
    /// # Errors
    ///
    /// Model-specific evaluation failure (e.g. no rupture set).
    fn exceed_probabilities(&mut self, curve: &mut DiscretizedCurve) -> Result<()>;

    /// Fill `spectrum` (X = periods) with P(SA(T) ≥ iml) for the
    /// current site and rupture.
    ///
    /// # Errors
    ///
    /// Model-specific evaluation failure.
    fn exceed_prob_spectrum(&mut self, iml: f64, spectrum: &mut DiscretizedCurve) -> Result<()>;

    /// Configuration parameters that are neither site nor rupture
    /// properties.
    fn other_params(&self) -> &ParamList;

    /// Site parameters, excluding the site location itself (which
    /// legitimately varies per call).
    fn site_params(&self) -> &ParamList;

    /// Combined mutation count of the tracked parameter lists.
    fn param_generation(&self) -> u64 {
        self.other_params().generation() + self.site_params().generation()
    }
}
