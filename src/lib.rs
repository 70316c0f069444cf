// SPDX-License-Identifier: AGPL-3.0-only

//! faultspring — point-source seismic hazard engine
//!
//! Computes conditional exceedance probabilities and response spectra
//! for earthquake ruptures, built around a concurrency-safe cache that
//! evaluates ground-motion models at most once per distance bin for
//! point-source ruptures and interpolates in log-distance space for
//! everything in between.
//!
//! ## Core modules
//!   - `interp` — fixed log-spaced distance bins with quick lookup
//!   - `calc` — identity keys, parameterization registry, the nested
//!     concurrent cache, and the exceedance/spectra calculators
//!   - `gmm` — the ground-motion model seam (tracked parameters,
//!     generation counters) plus the synthetic reference model
//!   - `ptsrc` — point-source distance corrections (analytical rJB)
//!
//! ## Supporting modules
//!   - `curve`, `weights`, `geo`, `poisson` — discretized functions,
//!     weighted branch lists, fast geodesy, rate conversions
//!   - `tolerances`, `validation`, `report` — documented thresholds,
//!     the pass/fail harness, JSON reports
//!
//! ## Validation binaries
//!   - `validate_point_cache` — cache parity, interpolation bounds,
//!     idempotence, concurrency, fallback checks
//!   - `validate_distance_correction` — analytical rJB limit checks

pub mod calc;
pub mod curve;
pub mod error;
pub mod geo;
pub mod gmm;
pub mod interp;
pub mod poisson;
pub mod ptsrc;
pub mod report;
pub mod rupture;
pub mod tolerances;
pub mod validation;
pub mod weights;

pub use calc::{RuptureExceedProbCalculator, RuptureSpectraCalculator};
pub use curve::DiscretizedCurve;
pub use error::{HazardError, Result};
pub use interp::DistanceInterpolator;
