// SPDX-License-Identifier: AGPL-3.0-only

//! The point-source cache engine: identity keys, the parameterization
//! registry, the nested distance-bin cache, and the two calculators
//! built on top of it.

pub mod cache;
pub mod exceed;
pub mod keys;
pub mod registry;
pub mod spectra;

pub use cache::{BinArray, CacheStats, PointSourceDistanceCache};
pub use exceed::RuptureExceedProbCalculator;
pub use keys::{UniqueGmm, UniqueImt, UniquePointRupture};
pub use registry::GmmIdentityRegistry;
pub use spectra::RuptureSpectraCalculator;
