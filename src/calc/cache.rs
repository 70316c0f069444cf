// SPDX-License-Identifier: AGPL-3.0-only

//! The point-source distance-bin cache.
//!
//! Three nested concurrent maps — model identity → IMT identity →
//! rupture identity — bottoming out in a fixed-size array with one slot
//! per distance bin. Reads never block; writers race through atomic
//! insert-if-absent at every level, so concurrent first-access
//! converges on exactly one container per key with at most one loser's
//! construction discarded. Bin slots fill the same way: first write
//! wins, a racing duplicate computation is dropped.
//!
//! A single published "last used" snapshot short-circuits the outer two
//! levels for the overwhelmingly common case of a tight loop over many
//! ruptures with one model + IMT. It is best-effort: a stale read just
//! falls through to the full lookup, never a wrong answer.

use crate::calc::keys::{UniqueGmm, UniqueImt, UniquePointRupture};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Fixed-size array of lazily filled cache slots, one per distance bin.
#[derive(Debug)]
pub struct BinArray<T> {
    slots: Box<[OnceLock<Arc<T>>]>,
}

impl<T> BinArray<T> {
    fn new(bins: usize) -> Self {
        Self {
            slots: (0..bins).map(|_| OnceLock::new()).collect(),
        }
    }

    /// The cached value at `bin`, if filled.
    #[must_use]
    pub fn get(&self, bin: usize) -> Option<&Arc<T>> {
        self.slots[bin].get()
    }

    /// Fill `bin` if empty and return the authoritative value: ours if
    /// the write won, the earlier racer's if not. The loser's value is
    /// simply dropped.
    #[must_use]
    pub fn fill(&self, bin: usize, value: Arc<T>) -> Arc<T> {
        self.slots[bin].get_or_init(|| value).clone()
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of filled bins.
    #[must_use]
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }
}

type RuptureMap<T> = DashMap<UniquePointRupture, Arc<BinArray<T>>>;

/// Immutable snapshot of the last completed lookup's outer levels.
struct LastLookup<T> {
    gmm: UniqueGmm,
    imt: UniqueImt,
    ruptures: Arc<RuptureMap<T>>,
}

/// Occupancy counters for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub logical_models: usize,
    pub unique_imts: usize,
    pub unique_ruptures: usize,
    pub filled_bins: usize,
    pub total_bins: usize,
}

/// The nested concurrent cache. `T` is the cached per-bin result: an
/// exceedance curve for hazard calculations, a spectrum for spectra.
pub struct PointSourceDistanceCache<T> {
    bins: usize,
    cache: DashMap<UniqueGmm, Arc<DashMap<UniqueImt, Arc<RuptureMap<T>>>>>,
    last: RwLock<Option<LastLookup<T>>>,
}

impl<T> PointSourceDistanceCache<T> {
    /// Cache sized for `bins` distance bins (the interpolator's fixed
    /// size).
    #[must_use]
    pub fn new(bins: usize) -> Self {
        Self {
            bins,
            cache: DashMap::new(),
            last: RwLock::new(None),
        }
    }

    /// Bin count every array is sized to.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// The bin array for this (model, IMT, rupture) identity, creating
    /// backing structures on first access at each level.
    #[must_use]
    pub fn cached(
        &self,
        gmm: &UniqueGmm,
        imt: &UniqueImt,
        rup: &UniquePointRupture,
    ) -> Arc<BinArray<T>> {
        {
            let last = self.last.read();
            if let Some(prev) = last.as_ref() {
                if prev.gmm == *gmm && prev.imt == *imt {
                    // fast path: skip the two outer map levels
                    return Self::rupture_entry(&prev.ruptures, rup, self.bins);
                }
            }
        }

        let imt_map = self
            .cache
            .entry(gmm.clone())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .value()
            .clone();
        let rup_map = imt_map
            .entry(imt.clone())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .value()
            .clone();
        let arr = Self::rupture_entry(&rup_map, rup, self.bins);

        *self.last.write() = Some(LastLookup {
            gmm: gmm.clone(),
            imt: imt.clone(),
            ruptures: rup_map,
        });
        arr
    }

    fn rupture_entry(
        map: &RuptureMap<T>,
        rup: &UniquePointRupture,
        bins: usize,
    ) -> Arc<BinArray<T>> {
        map.entry(rup.clone())
            .or_insert_with(|| Arc::new(BinArray::new(bins)))
            .value()
            .clone()
    }

    /// Walk the nesting levels and count occupancy.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut unique_imts = 0;
        let mut unique_ruptures = 0;
        let mut filled_bins = 0;
        let mut total_bins = 0;
        for imt_map in self.cache.iter() {
            for rup_map in imt_map.value().iter() {
                unique_imts += 1;
                for arr in rup_map.value().iter() {
                    unique_ruptures += 1;
                    filled_bins += arr.value().filled();
                    total_bins += arr.value().len();
                }
            }
        }
        CacheStats {
            logical_models: self.cache.len(),
            unique_imts,
            unique_ruptures,
            filled_bins,
            total_bins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use crate::gmm::synthetic::SyntheticAttenuation;
    use crate::gmm::{GroundMotionModel, Imt};
    use crate::rupture::{PointSurface, Rupture, RuptureSurface};

    fn keys(mag: f64) -> (UniqueGmm, UniqueImt, UniquePointRupture) {
        let gmm = SyntheticAttenuation::new();
        let rup = Rupture {
            mag,
            rake: 0.0,
            hypocenter: None,
            surface: RuptureSurface::Point(PointSurface::plain(
                Location::new(34.0, -118.0),
                5.0,
                12.0,
                90.0,
            )),
        };
        (
            UniqueGmm::of(&gmm),
            UniqueImt::new(gmm.intensity_measure(), true),
            UniquePointRupture::new(&rup).unwrap(),
        )
    }

    #[test]
    fn same_key_returns_same_array() {
        let cache: PointSourceDistanceCache<f64> = PointSourceDistanceCache::new(16);
        let (g, i, r) = keys(6.0);
        let a = cache.cached(&g, &i, &r);
        let b = cache.cached(&g, &i, &r);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_ruptures_get_distinct_arrays() {
        let cache: PointSourceDistanceCache<f64> = PointSourceDistanceCache::new(16);
        let (g, i, r1) = keys(6.0);
        let (_, _, r2) = keys(6.5);
        let a = cache.cached(&g, &i, &r1);
        let b = cache.cached(&g, &i, &r2);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn fast_path_and_full_path_agree() {
        let cache: PointSourceDistanceCache<f64> = PointSourceDistanceCache::new(8);
        let (g, i, r) = keys(6.0);
        let first = cache.cached(&g, &i, &r); // full path, publishes snapshot
        let second = cache.cached(&g, &i, &r); // fast path
        assert!(Arc::ptr_eq(&first, &second));

        // switching IMT invalidates the snapshot but not correctness
        let other_imt = UniqueImt::new(&Imt::sa(1.0), true);
        let third = cache.cached(&g, &other_imt, &r);
        assert!(!Arc::ptr_eq(&first, &third));
        let back = cache.cached(&g, &i, &r);
        assert!(Arc::ptr_eq(&first, &back));
    }

    #[test]
    fn bin_fill_first_write_wins() {
        let cache: PointSourceDistanceCache<u32> = PointSourceDistanceCache::new(4);
        let (g, i, r) = keys(6.0);
        let arr = cache.cached(&g, &i, &r);
        let first = arr.fill(2, Arc::new(7));
        let second = arr.fill(2, Arc::new(99));
        assert_eq!(*first, 7);
        assert_eq!(*second, 7, "losing write must observe the winner");
        assert_eq!(arr.filled(), 1);
    }

    #[test]
    fn stats_count_all_levels() {
        let cache: PointSourceDistanceCache<u32> = PointSourceDistanceCache::new(4);
        let (g, i, r1) = keys(6.0);
        let (_, _, r2) = keys(7.0);
        let a = cache.cached(&g, &i, &r1);
        let _ = a.fill(0, Arc::new(1));
        let _ = cache.cached(&g, &i, &r2);
        let stats = cache.stats();
        assert_eq!(stats.logical_models, 1);
        assert_eq!(stats.unique_imts, 1);
        assert_eq!(stats.unique_ruptures, 2);
        assert_eq!(stats.filled_bins, 1);
        assert_eq!(stats.total_bins, 8);
    }

    #[test]
    fn concurrent_first_access_converges_on_one_array() {
        let cache: PointSourceDistanceCache<u64> = PointSourceDistanceCache::new(8);
        let (g, i, r) = keys(6.0);
        let ptrs: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let (g, i, r) = (&g, &i, &r);
                    let cache = &cache;
                    scope.spawn(move || {
                        let arr = cache.cached(g, i, r);
                        Arc::as_ptr(&arr) as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(
            ptrs.windows(2).all(|w| w[0] == w[1]),
            "all threads must observe one array: {ptrs:?}"
        );
    }
}
