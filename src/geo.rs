// SPDX-License-Identifier: AGPL-3.0-only

//! Locations and the minimal fast geodesy the calculators need.
//!
//! Distances here are horizontal kilometers on a sphere of mean Earth
//! radius. The fast distance uses a flat-earth approximation that is
//! accurate to ~0.01% for separations under a few hundred km — the
//! range that matters for hazard, where ground motion at larger
//! distances is negligible.

/// Mean Earth radius in km (IUGG mean radius R₁).
pub const EARTH_RADIUS_MEAN: f64 = 6371.0072;

/// A geographic location: latitude/longitude in degrees, depth in km
/// (positive down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
}

impl Location {
    /// Surface location (depth 0).
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            depth: 0.0,
        }
    }

    /// Location at depth (km, positive down).
    #[must_use]
    pub const fn with_depth(lat: f64, lon: f64, depth: f64) -> Self {
        Self { lat, lon, depth }
    }

    fn lat_rad(&self) -> f64 {
        self.lat.to_radians()
    }

    fn lon_rad(&self) -> f64 {
        self.lon.to_radians()
    }
}

/// Fast horizontal distance (km) via scaled flat-earth approximation.
///
/// dLon is scaled by the cosine of the mean latitude; the result is the
/// Euclidean norm scaled by the mean Earth radius. Error relative to
/// the great-circle distance is < 0.01% for separations < 300 km away
/// from the poles.
#[must_use]
pub fn horz_distance_fast(p1: Location, p2: Location) -> f64 {
    let lat1 = p1.lat_rad();
    let lat2 = p2.lat_rad();
    let d_lat = lat1 - lat2;
    let d_lon = (p1.lon_rad() - p2.lon_rad()) * (0.5 * (lat1 + lat2)).cos();
    EARTH_RADIUS_MEAN * (d_lat * d_lat + d_lon * d_lon).sqrt()
}

/// Initial bearing from `p1` to `p2` in radians, normalized to [0, 2π).
#[must_use]
pub fn azimuth_rad(p1: Location, p2: Location) -> f64 {
    let lat1 = p1.lat_rad();
    let lat2 = p2.lat_rad();
    let d_lon = p2.lon_rad() - p1.lon_rad();
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let az = y.atan2(x);
    if az < 0.0 {
        az + 2.0 * std::f64::consts::PI
    } else {
        az
    }
}

/// Project a point at the given azimuth (radians) and horizontal
/// distance (km) along a great circle. Depth is carried through
/// unchanged — only the horizontal position moves.
#[must_use]
pub fn location_at(p: Location, azimuth: f64, horz_dist: f64) -> Location {
    let ad = horz_dist / EARTH_RADIUS_MEAN; // angular distance
    let lat1 = p.lat_rad();
    let sin_lat2 = lat1.sin() * ad.cos() + lat1.cos() * ad.sin() * azimuth.cos();
    let lat2 = sin_lat2.asin();
    let lon2 = p.lon_rad()
        + (azimuth.sin() * ad.sin() * lat1.cos()).atan2(ad.cos() - lat1.sin() * sin_lat2);
    Location {
        lat: lat2.to_degrees(),
        lon: lon2.to_degrees(),
        depth: p.depth,
    }
}
