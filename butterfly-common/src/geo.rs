//! Geodesy helpers: coordinates, great-circle distance and bearings.
//!
//! Bearings are degrees normalized to `(-180, 180]`, measured clockwise from
//! north. Distances are metres.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in metres.
    pub fn distance(&self, other: &Coord) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    /// Initial bearing from `self` towards `other`.
    pub fn bearing_to(&self, other: &Coord) -> f64 {
        compute_bearing(self.lat, self.lon, other.lat, other.lon)
    }

    /// Point reached by travelling `distance_m` metres from `self` along `bearing`.
    ///
    /// Flat-earth approximation, only meant for short offsets.
    pub fn offset(&self, bearing: f64, distance_m: f64) -> Coord {
        let rad = bearing.to_radians();
        let m_per_deg_lat = EARTH_RADIUS_M.to_radians();
        let m_per_deg_lon = m_per_deg_lat * self.lat.to_radians().cos();
        Coord {
            lat: self.lat + distance_m * rad.cos() / m_per_deg_lat,
            lon: self.lon + distance_m * rad.sin() / m_per_deg_lon,
        }
    }
}

/// Compute haversine distance between two points in meters
pub fn haversine_distance(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let delta_lat = (lat2_deg - lat1_deg).to_radians();
    let delta_lon = (lon2_deg - lon1_deg).to_radians();

    let a =
        (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Compute the initial bearing from point 1 to point 2 in degrees
pub fn compute_bearing(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let delta_lon = (lon2_deg - lon1_deg).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    normalize_bearing(y.atan2(x).to_degrees())
}

/// Map any angle in degrees onto `(-180, 180]`.
pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg % 360.0;
    if b <= -180.0 {
        b + 360.0
    } else if b > 180.0 {
        b - 360.0
    } else {
        b
    }
}

/// Bearing of the same line travelled the other way.
pub fn reverse_bearing(deg: f64) -> f64 {
    normalize_bearing(deg + 180.0)
}

/// Signed turn from heading `from` to heading `to`; positive turns right.
pub fn bearing_delta(from: f64, to: f64) -> f64 {
    normalize_bearing(to - from)
}
