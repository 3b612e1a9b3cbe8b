// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Geodesy primitives and the physical models consumed by the locator
//!
//! Spherical Earth throughout. The travel-time, magnitude and region models are
//! traits so a deployment can swap in tabulated implementations.

mod travel_time;
mod intensity;
mod regions;

pub use travel_time::*;
pub use intensity::*;
pub use regions::*;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in km
pub const EARTH_RADIUS: f64 = 6371.0;

/// Kilometres per degree of arc on the surface
pub const KM_PER_DEGREE: f64 = EARTH_RADIUS * std::f64::consts::PI / 180.0;

/// A surface position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        great_circle_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Great-circle (haversine) distance in km
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
}

/// Straight-line distance in km between two points given with altitudes in km.
/// Depths are negative altitudes.
pub fn geological_distance(
    lat1: f64,
    lon1: f64,
    alt1: f64,
    lat2: f64,
    lon2: f64,
    alt2: f64,
) -> f64 {
    let a = to_cartesian(lat1, lon1, EARTH_RADIUS + alt1);
    let b = to_cartesian(lat2, lon2, EARTH_RADIUS + alt2);
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

fn to_cartesian(lat: f64, lon: f64, r: f64) -> [f64; 3] {
    let (phi, lambda) = (lat.to_radians(), lon.to_radians());
    [r * phi.cos() * lambda.cos(), r * phi.cos() * lambda.sin(), r * phi.sin()]
}

/// Initial bearing from the first point towards the second, in `[0, 360)`
pub fn calculate_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    if bearing >= 360.0 { 0.0 } else { bearing }
}

/// Convert surface distance in km to angular distance in degrees
pub fn km_to_degrees(km: f64) -> f64 {
    km / KM_PER_DEGREE
}

/// Wrap a longitude into `[-180, 180]`
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 { 180.0 } else { wrapped }
}

/// Point reached by travelling `dist` km from `(lat, lon)` along `bearing` degrees
pub fn move_on_globe(lat: f64, lon: f64, dist: f64, bearing: f64) -> GeoPoint {
    GlobeMover::new(lat, lon, dist).point(bearing)
}

/// Destination solver with the per-origin trigonometry hoisted out, for sweeping
/// many bearings at one radius.
#[derive(Debug, Clone, Copy)]
pub struct GlobeMover {
    lon: f64,
    sin_lat: f64,
    cos_lat: f64,
    sin_delta: f64,
    cos_delta: f64,
}

impl GlobeMover {
    pub fn new(lat: f64, lon: f64, dist: f64) -> Self {
        let phi = lat.to_radians();
        let delta = dist / EARTH_RADIUS;
        Self {
            lon,
            sin_lat: phi.sin(),
            cos_lat: phi.cos(),
            sin_delta: delta.sin(),
            cos_delta: delta.cos(),
        }
    }

    pub fn point(&self, bearing: f64) -> GeoPoint {
        let theta = bearing.to_radians();
        let sin_phi2 = (self.sin_lat * self.cos_delta
            + self.cos_lat * self.sin_delta * theta.cos())
        .clamp(-1.0, 1.0);
        let phi2 = sin_phi2.asin();
        let y = theta.sin() * self.sin_delta * self.cos_lat;
        let x = self.cos_delta - self.sin_lat * sin_phi2;
        let lambda2 = self.lon.to_radians() + y.atan2(x);

        GeoPoint {
            lat: phi2.to_degrees(),
            lon: normalize_lon(lambda2.to_degrees()),
        }
    }
}
