// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Seismic phase travel times

use super::EARTH_RADIUS;

/// Maximum hypocenter depth supported by the default model, km
pub const MAX_DEPTH: f64 = 750.0;

/// Travel-time source for P and S phases. `None` means the phase has no arrival
/// at that depth and angular distance.
pub trait TravelTimeModel: Send + Sync {
    /// P-wave travel time in seconds
    fn p_wave(&self, depth: f64, angle: f64) -> Option<f64>;

    /// S-wave travel time in seconds
    fn s_wave(&self, depth: f64, angle: f64) -> Option<f64>;

    /// Deepest hypocenter the model covers, km
    fn max_depth(&self) -> f64;
}

/// Straight rays through a uniform sphere.
///
/// Good enough to drive the locator against synthetic data; real deployments
/// plug in a tabulated layered model.
#[derive(Debug, Clone, Copy)]
pub struct HomogeneousModel {
    pub vp: f64,
    pub vs: f64,
    pub max_depth: f64,
    pub max_angle: f64,
}

impl Default for HomogeneousModel {
    fn default() -> Self {
        Self {
            vp: 6.2,
            vs: 3.6,
            max_depth: MAX_DEPTH,
            max_angle: 150.0,
        }
    }
}

impl HomogeneousModel {
    fn ray_length(&self, depth: f64, angle: f64) -> Option<f64> {
        if !(0.0..=self.max_depth).contains(&depth) || !(0.0..=self.max_angle).contains(&angle) {
            return None;
        }
        let r1 = EARTH_RADIUS - depth;
        let r2 = EARTH_RADIUS;
        let len2 = r1 * r1 + r2 * r2 - 2.0 * r1 * r2 * angle.to_radians().cos();
        Some(len2.max(0.0).sqrt())
    }
}

impl TravelTimeModel for HomogeneousModel {
    fn p_wave(&self, depth: f64, angle: f64) -> Option<f64> {
        self.ray_length(depth, angle).map(|len| len / self.vp)
    }

    fn s_wave(&self, depth: f64, angle: f64) -> Option<f64> {
        self.ray_length(depth, angle).map(|len| len / self.vs)
    }

    fn max_depth(&self) -> f64 {
        self.max_depth
    }
}
