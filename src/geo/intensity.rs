// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Amplitude ratio to magnitude conversion

/// Maps a station's corrected amplitude ratio at a hypocentral distance to a magnitude
pub trait MagnitudeTable: Send + Sync {
    fn magnitude(&self, distance: f64, ratio: f64) -> f64;
}

/// Richter-style local magnitude on the detection ratio
#[derive(Debug, Clone, Copy)]
pub struct IntensityTable {
    pub distance_coefficient: f64,
    pub offset: f64,
}

impl Default for IntensityTable {
    fn default() -> Self {
        Self {
            distance_coefficient: 2.76,
            offset: -2.48,
        }
    }
}

impl MagnitudeTable for IntensityTable {
    fn magnitude(&self, distance: f64, ratio: f64) -> f64 {
        ratio.max(1.0).log10() + self.distance_coefficient * distance.max(1.0).log10() + self.offset
    }
}
