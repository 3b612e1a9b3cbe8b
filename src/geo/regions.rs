// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Region naming

/// Resolves a human readable region for a location
pub trait RegionResolver: Send + Sync {
    fn region_name(&self, lat: f64, lon: f64) -> String;
}

/// Fallback resolver that names a location by its coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateRegions;

impl RegionResolver for CoordinateRegions {
    fn region_name(&self, lat: f64, lon: f64) -> String {
        let ns = if lat >= 0.0 { 'N' } else { 'S' };
        let ew = if lon >= 0.0 { 'E' } else { 'W' };
        format!("{:.2}°{} {:.2}°{}", lat.abs(), ns, lon.abs(), ew)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_name() {
        assert_eq!(CoordinateRegions.region_name(35.0, -120.5), "35.00°N 120.50°W");
    }
}
