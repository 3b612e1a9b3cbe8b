// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Seismic stations

use std::fmt;

use serde::{Deserialize, Serialize};

/// Network-wide station identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StationId(pub u32);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A recording station and its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub network: String,
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    /// Elevation above sea level in metres
    pub alt: f64,
}

impl Station {
    pub fn new(id: StationId, network: &str, code: &str, lat: f64, lon: f64, alt: f64) -> Self {
        Self {
            id,
            network: network.to_string(),
            code: code.to_string(),
            lat,
            lon,
            alt,
        }
    }

    /// `NETWORK.CODE`
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.network, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        let station = Station::new(StationId(7), "JP", "TKY", 35.0, 139.0, 40.0);
        assert_eq!(station.identifier(), "JP.TKY");
        assert_eq!(station.id.to_string(), "#7");
    }
}
