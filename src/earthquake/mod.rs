// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Earthquake records, their live registry, magnitude and archival

mod archive;
mod magnitude;
mod registry;

pub use archive::*;
pub use magnitude::*;
pub use registry::*;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detection::Hypocenter;
use crate::geo::RegionResolver;

/// Identity of a live earthquake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EarthquakeId(pub Uuid);

impl EarthquakeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EarthquakeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EarthquakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A located event. Times are ms since epoch, depth in km.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earthquake {
    pub id: EarthquakeId,
    pub cluster_id: u64,

    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
    pub origin: i64,

    pub created_at: i64,
    pub last_update: i64,

    pub mag: f64,
    /// Per-station magnitudes, ascending
    pub mags: Vec<f64>,
    /// Share of selected picks consistent with this origin, percent
    pub pct: f64,
    pub revision_id: u32,
    pub region: String,
}

impl Earthquake {
    pub fn new(
        cluster_id: u64,
        hypocenter: &Hypocenter,
        regions: &dyn RegionResolver,
        now: i64,
    ) -> Self {
        Self {
            id: EarthquakeId::new(),
            cluster_id,
            lat: hypocenter.lat,
            lon: hypocenter.lon,
            depth: hypocenter.depth,
            origin: hypocenter.origin,
            created_at: now,
            last_update: now,
            mag: 0.0,
            mags: Vec::new(),
            pct: 0.0,
            revision_id: 0,
            region: regions.region_name(hypocenter.lat, hypocenter.lon),
        }
    }

    /// Move to a new solution. The region is only resolved again when the
    /// epicenter changed. Returns whether it did.
    pub fn update(
        &mut self,
        hypocenter: &Hypocenter,
        regions: &dyn RegionResolver,
        now: i64,
    ) -> bool {
        let moved = self.lat != hypocenter.lat || self.lon != hypocenter.lon;

        self.lat = hypocenter.lat;
        self.lon = hypocenter.lon;
        self.depth = hypocenter.depth;
        self.origin = hypocenter.origin;
        self.last_update = now;

        if moved {
            self.region = regions.region_name(self.lat, self.lon);
        }
        moved
    }

    /// One-line description for logs and exports
    pub fn to_summary(&self) -> String {
        format!(
            "M{:.1} {} ({:.3}, {:.3}) depth {:.1} km, rev {}, {:.0}% correct",
            self.mag, self.region, self.lat, self.lon, self.depth, self.revision_id, self.pct
        )
    }
}
