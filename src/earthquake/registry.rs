// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Live earthquake registry with magnitude-dependent retention

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::info;

use super::{median, ArchiveSink, Earthquake, EarthquakeId};

/// Retention in minutes, indexed by magnitude clamped to 0..=9
pub const STORE_TABLE: [i64; 10] = [3, 3, 3, 5, 7, 10, 15, 25, 40, 40];

/// Share of the retention window an earthquake must go without updates
const UPDATE_GRACE: f64 = 0.25;

/// Retention window for a magnitude, minutes
pub fn retention_minutes(mag: f64) -> i64 {
    let index = (mag as i64).clamp(0, STORE_TABLE.len() as i64 - 1) as usize;
    STORE_TABLE[index]
}

/// Owns every live earthquake
#[derive(Debug, Default)]
pub struct EarthquakeRegistry {
    quakes: RwLock<HashMap<EarthquakeId, Earthquake>>,
}

impl EarthquakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, quake: Earthquake) -> EarthquakeId {
        let id = quake.id;
        self.quakes.write().insert(id, quake);
        id
    }

    pub fn get(&self, id: EarthquakeId) -> Option<Earthquake> {
        self.quakes.read().get(&id).cloned()
    }

    pub fn contains(&self, id: EarthquakeId) -> bool {
        self.quakes.read().contains_key(&id)
    }

    /// Mutate a live earthquake in place
    pub fn update<R>(&self, id: EarthquakeId, f: impl FnOnce(&mut Earthquake) -> R) -> Option<R> {
        self.quakes.write().get_mut(&id).map(f)
    }

    /// Store per-station magnitudes (sorted here) and their median
    pub fn set_magnitude(&self, id: EarthquakeId, mut mags: Vec<f64>) -> bool {
        mags.sort_by(f64::total_cmp);
        let Some(mag) = median(&mags) else {
            return false;
        };
        self.update(id, |quake| {
            quake.mag = mag;
            quake.mags = mags;
        })
        .is_some()
    }

    pub fn remove(&self, id: EarthquakeId) -> Option<Earthquake> {
        self.quakes.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.quakes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.quakes.read().is_empty()
    }

    /// Copies of every live earthquake, oldest origin first
    pub fn snapshot(&self) -> Vec<Earthquake> {
        let mut quakes: Vec<Earthquake> = self.quakes.read().values().cloned().collect();
        quakes.sort_by_key(|q| q.origin);
        quakes
    }

    /// Archive and drop every earthquake that outlived its retention window and
    /// has gone a quarter of that window without an update. The sink runs with
    /// no registry lock held and sees each record while it is still live.
    pub fn sweep(&self, now: i64, sink: &dyn ArchiveSink) -> Vec<Earthquake> {
        let expired: Vec<Earthquake> = self
            .quakes
            .read()
            .values()
            .filter(|quake| is_expired(quake, now))
            .cloned()
            .collect();

        for quake in &expired {
            sink.archive(quake);
        }

        let mut quakes = self.quakes.write();
        let mut removed = Vec::with_capacity(expired.len());
        for quake in expired {
            if let Some(quake) = quakes.remove(&quake.id) {
                info!(id = %quake.id, summary = %quake.to_summary(), "Earthquake archived");
                removed.push(quake);
            }
        }
        removed
    }
}

fn is_expired(quake: &Earthquake, now: i64) -> bool {
    let window = retention_minutes(quake.mag) * 60 * 1000;
    now - quake.origin > window && (now - quake.last_update) as f64 > UPDATE_GRACE * window as f64
}
