// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Clusters - station picks believed to share one source

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::earthquake::EarthquakeId;
use crate::geo::{great_circle_distance, normalize_lon, GeoPoint};
use crate::sensors::StationId;

use super::{Hypocenter, PickedEvent, StationEvent};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Ratio thresholds behind the cluster level
const LEVEL_RATIOS: [f64; 4] = [128.0, 1024.0, 8192.0, 32768.0];

/// Candidate event built from per-station picks
#[derive(Debug)]
pub struct Cluster {
    id: u64,
    uuid: Uuid,
    assigned: HashMap<StationId, StationEvent>,

    root: Option<GeoPoint>,
    anchor: Option<GeoPoint>,
    size: f64,
    level: u8,

    update_count: u64,
    pub(crate) last_epicenter_update: u64,
    pub(crate) next_report_event_count: usize,
    pub(crate) revision_id: u32,

    pub(crate) earthquake: Option<EarthquakeId>,
    pub(crate) previous_hypocenter: Option<Hypocenter>,

    // read by export paths while the next cycle runs
    selected: Mutex<Arc<Vec<PickedEvent>>>,
}

impl Cluster {
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed) + 1,
            uuid: Uuid::new_v4(),
            assigned: HashMap::new(),
            root: None,
            anchor: None,
            size: 0.0,
            level: 0,
            update_count: 0,
            last_epicenter_update: 0,
            next_report_event_count: 0,
            revision_id: 0,
            earthquake: None,
            previous_hypocenter: None,
            selected: Mutex::new(Arc::new(Vec::new())),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Assign or refresh a station's detection
    pub fn assign(&mut self, event: StationEvent) {
        self.assigned.insert(event.station, event);
    }

    /// Drop a station from the cluster
    pub fn unassign(&mut self, station: StationId) -> Option<StationEvent> {
        self.assigned.remove(&station)
    }

    pub fn contains_station(&self, station: StationId) -> bool {
        self.assigned.contains_key(&station)
    }

    pub fn assigned_events(&self) -> &HashMap<StationId, StationEvent> {
        &self.assigned
    }

    /// Snapshot of every assigned pick
    pub fn picked_events(&self) -> Vec<PickedEvent> {
        self.assigned.values().map(StationEvent::pick).collect()
    }

    /// Recompute derived state if any station event changed since the last tick.
    /// Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        if !self.check_for_updates() {
            return false;
        }
        if self.root.is_none() {
            self.calculate_root();
        }
        self.calculate_size();
        true
    }

    fn check_for_updates(&mut self) -> bool {
        let updates: u64 = self.assigned.values().map(|e| e.updates).sum();
        let changed = updates != self.update_count;
        self.update_count = updates;
        changed
    }

    /// Circular mean of the valid stations: latitude averaged directly, longitude
    /// through its unit vector so the antimeridian does not pull the mean to 0.
    pub fn calculate_root(&mut self) {
        let mut n = 0usize;
        let mut sum_lat = 0.0;
        let mut sum_sin = 0.0;
        let mut sum_cos = 0.0;

        for event in self.assigned.values().filter(|e| e.valid) {
            let lon = event.lon.to_radians();
            sum_lat += event.lat;
            sum_sin += lon.sin();
            sum_cos += lon.cos();
            n += 1;
        }

        if n > 0 {
            let n = n as f64;
            let lon = (sum_sin / n).atan2(sum_cos / n).to_degrees();
            let root = GeoPoint::new(sum_lat / n, normalize_lon(lon));
            self.root = Some(root);
            self.anchor = Some(root);
        }
    }

    fn calculate_size(&mut self) {
        let Some(root) = self.root else {
            return;
        };

        let mut size = 0.0_f64;
        let mut counts = [0usize; 4];
        for event in self.assigned.values().filter(|e| e.valid) {
            size = size.max(great_circle_distance(root.lat, root.lon, event.lat, event.lon));
            for (count, threshold) in counts.iter_mut().zip(LEVEL_RATIOS) {
                if event.max_ratio >= threshold {
                    *count += 1;
                }
            }
        }

        self.size = size;
        self.level = level_for(counts);
    }

    pub fn root(&self) -> Option<GeoPoint> {
        self.root
    }

    pub fn anchor(&self) -> Option<GeoPoint> {
        self.anchor
    }

    pub fn update_anchor(&mut self, hypocenter: &Hypocenter) {
        self.anchor = Some(hypocenter.location());
    }

    pub fn reset_anchor(&mut self) {
        self.anchor = self.root;
    }

    /// Largest distance from the root to a valid station, km
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Coarse intensity level, 0..=4
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn revision_id(&self) -> u32 {
        self.revision_id
    }

    pub fn earthquake(&self) -> Option<EarthquakeId> {
        self.earthquake
    }

    pub fn previous_hypocenter(&self) -> Option<&Hypocenter> {
        self.previous_hypocenter.as_ref()
    }

    /// Picks used by the most recent search
    pub fn selected(&self) -> Arc<Vec<PickedEvent>> {
        Arc::clone(&self.selected.lock())
    }

    pub(crate) fn set_selected(&self, selected: Vec<PickedEvent>) {
        *self.selected.lock() = Arc::new(selected);
    }
}

impl Default for Cluster {
    fn default() -> Self {
        Self::new()
    }
}

fn level_for([r128, r1024, r8192, r32k]: [usize; 4]) -> u8 {
    let mut level = 0;
    if r128 > 8 || r1024 > 3 {
        level = 1;
    }
    if r1024 > 6 || r8192 > 3 {
        level = 2;
    }
    if r8192 > 4 || r32k >= 3 {
        level = 3;
    }
    if r32k > 3 {
        level = 4;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Station;

    fn event(id: u32, lat: f64, lon: f64, ratio: f64) -> StationEvent {
        let station = Station::new(StationId(id), "XX", &format!("S{id}"), lat, lon, 0.0);
        StationEvent::new(&station, 0, ratio)
    }

    #[test]
    fn test_root_across_antimeridian() {
        let mut cluster = Cluster::new();
        cluster.assign(event(1, 0.0, 179.0, 10.0));
        cluster.assign(event(2, 0.0, -179.0, 10.0));
        assert!(cluster.tick());

        let root = cluster.root().unwrap();
        assert!(root.lat.abs() < 1e-9);
        assert!(root.lon.abs() > 179.9);
        assert_eq!(cluster.anchor(), Some(root));
        assert!((cluster.size() - 111.19).abs() < 0.5);
    }

    #[test]
    fn test_root_ignores_invalid() {
        let mut cluster = Cluster::new();
        cluster.assign(event(1, 10.0, 20.0, 10.0));
        let mut bogus = event(2, -50.0, -100.0, 10.0);
        bogus.valid = false;
        cluster.assign(bogus);
        cluster.tick();

        let root = cluster.root().unwrap();
        assert!((root.lat - 10.0).abs() < 1e-9);
        assert!((root.lon - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_dirty_check() {
        let mut cluster = Cluster::new();
        assert!(!cluster.tick());
        assert!(cluster.root().is_none());

        cluster.assign(event(1, 10.0, 20.0, 10.0));
        assert!(cluster.tick());
        assert!(!cluster.tick());

        let mut updated = cluster.assigned_events()[&StationId(1)].clone();
        assert!(updated.record(500, 20.0));
        cluster.assign(updated);
        assert!(cluster.tick());
        assert_eq!(cluster.update_count(), 2);
    }

    #[test]
    fn test_root_is_computed_once() {
        let mut cluster = Cluster::new();
        cluster.assign(event(1, 10.0, 20.0, 10.0));
        cluster.tick();
        cluster.assign(event(2, 12.0, 22.0, 10.0));
        cluster.tick();

        let root = cluster.root().unwrap();
        assert!((root.lat - 10.0).abs() < 1e-9);
        assert!(cluster.size() > 250.0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for([0, 0, 0, 0]), 0);
        assert_eq!(level_for([9, 0, 0, 0]), 1);
        assert_eq!(level_for([4, 4, 0, 0]), 1);
        assert_eq!(level_for([7, 7, 0, 0]), 2);
        assert_eq!(level_for([4, 4, 4, 0]), 2);
        assert_eq!(level_for([5, 5, 5, 0]), 3);
        assert_eq!(level_for([3, 3, 3, 3]), 3);
        assert_eq!(level_for([4, 4, 4, 4]), 4);
    }

    #[test]
    fn test_level_from_events() {
        let mut cluster = Cluster::new();
        for i in 0..5 {
            cluster.assign(event(i, 10.0 + f64::from(i) * 0.1, 20.0, 9000.0));
        }
        cluster.tick();
        assert_eq!(cluster.level(), 3);
    }

    #[test]
    fn test_selected_snapshot() {
        let cluster = Cluster::new();
        assert!(cluster.selected().is_empty());
        cluster.set_selected(vec![event(1, 1.0, 2.0, 3.0).pick()]);
        assert_eq!(cluster.selected().len(), 1);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let a = Cluster::new();
        let b = Cluster::new();
        assert!(b.id() > a.id());
        assert_ne!(a.uuid(), b.uuid());
    }
}
