// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Archival of evicted earthquakes

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::Earthquake;

/// Receives each earthquake once, just before it leaves the live registry
pub trait ArchiveSink: Send + Sync {
    fn archive(&self, quake: &Earthquake);
}

/// Bounded in-memory archive keeping the most recent records
#[derive(Debug)]
pub struct EarthquakeArchive {
    records: Mutex<VecDeque<Earthquake>>,
    capacity: usize,
}

impl EarthquakeArchive {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<Earthquake> {
        self.records.lock().iter().rev().take(limit).cloned().collect()
    }
}

impl Default for EarthquakeArchive {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ArchiveSink for EarthquakeArchive {
    fn archive(&self, quake: &Earthquake) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.lock();
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(quake.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Hypocenter;
    use crate::geo::CoordinateRegions;

    #[test]
    fn test_bounded() {
        let archive = EarthquakeArchive::new(2);
        for origin in 0..3 {
            let hyp = Hypocenter::new(0.0, 0.0, 10.0, origin);
            archive.archive(&Earthquake::new(1, &hyp, &CoordinateRegions, 0));
        }
        assert_eq!(archive.len(), 2);
        let recent: Vec<i64> = archive.recent(5).iter().map(|q| q.origin).collect();
        assert_eq!(recent, vec![2, 1]);
    }
}
