// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Station picks

use serde::{Deserialize, Serialize};

use crate::sensors::{Station, StationId};

/// One station's P-wave arrival candidate, as consumed by the locator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickedEvent {
    /// Arrival time, ms since epoch
    pub p_wave: i64,
    pub lat: f64,
    pub lon: f64,
    /// Station elevation in metres
    pub elevation: f64,
    pub max_ratio: f64,
}

/// A station's live detection as assigned to a cluster. Keeps changing while the
/// station keeps recording; `updates` grows on every change so clusters can
/// dirty-check cheaply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationEvent {
    pub station: StationId,
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
    pub p_wave: i64,
    pub max_ratio: f64,
    pub updates: u64,
    pub valid: bool,
    /// Newest sample the station has logged since the pick
    pub latest_log_time: i64,
}

impl StationEvent {
    pub fn new(station: &Station, p_wave: i64, ratio: f64) -> Self {
        Self {
            station: station.id,
            lat: station.lat,
            lon: station.lon,
            elevation: station.alt,
            p_wave,
            max_ratio: ratio,
            updates: 1,
            valid: true,
            latest_log_time: p_wave,
        }
    }

    /// Feed the station's ratio at `time`; returns true if the peak grew
    pub fn record(&mut self, time: i64, ratio: f64) -> bool {
        self.latest_log_time = self.latest_log_time.max(time);
        if ratio > self.max_ratio {
            self.max_ratio = ratio;
            self.updates += 1;
            return true;
        }
        false
    }

    pub fn pick(&self) -> PickedEvent {
        PickedEvent {
            p_wave: self.p_wave,
            lat: self.lat,
            lon: self.lon,
            elevation: self.elevation,
            max_ratio: self.max_ratio,
        }
    }
}
