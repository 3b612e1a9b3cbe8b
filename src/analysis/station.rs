// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Per-station trigger analysis
//!
//! Removes the running mean from the raw counts, keeps exponentially smoothed
//! averages of the absolute filtered signal and opens a station event when the
//! short average rises well above the long one.

use tracing::{debug, trace};

use crate::detection::StationEvent;
use crate::error::BufferError;
use crate::sensors::Station;

use super::{Averages, WaveformBuffer};

const MEAN_SECONDS: f64 = 10.0;
const SHORT_SECONDS: f64 = 0.5;
const MEDIUM_SECONDS: f64 = 6.0;
const LONG_SECONDS: f64 = 200.0;
const SPECIAL_SECONDS: f64 = 50.0;

/// No triggers until this much signal has been seen
const WARMUP_SECONDS: f64 = 30.0;

/// Short/long ratio that opens an event
pub const TRIGGER_RATIO: f64 = 4.5;
/// Short/long ratio under which an open event closes
pub const RELEASE_RATIO: f64 = 2.0;

const MIN_LONG_AVERAGE: f64 = 1e-6;

/// Drives a station's waveform buffer and trigger state
#[derive(Debug)]
pub struct StationAnalysis {
    station: Station,
    buffer: WaveformBuffer,
    sample_rate: f64,
    samples: u64,

    mean: f64,
    short: f64,
    medium: f64,
    long: f64,
    special: f64,

    event: Option<StationEvent>,
    active: bool,
}

impl StationAnalysis {
    pub fn new(
        station: Station,
        sample_rate: f64,
        buffer_seconds: f64,
        server: bool,
    ) -> Result<Self, BufferError> {
        Ok(Self {
            station,
            buffer: WaveformBuffer::new(sample_rate, buffer_seconds, server)?,
            sample_rate,
            samples: 0,
            mean: 0.0,
            short: 0.0,
            medium: 0.0,
            long: 0.0,
            special: 0.0,
            event: None,
            active: false,
        })
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn buffer(&self) -> &WaveformBuffer {
        &self.buffer
    }

    /// Current short/long ratio
    pub fn ratio(&self) -> f64 {
        self.short / self.long.max(MIN_LONG_AVERAGE)
    }

    /// Most recent event, open or closed
    pub fn event(&self) -> Option<&StationEvent> {
        self.event.as_ref()
    }

    /// Whether an event is currently open
    pub fn is_triggered(&self) -> bool {
        self.active
    }

    fn smoothing(&self, seconds: f64) -> f64 {
        let window = (self.sample_rate * seconds).min(self.samples as f64).max(1.0);
        1.0 / window
    }

    /// Feed one sample. Returns true when an event opened or its peak grew.
    pub fn ingest(&mut self, time: i64, raw: i32) -> bool {
        self.samples += 1;

        self.mean += (f64::from(raw) - self.mean) * self.smoothing(MEAN_SECONDS);
        let filtered = f64::from(raw) - self.mean;
        let level = filtered.abs();

        self.short += (level - self.short) * self.smoothing(SHORT_SECONDS);
        self.medium += (level - self.medium) * self.smoothing(MEDIUM_SECONDS);
        self.special += (level - self.special) * self.smoothing(SPECIAL_SECONDS);
        if !self.active {
            self.long += (level - self.long) * self.smoothing(LONG_SECONDS);
        }

        let long = self.long.max(MIN_LONG_AVERAGE);
        self.buffer.log(
            time,
            raw,
            filtered as f32,
            Averages {
                short: self.short as f32,
                medium: self.medium as f32,
                long: long as f32,
                special: self.special as f32,
            },
            false,
        );

        let ratio = self.short / long;
        let warmed_up = self.samples as f64 >= self.sample_rate * WARMUP_SECONDS;

        if self.active {
            let Some(event) = self.event.as_mut() else {
                self.active = false;
                return false;
            };
            let grew = event.record(time, ratio);
            if ratio < RELEASE_RATIO {
                self.active = false;
                debug!(
                    station = %self.station.identifier(),
                    max_ratio = event.max_ratio,
                    "Station event closed"
                );
            }
            return grew;
        }

        if let Some(event) = self.event.as_mut() {
            event.latest_log_time = event.latest_log_time.max(time);
        }

        if warmed_up && ratio > TRIGGER_RATIO {
            trace!(station = %self.station.identifier(), time, ratio, "Station triggered");
            self.event = Some(StationEvent::new(&self.station, time, ratio));
            self.active = true;
            return true;
        }

        false
    }
}
