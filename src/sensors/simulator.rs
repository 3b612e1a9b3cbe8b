// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Synthetic station network for the playground and tests

use std::f64::consts::PI;
use std::sync::Arc;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::config::PlaygroundConfig;
use crate::geo::{
    geological_distance, great_circle_distance, km_to_degrees, move_on_globe, TravelTimeModel,
};

use super::{Station, StationId};

/// Closest a simulated station is placed to the epicenter, km
const MIN_STATION_DISTANCE: f64 = 10.0;

/// Ground truth for a simulated event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticQuake {
    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
    /// ms since epoch
    pub origin: i64,
    pub magnitude: f64,
}

impl SyntheticQuake {
    pub fn from_config(config: &PlaygroundConfig, origin: i64) -> Self {
        Self {
            lat: config.lat,
            lon: config.lon,
            depth: config.depth,
            origin,
            magnitude: config.magnitude,
        }
    }

    /// Peak signal-to-noise ratio a station at `distance` km should see
    pub fn expected_ratio(&self, distance: f64) -> f64 {
        10f64.powf(self.magnitude - 2.76 * distance.max(1.0).log10() + 2.48)
    }
}

/// Simulates stations scattered around an epicenter and their raw counts
pub struct NetworkSimulator {
    rng: StdRng,
    model: Arc<dyn TravelTimeModel>,
    sample_rate: f64,
    noise: f64,
    stations: Vec<Station>,
}

impl NetworkSimulator {
    pub fn new(config: &PlaygroundConfig, model: Arc<dyn TravelTimeModel>) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let radius = config.network_radius_km.max(MIN_STATION_DISTANCE);

        let stations = (0..config.station_count)
            .map(|i| {
                // uniform over the disc
                let dist = MIN_STATION_DISTANCE
                    + (radius - MIN_STATION_DISTANCE) * rng.gen::<f64>().sqrt();
                let bearing = rng.gen_range(0.0..360.0);
                let point = move_on_globe(config.lat, config.lon, dist, bearing);
                let alt = rng.gen_range(0.0..1500.0);
                let code = format!("S{i:03}");
                Station::new(StationId(i as u32), "SY", &code, point.lat, point.lon, alt)
            })
            .collect();

        Self {
            rng,
            model,
            sample_rate: config.sample_rate,
            noise: config.noise,
            stations,
        }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Raw samples for `station` over `[start, end)`: gaussian background plus
    /// decaying P and S wave trains
    pub fn waveform(
        &mut self,
        station: &Station,
        quake: &SyntheticQuake,
        start: i64,
        end: i64,
    ) -> Vec<(i64, i32)> {
        let dist_gc = great_circle_distance(quake.lat, quake.lon, station.lat, station.lon);
        let dist_ge = geological_distance(
            quake.lat,
            quake.lon,
            -quake.depth,
            station.lat,
            station.lon,
            station.alt / 1000.0,
        );
        let angle = km_to_degrees(dist_gc);
        let arrival = |travel: Option<f64>| travel.map(|t| quake.origin + (t * 1000.0) as i64);
        let p_arrival = arrival(self.model.p_wave(quake.depth, angle));
        let s_arrival = arrival(self.model.s_wave(quake.depth, angle));
        let amplitude = self.noise * quake.expected_ratio(dist_ge);

        let interval = 1000.0 / self.sample_rate;
        let count = ((end - start) as f64 / interval).max(0.0) as usize;
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let time = start + (i as f64 * interval) as i64;
            let t = time as f64 / 1000.0;
            let background: f64 = self.rng.sample::<f64, _>(StandardNormal) * self.noise;

            let mut signal = 0.0;
            if let Some(p) = p_arrival.filter(|&p| time >= p) {
                let since = (time - p) as f64 / 1000.0;
                signal += 0.5 * amplitude * (-since / 10.0).exp() * (2.0 * PI * 2.0 * t).sin();
            }
            if let Some(s) = s_arrival.filter(|&s| time >= s) {
                let since = (time - s) as f64 / 1000.0;
                signal += amplitude * (-since / 20.0).exp() * (2.0 * PI * t).sin();
            }

            samples.push((time, (background + signal) as i32));
        }
        samples
    }
}
