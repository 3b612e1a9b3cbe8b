// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Magnitude estimation from station peak ratios

use std::sync::Arc;

use tracing::trace;

use crate::detection::StationEvent;
use crate::geo::{
    geological_distance, great_circle_distance, km_to_degrees, MagnitudeTable, TravelTimeModel,
};

use super::Earthquake;

/// Records must run this long past the expected S arrival to be taken at face value
const S_WAVE_MARGIN_MS: i64 = 8000;

/// Median of an ascending slice, lower middle for even lengths
pub fn median(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    Some(sorted[(sorted.len() - 1) / 2])
}

/// Per-station magnitudes for an earthquake
pub struct MagnitudeEstimator {
    model: Arc<dyn TravelTimeModel>,
    table: Arc<dyn MagnitudeTable>,
}

impl MagnitudeEstimator {
    pub fn new(model: Arc<dyn TravelTimeModel>, table: Arc<dyn MagnitudeTable>) -> Self {
        Self { model, table }
    }

    /// Ascending per-station magnitudes; stations the model cannot reach are
    /// skipped. `None` when nothing is left.
    pub fn estimate<'a>(
        &self,
        quake: &Earthquake,
        events: impl IntoIterator<Item = &'a StationEvent>,
    ) -> Option<Vec<f64>> {
        let mut mags: Vec<f64> = events
            .into_iter()
            .filter(|event| event.valid)
            .filter_map(|event| self.station_magnitude(quake, event))
            .collect();

        if mags.is_empty() {
            return None;
        }
        mags.sort_by(f64::total_cmp);
        Some(mags)
    }

    fn station_magnitude(&self, quake: &Earthquake, event: &StationEvent) -> Option<f64> {
        let dist_gc = great_circle_distance(quake.lat, quake.lon, event.lat, event.lon);
        let dist_ge = geological_distance(
            quake.lat,
            quake.lon,
            -quake.depth,
            event.lat,
            event.lon,
            event.elevation / 1000.0,
        );

        let Some(s_travel) = self.model.s_wave(quake.depth, km_to_degrees(dist_gc)) else {
            trace!(station = %event.station, "No S arrival, station skipped");
            return None;
        };
        let expected_s = quake.origin + (s_travel * 1000.0) as i64;

        // truncated records have not seen the S peak yet
        let multiplier = if event.latest_log_time > expected_s + S_WAVE_MARGIN_MS {
            1.0
        } else {
            (2.0 - dist_gc / 400.0).max(1.0)
        };

        Some(self.table.magnitude(dist_ge, event.max_ratio * multiplier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Hypocenter;
    use crate::geo::{move_on_globe, CoordinateRegions, HomogeneousModel, IntensityTable};
    use crate::sensors::{Station, StationId};

    fn estimator() -> MagnitudeEstimator {
        MagnitudeEstimator::new(
            Arc::new(HomogeneousModel::default()),
            Arc::new(IntensityTable::default()),
        )
    }

    fn quake() -> Earthquake {
        Earthquake::new(1, &Hypocenter::new(0.0, 0.0, 10.0, 0), &CoordinateRegions, 0)
    }

    fn event(id: u32, dist: f64, ratio: f64, latest: i64) -> StationEvent {
        let point = move_on_globe(0.0, 0.0, dist, f64::from(id) * 30.0);
        let station = Station::new(StationId(id), "XX", "S", point.lat, point.lon, 0.0);
        let mut event = StationEvent::new(&station, 0, ratio);
        event.latest_log_time = latest;
        event
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[1.0]), Some(1.0));
        assert_eq!(median(&[1.0, 2.0]), Some(1.0));
        assert_eq!(median(&[1.0, 2.0, 10.0]), Some(2.0));
    }

    #[test]
    fn test_long_record_uses_plain_ratio() {
        let e = event(1, 100.0, 1000.0, 600_000);
        let mags = estimator().estimate(&quake(), [&e]).unwrap();
        let dist_ge = geological_distance(0.0, 0.0, -10.0, e.lat, e.lon, 0.0);
        let expected = IntensityTable::default().magnitude(dist_ge, 1000.0);
        assert!((mags[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_short_record_boosted_nearby() {
        let short = event(1, 100.0, 1000.0, 1);
        let long = event(1, 100.0, 1000.0, 600_000);
        let est = estimator();
        let boosted = est.estimate(&quake(), [&short]).unwrap()[0];
        let plain = est.estimate(&quake(), [&long]).unwrap()[0];
        // 2 - 100/400 = 1.75
        assert!((boosted - plain - 1.75_f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_and_invalid_skipped() {
        let far = event(1, 18_000.0, 1000.0, 0);
        let mut invalid = event(2, 100.0, 1000.0, 0);
        invalid.valid = false;
        assert!(estimator().estimate(&quake(), [&far, &invalid]).is_none());
    }
}
