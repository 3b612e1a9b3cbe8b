// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Hypocenter search - four-phase ternary refinement over ring distance

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::config::FinderSettings;
use crate::geo::{
    calculate_angle, great_circle_distance, km_to_degrees, GeoPoint, GlobeMover, TravelTimeModel,
};

use super::{prefers_first, select_better, Hypocenter, HypocenterCondition, PickedEvent};

/// Azimuthal bins used for the coverage check
pub const QUADRANTS: usize = 16;

/// Residual charged for a station the model cannot reach, s
const NO_ARRIVAL_PENALTY: f64 = 9999.0;

/// Previous solutions with this many correct stations skip the far phase
pub(crate) const FAR_PHASE_CUTOFF: usize = 12;

/// The depth phase does not scale its iteration count with resolution
const DEPTH_PHASE_ITERATIONS: usize = 2;

#[derive(Debug, Clone, Copy)]
struct ScanParams {
    name: &'static str,
    iterations: usize,
    max_dist: f64,
    depth_accuracy: f64,
    dist_horizontal: f64,
}

/// Locates hypocenters for a set of picks
pub struct HypocenterSearch {
    model: Arc<dyn TravelTimeModel>,
    settings: FinderSettings,
}

impl HypocenterSearch {
    pub fn new(model: Arc<dyn TravelTimeModel>, settings: FinderSettings) -> Self {
        Self { model, settings }
    }

    pub fn settings(&self) -> &FinderSettings {
        &self.settings
    }

    pub fn model(&self) -> &Arc<dyn TravelTimeModel> {
        &self.model
    }

    fn phase(
        &self,
        name: &'static str,
        base_iterations: i32,
        max_dist: f64,
        depth_accuracy: f64,
        dist_horizontal: f64,
    ) -> ScanParams {
        let iterations = (base_iterations + self.settings.iterations_difference()).max(1) as usize;
        ScanParams {
            name,
            iterations,
            max_dist,
            depth_accuracy: depth_accuracy / self.settings.universal_multiplier(),
            dist_horizontal,
        }
    }

    /// Run nearby, far, exact and depth phases around `anchor`
    pub fn find_hypocenter(
        &self,
        events: &[PickedEvent],
        anchor: GeoPoint,
        previous: Option<&Hypocenter>,
    ) -> Option<Hypocenter> {
        if events.is_empty() {
            return None;
        }

        let started = Instant::now();
        debug!(
            multiplier = self.settings.universal_multiplier(),
            iterations_difference = self.settings.iterations_difference(),
            events = events.len(),
            "Starting hypocenter search"
        );

        let nearby = self.phase("nearby", 8, 500.0, 10.0, 15.0);
        let mut best = self.run_phase(events, None, anchor, nearby);

        if needs_far_phase(previous) {
            let far = self.phase("far", 8, 11000.0, 50.0, 50.0);
            best = self.run_phase(events, best, anchor, far);
        }

        let exact = self.phase("exact", 9, 100.0, 5.0, 2.0);
        let centre = best?.location();
        best = self.run_phase(events, best, centre, exact);

        let depth = self.depth_phase();
        let centre = best?.location();
        best = self.run_phase(events, best, centre, depth);

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Hypocenter search finished");
        best
    }

    fn depth_phase(&self) -> ScanParams {
        ScanParams {
            iterations: DEPTH_PHASE_ITERATIONS,
            ..self.phase("depth", 2, 10.0, 0.5, 2.0)
        }
    }

    fn run_phase(
        &self,
        events: &[PickedEvent],
        best: Option<Hypocenter>,
        centre: GeoPoint,
        params: ScanParams,
    ) -> Option<Hypocenter> {
        let started = Instant::now();
        let result = self.scan_area(events, best, centre, params);
        debug!(
            phase = params.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            correct = result.map(|h| h.correct_stations),
            "Search phase done"
        );
        result
    }

    /// Ternary-style narrowing of `[0, max_dist]`. Each iteration samples the
    /// third point opposite the retained sample, halves the interval towards the
    /// better of the two and merges both into the running best.
    fn scan_area(
        &self,
        events: &[PickedEvent],
        mut best: Option<Hypocenter>,
        centre: GeoPoint,
        params: ScanParams,
    ) -> Option<Hypocenter> {
        let mut lower = 0.0;
        let mut upper = params.max_dist;
        // false: the retained sample sits at the upper third point
        let mut previous_up = false;

        let mut previous = self.best_at_dist(
            lower + (upper - lower) * (2.0 / 3.0),
            params.dist_horizontal,
            centre,
            events,
            params.depth_accuracy,
        );
        best = select_better(best, previous);

        for _ in 0..params.iterations {
            let fraction = (if previous_up { 2.0 } else { 1.0 }) / 3.0;
            let dist = lower + (upper - lower) * fraction;
            let comparing = self.best_at_dist(
                dist,
                params.dist_horizontal,
                centre,
                events,
                params.depth_accuracy,
            );

            let mid = (upper + lower) / 2.0;
            let previous_better = !prefers_first(comparing.as_ref(), previous.as_ref());
            let go_down = previous_better == previous_up;
            if go_down {
                upper = mid;
            } else {
                lower = mid;
            }

            best = select_better(best, select_better(comparing, previous));

            previous = if go_down == previous_up { previous } else { comparing };
            previous_up = !go_down;
        }

        best
    }

    /// Best candidate on the ring `dist` km around `centre`, sweeping every
    /// bearing in parallel and every depth from the surface to the model limit
    pub fn best_at_dist(
        &self,
        dist: f64,
        dist_horizontal: f64,
        centre: GeoPoint,
        events: &[PickedEvent],
        depth_accuracy: f64,
    ) -> Option<Hypocenter> {
        let mut angular_resolution = (dist_horizontal * 360.0) / (5.0 * dist);
        angular_resolution /= self.settings.universal_multiplier();
        if !angular_resolution.is_finite() || angular_resolution <= 0.0 {
            angular_resolution = 360.0;
        }

        let angle_count = (360.0 / angular_resolution).ceil().max(1.0) as usize;
        let depth_steps = (self.model.max_depth() / depth_accuracy).floor() as usize;
        let mover = GlobeMover::new(centre.lat, centre.lon, dist);

        (0..angle_count)
            .into_par_iter()
            .map(|i| {
                let point = mover.point(i as f64 * angular_resolution);
                let angles: Vec<f64> = events
                    .iter()
                    .map(|e| {
                        km_to_degrees(great_circle_distance(e.lat, e.lon, point.lat, point.lon))
                    })
                    .collect();

                let mut best = None;
                for step in 0..=depth_steps {
                    let depth = step as f64 * depth_accuracy;
                    let Some(origin) = self.best_origin(depth, events, &angles) else {
                        continue;
                    };
                    let mut hyp = Hypocenter::new(point.lat, point.lon, depth, origin);
                    self.analyse(&mut hyp, events, &angles);
                    best = select_better(Some(hyp), best);
                }
                best
            })
            .reduce(|| None, select_better)
    }

    /// Mean of per-station implied origin times; `None` when no station has an arrival
    fn best_origin(&self, depth: f64, events: &[PickedEvent], angles: &[f64]) -> Option<i64> {
        let mut sum: i64 = 0;
        let mut count: i64 = 0;
        for (event, &angle) in events.iter().zip(angles) {
            if let Some(travel) = self.model.p_wave(depth, angle) {
                sum += event.p_wave - (travel * 1000.0) as i64;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count)
    }

    fn analyse(&self, hyp: &mut Hypocenter, events: &[PickedEvent], angles: &[f64]) {
        let mut total_err = 0.0;
        let mut correct = 0;
        for (event, &angle) in events.iter().zip(angles) {
            let actual = ((event.p_wave - hyp.origin) as f64 / 1000.0).abs();
            let err = self
                .model
                .p_wave(hyp.depth, angle)
                .map_or(NO_ARRIVAL_PENALTY, |expected| (expected - actual).abs());
            if err * 1000.0 < self.settings.p_wave_inaccuracy_threshold {
                correct += 1;
            }
            total_err += err * err;
        }
        hyp.total_err = total_err;
        hyp.correct_stations = correct;
    }

    /// Validate a search result against station geometry and the previous solution
    pub fn check_conditions(
        &self,
        events: &[PickedEvent],
        best: Option<&Hypocenter>,
        previous: Option<&Hypocenter>,
        root: GeoPoint,
    ) -> HypocenterCondition {
        let Some(best) = best else {
            return HypocenterCondition::Null;
        };

        let dist_from_root = best.location().distance_to(&root);
        if dist_from_root > 2000.0 && best.correct_stations < 8 {
            return HypocenterCondition::DistantEventNotEnoughStations;
        }
        if best.correct_stations < 4 {
            return HypocenterCondition::NotEnoughCorrectStations;
        }

        let required = if dist_from_root > 4000.0 {
            1
        } else if dist_from_root > 1000.0 {
            2
        } else {
            3
        };
        if check_quadrants(best, events) < required {
            return HypocenterCondition::TooShallowAngle;
        }

        if previous.is_some_and(|p| best.correct_stations < p.correct_stations) {
            return HypocenterCondition::PreviousWasBetter;
        }

        HypocenterCondition::Ok
    }

    /// Picks that arrive before the origin or miss the predicted travel time
    pub fn wrong_events(&self, selected: &[PickedEvent], hyp: &Hypocenter) -> usize {
        selected
            .iter()
            .filter(|event| {
                let dist = great_circle_distance(event.lat, event.lon, hyp.lat, hyp.lon);
                let angle = km_to_degrees(dist);
                let Some(expected) = self.model.p_wave(hyp.depth, angle) else {
                    return true;
                };
                let expected = (expected * 1000.0) as i64;
                let actual = (event.p_wave - hyp.origin).abs();
                event.p_wave < hyp.origin
                    || (expected - actual).abs() as f64 > self.settings.p_wave_inaccuracy_threshold
            })
            .count()
    }
}

/// The far phase only runs until a previous solution is well constrained
fn needs_far_phase(previous: Option<&Hypocenter>) -> bool {
    previous.map_or(true, |p| p.correct_stations < FAR_PHASE_CUTOFF)
}

/// Number of occupied azimuthal bins around the hypocenter
pub fn check_quadrants(hyp: &Hypocenter, events: &[PickedEvent]) -> usize {
    let mut occupied = [false; QUADRANTS];
    for event in events {
        let angle = calculate_angle(hyp.lat, hyp.lon, event.lat, event.lon);
        let bin = ((angle * QUADRANTS as f64) / 360.0) as usize;
        occupied[bin.min(QUADRANTS - 1)] = true;
    }
    occupied.iter().filter(|&&o| o).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{move_on_globe, HomogeneousModel};

    const ORIGIN: i64 = 1_700_000_000_000;

    fn network(centre: GeoPoint, depth: f64, count: usize, radius: f64) -> Vec<PickedEvent> {
        let model = HomogeneousModel::default();
        (0..count)
            .map(|i| {
                let bearing = i as f64 * 360.0 / count as f64;
                let dist = radius * (0.5 + 0.5 * ((i % 3) as f64) / 2.0);
                let station = move_on_globe(centre.lat, centre.lon, dist, bearing);
                let angle = km_to_degrees(centre.distance_to(&station));
                let travel = model.p_wave(depth, angle).unwrap();
                PickedEvent {
                    p_wave: ORIGIN + (travel * 1000.0) as i64,
                    lat: station.lat,
                    lon: station.lon,
                    elevation: 0.0,
                    max_ratio: 100.0,
                }
            })
            .collect()
    }

    fn search() -> HypocenterSearch {
        HypocenterSearch::new(Arc::new(HomogeneousModel::default()), FinderSettings::default())
    }

    #[test]
    fn test_exact_solution_is_all_correct() {
        let centre = GeoPoint::new(10.0, 20.0);
        let events = network(centre, 20.0, 8, 200.0);
        let search = search();

        let mut hyp = Hypocenter::new(centre.lat, centre.lon, 20.0, ORIGIN);
        let angles: Vec<f64> = events
            .iter()
            .map(|e| km_to_degrees(great_circle_distance(e.lat, e.lon, hyp.lat, hyp.lon)))
            .collect();
        let origin = search.best_origin(20.0, &events, &angles).unwrap();
        assert!((origin - ORIGIN).abs() <= 1);

        search.analyse(&mut hyp, &events, &angles);
        assert_eq!(hyp.correct_stations, 8);
        assert!(hyp.total_err < 1e-3);
        assert_eq!(search.wrong_events(&events, &hyp), 0);
    }

    #[test]
    fn test_wrong_events() {
        let centre = GeoPoint::new(10.0, 20.0);
        let mut events = network(centre, 20.0, 6, 200.0);
        events[0].p_wave += 5000;
        events[1].p_wave = ORIGIN - 10;
        let hyp = Hypocenter::new(centre.lat, centre.lon, 20.0, ORIGIN);
        assert_eq!(search().wrong_events(&events, &hyp), 2);
    }

    #[test]
    fn test_quadrants() {
        let hyp = Hypocenter::new(0.0, 0.0, 10.0, 0);
        let one_sided: Vec<PickedEvent> = (0..5)
            .map(|i| PickedEvent {
                p_wave: 0,
                lat: 1.0 + i as f64 * 0.01,
                lon: 0.001,
                elevation: 0.0,
                max_ratio: 1.0,
            })
            .collect();
        assert_eq!(check_quadrants(&hyp, &one_sided), 1);

        let surrounding = network(GeoPoint::new(0.0, 0.0), 10.0, 8, 100.0);
        assert_eq!(check_quadrants(&hyp, &surrounding), 8);
    }

    #[test]
    fn test_conditions() {
        let centre = GeoPoint::new(10.0, 20.0);
        let events = network(centre, 20.0, 8, 200.0);
        let search = search();

        assert_eq!(search.check_conditions(&events, None, None, centre), HypocenterCondition::Null);

        let mut hyp = Hypocenter::new(centre.lat, centre.lon, 20.0, ORIGIN);
        hyp.correct_stations = 3;
        assert_eq!(
            search.check_conditions(&events, Some(&hyp), None, centre),
            HypocenterCondition::NotEnoughCorrectStations
        );

        hyp.correct_stations = 8;
        assert_eq!(
            search.check_conditions(&events, Some(&hyp), None, centre),
            HypocenterCondition::Ok
        );

        let mut prev = hyp;
        prev.correct_stations = 9;
        assert_eq!(
            search.check_conditions(&events, Some(&hyp), Some(&prev), centre),
            HypocenterCondition::PreviousWasBetter
        );

        let far_root = GeoPoint::new(-40.0, 20.0);
        hyp.correct_stations = 7;
        assert_eq!(
            search.check_conditions(&events, Some(&hyp), None, far_root),
            HypocenterCondition::DistantEventNotEnoughStations
        );
    }

    #[test]
    fn test_too_shallow_angle() {
        let hyp = {
            let mut h = Hypocenter::new(0.0, 0.0, 10.0, 0);
            h.correct_stations = 6;
            h
        };
        let events: Vec<PickedEvent> = (0..6)
            .map(|i| PickedEvent {
                p_wave: 0,
                lat: 1.0 + i as f64 * 0.1,
                lon: 0.001,
                elevation: 0.0,
                max_ratio: 1.0,
            })
            .collect();
        assert_eq!(
            search().check_conditions(&events, Some(&hyp), None, GeoPoint::new(0.0, 0.0)),
            HypocenterCondition::TooShallowAngle
        );
    }

    #[test]
    fn test_best_at_dist_finds_ring_point() {
        let truth = GeoPoint::new(5.0, 5.0);
        let events = network(truth, 10.0, 10, 300.0);
        let centre = move_on_globe(truth.lat, truth.lon, 50.0, 270.0);

        let best = search().best_at_dist(50.0, 2.0, centre, &events, 5.0).unwrap();
        assert!(best.location().distance_to(&truth) < 5.0);
        assert_eq!(best.correct_stations, 10);
    }

    #[test]
    fn test_find_hypocenter() {
        let truth = GeoPoint::new(35.0, 139.0);
        let events = network(truth, 15.0, 10, 250.0);
        let anchor = move_on_globe(truth.lat, truth.lon, 60.0, 45.0);

        let hyp = search().find_hypocenter(&events, anchor, None).unwrap();
        assert!(hyp.location().distance_to(&truth) < 10.0);
        assert!((hyp.depth - 15.0).abs() < 15.0);
        assert!((hyp.origin - ORIGIN).abs() < 1000);
        assert_eq!(hyp.correct_stations, 10);
    }

    #[test]
    fn test_depth_phase_iterations_fixed() {
        for resolution in [0.0, 40.0, 100.0] {
            let settings = FinderSettings {
                resolution,
                ..FinderSettings::default()
            };
            let search = HypocenterSearch::new(Arc::new(HomogeneousModel::default()), settings);
            let depth = search.depth_phase();
            assert_eq!(depth.iterations, 2);
            assert!((depth.depth_accuracy - 0.5 / settings.universal_multiplier()).abs() < 1e-12);
        }

        let fine = FinderSettings {
            resolution: 100.0,
            ..FinderSettings::default()
        };
        let search = HypocenterSearch::new(Arc::new(HomogeneousModel::default()), fine);
        assert_eq!(search.phase("exact", 9, 100.0, 5.0, 2.0).iterations, 13);
    }

    #[test]
    fn test_far_phase_skipped_after_good_solution() {
        let mut previous = Hypocenter::new(0.0, 0.0, 10.0, ORIGIN);
        assert!(needs_far_phase(None));
        previous.correct_stations = FAR_PHASE_CUTOFF - 1;
        assert!(needs_far_phase(Some(&previous)));
        previous.correct_stations = FAR_PHASE_CUTOFF;
        assert!(!needs_far_phase(Some(&previous)));

        // without the far phase the search cannot leave the nearby rings
        let truth = GeoPoint::new(35.0, 139.0);
        let events = network(truth, 15.0, 10, 250.0);
        let anchor = move_on_globe(truth.lat, truth.lon, 3000.0, 90.0);
        let hyp = search().find_hypocenter(&events, anchor, Some(&previous)).unwrap();
        assert!(hyp.location().distance_to(&anchor) <= 500.0 + 100.0 + 10.0 + 1.0);
    }

    #[test]
    fn test_empty_events() {
        assert!(search().find_hypocenter(&[], GeoPoint::new(0.0, 0.0), None).is_none());
    }
}
