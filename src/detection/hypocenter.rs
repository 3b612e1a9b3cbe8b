// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Hypocenter candidates and their ranking

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// A candidate origin: position, depth (km) and origin time (ms since epoch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hypocenter {
    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
    pub origin: i64,
    /// Sum of squared timing residuals, s²
    pub total_err: f64,
    pub correct_stations: usize,
    pub wrong_events_count: usize,
}

impl Hypocenter {
    pub fn new(lat: f64, lon: f64, depth: f64, origin: i64) -> Self {
        Self {
            lat,
            lon,
            depth,
            origin,
            total_err: 0.0,
            correct_stations: 0,
            wrong_events_count: 0,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// True when `first` strictly outranks `second`: more correct stations first,
/// then lower total error, then position and origin time. The ordering is
/// total, so the choice is commutative and associative for parallel reduction.
pub fn prefers_first(first: Option<&Hypocenter>, second: Option<&Hypocenter>) -> bool {
    match (first, second) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(a), Some(b)) => rank(a, b) == Ordering::Less,
    }
}

fn rank(a: &Hypocenter, b: &Hypocenter) -> Ordering {
    b.correct_stations
        .cmp(&a.correct_stations)
        .then_with(|| a.total_err.total_cmp(&b.total_err))
        .then_with(|| a.lat.total_cmp(&b.lat))
        .then_with(|| a.lon.total_cmp(&b.lon))
        .then_with(|| a.depth.total_cmp(&b.depth))
        .then_with(|| a.origin.cmp(&b.origin))
}

/// Better of two candidates; `None` always loses
pub fn select_better(first: Option<Hypocenter>, second: Option<Hypocenter>) -> Option<Hypocenter> {
    if prefers_first(first.as_ref(), second.as_ref()) {
        first
    } else {
        second
    }
}

/// Terminal outcome of validating a search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HypocenterCondition {
    Ok,
    Null,
    DistantEventNotEnoughStations,
    NotEnoughCorrectStations,
    TooShallowAngle,
    PreviousWasBetter,
}

impl HypocenterCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Null => "NULL",
            Self::DistantEventNotEnoughStations => "DISTANT_EVENT_NOT_ENOUGH_STATIONS",
            Self::NotEnoughCorrectStations => "NOT_ENOUGH_CORRECT_STATIONS",
            Self::TooShallowAngle => "TOO_SHALLOW_ANGLE",
            Self::PreviousWasBetter => "PREVIOUS_WAS_BETTER",
        }
    }
}

impl fmt::Display for HypocenterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
