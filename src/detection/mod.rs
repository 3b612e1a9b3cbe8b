// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Detection module - clusters, pick selection and hypocenter location
//!
//! [`DetectionEngine::process_cluster`] is one analysis pass over one cluster:
//! decide whether the cluster changed enough to search again, pick a strong and
//! spatially spread subset of its picks, locate it and commit the result to the
//! earthquake registry.

mod cluster;
mod hypocenter;
mod pick;
mod search;

pub use cluster::*;
pub use hypocenter::*;
pub use pick::*;
pub use search::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::EventBus;
use crate::earthquake::{Earthquake, EarthquakeId, EarthquakeRegistry};
use crate::geo::{great_circle_distance, GeoPoint, RegionResolver};

/// Fewest picks worth locating
pub const MIN_EVENTS: usize = 5;
/// The strongest pick must reach this ratio
pub const MIN_RATIO: f64 = 16.0;
/// Size of the spread subset handed to the search
pub const TARGET_EVENTS: usize = 30;
/// Required spread between the 10th and 90th percentile arrivals, ms
pub const DELTA_P_THRESHOLD: i64 = 2200;

const RATIO_PERCENTILE: f64 = 0.35;
const KEEP_AT_LEAST: usize = 8;

/// Picks at which re-analysis starts backing off
const BACKOFF_START: usize = 24;
const BACKOFF_GROWTH: f64 = 1.2;

/// Anchor moves once the solution drifts this far from it, km
const ANCHOR_DRIFT: f64 = 400.0;

/// Why a cluster was not searched this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoPicks,
    Backoff,
    NoNewPicks,
    TooWeak,
    TooFewPicks,
    NoRoot,
    NotEnoughDeltaP,
    /// The cluster's earthquake was archived while the cluster kept updating
    Archived,
}

/// Result of one pass over one cluster
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Skipped(SkipReason),
    Rejected(HypocenterCondition),
    Committed {
        earthquake: EarthquakeId,
        pct: f64,
        created: bool,
    },
    Discarded {
        pct: f64,
    },
}

/// Runs the per-cluster search and commits results
pub struct DetectionEngine {
    search: HypocenterSearch,
    registry: Arc<EarthquakeRegistry>,
    regions: Arc<dyn RegionResolver>,
    bus: Arc<EventBus>,
}

impl DetectionEngine {
    pub fn new(
        search: HypocenterSearch,
        registry: Arc<EarthquakeRegistry>,
        regions: Arc<dyn RegionResolver>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            search,
            registry,
            regions,
            bus,
        }
    }

    pub fn search(&self) -> &HypocenterSearch {
        &self.search
    }

    pub fn registry(&self) -> &Arc<EarthquakeRegistry> {
        &self.registry
    }

    pub fn process_cluster(&self, cluster: &mut Cluster, now: i64) -> AnalysisOutcome {
        let mut picks = cluster.picked_events();
        if picks.is_empty() {
            return AnalysisOutcome::Skipped(SkipReason::NoPicks);
        }

        if cluster.earthquake.is_some() && picks.len() >= BACKOFF_START {
            if picks.len() < cluster.next_report_event_count {
                return AnalysisOutcome::Skipped(SkipReason::Backoff);
            }
            cluster.next_report_event_count = (picks.len() as f64 * BACKOFF_GROWTH) as usize;
            debug!(
                cluster = cluster.id(),
                next = cluster.next_report_event_count,
                "Next report scheduled"
            );
        }

        if cluster.last_epicenter_update == cluster.update_count() {
            return AnalysisOutcome::Skipped(SkipReason::NoNewPicks);
        }
        cluster.last_epicenter_update = cluster.update_count();

        picks.sort_by(|a, b| a.max_ratio.total_cmp(&b.max_ratio));
        if picks[picks.len() - 1].max_ratio < MIN_RATIO {
            return AnalysisOutcome::Skipped(SkipReason::TooWeak);
        }

        trim_weak(&mut picks);
        if picks.len() < MIN_EVENTS {
            return AnalysisOutcome::Skipped(SkipReason::TooFewPicks);
        }

        let mut selected = select_spread(&picks);
        selected.sort_by_key(|p| p.p_wave);
        cluster.set_selected(selected.clone());

        let spread = delta_p(&selected);
        if spread < DELTA_P_THRESHOLD {
            debug!(cluster = cluster.id(), delta_p = spread, "Not enough delta-P");
            return AnalysisOutcome::Skipped(SkipReason::NotEnoughDeltaP);
        }

        let (Some(root), Some(anchor)) = (cluster.root(), cluster.anchor()) else {
            return AnalysisOutcome::Skipped(SkipReason::NoRoot);
        };

        debug!(cluster = cluster.id(), selected = selected.len(), "Searching hypocenter");
        let previous = cluster.previous_hypocenter;
        let best = self.search.find_hypocenter(&selected, anchor, previous.as_ref());
        let condition = self
            .search
            .check_conditions(&selected, best.as_ref(), previous.as_ref(), root);

        let Some(mut best) = best else {
            debug!(cluster = cluster.id(), %condition, "Hypocenter rejected");
            return AnalysisOutcome::Rejected(condition);
        };

        if condition != HypocenterCondition::Ok {
            debug!(
                cluster = cluster.id(),
                %condition,
                correct = best.correct_stations,
                "Hypocenter rejected"
            );
            cluster.previous_hypocenter = Some(best);
            return AnalysisOutcome::Rejected(condition);
        }

        let wrong = self.search.wrong_events(&selected, &best);
        best.wrong_events_count = wrong;
        let pct = 100.0 * (selected.len() - wrong) as f64 / selected.len() as f64;
        debug!(
            cluster = cluster.id(),
            pct,
            wrong,
            selected = selected.len(),
            correct = best.correct_stations,
            err = best.total_err,
            "Hypocenter evaluated"
        );

        let outcome = if pct > self.search.settings().correctness_threshold {
            self.commit(cluster, &best, anchor, pct, now)
        } else {
            if let Some(id) = cluster.earthquake.take() {
                if self.registry.remove(id).is_some() {
                    info!(cluster = cluster.id(), %id, pct, "Earthquake removed");
                    self.bus.publish_removed(id, cluster.id());
                }
            }
            AnalysisOutcome::Discarded { pct }
        };

        if previous.is_some_and(|p| p.correct_stations < search::FAR_PHASE_CUTOFF)
            && best.correct_stations >= search::FAR_PHASE_CUTOFF
        {
            debug!(cluster = cluster.id(), "Far search disabled");
        }
        cluster.previous_hypocenter = Some(best);
        outcome
    }

    fn commit(
        &self,
        cluster: &mut Cluster,
        best: &Hypocenter,
        anchor: GeoPoint,
        pct: f64,
        now: i64,
    ) -> AnalysisOutcome {
        if best.location().distance_to(&anchor) > ANCHOR_DRIFT {
            cluster.update_anchor(best);
        }

        let regions = self.regions.as_ref();
        match cluster.earthquake {
            Some(id) => {
                let revision = cluster.revision_id + 1;
                let updated = self.registry.update(id, |quake| {
                    quake.update(best, regions, now);
                    quake.pct = pct;
                    quake.revision_id = revision;
                    quake.clone()
                });
                let Some(quake) = updated else {
                    debug!(cluster = cluster.id(), %id, "Earthquake already archived");
                    return AnalysisOutcome::Skipped(SkipReason::Archived);
                };
                cluster.revision_id = revision;
                info!(cluster = cluster.id(), summary = %quake.to_summary(), "Earthquake updated");
                self.bus.publish_updated(quake);
                AnalysisOutcome::Committed {
                    earthquake: id,
                    pct,
                    created: false,
                }
            }
            None => {
                cluster.revision_id += 1;
                let mut quake = Earthquake::new(cluster.id(), best, regions, now);
                quake.pct = pct;
                quake.revision_id = cluster.revision_id;
                let id = self.registry.insert(quake.clone());
                cluster.earthquake = Some(id);
                info!(cluster = cluster.id(), summary = %quake.to_summary(), "Earthquake created");
                self.bus.publish_created(quake);
                AnalysisOutcome::Committed {
                    earthquake: id,
                    pct,
                    created: true,
                }
            }
        }
    }
}

/// Drop picks under the 35th-percentile ratio, keeping at least eight.
/// `picks` must be sorted by ascending ratio.
fn trim_weak(picks: &mut Vec<PickedEvent>) {
    if picks.is_empty() {
        return;
    }
    let threshold = picks[((picks.len() - 1) as f64 * RATIO_PERCENTILE) as usize].max_ratio;
    let weak = picks.iter().take_while(|p| p.max_ratio < threshold).count();
    let removable = weak.min(picks.len().saturating_sub(KEEP_AT_LEAST));
    picks.drain(..removable);
}

/// Farthest-point subset: start from the strongest pick (the last one) and keep
/// adding the pick whose nearest selected neighbour is farthest away
fn select_spread(picks: &[PickedEvent]) -> Vec<PickedEvent> {
    let Some(first) = picks.len().checked_sub(1) else {
        return Vec::new();
    };

    let dist = |a: &PickedEvent, b: &PickedEvent| great_circle_distance(a.lat, a.lon, b.lat, b.lon);
    let mut taken = vec![false; picks.len()];
    let mut closest: Vec<f64> = picks.iter().map(|p| dist(p, &picks[first])).collect();
    taken[first] = true;
    let mut selected = vec![picks[first]];

    while selected.len() < TARGET_EVENTS {
        let mut furthest = None;
        let mut max_dist = 0.0;
        for (i, &d) in closest.iter().enumerate() {
            if !taken[i] && d > max_dist {
                max_dist = d;
                furthest = Some(i);
            }
        }
        let Some(next) = furthest else {
            break;
        };

        taken[next] = true;
        selected.push(picks[next]);
        for (i, pick) in picks.iter().enumerate() {
            if !taken[i] {
                closest[i] = closest[i].min(dist(pick, &picks[next]));
            }
        }
    }
    selected
}

/// Spread between the 10th and 90th percentile arrivals. `selected` must be
/// sorted by arrival time.
fn delta_p(selected: &[PickedEvent]) -> i64 {
    if selected.is_empty() {
        return 0;
    }
    let last = (selected.len() - 1) as f64;
    selected[(last * 0.9) as usize].p_wave - selected[(last * 0.1) as usize].p_wave
}
