// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Main analysis engine - owns the clusters and drives each cycle

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::config::Config;
use crate::detection::{AnalysisOutcome, Cluster, DetectionEngine, HypocenterSearch};
use crate::earthquake::{
    ArchiveSink, Earthquake, EarthquakeArchive, EarthquakeRegistry, MagnitudeEstimator,
};
use crate::error::Result;
use crate::geo::{
    CoordinateRegions, HomogeneousModel, IntensityTable, MagnitudeTable, RegionResolver,
    TravelTimeModel,
};

use super::{EngineStats, EventBus};

const BUS_CAPACITY: usize = 1024;

/// Current wall clock in ms since epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Orchestrates clusters, the search engine and the earthquake registry
pub struct Engine {
    config: Arc<Config>,
    pool: ThreadPool,
    clusters: Vec<Cluster>,
    detection: DetectionEngine,
    magnitude: MagnitudeEstimator,
    registry: Arc<EarthquakeRegistry>,
    archive: Arc<dyn ArchiveSink>,
    bus: Arc<EventBus>,
    start_time: Instant,
    cycles: u64,
}

impl Engine {
    /// Engine with the built-in travel-time model, magnitude table, region
    /// names and an in-memory archive
    pub fn new(config: Config) -> Result<Self> {
        Self::with_collaborators(
            config,
            Arc::new(HomogeneousModel::default()),
            Arc::new(IntensityTable::default()),
            Arc::new(CoordinateRegions),
            Arc::new(EarthquakeArchive::default()),
        )
    }

    pub fn with_collaborators(
        config: Config,
        model: Arc<dyn TravelTimeModel>,
        table: Arc<dyn MagnitudeTable>,
        regions: Arc<dyn RegionResolver>,
        archive: Arc<dyn ArchiveSink>,
    ) -> Result<Self> {
        config.validate()?;

        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("quakewatch-{i}"));
        if config.analysis.worker_threads > 0 {
            builder = builder.num_threads(config.analysis.worker_threads);
        }
        let pool = builder.build()?;
        info!(threads = pool.current_num_threads(), "Analysis pool ready");

        let registry = Arc::new(EarthquakeRegistry::new());
        let bus = Arc::new(EventBus::new(BUS_CAPACITY));
        let search = HypocenterSearch::new(model.clone(), config.finder);

        Ok(Self {
            detection: DetectionEngine::new(search, registry.clone(), regions, bus.clone()),
            magnitude: MagnitudeEstimator::new(model, table),
            config: Arc::new(config),
            pool,
            clusters: Vec::new(),
            registry,
            archive,
            bus,
            start_time: Instant::now(),
            cycles: 0,
        })
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<EarthquakeRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn add_cluster(&mut self, cluster: Cluster) -> u64 {
        let id = cluster.id();
        debug!(cluster = id, "Cluster added");
        self.clusters.push(cluster);
        id
    }

    pub fn cluster(&self, id: u64) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id() == id)
    }

    pub fn cluster_mut(&mut self, id: u64) -> Option<&mut Cluster> {
        self.clusters.iter_mut().find(|c| c.id() == id)
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Refresh every cluster's derived state; returns how many changed
    pub fn tick(&mut self) -> usize {
        self.clusters
            .iter_mut()
            .map(|c| c.tick())
            .filter(|&changed| changed)
            .count()
    }

    /// One analysis cycle: every cluster is ticked and searched in parallel,
    /// then every live earthquake gets its magnitude recomputed in parallel
    pub fn run_cycle(&mut self, now: i64) -> Vec<(u64, AnalysisOutcome)> {
        let started = Instant::now();
        let Self {
            pool,
            clusters,
            detection,
            ..
        } = self;

        let outcomes: Vec<(u64, AnalysisOutcome)> = pool.install(|| {
            clusters
                .par_iter_mut()
                .map(|cluster| {
                    cluster.tick();
                    (cluster.id(), detection.process_cluster(cluster, now))
                })
                .collect()
        });

        self.update_magnitudes();
        self.cycles += 1;

        debug!(
            cycle = self.cycles,
            clusters = self.clusters.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis cycle finished"
        );
        outcomes
    }

    fn update_magnitudes(&self) {
        let registry = &self.registry;
        let magnitude = &self.magnitude;
        let clusters = &self.clusters;

        self.pool.install(|| {
            clusters.par_iter().for_each(|cluster| {
                let Some(id) = cluster.earthquake() else {
                    return;
                };
                let Some(quake) = registry.get(id) else {
                    return;
                };
                if let Some(mags) = magnitude.estimate(&quake, cluster.assigned_events().values()) {
                    registry.set_magnitude(id, mags);
                }
            });
        });
    }

    /// Periodic eviction: archive earthquakes that outlived their retention
    pub fn second(&self, now: i64) -> Vec<Earthquake> {
        let archived = self.registry.sweep(now, self.archive.as_ref());
        for quake in &archived {
            self.bus.publish_archived(quake.clone());
        }
        archived
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            clusters: self.clusters.len(),
            live_earthquakes: self.registry.len(),
            cycles: self.cycles,
            events_published: self.bus.published(),
            uptime_seconds: self.uptime(),
        }
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
