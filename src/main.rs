// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! QuakeWatch - Seismic Event Detection and Hypocenter Location Engine
//!
//! Runs a synthetic earthquake through a simulated station network and
//! reports how close the located hypocenter lands to the truth.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use quakewatch::core::now_millis;
use quakewatch::earthquake::EarthquakeArchive;
use quakewatch::geo::{
    great_circle_distance, CoordinateRegions, HomogeneousModel, IntensityTable, TravelTimeModel,
};
use quakewatch::sensors::{NetworkSimulator, SyntheticQuake};
use quakewatch::{Cluster, Config, Engine, QuakeEvent, StationAnalysis, VERSION};

/// Quiet signal fed before the origin so the averages settle
const LEAD_IN_MS: i64 = 60_000;
const STEP_MS: i64 = 1000;

/// QuakeWatch - Seismic Event Detection and Hypocenter Location Engine
#[derive(Parser, Debug)]
#[command(name = "quakewatch")]
#[command(author = "QuakeWatch Project")]
#[command(version = VERSION)]
#[command(about = "Locate a synthetic earthquake from simulated station picks")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Override the simulated magnitude
    #[arg(long)]
    magnitude: Option<f64>,

    /// Override the simulator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of simulated stations
    #[arg(long)]
    stations: Option<usize>,

    /// Override the search resolution (0-100)
    #[arg(long)]
    resolution: Option<f64>,

    /// Pace cycles by the configured interval instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Print the final earthquake list as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("QuakeWatch v{} - Seismic Event Detection", VERSION);

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if let Some(magnitude) = args.magnitude {
        config.playground.magnitude = magnitude;
    }
    if let Some(seed) = args.seed {
        config.playground.seed = seed;
    }
    if let Some(stations) = args.stations {
        config.playground.station_count = stations;
    }
    if let Some(resolution) = args.resolution {
        config.finder.resolution = resolution;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_playground(config, args.realtime, args.json))
}

async fn run_playground(config: Config, realtime: bool, json: bool) -> Result<()> {
    let model: Arc<dyn TravelTimeModel> = Arc::new(HomogeneousModel::default());
    let archive = Arc::new(EarthquakeArchive::default());
    let mut engine = Engine::with_collaborators(
        config.clone(),
        model.clone(),
        Arc::new(IntensityTable::default()),
        Arc::new(CoordinateRegions),
        archive.clone(),
    )?;

    let mut rx = engine.bus().subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.payload {
                    QuakeEvent::Created(quake) => info!("New earthquake: {}", quake.to_summary()),
                    QuakeEvent::Updated(quake) => {
                        let summary = quake.to_summary();
                        info!(revision = quake.revision_id, "Earthquake updated: {}", summary)
                    }
                    QuakeEvent::Removed { id, cluster_id } => {
                        warn!(cluster = cluster_id, "Earthquake {} removed", id)
                    }
                    QuakeEvent::Archived(quake) => {
                        info!("Earthquake archived: {}", quake.to_summary())
                    }
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event listener lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let playground = &config.playground;
    let origin = now_millis();
    let truth = SyntheticQuake::from_config(playground, origin);
    let mut simulator = NetworkSimulator::new(playground, model);

    let mut stations = simulator
        .stations()
        .iter()
        .cloned()
        .map(|station| {
            StationAnalysis::new(
                station,
                simulator.sample_rate(),
                config.buffer.seconds,
                config.buffer.server_mode,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(stations = stations.len(), "Simulated network ready");

    let cluster_id = engine.add_cluster(Cluster::new());
    let end = origin + (playground.duration_secs * 1000.0) as i64;
    let mut time = origin - LEAD_IN_MS;

    while time < end {
        let next = time + STEP_MS;

        for analysis in &mut stations {
            let station = analysis.station().clone();
            for (sample_time, raw) in simulator.waveform(&station, &truth, time, next) {
                analysis.ingest(sample_time, raw);
            }
        }

        if let Some(cluster) = engine.cluster_mut(cluster_id) {
            for analysis in &stations {
                if let Some(event) = analysis.event() {
                    cluster.assign(event.clone());
                }
            }
        }

        for (id, outcome) in engine.run_cycle(next) {
            debug!(cluster = id, ?outcome, "Cycle outcome");
        }
        engine.second(next);

        if realtime {
            tokio::time::sleep(Duration::from_millis(config.analysis.cycle_interval_ms)).await;
        }
        time = next;
    }

    let located = engine.registry().snapshot();
    if located.is_empty() {
        warn!("No earthquake located");
    }
    for quake in &located {
        info!(
            error_km = great_circle_distance(quake.lat, quake.lon, truth.lat, truth.lon),
            depth_error_km = quake.depth - truth.depth,
            origin_error_ms = quake.origin - truth.origin,
            magnitude_error = quake.mag - truth.magnitude,
            "Final: {}",
            quake.to_summary()
        );
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&located)?);
    }

    let stats = engine.stats();
    info!(
        cycles = stats.cycles,
        events = stats.events_published,
        archived = archive.len(),
        "Playground finished"
    );

    // closes the bus so the listener drains and exits
    drop(engine);
    listener.await?;

    Ok(())
}
