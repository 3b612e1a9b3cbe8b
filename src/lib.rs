// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! QuakeWatch - Seismic Event Detection and Hypocenter Location Engine
//!
//! Locates earthquakes from P-wave picks reported by a network of stations:
//! - Per-station ring buffers of raw, filtered and averaged samples
//! - Clusters of station events with antimeridian-safe centroids
//! - Four-phase parallel hypocenter search over a travel-time model
//! - Earthquake registry with median magnitudes and tiered retention
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    QuakeWatch Engine                      │
//! ├───────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌──────────┐  │
//! │  │ Stations │→ │ Analysis │→ │ Detection │→ │Earthquake│  │
//! │  │          │  │ Buffers  │  │ Clusters  │  │ Registry │  │
//! │  └──────────┘  └──────────┘  └───────────┘  └──────────┘  │
//! │                                    ↓              ↓       │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │                     Event Bus                       │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod detection;
pub mod earthquake;
pub mod error;
pub mod geo;
pub mod sensors;

// Re-exports for convenience
pub use analysis::{StationAnalysis, WaveformBuffer};
pub use config::Config;
pub use core::{Engine, EventBus, QuakeEvent};
pub use detection::{AnalysisOutcome, Cluster, DetectionEngine, Hypocenter, HypocenterSearch};
pub use earthquake::{Earthquake, EarthquakeId, EarthquakeRegistry};
pub use error::{BufferError, QuakeError};
pub use sensors::{Station, StationId};

/// QuakeWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// QuakeWatch name
pub const NAME: &str = "QuakeWatch";
