// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Core engine module - drives clusters, search and eviction

mod engine;
mod event_bus;

pub use engine::{now_millis, Engine};
pub use event_bus::{Event, EventBus, QuakeEvent};

use serde::{Deserialize, Serialize};

/// Engine-wide counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub clusters: usize,
    pub live_earthquakes: usize,
    pub cycles: u64,
    pub events_published: u64,
    pub uptime_seconds: u64,
}
