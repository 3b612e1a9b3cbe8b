// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Event bus for earthquake notifications

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::earthquake::{Earthquake, EarthquakeId};

/// Earthquake lifecycle notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QuakeEvent {
    /// First commit of a new earthquake, sent once per earthquake
    Created(Earthquake),
    /// A later revision of the location
    Updated(Earthquake),
    /// Dropped after its solution stopped fitting the picks
    Removed { id: EarthquakeId, cluster_id: u64 },
    /// Evicted from the live registry into the archive
    Archived(Earthquake),
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: QuakeEvent,
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_created(&self, quake: Earthquake) {
        self.publish(QuakeEvent::Created(quake));
    }

    pub fn publish_updated(&self, quake: Earthquake) {
        self.publish(QuakeEvent::Updated(quake));
    }

    pub fn publish_removed(&self, id: EarthquakeId, cluster_id: u64) {
        self.publish(QuakeEvent::Removed { id, cluster_id });
    }

    pub fn publish_archived(&self, quake: Earthquake) {
        self.publish(QuakeEvent::Archived(quake));
    }

    fn publish(&self, payload: QuakeEvent) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            timestamp: Utc::now(),
            payload,
        };
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Number of events published so far
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Hypocenter;
    use crate::geo::CoordinateRegions;

    #[test]
    fn test_publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let quake = Earthquake::new(3, &Hypocenter::new(1.0, 2.0, 3.0, 4), &CoordinateRegions, 5);
        bus.publish_created(quake.clone());
        bus.publish_removed(quake.id, 3);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.id, 0);
        assert!(matches!(first.payload, QuakeEvent::Created(ref q) if q.id == quake.id));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.id, 1);
        assert!(matches!(second.payload, QuakeEvent::Removed { cluster_id: 3, .. }));
        assert_eq!(bus.published(), 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish_removed(EarthquakeId::new(), 1);
        assert_eq!(bus.published(), 1);
    }
}
