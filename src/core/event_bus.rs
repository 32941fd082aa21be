// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Event bus for inter-component communication

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::sensors::{Batch, Reading, SensorKind};

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A reading flagged `alert` or `cold_spot_detected`
    Alert {
        sensor_id: String,
        sensor_type: SensorKind,
        value: f64,
        reason: String,
    },
    Motion {
        sensor_id: String,
        total_events: u64,
    },
    /// Zero-quality reading
    SensorFault {
        sensor_id: String,
        message: String,
    },
    Status {
        key: String,
        value: String,
    },
}

impl EventPayload {
    /// Events a single reading gives rise to
    pub fn from_reading(reading: &Reading) -> Vec<EventPayload> {
        let mut events = Vec::new();
        let sensor_id = reading.sensor_id().to_string();

        if reading.quality() == 0.0 {
            events.push(EventPayload::SensorFault {
                sensor_id,
                message: reading.error().unwrap_or("zero quality").to_string(),
            });
            return events;
        }

        for reason in ["alert", "cold_spot_detected"] {
            if reading.flag(reason) {
                events.push(EventPayload::Alert {
                    sensor_id: sensor_id.clone(),
                    sensor_type: reading.sensor_type(),
                    value: reading.value().as_f64(),
                    reason: reason.to_string(),
                });
            }
        }

        if reading.sensor_type() == SensorKind::Motion && reading.value().as_bool() == Some(true) {
            let total_events = reading
                .metadata()
                .get("total_events")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            events.push(EventPayload::Motion { sensor_id, total_events });
        }

        events
    }
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    batch_tx: broadcast::Sender<Arc<Batch>>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (batch_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            batch_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    /// Publish a batch and the events derived from its readings
    pub fn publish_batch(&self, batch: Arc<Batch>) {
        for reading in batch.readings() {
            for payload in EventPayload::from_reading(reading) {
                self.publish_event(payload);
            }
        }
        let _ = self.batch_tx.send(batch);
    }

    pub fn publish_status(&self, key: &str, value: &str) {
        self.publish_event(EventPayload::Status {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn publish_event(&self, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_batches(&self) -> broadcast::Receiver<Arc<Batch>> {
        self.batch_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub fn events_published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{Metadata, ReadingValue, SensorIdentity};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn reading(kind: SensorKind, value: f64, quality: f64, flags: &[(&str, Value)]) -> Reading {
        let mut metadata = Metadata::new();
        for (k, v) in flags {
            metadata.insert(k.to_string(), v.clone());
        }
        let id = SensorIdentity::new(kind.name(), kind, kind.default_unit());
        let value: ReadingValue = if kind == SensorKind::Motion { (value > 0.0).into() } else { value.into() };
        Reading::new(&id, value, quality, metadata, Utc::now())
    }

    #[test]
    fn test_events_from_readings() {
        let alert = reading(SensorKind::Emf, 3.1, 1.0, &[("alert", Value::Bool(true))]);
        assert_eq!(
            EventPayload::from_reading(&alert),
            vec![EventPayload::Alert {
                sensor_id: "emf".into(),
                sensor_type: SensorKind::Emf,
                value: 3.1,
                reason: "alert".into(),
            }]
        );

        let quiet = reading(SensorKind::Emf, 0.3, 1.0, &[("alert", Value::Bool(false))]);
        assert!(EventPayload::from_reading(&quiet).is_empty());

        let motion = reading(SensorKind::Motion, 1.0, 1.0, &[("total_events", Value::from(4))]);
        assert_eq!(
            EventPayload::from_reading(&motion),
            vec![EventPayload::Motion { sensor_id: "motion".into(), total_events: 4 }]
        );

        let failed = reading(SensorKind::Pressure, 0.0, 0.0, &[("error", Value::from("boom"))]);
        assert_eq!(
            EventPayload::from_reading(&failed),
            vec![EventPayload::SensorFault { sensor_id: "pressure".into(), message: "boom".into() }]
        );
    }

    #[tokio::test]
    async fn test_publish_batch_reaches_subscribers() {
        let bus = EventBus::new(16);
        let mut batches = bus.subscribe_batches();
        let mut events = bus.subscribe_events();

        let cold = reading(SensorKind::Temperature, 55.0, 1.0, &[("cold_spot_detected", Value::Bool(true))]);
        let mut readings = BTreeMap::new();
        readings.insert("temperature".to_string(), cold);
        bus.publish_batch(Arc::new(Batch::new(Utc::now(), readings)));

        let batch = batches.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        let event = events.recv().await.unwrap();
        assert!(matches!(event.payload, EventPayload::Alert { ref reason, .. } if reason == "cold_spot_detected"));
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(0);
        bus.publish_status("state", "idle");
        bus.publish_batch(Arc::new(Batch::new(Utc::now(), BTreeMap::new())));
        assert_eq!(bus.events_published(), 1);
    }
}
