// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Continuous monitor - turns sustained level shifts into alert events

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::anomaly::{ChangePointDetector, Shift, SlidingWindow};
use crate::config::MonitorConfig;
use crate::core::{EventBus, EventPayload, RunContext};
use crate::sensors::{Batch, Reading, SensorKind};

/// Alert reason for a CUSUM detection
pub const CHANGE_POINT_REASON: &str = "change_point";

/// Per-sensor detector state
struct Track {
    window: SlidingWindow,
    detector: Option<ChangePointDetector>,
    last_fired: Option<DateTime<Utc>>,
}

impl Track {
    fn new(window: usize) -> Self {
        Self {
            window: SlidingWindow::new(window),
            detector: None,
            last_fired: None,
        }
    }
}

/// A shift the monitor found in one sensor's stream
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePoint {
    pub sensor_id: String,
    pub sensor_type: SensorKind,
    pub value: f64,
    pub baseline: f64,
    pub shift: Shift,
}

impl ChangePoint {
    pub fn into_event(self) -> EventPayload {
        EventPayload::Alert {
            sensor_id: self.sensor_id,
            sensor_type: self.sensor_type,
            value: self.value,
            reason: CHANGE_POINT_REASON.to_string(),
        }
    }
}

/// CUSUM monitor over every numeric sensor.
///
/// A track learns its baseline from the first `window` good readings, then
/// runs a detector with slack and decision interval scaled by the learned
/// standard deviation. After a detection the track relearns from scratch, and
/// detections inside the cooldown are dropped.
pub struct AnomalyMonitor {
    config: MonitorConfig,
    tracks: HashMap<String, Track>,
}

impl AnomalyMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            tracks: HashMap::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Feed one batch, returning the change points it completes
    pub fn observe(&mut self, batch: &Batch) -> Vec<ChangePoint> {
        batch
            .readings()
            .filter_map(|reading| self.observe_reading(reading, batch.timestamp()))
            .collect()
    }

    fn observe_reading(&mut self, reading: &Reading, at: DateTime<Utc>) -> Option<ChangePoint> {
        // motion is a boolean line; failed reads carry no signal
        if reading.sensor_type() == SensorKind::Motion || reading.quality() == 0.0 {
            return None;
        }
        let value = reading.value().as_f64();
        if !value.is_finite() {
            return None;
        }

        let config = &self.config;
        let track = self
            .tracks
            .entry(reading.sensor_id().to_string())
            .or_insert_with(|| Track::new(config.window));

        if track.detector.is_none() {
            track.window.push(value);
            if track.window.is_full() {
                let sigma = track.window.std_dev().max(config.min_std_dev);
                track.detector = Some(ChangePointDetector::new(
                    track.window.mean(),
                    config.threshold_sigma * sigma,
                    config.allowance_sigma * sigma,
                ));
                debug!(
                    sensor = %reading.sensor_id(),
                    baseline = track.window.mean(),
                    sigma,
                    "Baseline learned"
                );
            }
            return None;
        }

        let detector = track.detector.as_mut()?;
        let shift = detector.update(value)?;
        let baseline = detector.target();
        track.detector = None;
        track.window.clear();

        let cooldown = ChronoDuration::milliseconds(config.cooldown_ms as i64);
        if let Some(last) = track.last_fired {
            if at - last < cooldown {
                debug!(sensor = %reading.sensor_id(), "Change point inside cooldown");
                return None;
            }
        }
        track.last_fired = Some(at);

        Some(ChangePoint {
            sensor_id: reading.sensor_id().to_string(),
            sensor_type: reading.sensor_type(),
            value,
            baseline,
            shift,
        })
    }

    /// Watch published batches until the context stops
    pub async fn run(mut self, event_bus: Arc<EventBus>, context: RunContext) {
        info!(window = self.config.window, "Starting anomaly monitor");
        let mut batches = event_bus.subscribe_batches();

        loop {
            tokio::select! {
                _ = context.stopped() => break,
                batch = batches.recv() => match batch {
                    Ok(batch) => {
                        for change in self.observe(&batch) {
                            info!(
                                sensor = %change.sensor_id,
                                value = change.value,
                                baseline = change.baseline,
                                shift = change.shift.as_str(),
                                "Change point"
                            );
                            event_bus.publish_event(change.into_event());
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Anomaly monitor lagging");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        info!("Anomaly monitor stopped");
    }
}
