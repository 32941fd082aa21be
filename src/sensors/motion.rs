// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! PIR motion sensor

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::info;

use super::base::SensorCore;
use super::traits::{Sample, Sensor};
use crate::error::SensorError;

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
const DETECT_PROBABILITY: f64 = 0.01;

/// Passive infrared motion detector
///
/// On a real GPIO line a detection is a rising edge of the line level,
/// ignored when it lands inside the debounce window of the previous one.
/// Simulated lines fire with a fixed probability per read.
pub struct MotionSensor {
    core: SensorCore,
    debounce: Duration,
    motion_count: u64,
    last_motion: Option<DateTime<Utc>>,
    last_level: bool,
}

impl MotionSensor {
    pub fn new(core: SensorCore, debounce_ms: u64) -> Self {
        Self {
            core,
            debounce: Duration::from_millis(debounce_ms),
            motion_count: 0,
            last_motion: None,
            last_level: false,
        }
    }

    pub fn motion_count(&self) -> u64 {
        self.motion_count
    }

    pub fn last_motion(&self) -> Option<DateTime<Utc>> {
        self.last_motion
    }

    fn within_debounce(&self, now: DateTime<Utc>) -> bool {
        match self.last_motion {
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed < self.debounce,
                Err(_) => true,
            },
            None => false,
        }
    }

    fn detect(&mut self, now: DateTime<Utc>) -> Result<bool, SensorError> {
        match self.core.probe(0)? {
            Some(level) => {
                let level = level != 0;
                let rising = level && !self.last_level;
                self.last_level = level;
                Ok(rising && !self.within_debounce(now))
            }
            None => Ok(self.core.noise().chance(DETECT_PROBABILITY)),
        }
    }
}

#[async_trait]
impl Sensor for MotionSensor {
    fn core(&self) -> &SensorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SensorCore {
        &mut self.core
    }

    fn sample(&mut self, now: DateTime<Utc>) -> Result<Sample, SensorError> {
        let detected = self.detect(now)?;
        if detected {
            self.motion_count += 1;
            self.last_motion = Some(now);
            info!(sensor = %self.core.id(), total = self.motion_count, "Motion detected");
        }

        let last_motion = match self.last_motion {
            Some(t) => Value::from(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => Value::Null,
        };

        Ok(Sample::new(detected)
            .with("total_events", self.motion_count)
            .with("last_motion", last_motion)
            .with("debounce_ms", self.debounce.as_millis() as u64))
    }
}
