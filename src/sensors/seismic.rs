// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Vibration sensor in g

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::base::SensorCore;
use super::reading::round_to;
use super::traits::{ensure_finite, Sample, Sensor};
use crate::error::SensorError;

pub const VIBRATION_ALERT_G: f64 = 0.1;
const SPIKE_PROBABILITY: f64 = 0.005;

/// Piezo / SW-420 vibration pickup
pub struct VibrationSensor {
    core: SensorCore,
}

impl VibrationSensor {
    pub fn new(core: SensorCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Sensor for VibrationSensor {
    fn core(&self) -> &SensorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SensorCore {
        &mut self.core
    }

    fn sample(&mut self, _now: DateTime<Utc>) -> Result<Sample, SensorError> {
        self.core.probe(0)?;

        let noise = self.core.noise();
        let mut value = noise.gaussian(0.01, 0.005).abs();
        if noise.chance(SPIKE_PROBABILITY) {
            value += noise.uniform(0.1, 0.5);
        }
        let value = round_to(ensure_finite("vibration", value)?, 4);

        Ok(Sample::new(value).with("alert", value > VIBRATION_ALERT_G))
    }
}
