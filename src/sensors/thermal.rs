// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Temperature sensor and cold spot detection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::base::SensorCore;
use super::reading::{round_to, Reading};
use super::traits::{ensure_finite, Sample, Sensor};
use crate::error::SensorError;

const AMBIENT_F: f64 = 68.0;
const MIN_F: f64 = 40.0;
const MAX_F: f64 = 100.0;
const COLD_SPOT_PROBABILITY: f64 = 0.01;
/// Drop between consecutive readings that counts as a cold spot
pub const COLD_SPOT_DROP: f64 = 5.0;

/// Reporting unit of a temperature sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFormat {
    #[default]
    Fahrenheit,
    Celsius,
}

impl UnitFormat {
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Fahrenheit => "°F",
            Self::Celsius => "°C",
        }
    }

    /// Convert an absolute Fahrenheit temperature
    fn from_fahrenheit(&self, f: f64) -> f64 {
        match self {
            Self::Fahrenheit => f,
            Self::Celsius => (f - 32.0) * 5.0 / 9.0,
        }
    }

    /// Convert a Fahrenheit difference
    fn delta_from_fahrenheit(&self, df: f64) -> f64 {
        match self {
            Self::Fahrenheit => df,
            Self::Celsius => df * 5.0 / 9.0,
        }
    }
}

/// True when the sequence holds at least three readings and any reading is
/// more than [`COLD_SPOT_DROP`] below its predecessor.
pub fn detect_cold_spot(readings: &[Reading]) -> bool {
    if readings.len() < 3 {
        return false;
    }
    readings
        .windows(2)
        .any(|pair| pair[0].value().as_f64() - pair[1].value().as_f64() > COLD_SPOT_DROP)
}

/// DS18B20 / DHT temperature probe
pub struct TemperatureSensor {
    core: SensorCore,
    model: String,
    unit_format: UnitFormat,
    last_temp_f: f64,
}

impl TemperatureSensor {
    /// The core's unit must match `unit_format`
    pub fn new(core: SensorCore, model: String, unit_format: UnitFormat) -> Self {
        Self {
            core,
            model,
            unit_format,
            last_temp_f: AMBIENT_F,
        }
    }

    pub fn unit_format(&self) -> UnitFormat {
        self.unit_format
    }
}

#[async_trait]
impl Sensor for TemperatureSensor {
    fn core(&self) -> &SensorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SensorCore {
        &mut self.core
    }

    async fn initialize(&mut self) -> bool {
        let ok = self.core.initialize();
        if ok {
            info!(sensor = %self.core.id(), model = %self.model, "Temperature sensor ready");
        }
        ok
    }

    fn sample(&mut self, _now: DateTime<Utc>) -> Result<Sample, SensorError> {
        self.core.probe(0)?;

        let noise = self.core.noise();
        let drift = ensure_finite("temperature drift", noise.gaussian(0.0, 0.3))?;
        let cold_spot = if noise.chance(COLD_SPOT_PROBABILITY) {
            ensure_finite("cold spot", noise.uniform(5.0, 15.0))?
        } else {
            0.0
        };
        self.last_temp_f = (self.last_temp_f + drift).clamp(MIN_F, MAX_F);

        let fahrenheit = round_to(self.last_temp_f - cold_spot, 1);
        let deviation = if cold_spot > 0.0 {
            round_to(self.unit_format.delta_from_fahrenheit(-cold_spot), 2)
        } else {
            0.0
        };
        let value = match self.unit_format {
            UnitFormat::Fahrenheit => fahrenheit,
            UnitFormat::Celsius => round_to(self.unit_format.from_fahrenheit(fahrenheit), 1),
        };

        Ok(Sample::new(value)
            .with("model", self.model.as_str())
            .with("cold_spot_detected", cold_spot > COLD_SPOT_DROP)
            .with(
                "baseline",
                round_to(self.unit_format.from_fahrenheit(self.last_temp_f), 2),
            )
            .with("deviation", deviation))
    }
}
