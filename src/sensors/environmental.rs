// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Environmental sensors - humidity and barometric pressure

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::base::SensorCore;
use super::reading::round_to;
use super::traits::{ensure_finite, Sample, Sensor};
use crate::error::SensorError;

/// Relative humidity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComfortLevel {
    Dry,
    Comfortable,
    Humid,
    VeryHumid,
}

impl ComfortLevel {
    pub fn from_humidity(percent: f64) -> Self {
        if percent < 30.0 {
            Self::Dry
        } else if percent < 50.0 {
            Self::Comfortable
        } else if percent < 70.0 {
            Self::Humid
        } else {
            Self::VeryHumid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dry => "dry",
            Self::Comfortable => "comfortable",
            Self::Humid => "humid",
            Self::VeryHumid => "very_humid",
        }
    }
}

/// DHT22 style relative humidity sensor
pub struct HumiditySensor {
    core: SensorCore,
    model: String,
    last_humidity: f64,
}

impl HumiditySensor {
    pub fn new(core: SensorCore, model: String) -> Self {
        Self {
            core,
            model,
            last_humidity: 45.0,
        }
    }
}

#[async_trait]
impl Sensor for HumiditySensor {
    fn core(&self) -> &SensorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SensorCore {
        &mut self.core
    }

    fn sample(&mut self, _now: DateTime<Utc>) -> Result<Sample, SensorError> {
        self.core.probe(0)?;

        let drift = ensure_finite("humidity drift", self.core.noise().gaussian(0.0, 1.0))?;
        self.last_humidity = (self.last_humidity + drift).clamp(10.0, 95.0);
        let value = round_to(self.last_humidity, 1);

        Ok(Sample::new(value)
            .with("model", self.model.as_str())
            .with("comfort_level", ComfortLevel::from_humidity(value).as_str()))
    }
}

pub const SEA_LEVEL_HPA: f64 = 1013.25;
const METERS_PER_HPA: f64 = 8.3;
const TREND_WINDOW: usize = 10;
const TREND_THRESHOLD_HPA: f64 = 0.5;

/// BMP280/BME280 chip-id register and expected ids
const REG_CHIP_ID: u8 = 0xD0;
const REG_STATUS: u8 = 0xF3;
const BMP280_CHIP_ID: u8 = 0x58;
const BME280_CHIP_ID: u8 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureTrend {
    Rising,
    Falling,
    Stable,
}

impl PressureTrend {
    /// Compare the newest sample of the window with the oldest
    pub fn over(window: &VecDeque<f64>) -> Self {
        match (window.front(), window.back()) {
            (Some(first), Some(last)) if last - first > TREND_THRESHOLD_HPA => Self::Rising,
            (Some(first), Some(last)) if first - last > TREND_THRESHOLD_HPA => Self::Falling,
            _ => Self::Stable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Stable => "stable",
        }
    }
}

/// Rough altitude above sea level for a pressure reading
pub fn altitude_approx_m(pressure_hpa: f64) -> f64 {
    ((SEA_LEVEL_HPA - pressure_hpa) * METERS_PER_HPA).round()
}

/// I2C barometric pressure sensor
pub struct PressureSensor {
    core: SensorCore,
    model: String,
    last_pressure: f64,
    history: VecDeque<f64>,
}

impl PressureSensor {
    pub fn new(core: SensorCore, model: String) -> Self {
        Self {
            core,
            model,
            last_pressure: SEA_LEVEL_HPA,
            history: VecDeque::with_capacity(TREND_WINDOW),
        }
    }

    pub fn trend(&self) -> PressureTrend {
        PressureTrend::over(&self.history)
    }

    fn check_chip_id(&mut self) {
        match self.core.probe(REG_CHIP_ID) {
            Ok(Some(BMP280_CHIP_ID)) | Ok(Some(BME280_CHIP_ID)) | Ok(None) => {}
            Ok(Some(id)) => {
                warn!(sensor = %self.core.id(), chip_id = id, "Unexpected pressure sensor chip id");
            }
            Err(e) => {
                warn!(sensor = %self.core.id(), error = %e, "Could not read chip id");
            }
        }
    }
}

#[async_trait]
impl Sensor for PressureSensor {
    fn core(&self) -> &SensorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SensorCore {
        &mut self.core
    }

    async fn initialize(&mut self) -> bool {
        if !self.core.initialize() {
            return false;
        }
        self.check_chip_id();
        info!(sensor = %self.core.id(), model = %self.model, "Pressure sensor ready");
        true
    }

    fn sample(&mut self, _now: DateTime<Utc>) -> Result<Sample, SensorError> {
        self.core.probe(REG_STATUS)?;

        let drift = ensure_finite("pressure drift", self.core.noise().gaussian(0.0, 0.1))?;
        self.last_pressure = (self.last_pressure + drift).clamp(980.0, 1050.0);
        let value = round_to(self.last_pressure, 2);

        if self.history.len() == TREND_WINDOW {
            self.history.pop_front();
        }
        self.history.push_back(value);

        Ok(Sample::new(value)
            .with("model", self.model.as_str())
            .with("altitude_approx_m", altitude_approx_m(value))
            .with("trend", self.trend().as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::base::test_core;
    use crate::sensors::noise::{NoiseSource, SeededNoise};
    use crate::sensors::SensorKind;

    /// Pushes the gaussian term by a fixed step
    struct Ramp(f64);

    impl NoiseSource for Ramp {
        fn gaussian(&mut self, _mean: f64, _std_dev: f64) -> f64 {
            self.0
        }
        fn uniform(&mut self, low: f64, _high: f64) -> f64 {
            low
        }
        fn chance(&mut self, _probability: f64) -> bool {
            false
        }
    }

    #[test]
    fn test_comfort_levels() {
        assert_eq!(ComfortLevel::from_humidity(10.0), ComfortLevel::Dry);
        assert_eq!(ComfortLevel::from_humidity(30.0), ComfortLevel::Comfortable);
        assert_eq!(ComfortLevel::from_humidity(69.9), ComfortLevel::Humid);
        assert_eq!(ComfortLevel::from_humidity(70.0), ComfortLevel::VeryHumid);
    }

    #[tokio::test]
    async fn test_humidity_stays_in_bounds() {
        let core = test_core(SensorKind::Humidity, Box::new(SeededNoise::from_seed(9)));
        let mut sensor = HumiditySensor::new(core, "dht22".into());
        assert!(sensor.initialize().await);

        for _ in 0..10_000 {
            let reading = sensor.read().await;
            let value = reading.value().as_f64();
            assert!((10.0..=95.0).contains(&value), "value = {}", value);
            assert_eq!(reading.unit(), "%");
            assert_eq!(
                reading.metadata()["comfort_level"],
                ComfortLevel::from_humidity(value).as_str()
            );
        }
    }

    #[test]
    fn test_altitude() {
        assert_eq!(altitude_approx_m(SEA_LEVEL_HPA), 0.0);
        assert_eq!(altitude_approx_m(1000.0), 110.0);
    }

    #[tokio::test]
    async fn test_pressure_trend() {
        let mut rising = PressureSensor::new(test_core(SensorKind::Pressure, Box::new(Ramp(0.2))), "bmp280".into());
        assert!(rising.initialize().await);
        let first = rising.read().await;
        assert_eq!(first.metadata()["trend"], "stable");
        for _ in 0..9 {
            rising.read().await;
        }
        assert_eq!(rising.trend(), PressureTrend::Rising);

        let mut falling = PressureSensor::new(test_core(SensorKind::Pressure, Box::new(Ramp(-0.2))), "bmp280".into());
        assert!(falling.initialize().await);
        for _ in 0..10 {
            falling.read().await;
        }
        assert_eq!(falling.trend(), PressureTrend::Falling);
        assert_eq!(falling.history.len(), TREND_WINDOW);
    }

    #[tokio::test]
    async fn test_pressure_clamped() {
        let mut sensor = PressureSensor::new(test_core(SensorKind::Pressure, Box::new(Ramp(5.0))), "bme280".into());
        assert!(sensor.initialize().await);
        let mut last = 0.0;
        for _ in 0..100 {
            last = sensor.read().await.value().as_f64();
        }
        assert_eq!(last, 1050.0);
    }
}
