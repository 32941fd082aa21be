// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor traits and common types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::base::SensorCore;
use super::reading::{Metadata, Reading, ReadingValue};
use crate::error::SensorError;
use crate::transport::{TransportConfig, TransportMode};

/// Sensor types supported by GlowBarn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Emf,         // K-II style detector, milliGauss
    Temperature, // DS18B20 / DHT
    Humidity,    // DHT22
    Motion,      // PIR
    Vibration,   // piezo / SW-420
    Pressure,    // BMP280 / BME280
}

impl SensorKind {
    /// All kinds in configuration declaration order
    pub const ALL: [SensorKind; 6] = [
        SensorKind::Emf,
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Motion,
        SensorKind::Vibration,
        SensorKind::Pressure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Emf => "emf",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Motion => "motion",
            Self::Vibration => "vibration",
            Self::Pressure => "pressure",
        }
    }

    /// Unit of measurement. Temperature may be switched to Celsius in config.
    pub fn default_unit(&self) -> &'static str {
        match self {
            Self::Emf => "mG",
            Self::Temperature => "°F",
            Self::Humidity => "%",
            Self::Motion => "bool",
            Self::Vibration => "g",
            Self::Pressure => "hPa",
        }
    }

    pub fn default_transport(&self) -> TransportConfig {
        match self {
            Self::Emf => TransportConfig::Gpio { pin: 17 },
            Self::Temperature => TransportConfig::Gpio { pin: 4 },
            Self::Humidity => TransportConfig::Gpio { pin: 22 },
            Self::Motion => TransportConfig::Gpio { pin: 27 },
            Self::Vibration => TransportConfig::Gpio { pin: 23 },
            Self::Pressure => TransportConfig::I2c { bus: 1, address: 0x76 },
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Emf => "generic",
            Self::Temperature => "ds18b20",
            Self::Humidity => "dht22",
            Self::Motion => "pir",
            Self::Vibration => "generic",
            Self::Pressure => "bmp280",
        }
    }

    /// Nominal device rate in Hz; the manager loop runs at its own cadence
    pub fn default_sample_rate(&self) -> f64 {
        match self {
            Self::Emf => 100.0,
            _ => 10.0,
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-sensor lifecycle state tracked by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorState {
    Unconfigured,
    Initializing,
    Ready,
    Sampling,
    Failed,
    ShuttingDown,
    Released,
}

/// Output of one successful acquisition, before it becomes a [`Reading`]
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub value: ReadingValue,
    pub quality: f64,
    pub metadata: Metadata,
}

impl Sample {
    pub fn new(value: impl Into<ReadingValue>) -> Self {
        Self {
            value: value.into(),
            quality: 1.0,
            metadata: Metadata::new(),
        }
    }

    pub fn quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Reject NaN/inf before it reaches drift state or a reading
pub(crate) fn ensure_finite(what: &str, value: f64) -> Result<f64, SensorError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SensorError::InvalidSample(format!("{} is {}", what, value)))
    }
}

/// Trait for all sensors
///
/// `read` never fails from the caller's side: anything `sample` returns as
/// an error is turned into a zero-value, zero-quality reading carrying an
/// `error` metadata entry.
#[async_trait]
pub trait Sensor: Send {
    fn core(&self) -> &SensorCore;

    fn core_mut(&mut self) -> &mut SensorCore;

    /// One acquisition through the transport plus the drift/anomaly model
    fn sample(&mut self, now: DateTime<Utc>) -> Result<Sample, SensorError>;

    /// Get sensor unique identifier
    fn id(&self) -> &str {
        self.core().id()
    }

    fn sensor_type(&self) -> SensorKind {
        self.core().kind()
    }

    fn unit(&self) -> &str {
        self.core().unit()
    }

    fn is_initialized(&self) -> bool {
        self.core().is_initialized()
    }

    fn transport_mode(&self) -> Option<TransportMode> {
        self.core().transport_mode()
    }

    fn last_reading(&self) -> Option<&Reading> {
        self.core().last_reading()
    }

    /// Acquire the transport. False only on a genuine hardware error.
    async fn initialize(&mut self) -> bool {
        self.core_mut().initialize()
    }

    async fn read(&mut self) -> Reading {
        let now = self.core_mut().now();
        if !self.is_initialized() {
            return self.core_mut().fail(&SensorError::NotInitialized, now);
        }
        match self.sample(now) {
            Ok(sample) => self.core_mut().emit(sample, now),
            Err(e) => self.core_mut().fail(&e, now),
        }
    }

    /// Release the transport. No-op when never initialized.
    async fn shutdown(&mut self) {
        self.core_mut().shutdown()
    }
}

/// Sensor health metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorHealth {
    pub sensor_id: String,
    pub sensor_type: SensorKind,
    pub state: SensorState,
    pub transport: Option<TransportMode>,
    pub readings_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub last_quality: Option<f64>,
}

impl SensorHealth {
    pub fn new(sensor_id: &str, sensor_type: SensorKind) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            sensor_type,
            state: SensorState::Unconfigured,
            transport: None,
            readings_count: 0,
            error_count: 0,
            last_error: None,
            last_quality: None,
        }
    }

    pub fn record(&mut self, reading: &Reading) {
        self.readings_count += 1;
        self.last_quality = Some(reading.quality());
        if let Some(error) = reading.error() {
            self.error_count += 1;
            self.last_error = Some(error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_and_units() {
        let names: Vec<&str> = SensorKind::ALL.iter().map(SensorKind::name).collect();
        assert_eq!(names, ["emf", "temperature", "humidity", "motion", "vibration", "pressure"]);
        assert_eq!(SensorKind::Pressure.default_unit(), "hPa");
        assert_eq!(SensorKind::Motion.default_unit(), "bool");
        assert_eq!(serde_json::to_value(SensorKind::Emf).unwrap(), "emf");
    }

    #[test]
    fn test_sample_builder() {
        let sample = Sample::new(2.5).quality(0.8).with("alert", true);
        assert_eq!(sample.value, ReadingValue::Number(2.5));
        assert_eq!(sample.quality, 0.8);
        assert_eq!(sample.metadata["alert"], Value::Bool(true));
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("x", 1.5).unwrap(), 1.5);
        assert!(ensure_finite("x", f64::NAN).is_err());
        assert!(ensure_finite("x", f64::INFINITY).is_err());
    }
}
