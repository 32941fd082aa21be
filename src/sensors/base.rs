// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! State shared by every sensor: identity, transport, noise and last reading

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info};

use super::noise::NoiseSource;
use super::reading::{Metadata, Reading, ReadingValue, SensorIdentity};
use super::traits::{Sample, SensorKind};
use crate::error::{SensorError, TransportError};
use crate::transport::{Transport, TransportConfig, TransportMode};

pub struct SensorCore {
    identity: SensorIdentity,
    binding: TransportConfig,
    transport: Box<dyn Transport>,
    noise: Box<dyn NoiseSource>,
    sample_rate: f64,
    initialized: bool,
    last_reading: Option<Reading>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl SensorCore {
    pub fn new(
        identity: SensorIdentity,
        binding: TransportConfig,
        transport: Box<dyn Transport>,
        noise: Box<dyn NoiseSource>,
        sample_rate: f64,
    ) -> Self {
        Self {
            identity,
            binding,
            transport,
            noise,
            sample_rate,
            initialized: false,
            last_reading: None,
            last_timestamp: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn kind(&self) -> SensorKind {
        self.identity.kind
    }

    pub fn unit(&self) -> &str {
        &self.identity.unit
    }

    pub fn binding(&self) -> &TransportConfig {
        &self.binding
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn transport_mode(&self) -> Option<TransportMode> {
        self.transport.mode()
    }

    pub fn is_hardware(&self) -> bool {
        self.transport.mode() == Some(TransportMode::Hardware)
    }

    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    pub fn noise(&mut self) -> &mut dyn NoiseSource {
        self.noise.as_mut()
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }
        match self.transport.acquire() {
            Ok(mode) => {
                self.initialized = true;
                info!(
                    sensor = %self.identity.id,
                    transport = %self.transport.describe(),
                    mode = ?mode,
                    "Sensor initialized"
                );
                true
            }
            Err(e) => {
                error!(sensor = %self.identity.id, error = %e, "Failed to initialize sensor");
                false
            }
        }
    }

    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.transport.release();
        self.initialized = false;
        info!(sensor = %self.identity.id, "Sensor shut down");
    }

    /// Sample time, never earlier than the previous one
    pub fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }

    /// Sample the register once on real hardware; `None` when simulated
    pub fn probe(&mut self, register: u8) -> Result<Option<u8>, TransportError> {
        if self.is_hardware() {
            self.transport.raw_read(register).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn emit(&mut self, sample: Sample, timestamp: DateTime<Utc>) -> Reading {
        let reading = Reading::new(
            &self.identity,
            sample.value,
            sample.quality,
            sample.metadata,
            timestamp,
        );
        debug!(sensor = %self.identity.id, value = ?reading.value(), "Reading");
        self.last_reading = Some(reading.clone());
        reading
    }

    pub fn fail(&mut self, err: &SensorError, timestamp: DateTime<Utc>) -> Reading {
        error!(sensor = %self.identity.id, error = %err, "Sensor read failed");
        let mut metadata = Metadata::new();
        metadata.insert("error".to_string(), Value::from(err.to_string()));
        let reading = Reading::new(
            &self.identity,
            ReadingValue::zero(self.identity.kind),
            0.0,
            metadata,
            timestamp,
        );
        self.last_reading = Some(reading.clone());
        reading
    }
}

/// A core on a GPIO root that does not exist, so it always runs simulated
#[cfg(test)]
pub(crate) fn test_core(kind: SensorKind, noise: Box<dyn NoiseSource>) -> SensorCore {
    test_core_with_unit(kind, kind.default_unit(), noise)
}

#[cfg(test)]
pub(crate) fn test_core_with_unit(
    kind: SensorKind,
    unit: &str,
    noise: Box<dyn NoiseSource>,
) -> SensorCore {
    let binding = kind.default_transport();
    let hardware = crate::config::HardwareConfig {
        gpio_root: std::path::PathBuf::from("/nonexistent/glowbarn/gpio"),
        i2c_device_prefix: "/nonexistent/glowbarn/i2c-".to_string(),
    };
    let transport = binding.open(&hardware);
    SensorCore::new(
        SensorIdentity::new(kind.name(), kind, unit),
        binding,
        transport,
        noise,
        kind.default_sample_rate(),
    )
}
