// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;
use crate::sensors::{SensorKind, UnitFormat};
use crate::transport::TransportConfig;

/// Baud rate used when a serial entry omits one
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Bus used when an I2C entry omits one
pub const DEFAULT_I2C_BUS: u8 = 1;

/// Shortest tick the sampling loop accepts
pub const MIN_LOOP_PERIOD: Duration = Duration::from_millis(1);

/// Longest tick the sampling loop accepts
pub const MAX_LOOP_PERIOD: Duration = Duration::from_secs(3600);

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Capacity of the event bus channels
    pub event_capacity: usize,

    /// Sampling loop configuration
    pub sampling: SamplingConfig,

    /// Hardware access paths
    pub hardware: HardwareConfig,

    /// Change point monitoring
    pub monitor: MonitorConfig,

    /// Per-sensor configuration
    pub sensors: SensorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "GlowBarn".to_string(),
            log_level: "info".to_string(),
            event_capacity: 1000,
            sampling: SamplingConfig::default(),
            hardware: HardwareConfig::default(),
            monitor: MonitorConfig::default(),
            sensors: SensorsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject settings the sampling loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if loop_period(self.sampling.rate_hz).is_none() {
            return Err(ConfigError::InvalidLoopRate(self.sampling.rate_hz));
        }
        self.monitor.validate()
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("glowbarn"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Sampling loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Loop cadence in Hz
    pub rate_hz: f64,

    /// Seed for the simulated signal; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Tick length for a loop rate, or `None` when the rate is not positive,
/// not finite, or yields a period outside `MIN_LOOP_PERIOD..=MAX_LOOP_PERIOD`.
pub fn loop_period(rate_hz: f64) -> Option<Duration> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return None;
    }
    let period = Duration::try_from_secs_f64(1.0 / rate_hz).ok()?;
    (MIN_LOOP_PERIOD..=MAX_LOOP_PERIOD)
        .contains(&period)
        .then_some(period)
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            rate_hz: 10.0,
            seed: None,
        }
    }
}

/// Where hardware lives on the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Linux sysfs GPIO directory
    pub gpio_root: PathBuf,

    /// I2C device node prefix; the bus index is appended
    pub i2c_device_prefix: String,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            i2c_device_prefix: "/dev/i2c-".to_string(),
        }
    }
}

/// CUSUM monitor settings. Slack and decision interval are multiples of the
/// standard deviation learned over `window` readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,

    /// Readings used to learn each sensor's baseline
    pub window: usize,

    pub allowance_sigma: f64,

    pub threshold_sigma: f64,

    /// Floor for the learned standard deviation
    pub min_std_dev: f64,

    /// Minimum gap between two alerts of one sensor
    pub cooldown_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 50,
            allowance_sigma: 0.5,
            threshold_sigma: 8.0,
            min_std_dev: 0.05,
            cooldown_ms: 5_000,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::InvalidMonitor("window must hold at least 2 readings"));
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.threshold_sigma) || !positive(self.min_std_dev) {
            return Err(ConfigError::InvalidMonitor(
                "threshold_sigma and min_std_dev must be positive",
            ));
        }
        if !self.allowance_sigma.is_finite() || self.allowance_sigma < 0.0 {
            return Err(ConfigError::InvalidMonitor("allowance_sigma must not be negative"));
        }
        Ok(())
    }
}

/// One table per sensor type. A table left out of the file means the
/// sensor is disabled; the built-in default enables all six.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorsConfig {
    #[serde(default)]
    pub emf: SensorEntry,
    #[serde(default)]
    pub temperature: SensorEntry,
    #[serde(default)]
    pub humidity: SensorEntry,
    #[serde(default)]
    pub motion: SensorEntry,
    #[serde(default)]
    pub vibration: SensorEntry,
    #[serde(default)]
    pub pressure: SensorEntry,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            emf: SensorEntry::enabled(),
            temperature: SensorEntry::enabled(),
            humidity: SensorEntry::enabled(),
            motion: SensorEntry::enabled(),
            vibration: SensorEntry::enabled(),
            pressure: SensorEntry::enabled(),
        }
    }
}

impl SensorsConfig {
    /// Nothing enabled
    pub fn none() -> Self {
        Self {
            emf: SensorEntry::default(),
            temperature: SensorEntry::default(),
            humidity: SensorEntry::default(),
            motion: SensorEntry::default(),
            vibration: SensorEntry::default(),
            pressure: SensorEntry::default(),
        }
    }

    /// Entries in declaration order
    pub fn entries(&self) -> [(SensorKind, &SensorEntry); 6] {
        [
            (SensorKind::Emf, &self.emf),
            (SensorKind::Temperature, &self.temperature),
            (SensorKind::Humidity, &self.humidity),
            (SensorKind::Motion, &self.motion),
            (SensorKind::Vibration, &self.vibration),
            (SensorKind::Pressure, &self.pressure),
        ]
    }

    pub fn entry_mut(&mut self, kind: SensorKind) -> &mut SensorEntry {
        match kind {
            SensorKind::Emf => &mut self.emf,
            SensorKind::Temperature => &mut self.temperature,
            SensorKind::Humidity => &mut self.humidity,
            SensorKind::Motion => &mut self.motion,
            SensorKind::Vibration => &mut self.vibration,
            SensorKind::Pressure => &mut self.pressure,
        }
    }
}

/// A `[sensors.<type>]` table. Absent keys fall back to per-type defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorEntry {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f64>,
    /// Temperature only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_format: Option<UnitFormat>,
    /// Motion only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl SensorEntry {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Pick the transport binding: `port` selects serial, `address`/`bus`
    /// select I2C, `pin` selects GPIO, otherwise the type's default.
    pub fn transport(&self, kind: SensorKind) -> Result<TransportConfig, ConfigError> {
        if let Some(port) = &self.port {
            let baud_rate = self.baudrate.unwrap_or(DEFAULT_BAUD_RATE);
            if baud_rate == 0 {
                return Err(ConfigError::InvalidBaudRate { sensor: kind.name().to_string() });
            }
            return Ok(TransportConfig::Serial { port: port.clone(), baud_rate });
        }

        if self.address.is_some() || self.bus.is_some() {
            let (default_bus, default_address) = match kind.default_transport() {
                TransportConfig::I2c { bus, address } => (bus, Some(address)),
                _ => (DEFAULT_I2C_BUS, None),
            };
            let address = self
                .address
                .or(default_address)
                .ok_or(ConfigError::MissingAddress { sensor: kind.name().to_string() })?;
            if address > 0x7F {
                return Err(ConfigError::InvalidAddress {
                    sensor: kind.name().to_string(),
                    address,
                });
            }
            return Ok(TransportConfig::I2c {
                bus: self.bus.unwrap_or(default_bus),
                address,
            });
        }

        if let Some(pin) = self.pin {
            return Ok(TransportConfig::Gpio { pin });
        }

        Ok(kind.default_transport())
    }

    pub fn sample_rate(&self, kind: SensorKind) -> Result<f64, ConfigError> {
        match self.sample_rate {
            Some(rate) if !rate.is_finite() || rate <= 0.0 => Err(ConfigError::InvalidSampleRate {
                sensor: kind.name().to_string(),
                rate,
            }),
            Some(rate) => Ok(rate),
            None => Ok(kind.default_sample_rate()),
        }
    }

    pub fn model(&self, kind: SensorKind) -> String {
        self.sensor_model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_rate_bounds() {
        let mut config = Config::default();
        assert_eq!(loop_period(10.0), Some(Duration::from_millis(100)));
        assert_eq!(loop_period(1000.0), Some(MIN_LOOP_PERIOD));

        for rate in [1e10, 1e-300, 0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert_eq!(loop_period(rate), None, "rate {rate}");
            config.sampling.rate_hz = rate;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidLoopRate(_))
            ));
        }
    }

    #[test]
    fn test_monitor_settings() {
        let config: Config = toml::from_str(
            r#"
            [monitor]
            window = 20
            cooldown_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.monitor.window, 20);
        assert_eq!(config.monitor.cooldown_ms, 0);
        assert_eq!(config.monitor.threshold_sigma, MonitorConfig::default().threshold_sigma);
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.monitor.window = 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMonitor(_))));
        config.monitor.window = 50;
        config.monitor.threshold_sigma = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMonitor(_))));
    }

    #[test]
    fn test_default_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glowbarn").join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, Config::default());

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn test_omitted_tables_are_disabled() {
        let config: Config = toml::from_str(
            r#"
            [sensors.emf]
            enabled = true
            pin = 18

            [sensors.pressure]
            enabled = true
            "#,
        )
        .unwrap();

        let enabled: Vec<SensorKind> = config
            .sensors
            .entries()
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(kind, _)| *kind)
            .collect();
        assert_eq!(enabled, vec![SensorKind::Emf, SensorKind::Pressure]);
        assert_eq!(config.sampling.rate_hz, 10.0);
        assert_eq!(
            config.sensors.emf.transport(SensorKind::Emf).unwrap(),
            TransportConfig::Gpio { pin: 18 }
        );
    }

    #[test]
    fn test_transport_selection() {
        let pressure = SensorEntry::enabled();
        assert_eq!(
            pressure.transport(SensorKind::Pressure).unwrap(),
            TransportConfig::I2c { bus: 1, address: 0x76 }
        );

        let usb_emf = SensorEntry {
            port: Some("/dev/ttyUSB0".to_string()),
            ..SensorEntry::enabled()
        };
        assert_eq!(
            usb_emf.transport(SensorKind::Emf).unwrap(),
            TransportConfig::Serial { port: "/dev/ttyUSB0".to_string(), baud_rate: 9600 }
        );

        let moved = SensorEntry { address: Some(0x77), ..SensorEntry::enabled() };
        assert_eq!(
            moved.transport(SensorKind::Pressure).unwrap(),
            TransportConfig::I2c { bus: 1, address: 0x77 }
        );
    }

    #[test]
    fn test_bad_entries_are_reported() {
        let wide = SensorEntry { address: Some(0x1FF), ..SensorEntry::enabled() };
        assert!(matches!(
            wide.transport(SensorKind::Pressure),
            Err(ConfigError::InvalidAddress { .. })
        ));

        let no_address = SensorEntry { bus: Some(0), ..SensorEntry::enabled() };
        assert!(matches!(
            no_address.transport(SensorKind::Humidity),
            Err(ConfigError::MissingAddress { .. })
        ));

        let zero_baud = SensorEntry {
            port: Some("/dev/ttyS0".to_string()),
            baudrate: Some(0),
            ..SensorEntry::enabled()
        };
        assert!(zero_baud.transport(SensorKind::Emf).is_err());

        let negative = SensorEntry { sample_rate: Some(-1.0), ..SensorEntry::enabled() };
        assert!(negative.sample_rate(SensorKind::Vibration).is_err());
    }

    #[test]
    fn test_rejects_zero_loop_rate() {
        let mut config = Config::default();
        config.sampling.rate_hz = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidLoopRate(0.0)));
    }
}
