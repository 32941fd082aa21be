// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! GlowBarn Sensors - sensor abstraction and anomaly flagging core
//!
//! Six environmental sensors (EMF, temperature, humidity, motion, vibration,
//! pressure) behind one async `Sensor` trait, each bound to a GPIO, I2C or
//! serial transport that falls back to a simulated signal when the hardware
//! is absent. A manager samples every ready sensor at a fixed cadence and
//! publishes batches of readings on the event bus, where a CUSUM monitor
//! watches for sustained level shifts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      GlowBarn Engine                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌────────────────────┐  │
//! │  │  Config   │ → │  Sensor   │ → │     Event Bus      │  │
//! │  │  (TOML)   │   │  Manager  │   │ batches + alerts   │  │
//! │  └───────────┘   └───────────┘   └────────────────────┘  │
//! │                        ↓                                 │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  EMF · Temperature · Humidity · Motion · Vibration │  │
//! │  │  Pressure                                          │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                        ↓                                 │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐              │
//! │  │   GPIO   │   │   I2C    │   │  Serial  │  (or mock)   │
//! │  └──────────┘   └──────────┘   └──────────┘              │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod sensors;
pub mod transport;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::{Engine, EventBus, RunContext};
pub use error::{ConfigError, SensorError, TransportError};
pub use sensors::{Batch, Reading, ReadingValue, Sensor, SensorKind, SensorManager};
pub use transport::{TransportConfig, TransportMode};

/// GlowBarn version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GlowBarn name
pub const NAME: &str = "GlowBarn";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        rust_version: option_env!("CARGO_PKG_RUST_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or("unspecified")
            .to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Minimum supported Rust version
    pub rust_version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    let mut features = vec![];

    #[cfg(feature = "serial")]
    features.push("serial".to_string());

    #[cfg(feature = "hardware")]
    features.push("hardware".to_string());

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, VERSION);
        assert!(!info.os.is_empty());
        assert_eq!(info.features.contains(&"serial".to_string()), cfg!(feature = "serial"));
    }
}
