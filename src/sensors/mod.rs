// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor module - readings, sensor variants and the sampling manager

mod base;
mod emf;
mod environmental;
mod manager;
mod motion;
mod noise;
mod reading;
mod seismic;
mod thermal;
mod traits;

pub use base::SensorCore;
pub use emf::{alert_level, EmfAlertLevel, EmfSensor, EMF_ALERT_THRESHOLD_MG, EMF_BASELINE_MG};
pub use environmental::{
    altitude_approx_m, ComfortLevel, HumiditySensor, PressureSensor, PressureTrend, SEA_LEVEL_HPA,
};
pub use manager::{build_sensor, SensorManager};
pub use motion::{MotionSensor, DEFAULT_DEBOUNCE_MS};
pub use noise::{NoiseSource, SeededNoise};
pub use reading::{round_to, Batch, Metadata, Reading, ReadingValue, SensorIdentity};
pub use seismic::{VibrationSensor, VIBRATION_ALERT_G};
pub use thermal::{detect_cold_spot, TemperatureSensor, UnitFormat, COLD_SPOT_DROP};
pub use traits::{Sample, Sensor, SensorHealth, SensorKind, SensorState};
