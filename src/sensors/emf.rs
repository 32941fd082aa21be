// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! EMF sensor - K-II style electromagnetic field meter in milliGauss

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::base::SensorCore;
use super::reading::round_to;
use super::traits::{ensure_finite, Sample, Sensor};
use crate::error::SensorError;

/// Ambient field of a quiet room
pub const EMF_BASELINE_MG: f64 = 0.3;
/// Readings above this raise `alert`
pub const EMF_ALERT_THRESHOLD_MG: f64 = 2.0;
const SPIKE_PROBABILITY: f64 = 0.02;
const NOISY_ABOVE_MG: f64 = 10.0;

/// Coarse EMF bands, matching the LEDs on a K-II meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmfAlertLevel {
    Normal,
    Elevated,
    High,
    VeryHigh,
}

impl EmfAlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

pub fn alert_level(value_mg: f64) -> EmfAlertLevel {
    if value_mg < 0.5 {
        EmfAlertLevel::Normal
    } else if value_mg < 2.0 {
        EmfAlertLevel::Elevated
    } else if value_mg < 5.0 {
        EmfAlertLevel::High
    } else {
        EmfAlertLevel::VeryHigh
    }
}

pub struct EmfSensor {
    core: SensorCore,
    baseline: f64,
}

impl EmfSensor {
    pub fn new(core: SensorCore) -> Self {
        Self {
            core,
            baseline: EMF_BASELINE_MG,
        }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    fn calibrate(&mut self) {
        self.baseline = EMF_BASELINE_MG;
    }
}

#[async_trait]
impl Sensor for EmfSensor {
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
        self.calibrate();
        true
    }

    fn sample(&mut self, _now: DateTime<Utc>) -> Result<Sample, SensorError> {
        self.core.probe(0)?;

        let noise = self.core.noise();
        let mut raw = self.baseline + noise.gaussian(0.0, 0.1);
        let spike = noise.chance(SPIKE_PROBABILITY);
        if spike {
            raw += noise.uniform(1.0, 5.0);
        }

        let raw = ensure_finite("emf field", raw)?;
        let value = round_to(if raw > 0.0 { raw } else { 0.0 }, 2);
        let quality = if value >= NOISY_ABOVE_MG { 0.8 } else { 1.0 };

        Ok(Sample::new(value)
            .quality(quality)
            .with("baseline", self.baseline)
            .with("deviation", round_to(value - self.baseline, 2))
            .with("alert", value > EMF_ALERT_THRESHOLD_MG)
            .with("alert_level", alert_level(value).as_str())
            .with("spike", spike))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::base::test_core;
    use crate::sensors::reading::Reading;
    use crate::sensors::noise::{NoiseSource, SeededNoise};
    use crate::sensors::SensorKind;

    struct BrokenNoise;

    impl NoiseSource for BrokenNoise {
        fn gaussian(&mut self, _mean: f64, _std_dev: f64) -> f64 {
            f64::NAN
        }
        fn uniform(&mut self, low: f64, _high: f64) -> f64 {
            low
        }
        fn chance(&mut self, _probability: f64) -> bool {
            false
        }
    }

    /// Constant field offset with an optional minimum spike
    struct Steady {
        field: f64,
        spike: bool,
    }

    impl NoiseSource for Steady {
        fn gaussian(&mut self, _mean: f64, _std_dev: f64) -> f64 {
            self.field
        }
        fn uniform(&mut self, low: f64, _high: f64) -> f64 {
            low
        }
        fn chance(&mut self, _probability: f64) -> bool {
            self.spike
        }
    }

    async fn read_steady(field: f64, spike: bool) -> Reading {
        let mut sensor = EmfSensor::new(test_core(SensorKind::Emf, Box::new(Steady { field, spike })));
        assert!(sensor.initialize().await);
        sensor.read().await
    }

    #[test]
    fn test_alert_levels() {
        assert_eq!(alert_level(0.3), EmfAlertLevel::Normal);
        assert_eq!(alert_level(0.5), EmfAlertLevel::Elevated);
        assert_eq!(alert_level(2.0), EmfAlertLevel::High);
        assert_eq!(alert_level(7.5), EmfAlertLevel::VeryHigh);
    }

    #[tokio::test]
    async fn test_spike_rate_and_no_negatives() {
        let core = test_core(SensorKind::Emf, Box::new(SeededNoise::from_seed(2026)));
        let mut sensor = EmfSensor::new(core);
        assert!(sensor.initialize().await);

        let mut spikes = 0;
        for _ in 0..100_000 {
            let reading = sensor.read().await;
            let value = reading.value().as_f64();
            assert!(value >= 0.0);
            assert_eq!(reading.unit(), "mG");
            assert!((0.0..=1.0).contains(&reading.quality()));
            assert_eq!(reading.flag("alert"), value > EMF_ALERT_THRESHOLD_MG);
            if reading.flag("spike") {
                spikes += 1;
            }
        }
        assert!((1750..=2250).contains(&spikes), "spikes = {}", spikes);
    }

    #[tokio::test]
    async fn test_non_finite_sample_fails_softly() {
        let mut sensor = EmfSensor::new(test_core(SensorKind::Emf, Box::new(BrokenNoise)));
        assert!(sensor.initialize().await);

        let reading = sensor.read().await;
        assert_eq!(reading.value().as_f64(), 0.0);
        assert_eq!(reading.quality(), 0.0);
        assert!(reading.error().unwrap().contains("emf field"));
    }

    #[tokio::test]
    async fn test_read_before_initialize() {
        let mut sensor = EmfSensor::new(test_core(SensorKind::Emf, Box::new(SeededNoise::from_seed(3))));
        let reading = sensor.read().await;
        assert!(reading.is_failed());
        assert_eq!(reading.error(), Some("sensor not initialized"));
        assert_eq!(sensor.last_reading(), Some(&reading));
    }

    #[tokio::test]
    async fn test_strong_field_lowers_quality() {
        let reading = read_steady(9.0, false).await;
        assert_eq!(reading.value().as_f64(), 9.3);
        assert_eq!(reading.quality(), 1.0);

        let reading = read_steady(9.7, false).await;
        assert_eq!(reading.value().as_f64(), 10.0);
        assert_eq!(reading.quality(), 0.8);

        let reading = read_steady(9.0, true).await;
        assert_eq!(reading.value().as_f64(), 10.3);
        assert_eq!(reading.quality(), 0.8);
        assert!(reading.flag("spike"));
        assert!(reading.flag("alert"));
        assert_eq!(reading.metadata()["alert_level"], "very_high");
        assert_eq!(reading.metadata()["deviation"], 10.0);
    }
}
