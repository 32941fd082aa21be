// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor manager - owns every configured sensor and runs the sampling loop

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::base::SensorCore;
use super::emf::EmfSensor;
use super::environmental::{HumiditySensor, PressureSensor};
use super::motion::{MotionSensor, DEFAULT_DEBOUNCE_MS};
use super::noise::{NoiseSource, SeededNoise};
use super::reading::{Batch, Reading, SensorIdentity};
use super::seismic::VibrationSensor;
use super::thermal::TemperatureSensor;
use super::traits::{Sensor, SensorHealth, SensorKind, SensorState};
use crate::config::{loop_period, Config, HardwareConfig, SamplingConfig, SensorEntry};
use crate::core::{EventBus, RunContext};

/// Construct the sensor for one `[sensors.<type>]` entry.
/// Unusable parameters are logged and replaced by the type's defaults.
pub fn build_sensor(
    kind: SensorKind,
    entry: &SensorEntry,
    hardware: &HardwareConfig,
    noise: Box<dyn NoiseSource>,
) -> Box<dyn Sensor> {
    let binding = entry.transport(kind).unwrap_or_else(|e| {
        warn!(sensor = %kind, error = %e, "Invalid transport settings, using defaults");
        kind.default_transport()
    });
    let sample_rate = entry.sample_rate(kind).unwrap_or_else(|e| {
        warn!(sensor = %kind, error = %e, "Invalid sample rate, using default");
        kind.default_sample_rate()
    });
    let unit_format = entry.unit_format.unwrap_or_default();
    let unit = match kind {
        SensorKind::Temperature => unit_format.unit(),
        _ => kind.default_unit(),
    };

    let transport = binding.open(hardware);
    let core = SensorCore::new(
        SensorIdentity::new(kind.name(), kind, unit),
        binding,
        transport,
        noise,
        sample_rate,
    );

    match kind {
        SensorKind::Emf => Box::new(EmfSensor::new(core)),
        SensorKind::Temperature => {
            Box::new(TemperatureSensor::new(core, entry.model(kind), unit_format))
        }
        SensorKind::Humidity => Box::new(HumiditySensor::new(core, entry.model(kind))),
        SensorKind::Motion => Box::new(MotionSensor::new(
            core,
            entry.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
        )),
        SensorKind::Vibration => Box::new(VibrationSensor::new(core)),
        SensorKind::Pressure => Box::new(PressureSensor::new(core, entry.model(kind))),
    }
}

struct SlotInner {
    sensor: Box<dyn Sensor>,
    health: SensorHealth,
}

/// One sensor behind its own lock
struct SensorSlot {
    id: String,
    inner: Mutex<SlotInner>,
}

/// Clears the loop flag when `run` returns
struct LoopGuard<'a>(&'a AtomicBool);

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Manages all sensors in the system
pub struct SensorManager {
    slots: Vec<SensorSlot>,
    context: RunContext,
    event_bus: Arc<EventBus>,
    period: Duration,
    latest: RwLock<Option<Arc<Batch>>>,
    loop_active: AtomicBool,
    batches: AtomicU64,
}

impl SensorManager {
    /// One sensor per enabled entry, in declaration order
    pub fn new(config: &Config, context: RunContext, event_bus: Arc<EventBus>) -> Self {
        let sensors = config
            .sensors
            .entries()
            .into_iter()
            .enumerate()
            .filter(|(_, (_, entry))| entry.enabled)
            .map(|(stream, (kind, entry))| {
                let noise = SeededNoise::for_sensor(config.sampling.seed, stream as u64);
                build_sensor(kind, entry, &config.hardware, Box::new(noise))
            })
            .collect();

        Self::with_sensors(sensors, config.sampling.rate_hz, context, event_bus)
    }

    pub fn with_sensors(
        sensors: Vec<Box<dyn Sensor>>,
        rate_hz: f64,
        context: RunContext,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let fallback = SamplingConfig::default().rate_hz;
        let period = loop_period(rate_hz).unwrap_or_else(|| {
            warn!(rate_hz, fallback, "Invalid sampling rate, using default");
            Duration::from_secs_f64(1.0 / fallback)
        });

        let mut slots: Vec<SensorSlot> = Vec::with_capacity(sensors.len());
        for sensor in sensors {
            let id = sensor.id().to_string();
            if slots.iter().any(|slot| slot.id == id) {
                warn!(sensor = %id, "Duplicate sensor id, ignoring");
                continue;
            }
            let health = SensorHealth::new(&id, sensor.sensor_type());
            info!(sensor = %id, sensor_type = %sensor.sensor_type(), "Added sensor");
            slots.push(SensorSlot {
                id,
                inner: Mutex::new(SlotInner { sensor, health }),
            });
        }

        Self {
            slots,
            context,
            event_bus,
            period,
            latest: RwLock::new(None),
            loop_active: AtomicBool::new(false),
            batches: AtomicU64::new(0),
        }
    }

    pub fn sensor_ids(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Initialize every sensor in order. Returns how many are ready.
    pub async fn initialize(&self) -> usize {
        info!("Initializing {} sensors...", self.slots.len());
        let mut ready = 0;

        for slot in &self.slots {
            let mut inner = slot.inner.lock().await;
            let SlotInner { sensor, health } = &mut *inner;

            if matches!(health.state, SensorState::Ready | SensorState::Sampling) {
                ready += 1;
                continue;
            }

            health.state = SensorState::Initializing;
            if sensor.initialize().await {
                health.state = SensorState::Ready;
                health.last_error = None;
                health.transport = sensor.transport_mode();
                info!(sensor = %slot.id, mode = ?health.transport, "Sensor ready");
                ready += 1;
            } else {
                health.state = SensorState::Failed;
                health.last_error = Some("initialization failed".to_string());
                error!(sensor = %slot.id, "Sensor failed to initialize");
            }
        }

        info!("Initialized {} of {} sensors", ready, self.slots.len());
        ready
    }

    pub async fn ready_count(&self) -> usize {
        let mut ready = 0;
        for slot in &self.slots {
            if slot.inner.lock().await.health.state == SensorState::Ready {
                ready += 1;
            }
        }
        ready
    }

    /// Read every ready sensor once. Sensors are read concurrently.
    pub async fn sample_once(&self) -> Batch {
        let timestamp = Utc::now();
        let reads = self.slots.iter().map(|slot| async move {
            let mut inner = slot.inner.lock().await;
            if inner.health.state != SensorState::Ready {
                return None;
            }
            inner.health.state = SensorState::Sampling;
            let reading = inner.sensor.read().await;
            inner.health.record(&reading);
            inner.health.state = SensorState::Ready;
            Some((slot.id.clone(), reading))
        });

        let readings: BTreeMap<String, Reading> = join_all(reads).await.into_iter().flatten().collect();
        Batch::new(timestamp, readings)
    }

    /// Sample at the configured rate until the run context is stopped
    pub async fn run(&self) -> Result<()> {
        if self
            .loop_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            bail!("sampling loop already running");
        }
        let _guard = LoopGuard(&self.loop_active);

        info!(period_ms = self.period.as_millis() as u64, "Starting sampling loop");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.context.is_running() {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.context.is_running() {
                        break;
                    }
                    let batch = Arc::new(self.sample_once().await);
                    self.publish(batch);
                }
                _ = self.context.stopped() => break,
            }
        }

        info!(batches = self.batches_sampled(), "Sampling loop stopped");
        Ok(())
    }

    fn publish(&self, batch: Arc<Batch>) {
        debug!(readings = batch.len(), "Batch sampled");
        *self.latest.write() = Some(Arc::clone(&batch));
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.event_bus.publish_batch(batch);
    }

    /// Shut every sensor down. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        info!("Shutting down sensors...");
        for slot in &self.slots {
            let mut inner = slot.inner.lock().await;
            if inner.health.state == SensorState::Released {
                continue;
            }
            inner.health.state = SensorState::ShuttingDown;
            inner.sensor.shutdown().await;
            inner.health.state = SensorState::Released;
        }
    }

    pub async fn health(&self) -> Vec<SensorHealth> {
        let mut health = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            health.push(slot.inner.lock().await.health.clone());
        }
        health
    }

    pub fn latest(&self) -> Option<Arc<Batch>> {
        self.latest.read().clone()
    }

    pub fn batches_sampled(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn is_looping(&self) -> bool {
        self.loop_active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorsConfig;
    use crate::sensors::UnitFormat;
    use crate::transport::{TransportConfig, TransportMode};

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.hardware = HardwareConfig {
            gpio_root: "/nonexistent/glowbarn/gpio".into(),
            i2c_device_prefix: "/nonexistent/glowbarn/i2c-".into(),
        };
        config.sampling.seed = Some(42);
        config
    }

    fn manager(config: &Config) -> SensorManager {
        SensorManager::new(config, RunContext::new(), Arc::new(EventBus::new(64)))
    }

    #[tokio::test]
    async fn test_all_sensors_in_declaration_order() {
        let manager = manager(&offline_config());
        assert_eq!(
            manager.sensor_ids(),
            vec!["emf", "temperature", "humidity", "motion", "vibration", "pressure"]
        );
        assert_eq!(manager.initialize().await, 6);

        let batch = manager.sample_once().await;
        assert_eq!(batch.len(), 6);
        for reading in batch.readings() {
            assert!((0.0..=1.0).contains(&reading.quality()));
            assert_eq!(reading.unit(), reading.sensor_type().default_unit());
        }

        for health in manager.health().await {
            assert_eq!(health.state, SensorState::Ready);
            assert_eq!(health.transport, Some(TransportMode::Simulated));
            assert_eq!(health.readings_count, 1);
        }
    }

    #[tokio::test]
    async fn test_uninitialized_sensors_are_not_sampled() {
        let manager = manager(&offline_config());
        assert!(manager.sample_once().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_sensor_is_skipped() {
        let broken_root = tempfile::tempdir().unwrap();
        let mut config = offline_config();
        config.sensors = SensorsConfig::none();
        config.sensors.emf.enabled = true;
        config.sensors.vibration.enabled = true;
        config.sensors.vibration.pin = Some(23);

        let hardware = HardwareConfig {
            gpio_root: broken_root.path().to_path_buf(),
            ..config.hardware.clone()
        };
        let sensors = vec![
            build_sensor(SensorKind::Emf, &config.sensors.emf, &config.hardware, Box::new(SeededNoise::from_seed(1))),
            // a gpio root with no export machinery is a genuine acquisition error
            build_sensor(SensorKind::Vibration, &config.sensors.vibration, &hardware, Box::new(SeededNoise::from_seed(2))),
        ];
        let manager = SensorManager::with_sensors(sensors, 10.0, RunContext::new(), Arc::new(EventBus::new(8)));

        assert_eq!(manager.initialize().await, 1);
        let batch = manager.sample_once().await;
        assert_eq!(batch.sensor_ids().collect::<Vec<_>>(), vec!["emf"]);

        let health = manager.health().await;
        assert_eq!(health[1].state, SensorState::Failed);
        assert!(health[1].last_error.is_some());
    }

    #[tokio::test]
    async fn test_failed_sensor_recovers_on_retry() {
        let root = tempfile::tempdir().unwrap();
        let mut entry = SensorEntry::enabled();
        entry.pin = Some(23);
        let hardware = HardwareConfig {
            gpio_root: root.path().to_path_buf(),
            ..offline_config().hardware
        };
        let sensors = vec![build_sensor(
            SensorKind::Vibration,
            &entry,
            &hardware,
            Box::new(SeededNoise::from_seed(3)),
        )];
        let manager = SensorManager::with_sensors(sensors, 10.0, RunContext::new(), Arc::new(EventBus::new(8)));

        assert_eq!(manager.initialize().await, 0);
        assert!(manager.health().await[0].last_error.is_some());

        // the pin shows up once sysfs catches up
        std::fs::create_dir(root.path().join("gpio23")).unwrap();
        assert_eq!(manager.initialize().await, 1);

        let health = manager.health().await.remove(0);
        assert_eq!(health.state, SensorState::Ready);
        assert_eq!(health.last_error, None);
        assert_eq!(health.transport, Some(TransportMode::Hardware));
    }

    #[test]
    fn test_unusable_loop_rate_falls_back() {
        for rate in [1e10, 1e-300, 0.0, f64::NAN] {
            let manager = SensorManager::with_sensors(Vec::new(), rate, RunContext::new(), Arc::new(EventBus::new(8)));
            assert_eq!(manager.period(), Duration::from_millis(100), "rate {rate}");
        }
        let manager = SensorManager::with_sensors(Vec::new(), 1000.0, RunContext::new(), Arc::new(EventBus::new(8)));
        assert_eq!(manager.period(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_shutdown_twice() {
        let manager = manager(&offline_config());
        manager.initialize().await;
        manager.shutdown().await;
        manager.shutdown().await;
        assert!(manager
            .health()
            .await
            .iter()
            .all(|h| h.state == SensorState::Released));
        assert!(manager.sample_once().await.is_empty());
    }

    #[test]
    fn test_build_sensor_applies_entry() {
        let mut entry = SensorEntry::enabled();
        entry.unit_format = Some(UnitFormat::Celsius);
        let hardware = offline_config().hardware;
        let sensor = build_sensor(
            SensorKind::Temperature,
            &entry,
            &hardware,
            Box::new(SeededNoise::from_seed(1)),
        );
        assert_eq!(sensor.unit(), "°C");

        let mut bad = SensorEntry::enabled();
        bad.address = Some(0x1FF);
        bad.sample_rate = Some(-1.0);
        let sensor = build_sensor(SensorKind::Pressure, &bad, &hardware, Box::new(SeededNoise::from_seed(1)));
        assert_eq!(sensor.core().binding(), &TransportConfig::I2c { bus: 1, address: 0x76 });
        assert_eq!(sensor.core().sample_rate(), 10.0);
    }

    #[tokio::test]
    async fn test_run_stops_with_context() {
        let config = offline_config();
        let context = RunContext::new();
        let manager = Arc::new(SensorManager::new(&config, context.clone(), Arc::new(EventBus::new(64))));
        manager.initialize().await;

        let task = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.run().await })
        };
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(manager.is_looping());
        assert!(manager.run().await.is_err());

        context.stop();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(!manager.is_looping());
        assert!(manager.batches_sampled() >= 1);
        assert_eq!(manager.latest().unwrap().len(), 6);
    }
}
