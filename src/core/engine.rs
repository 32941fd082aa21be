// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Main engine - wires configuration, event bus and sensor manager together

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{EventBus, RunContext, SystemState};
use crate::analysis::AnomalyMonitor;
use crate::config::Config;
use crate::sensors::SensorManager;

/// Main GlowBarn engine
pub struct Engine {
    pub config: Arc<Config>,
    context: RunContext,
    event_bus: Arc<EventBus>,
    manager: Arc<SensorManager>,
    task: Option<JoinHandle<Result<()>>>,
    monitor_task: Option<JoinHandle<()>>,
    start_time: Option<Instant>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let context = RunContext::new();
        let event_bus = Arc::new(EventBus::new(config.event_capacity));
        let manager = Arc::new(SensorManager::new(&config, context.clone(), Arc::clone(&event_bus)));

        Ok(Self {
            config,
            context,
            event_bus,
            manager,
            task: None,
            monitor_task: None,
            start_time: None,
        })
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn manager(&self) -> Arc<SensorManager> {
        Arc::clone(&self.manager)
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Initialize sensors and spawn the sampling loop. Returns the number of
    /// sensors ready.
    pub async fn start(&mut self) -> Result<usize> {
        if self.task.is_some() {
            bail!("engine already started");
        }
        info!("Starting GlowBarn engine...");

        let ready = self.manager.initialize().await;
        self.context.resume();
        if self.config.monitor.enabled {
            let monitor = AnomalyMonitor::new(self.config.monitor.clone());
            self.monitor_task = Some(tokio::spawn(
                monitor.run(Arc::clone(&self.event_bus), self.context.clone()),
            ));
        }
        let manager = Arc::clone(&self.manager);
        self.task = Some(tokio::spawn(async move { manager.run().await }));
        self.start_time = Some(Instant::now());
        self.event_bus.publish_status("engine", "running");

        info!(sensors_ready = ready, "GlowBarn engine started");
        Ok(ready)
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping GlowBarn engine...");
        self.context.stop();

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Sampling loop failed"),
                Err(e) => error!(error = %e, "Sampling task panicked"),
            }
        }
        if let Some(task) = self.monitor_task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Anomaly monitor panicked");
            }
        }
        self.manager.shutdown().await;
        self.start_time = None;
        self.event_bus.publish_status("engine", "stopped");

        info!("GlowBarn engine stopped");
        Ok(())
    }

    pub async fn state(&self) -> SystemState {
        SystemState {
            running: self.task.is_some() && self.context.is_running(),
            sensors_ready: self.manager.ready_count().await,
            batches_sampled: self.manager.batches_sampled(),
            uptime_seconds: self.uptime(),
            last_batch: self.manager.latest().map(|batch| batch.timestamp()),
        }
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}
