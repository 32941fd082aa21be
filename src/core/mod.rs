// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Core engine module - run context, event bus and engine

mod context;
mod engine;
mod event_bus;

pub use context::RunContext;
pub use engine::Engine;
pub use event_bus::{Event, EventBus, EventPayload};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// System-wide state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub running: bool,
    pub sensors_ready: usize,
    pub batches_sampled: u64,
    pub uptime_seconds: u64,
    pub last_batch: Option<DateTime<Utc>>,
}
