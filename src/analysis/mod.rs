// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Analysis module - streaming statistics over published batches

mod anomaly;
mod monitor;

pub use anomaly::{ChangePointDetector, ExponentialMovingAverage, Shift, SlidingWindow};
pub use monitor::{AnomalyMonitor, ChangePoint, CHANGE_POINT_REASON};
