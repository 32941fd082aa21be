// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Streaming statistics - sliding window, EMA and CUSUM change points

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Fixed-size window with running sums
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    data: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    sum_sq: f64,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.data.len() >= self.capacity {
            if let Some(old) = self.data.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
        self.data.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.sum / self.data.len() as f64
    }

    /// Sample variance, 0 with fewer than two values
    pub fn variance(&self) -> f64 {
        if self.data.len() < 2 {
            return 0.0;
        }
        let n = self.data.len() as f64;
        // running sums can go slightly negative through cancellation
        ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }
}

/// Exponential moving average
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    alpha: f64,
    current: Option<f64>,
}

impl ExponentialMovingAverage {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            current: None,
        }
    }

    /// Smoothing equivalent to a `span`-sample window
    pub fn from_span(span: usize) -> Self {
        Self::new(2.0 / (span as f64 + 1.0))
    }

    pub fn update(&mut self, value: f64) -> f64 {
        let ema = match self.current {
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
            None => value,
        };
        self.current = Some(ema);
        ema
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Direction of a detected shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Up,
    Down,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Two-sided CUSUM change point detector
#[derive(Debug, Clone)]
pub struct ChangePointDetector {
    target_mean: f64,
    threshold: f64,
    allowance: f64,
    cusum_pos: f64,
    cusum_neg: f64,
}

impl ChangePointDetector {
    /// `allowance` is the slack per sample, `threshold` the decision interval
    pub fn new(target_mean: f64, threshold: f64, allowance: f64) -> Self {
        Self {
            target_mean,
            threshold,
            allowance,
            cusum_pos: 0.0,
            cusum_neg: 0.0,
        }
    }

    /// Feed one value. Returns the shift direction when either sum crosses
    /// the threshold; both sums reset after a detection.
    pub fn update(&mut self, value: f64) -> Option<Shift> {
        let diff = value - self.target_mean;
        self.cusum_pos = (self.cusum_pos + diff - self.allowance).max(0.0);
        self.cusum_neg = (self.cusum_neg - diff - self.allowance).max(0.0);

        let shift = if self.cusum_pos > self.threshold {
            Some(Shift::Up)
        } else if self.cusum_neg > self.threshold {
            Some(Shift::Down)
        } else {
            None
        };
        if shift.is_some() {
            self.reset();
        }
        shift
    }

    pub fn target(&self) -> f64 {
        self.target_mean
    }

    pub fn set_target(&mut self, mean: f64) {
        self.target_mean = mean;
        self.reset();
    }

    fn reset(&mut self) {
        self.cusum_pos = 0.0;
        self.cusum_neg = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_statistics() {
        let mut window = SlidingWindow::new(4);
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window.variance(), 0.0);

        for v in [2.0, 4.0, 4.0, 4.0] {
            window.push(v);
        }
        assert!(window.is_full());
        assert_eq!(window.mean(), 3.5);
        assert!((window.variance() - 1.0).abs() < 1e-12);

        // oldest value falls out
        window.push(8.0);
        assert_eq!(window.len(), 4);
        assert_eq!(window.values().collect::<Vec<_>>(), vec![4.0, 4.0, 4.0, 8.0]);
        assert_eq!(window.mean(), 5.0);
        assert!((window.std_dev() - 2.0).abs() < 1e-12);

        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn test_ema() {
        let mut ema = ExponentialMovingAverage::from_span(3);
        assert_eq!(ema.value(), None);
        assert_eq!(ema.update(10.0), 10.0);
        assert_eq!(ema.update(20.0), 15.0);
        ema.reset();
        assert_eq!(ema.value(), None);
    }

    #[test]
    fn test_cusum_detects_sustained_shift() {
        let mut detector = ChangePointDetector::new(0.0, 4.0, 0.5);
        for _ in 0..100 {
            assert_eq!(detector.update(0.4), None);
        }

        let mut hits = Vec::new();
        for i in 0..10 {
            if let Some(shift) = detector.update(-2.0) {
                hits.push((i, shift));
            }
        }
        // 1.5 per step crosses 4.0 on the third sample, then starts over
        assert_eq!(hits, vec![(2, Shift::Down), (5, Shift::Down), (8, Shift::Down)]);

        detector.set_target(-2.0);
        assert_eq!(detector.update(-2.0), None);
        assert_eq!(detector.target(), -2.0);
    }
}
