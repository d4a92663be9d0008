//! Fixed-capacity rolling window of indexed chart points.

use serde::Serialize;
use std::collections::VecDeque;

/// Default number of points kept per chart series.
pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub index: u64,
    pub value: f64,
}

/// Keeps the most recent `capacity` points in insertion order.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    points: VecDeque<Point>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Appends a point, returning the evicted oldest point once full.
    pub fn push(&mut self, index: u64, value: f64) -> Option<Point> {
        debug_assert!(
            self.points.back().map_or(true, |last| last.index < index),
            "window indices must increase"
        );
        self.points.push_back(Point { index, value });
        if self.points.len() > self.capacity {
            self.points.pop_front()
        } else {
            None
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn points(&self) -> Vec<Point> {
        self.points.iter().copied().collect()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
