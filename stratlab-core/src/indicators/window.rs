//! Fixed-capacity ring buffer.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    capacity: usize,
    buf: VecDeque<T>,
}

impl<T: Copy> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "RollingWindow capacity must be >= 1");
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a value; returns the evicted oldest value once full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent value.
    pub fn last(&self) -> Option<T> {
        self.buf.back().copied()
    }

    /// Oldest value still in the window.
    pub fn first(&self) -> Option<T> {
        self.buf.front().copied()
    }

    /// Value `n` steps back from the newest (`ago(0)` == `last()`).
    pub fn ago(&self, n: usize) -> Option<T> {
        if n >= self.buf.len() {
            return None;
        }
        self.buf.get(self.buf.len() - 1 - n).copied()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.buf.iter()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl RollingWindow<f64> {
    pub fn max(&self) -> Option<f64> {
        self.buf.iter().copied().reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.buf.iter().copied().reduce(f64::min)
    }

    pub fn sum(&self) -> f64 {
        self.buf.iter().sum()
    }
}
