//! Sliding-window mean and variance in O(1) per sample.
//!
//! Welford's update, extended with removal of the sample leaving the window.
//! The accumulators are rebuilt from the window every `capacity` pushes so
//! floating-point drift stays bounded on long streams.

use super::window::RollingWindow;

#[derive(Debug, Clone)]
pub struct RollingStatistics {
    window: RollingWindow<f64>,
    mean: f64,
    m2: f64,
    pushes_since_rebuild: usize,
}

impl RollingStatistics {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "RollingStatistics capacity must be >= 1");
        Self {
            window: RollingWindow::new(capacity),
            mean: 0.0,
            m2: 0.0,
            pushes_since_rebuild: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if let Some(old) = self.window.push(value) {
            self.remove_sample(old);
        }
        self.add_sample(value);

        self.pushes_since_rebuild += 1;
        if self.pushes_since_rebuild >= self.window.capacity() {
            self.rebuild();
        }
    }

    fn add_sample(&mut self, x: f64) {
        let n = self.window.len() as f64;
        let delta = x - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (x - self.mean);
    }

    /// Called after the evicted value has left the window.
    fn remove_sample(&mut self, y: f64) {
        let n_after = self.window.len() as f64 - 1.0;
        if n_after <= 0.0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let old_mean = self.mean;
        self.mean = (old_mean * (n_after + 1.0) - y) / n_after;
        self.m2 -= (y - old_mean) * (y - self.mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
    }

    fn rebuild(&mut self) {
        self.pushes_since_rebuild = 0;
        let n = self.window.len();
        if n == 0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let mean = self.window.sum() / n as f64;
        self.m2 = self.window.iter().map(|v| (v - mean).powi(2)).sum();
        self.mean = mean;
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.mean)
        }
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some((self.m2 / self.window.len() as f64).max(0.0))
        }
    }

    /// Sample variance (n - 1 denominator); `None` with fewer than 2 samples.
    pub fn sample_variance(&self) -> Option<f64> {
        let n = self.window.len();
        if n < 2 {
            None
        } else {
            Some((self.m2 / (n - 1) as f64).max(0.0))
        }
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Deviation of `value` from the window mean in standard deviations.
    ///
    /// `None` until the window is full, and when the deviation is zero.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let mean = self.mean()?;
        let sd = self.std_dev()?;
        if sd <= f64::EPSILON * mean.abs().max(1.0) {
            return None;
        }
        Some((value - mean) / sd)
    }

    pub fn window(&self) -> &RollingWindow<f64> {
        &self.window
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.mean = 0.0;
        self.m2 = 0.0;
        self.pushes_since_rebuild = 0;
    }
}
