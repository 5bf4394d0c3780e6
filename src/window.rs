//! Display windowing shared by every 2-D render

use crate::config::WindowStrategy;
use crate::error::Result;
use crate::volume::Volume;
use log::debug;
use serde::Serialize;
use std::fmt;

/// Widths below this are replaced by `max * 2`
pub const MIN_WINDOW_WIDTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSpec {
    pub center: f64,
    pub width: f64,
}

impl WindowSpec {
    #[must_use]
    pub fn new(center: f64, width: f64) -> Self {
        Self { center, width }
    }

    /// Window covering `[min, max]`, widened when nearly degenerate
    #[must_use]
    pub fn from_range(min: f64, max: f64) -> Self {
        let center = (max + min) / 2.0;
        let mut width = max - min;
        if width < MIN_WINDOW_WIDTH {
            width = max * 2.0;
        }
        Self { center, width }
    }

    /// Window over the observed range of `values`; `(0, 0)` when empty
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let range = ValueRange::from_values(values);
        Self::from_range(range.min, range.max)
    }

    #[inline]
    #[must_use]
    pub fn low(&self) -> f64 {
        self.center - self.width / 2.0
    }

    #[inline]
    #[must_use]
    pub fn high(&self) -> f64 {
        self.center + self.width / 2.0
    }

    /// Map a value onto `[0, 255]`, clamping outside the window
    #[inline(always)]
    #[must_use]
    pub fn apply(&self, value: f64) -> u8 {
        let low = self.low();
        if value <= low {
            0
        } else if value >= self.high() {
            255
        } else {
            ((value - low) / self.width * 255.0).round() as u8
        }
    }

    /// Window a whole slice into a caller-owned buffer
    pub fn apply_slice(&self, values: &[f32], out: &mut [u8]) {
        for (dst, &value) in out.iter_mut().zip(values) {
            *dst = self.apply(f64::from(value));
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C={:.1} W={:.1}", self.center, self.width)
    }
}

/// Running min/max
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ValueRange {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl ValueRange {
    #[inline(always)]
    pub fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Range of `values`, or `[0, 0]` when there are none
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut range = Self::default();
        values.into_iter().for_each(|v| range.include(v));
        if range.is_empty() {
            return Self { min: 0.0, max: 0.0 };
        }
        range
    }
}

/// At most `max_samples` depth indices, evenly spaced from 0
#[must_use]
pub fn sample_indices(depth: usize, max_samples: usize) -> Vec<usize> {
    let max_samples = max_samples.max(1);
    let step = (depth / max_samples).max(1);
    (0..depth).step_by(step).take(max_samples).collect()
}

/// Depth indices `strategy` scans
#[must_use]
pub fn indices_for(strategy: WindowStrategy, depth: usize) -> Vec<usize> {
    match strategy {
        WindowStrategy::Sampled { max_samples } => sample_indices(depth, max_samples),
        WindowStrategy::Exact => (0..depth).collect(),
    }
}

/// Compute the volume's display window from the slices `strategy` selects
///
/// # Errors
///
/// Fails only if the scratch store cannot be read
pub fn compute_window(volume: &Volume, strategy: WindowStrategy) -> Result<WindowSpec> {
    let indices = indices_for(strategy, volume.dimensions().depth);
    let mut buffer = vec![0.0f32; volume.dimensions().slice_len()];
    let mut range = ValueRange::default();

    for &z in &indices {
        volume.read_slice_into(z, &mut buffer)?;
        buffer.iter().for_each(|&v| range.include(f64::from(v)));
    }

    let window = if range.is_empty() {
        WindowSpec::from_range(0.0, 0.0)
    } else {
        WindowSpec::from_range(range.min, range.max)
    };
    debug!(
        "Window {window} from {} slices (range {}..{})",
        indices.len(),
        range.min,
        range.max
    );
    Ok(window)
}
