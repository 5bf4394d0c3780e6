//! Domain-specific value types shared across the pipeline

use serde::Serialize;
use std::fmt;

/// In-plane image dimensions of one slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub rows: u32,
    pub cols: u32,
}

impl Dimensions {
    #[must_use]
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    #[inline]
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rows > 0 && self.cols > 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{cols}x{rows}", cols = self.cols, rows = self.rows)
    }
}

/// Volume extent: in-plane rows/columns plus the number of stacked slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeDimensions {
    pub rows: usize,
    pub columns: usize,
    pub depth: usize,
}

impl VolumeDimensions {
    #[must_use]
    pub fn new(rows: usize, columns: usize, depth: usize) -> Self {
        Self { rows, columns, depth }
    }

    #[inline]
    #[must_use]
    pub fn slice_len(&self) -> usize {
        self.rows * self.columns
    }

    #[inline]
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.slice_len() * self.depth
    }

    /// Row-major voxel index (`z*rows*columns + y*columns + x`)
    #[inline(always)]
    #[must_use]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.slice_len() + y * self.columns + x
    }
}

impl fmt::Display for VolumeDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.columns, self.rows, self.depth)
    }
}

/// Geometry every volume writer consumes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeGeometry {
    pub dimensions: VolumeDimensions,
    /// Stored as read: `[row spacing, column spacing, slice thickness]`
    pub spacing: [f64; 3],
    /// Position of the first slice after sorting
    pub origin: [f64; 3],
}

/// Rescale parameters for converting pixel values to real units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescaleParams {
    pub slope: f64,
    pub intercept: f64,
}

impl RescaleParams {
    #[must_use]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    #[must_use]
    pub const fn identity() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }

    #[inline(always)]
    #[must_use]
    // Hot path: called for every voxel during assembly
    pub fn apply(&self, raw: f64) -> f64 {
        raw.mul_add(self.slope, self.intercept)
    }
}

impl Default for RescaleParams {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for RescaleParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slope={slope}, intercept={intercept}",
            slope = self.slope,
            intercept = self.intercept
        )
    }
}

/// Sample layout of the pixel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitDepth {
    pub allocated: u16,
    /// 0 = unsigned, 1 = two's complement
    pub pixel_representation: u16,
}

impl BitDepth {
    #[must_use]
    pub fn new(allocated: u16, pixel_representation: u16) -> Self {
        Self {
            allocated,
            pixel_representation,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.pixel_representation != 0
    }

    #[inline]
    #[must_use]
    pub fn bytes_per_sample(&self) -> usize {
        if self.allocated <= 8 { 1 } else { 2 }
    }
}

impl Default for BitDepth {
    fn default() -> Self {
        Self::new(16, 0)
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_signed() { "signed" } else { "unsigned" };
        write!(f, "{} bits {sign}", self.allocated)
    }
}
