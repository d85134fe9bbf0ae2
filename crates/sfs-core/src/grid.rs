//! Row-major 2D raster used for height fields, images and intermediates.

use crate::{Result, SfsError};

/// A dense 2D array of `f64` samples stored in row-major order.
///
/// Row 0 is the top of the image and `x` increases to the right, matching
/// the pixel layout of the decoded image the grid was built from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    /// Width in pixels.
    width: usize,
    /// Height in pixels.
    height: usize,
    /// Samples, `data[y * width + x]`.
    data: Vec<f64>,
}

/// Relative (dimensionless, or meters after scaling) surface elevation.
pub type HeightField = Grid;

/// Observed brightness, normalized to reflectance in `[0, 1]`.
pub type ObservedImage = Grid;

impl Grid {
    /// Create a grid from row-major samples.
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SfsError::InvalidGrid(format!(
                "dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if data.len() != width * height {
            return Err(SfsError::InvalidGrid(format!(
                "expected {} samples for {}x{}, got {}",
                width * height,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a zero-valued grid.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |_, _| 0.0)
    }

    /// Create a grid by evaluating `f(x, y)` at every pixel.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn from_fn<F: FnMut(usize, usize) -> f64>(width: usize, height: usize, mut f: F) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a constructed grid; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Mutable sample at `(x, y)`.
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut f64 {
        &mut self.data[y * self.width + x]
    }

    /// Flattened row-major samples.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consume the grid and return its row-major samples.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Apply `f` to every sample, producing a new grid of the same shape.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Whether `other` has the same width and height.
    pub fn same_shape(&self, other: &Grid) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Fail with [`SfsError::ShapeMismatch`] unless `other` has this grid's shape.
    pub fn ensure_same_shape(&self, other: &Grid) -> Result<()> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(SfsError::ShapeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: other.width,
                actual_height: other.height,
            })
        }
    }

    /// Smallest sample.
    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest sample.
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Arithmetic mean of all samples.
    pub fn mean(&self) -> f64 {
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }
}
