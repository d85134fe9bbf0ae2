//! Surface slopes and normals of a height field.

use crate::stencil::{diff_x, diff_y};
use crate::Grid;

/// Floor applied to normal lengths before dividing.
pub const NORMAL_EPSILON: f64 = 1e-9;

/// Per-pixel x- and y-slopes of a height field.
#[derive(Debug, Clone)]
pub struct Slopes {
    /// Slope along a row (`dz/dx`).
    pub p: Grid,
    /// Slope down a column (`dz/dy`).
    pub q: Grid,
}

/// Compute the slopes of `z`.
pub fn slopes(z: &Grid) -> Slopes {
    Slopes {
        p: diff_x(z),
        q: diff_y(z),
    }
}

/// Per-pixel surface normals, `[x, y, z]` components.
#[derive(Debug, Clone)]
pub struct NormalField {
    width: usize,
    height: usize,
    normals: Vec<[f64; 3]>,
}

impl NormalField {
    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Normal at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> [f64; 3] {
        self.normals[y * self.width + x]
    }

    /// All normals in row-major order.
    pub fn as_slice(&self) -> &[[f64; 3]] {
        &self.normals
    }
}

/// Normalize `(-p, -q, 1)`.
///
/// The length is floored at [`NORMAL_EPSILON`]; a vector that hits the
/// floor is returned as divided, without renormalizing.
#[inline]
pub(crate) fn normal_from_slopes(p: f64, q: f64) -> [f64; 3] {
    let n = [-p, -q, 1.0];
    let norm = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2])
        .sqrt()
        .max(NORMAL_EPSILON);
    [n[0] / norm, n[1] / norm, n[2] / norm]
}

/// Compute the normal field of `z`.
pub fn surface_normals(z: &Grid) -> NormalField {
    let Slopes { p, q } = slopes(z);
    let normals = p
        .as_slice()
        .iter()
        .zip(q.as_slice())
        .map(|(&p, &q)| normal_from_slopes(p, q))
        .collect();
    NormalField {
        width: z.width(),
        height: z.height(),
        normals,
    }
}
