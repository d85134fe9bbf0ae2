//! Finite-difference stencils shared by the normal field and the energy.
//!
//! Derivatives use central differences in the interior and one-sided first
//! differences on the border samples. An axis with a single sample has zero
//! derivative along it.

use crate::Grid;

/// Derivative along a row (x direction).
pub(crate) fn diff_x(grid: &Grid) -> Grid {
    let (w, h) = grid.dimensions();
    let mut out = Grid::zeros(w, h);
    if w < 2 {
        return out;
    }
    for y in 0..h {
        for x in 0..w {
            *out.get_mut(x, y) = if x == 0 {
                grid.get(1, y) - grid.get(0, y)
            } else if x == w - 1 {
                grid.get(w - 1, y) - grid.get(w - 2, y)
            } else {
                0.5 * (grid.get(x + 1, y) - grid.get(x - 1, y))
            };
        }
    }
    out
}

/// Derivative down a column (y direction).
pub(crate) fn diff_y(grid: &Grid) -> Grid {
    let (w, h) = grid.dimensions();
    let mut out = Grid::zeros(w, h);
    if h < 2 {
        return out;
    }
    for y in 0..h {
        for x in 0..w {
            *out.get_mut(x, y) = if y == 0 {
                grid.get(x, 1) - grid.get(x, 0)
            } else if y == h - 1 {
                grid.get(x, h - 1) - grid.get(x, h - 2)
            } else {
                0.5 * (grid.get(x, y + 1) - grid.get(x, y - 1))
            };
        }
    }
    out
}

/// Transpose of [`diff_x`]: scatters each sample back onto the pixels its
/// derivative was computed from.
///
/// In the interior this is the negated central difference, i.e. the
/// x-part of a negative divergence.
pub(crate) fn diff_x_transpose(grid: &Grid) -> Grid {
    let (w, h) = grid.dimensions();
    let mut out = Grid::zeros(w, h);
    if w < 2 {
        return out;
    }
    for y in 0..h {
        for x in 0..w {
            let g = grid.get(x, y);
            if x == 0 {
                *out.get_mut(1, y) += g;
                *out.get_mut(0, y) -= g;
            } else if x == w - 1 {
                *out.get_mut(w - 1, y) += g;
                *out.get_mut(w - 2, y) -= g;
            } else {
                *out.get_mut(x + 1, y) += 0.5 * g;
                *out.get_mut(x - 1, y) -= 0.5 * g;
            }
        }
    }
    out
}

/// Transpose of [`diff_y`].
pub(crate) fn diff_y_transpose(grid: &Grid) -> Grid {
    let (w, h) = grid.dimensions();
    let mut out = Grid::zeros(w, h);
    if h < 2 {
        return out;
    }
    for y in 0..h {
        for x in 0..w {
            let g = grid.get(x, y);
            if y == 0 {
                *out.get_mut(x, 1) += g;
                *out.get_mut(x, 0) -= g;
            } else if y == h - 1 {
                *out.get_mut(x, h - 1) += g;
                *out.get_mut(x, h - 2) -= g;
            } else {
                *out.get_mut(x, y + 1) += 0.5 * g;
                *out.get_mut(x, y - 1) -= 0.5 * g;
            }
        }
    }
    out
}

/// 5-point Laplacian with zero padding outside the grid.
///
/// The operator is symmetric, so applying it twice gives the gradient of
/// `0.5 * sum(L^2)`.
pub(crate) fn laplacian(grid: &Grid) -> Grid {
    let (w, h) = grid.dimensions();
    Grid::from_fn(w, h, |x, y| {
        let mut sum = -4.0 * grid.get(x, y);
        if x > 0 {
            sum += grid.get(x - 1, y);
        }
        if x + 1 < w {
            sum += grid.get(x + 1, y);
        }
        if y > 0 {
            sum += grid.get(x, y - 1);
        }
        if y + 1 < h {
            sum += grid.get(x, y + 1);
        }
        sum
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dot(a: &Grid, b: &Grid) -> f64 {
        a.as_slice().iter().zip(b.as_slice()).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_diff_of_plane_is_exact() {
        let plane = Grid::from_fn(5, 4, |x, y| 0.3 * x as f64 - 1.2 * y as f64);
        for v in diff_x(&plane).as_slice() {
            assert_abs_diff_eq!(*v, 0.3, epsilon = 1e-12);
        }
        for v in diff_y(&plane).as_slice() {
            assert_abs_diff_eq!(*v, -1.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_transpose_identity() {
        // <D a, b> == <a, D^T b> for arbitrary grids
        let a = Grid::from_fn(5, 4, |x, y| ((x * 7 + y * 3) % 5) as f64 - 1.5);
        let b = Grid::from_fn(5, 4, |x, y| ((x * 2 + y * 5) % 7) as f64 * 0.25);
        assert_abs_diff_eq!(
            dot(&diff_x(&a), &b),
            dot(&a, &diff_x_transpose(&b)),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            dot(&diff_y(&a), &b),
            dot(&a, &diff_y_transpose(&b)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_sample_axis_has_zero_derivative() {
        let row = Grid::from_fn(4, 1, |x, _| x as f64);
        assert!(diff_y(&row).as_slice().iter().all(|&v| v == 0.0));
        assert!(diff_y_transpose(&row).as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(diff_x(&row).as_slice(), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_laplacian_zero_padding() {
        let mut grid = Grid::zeros(3, 3);
        *grid.get_mut(1, 1) = 1.0;
        let lap = laplacian(&grid);
        assert_eq!(lap.get(1, 1), -4.0);
        assert_eq!(lap.get(0, 1), 1.0);
        assert_eq!(lap.get(0, 0), 0.0);

        // A constant field is only curved at the padded border
        let ones = Grid::from_fn(3, 3, |_, _| 1.0);
        let lap = laplacian(&ones);
        assert_eq!(lap.get(1, 1), 0.0);
        assert_eq!(lap.get(0, 0), -2.0);
        assert_eq!(lap.get(1, 0), -1.0);
    }
}
