//! Lambertian image formation.

use crate::normals::surface_normals;
use crate::{Grid, LightVector};

/// Render the brightness `z` would produce under `light`.
///
/// Albedo is taken as 1; surfaces facing away from the light are black.
pub fn predicted_image(z: &Grid, light: &LightVector) -> Grid {
    let normals = surface_normals(z);
    let (width, height) = z.dimensions();
    Grid::from_fn(width, height, |x, y| light.dot(&normals.get(x, y)).max(0.0))
}
