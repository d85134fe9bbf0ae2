//! Sun direction in the scene frame (+X East, +Y North, +Z Up).

/// Unit vector pointing from the surface toward the light source.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightVector {
    /// East component.
    pub east: f64,
    /// North component.
    pub north: f64,
    /// Up component.
    pub up: f64,
}

impl LightVector {
    /// Build the light direction from sun azimuth and elevation.
    ///
    /// # Arguments
    ///
    /// * `azimuth_deg` - Degrees clockwise from North
    /// * `elevation_deg` - Degrees above the horizon
    ///
    /// Angles must be finite.
    pub fn from_sun_angles(azimuth_deg: f64, elevation_deg: f64) -> Self {
        let az = azimuth_deg.to_radians();
        let el = elevation_deg.to_radians();

        let up = el.sin();
        let horizontal = el.cos();
        let east = horizontal * az.sin();
        let north = horizontal * az.cos();

        let norm = (east * east + north * north + up * up).sqrt();
        Self {
            east: east / norm,
            north: north / norm,
            up: up / norm,
        }
    }

    /// Components as `[east, north, up]`.
    pub fn as_array(&self) -> [f64; 3] {
        [self.east, self.north, self.up]
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        (self.east * self.east + self.north * self.north + self.up * self.up).sqrt()
    }

    /// Dot product with a surface normal `[x, y, z]`.
    #[inline]
    pub fn dot(&self, normal: &[f64; 3]) -> f64 {
        self.east * normal[0] + self.north * normal[1] + self.up * normal[2]
    }
}

/// Shorthand for [`LightVector::from_sun_angles`].
pub fn light_vector(azimuth_deg: f64, elevation_deg: f64) -> LightVector {
    LightVector::from_sun_angles(azimuth_deg, elevation_deg)
}
