use serde::{Deserialize, Serialize};

use crate::{ImageSize, Real, Vec2, REFERENCE_IMAGE_SIZE};

/// A single detected beacon blob in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeaconMeasurement {
    /// Blob centroid in pixels.
    pub loc: Vec2,
    /// Blob size (diameter) in pixels.
    pub diameter: Real,
    /// Resolution the coordinates refer to.
    pub image_size: ImageSize,
}

impl BeaconMeasurement {
    pub fn new(x: Real, y: Real, diameter: Real, image_size: ImageSize) -> Self {
        Self {
            loc: Vec2::new(x, y),
            diameter,
            image_size,
        }
    }

    /// Measurement expressed against [`REFERENCE_IMAGE_SIZE`].
    pub fn at_reference_size(x: Real, y: Real, diameter: Real) -> Self {
        Self::new(x, y, diameter, REFERENCE_IMAGE_SIZE)
    }
}
