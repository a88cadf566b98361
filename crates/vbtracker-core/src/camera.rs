use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Mat3, Pt3, Real, Vec2};

/// Errors raised when constructing camera parameters.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("focal lengths must be positive, got fx={fx}, fy={fy}")]
    NonPositiveFocalLength { fx: Real, fy: Real },
    #[error("image size must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}

/// Image resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Resolution every recorded blob coordinate is expressed against.
pub const REFERENCE_IMAGE_SIZE: ImageSize = ImageSize::new(640, 480);

/// Pinhole camera with a three-term radial distortion model.
///
/// Radial distortion acts on normalized coordinates:
/// `n_d = n_u * (1 + k1 r^2 + k2 r^4 + k3 r^6)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParameters {
    pub fx: Real,
    pub fy: Real,
    pub cx: Real,
    pub cy: Real,
    /// Radial coefficients `[k1, k2, k3]`.
    pub radial: [Real; 3],
    pub image_size: ImageSize,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            fx: 700.0,
            fy: 700.0,
            cx: REFERENCE_IMAGE_SIZE.width as Real / 2.0,
            cy: REFERENCE_IMAGE_SIZE.height as Real / 2.0,
            radial: [0.0; 3],
            image_size: REFERENCE_IMAGE_SIZE,
        }
    }
}

const UNDISTORT_ITERS: usize = 8;

impl CameraParameters {
    pub fn new(
        fx: Real,
        fy: Real,
        cx: Real,
        cy: Real,
        radial: [Real; 3],
        image_size: ImageSize,
    ) -> Result<Self, CameraError> {
        let camera = Self {
            fx,
            fy,
            cx,
            cy,
            radial,
            image_size,
        };
        camera.validate()?;
        Ok(camera)
    }

    /// Check the invariants `new` enforces; deserialized values bypass it.
    pub fn validate(&self) -> Result<(), CameraError> {
        if !(self.fx > 0.0 && self.fy > 0.0) {
            return Err(CameraError::NonPositiveFocalLength {
                fx: self.fx,
                fy: self.fy,
            });
        }
        if self.image_size.width == 0 || self.image_size.height == 0 {
            return Err(CameraError::EmptyImage {
                width: self.image_size.width,
                height: self.image_size.height,
            });
        }
        Ok(())
    }

    /// Same intrinsics with every distortion coefficient zeroed.
    ///
    /// Used when measurements have already been undistorted upstream.
    pub fn create_undistorted_variant(&self) -> Self {
        Self {
            radial: [0.0; 3],
            ..self.clone()
        }
    }

    pub fn is_undistorted(&self) -> bool {
        self.radial.iter().all(|&k| k == 0.0)
    }

    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Mean focal length, used to express normalized residuals in pixels.
    pub fn mean_focal_length(&self) -> Real {
        0.5 * (self.fx + self.fy)
    }

    fn radial_factor(&self, n: &Vec2) -> Real {
        let r2 = n.norm_squared();
        let [k1, k2, k3] = self.radial;
        1.0 + r2 * (k1 + r2 * (k2 + r2 * k3))
    }

    /// Map a pixel to undistorted normalized coordinates on the Z=1 plane.
    pub fn normalize_pixel(&self, pixel: &Vec2) -> Vec2 {
        let n_d = Vec2::new((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy);
        if self.is_undistorted() {
            return n_d;
        }
        // Fixed-point inversion of the radial model.
        let mut n = n_d;
        for _ in 0..UNDISTORT_ITERS {
            n = n_d / self.radial_factor(&n);
        }
        n
    }

    /// Project a camera-frame point to pixels. `None` for points behind the camera.
    pub fn project_point(&self, p_c: &Pt3) -> Option<Vec2> {
        if p_c.z <= 0.0 {
            return None;
        }
        let n_u = Vec2::new(p_c.x / p_c.z, p_c.y / p_c.z);
        let n_d = n_u * self.radial_factor(&n_u);
        Some(Vec2::new(
            self.fx * n_d.x + self.cx,
            self.fy * n_d.y + self.cy,
        ))
    }
}
