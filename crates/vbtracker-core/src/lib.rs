//! Core math and measurement primitives for the video-based tracker tools.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Vec3`, `Iso3`, ...),
//! - time stamps with microsecond resolution ([`TimeValue`]),
//! - pinhole camera parameters with radial distortion ([`CameraParameters`]),
//! - beacon (blob) measurements in image space ([`BeaconMeasurement`]),
//! - a generic RANSAC engine (`ransac`, [`Estimator`]),
//! - one-euro adaptive low-pass filters ([`OneEuroFilter`]).

/// Camera parameters and pixel normalisation.
pub mod camera;
/// One-euro low-pass filters for vectors and rotations.
pub mod filters;
/// Linear algebra type aliases.
pub mod math;
/// Beacon measurements.
pub mod measurement;
/// Generic RANSAC engine and traits.
pub mod ransac;
/// Time stamps.
pub mod time;

pub use camera::*;
pub use filters::*;
pub use math::*;
pub use measurement::*;
pub use ransac::*;
pub use time::*;
