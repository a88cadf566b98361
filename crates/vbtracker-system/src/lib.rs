//! Tracking-system side of the parameter finder.
//!
//! [`TrackingSystem`], [`TrackedBody`] and [`TrackedTarget`] are the
//! interfaces the replay strategies drive. [`ReferenceTrackingSystem`] is a
//! compact implementation built from [`ConfigParams`] and a [`TargetLayout`]:
//! it solves each frame with RANSAC-wrapped PnP and blends the result into a
//! per-body pose estimate.

mod config;
mod pnp;
mod reference;
mod system;
mod target;

pub use config::*;
pub use pnp::*;
pub use reference::*;
pub use system::*;
pub use target::*;
