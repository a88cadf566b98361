use anyhow::Result;
use serde::{Deserialize, Serialize};
use vbtracker_core::{BeaconMeasurement, CameraParameters, Iso3, TimeValue, UnitQuat, Vec3};

use crate::ConfigParams;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(pub usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub usize);

/// Address of a target: the body that owns it and its index on that body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetHandle {
    pub body: BodyId,
    pub target: TargetId,
}

impl TargetHandle {
    pub const fn new(body: BodyId, target: TargetId) -> Self {
        Self { body, target }
    }
}

/// Everything the image-processing stage hands to the tracker for one frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub timestamp: TimeValue,
    pub camera: CameraParameters,
    pub measurements: Vec<BeaconMeasurement>,
}

/// Pose recovered from beacon measurements alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RansacPose {
    pub position: Vec3,
    pub orientation: UnitQuat,
    /// Number of measurements in the consensus set.
    pub inliers: usize,
}

/// Rigid body tracked by a [`TrackingSystem`].
pub trait TrackedBody {
    fn id(&self) -> BodyId;
    fn has_pose_estimate(&self) -> bool;
    /// Latest pose. Only meaningful when [`TrackedBody::has_pose_estimate`] is true.
    fn pose(&self) -> Iso3;
}

/// Beacon constellation attached to a body.
pub trait TrackedTarget {
    fn handle(&self) -> TargetHandle;
    /// Stateless pose solve from the given measurements, ignoring the body's filter.
    fn uncalibrated_ransac_pose_estimate(
        &self,
        camera: &CameraParameters,
        measurements: &[BeaconMeasurement],
    ) -> Option<RansacPose>;
}

/// Multi-body tracker driven one video frame at a time.
pub trait TrackingSystem {
    /// Ingest one frame; returns the bodies whose state changed.
    fn update_bodies_from_video_data(&mut self, frame: VideoFrame) -> Vec<BodyId>;
    fn body(&self, id: BodyId) -> Option<&dyn TrackedBody>;
    fn target(&self, handle: TargetHandle) -> Option<&dyn TrackedTarget>;
}

/// Builds a fresh tracking system for a given parameter set.
pub trait TrackingSystemFactory {
    fn build(&self, params: &ConfigParams) -> Result<Box<dyn TrackingSystem>>;

    /// Target the replay and optimizer operate on.
    fn primary_target(&self) -> TargetHandle {
        TargetHandle::default()
    }
}
