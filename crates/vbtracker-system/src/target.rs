use log::debug;
use serde::{Deserialize, Serialize};
use vbtracker_core::{BeaconMeasurement, CameraParameters, Pt3, RansacOptions, Vec2};

use crate::{PnpSolver, RansacPose, TargetHandle, TrackedTarget};

/// Beacon positions of a target in its own frame, in meters.
///
/// The recorded logs carry no beacon identities: the i-th blob of a frame is
/// taken to be beacon `i`. Blobs beyond the layout are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetLayout {
    pub beacons: Vec<Pt3>,
}

impl TargetLayout {
    pub fn new(beacons: Vec<Pt3>) -> Self {
        Self { beacons }
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }
}

/// Target that solves its pose from one frame of blobs.
#[derive(Debug, Clone)]
pub struct BeaconTarget {
    handle: TargetHandle,
    layout: TargetLayout,
    ransac: RansacOptions,
}

impl BeaconTarget {
    pub fn new(handle: TargetHandle, layout: TargetLayout, ransac: RansacOptions) -> Self {
        Self {
            handle,
            layout,
            ransac,
        }
    }

    pub fn layout(&self) -> &TargetLayout {
        &self.layout
    }
}

impl TrackedTarget for BeaconTarget {
    fn handle(&self) -> TargetHandle {
        self.handle
    }

    fn uncalibrated_ransac_pose_estimate(
        &self,
        camera: &CameraParameters,
        measurements: &[BeaconMeasurement],
    ) -> Option<RansacPose> {
        let n = measurements.len().min(self.layout.len());
        let model = &self.layout.beacons[..n];
        let normalized: Vec<Vec2> = measurements[..n]
            .iter()
            .map(|m| camera.normalize_pixel(&m.loc))
            .collect();

        match PnpSolver::dlt_ransac(model, &normalized, camera.mean_focal_length(), &self.ransac) {
            Ok((pose, inliers)) => Some(RansacPose {
                position: pose.translation.vector,
                orientation: pose.rotation,
                inliers: inliers.len(),
            }),
            Err(err) => {
                debug!("target {:?}: no ransac pose: {}", self.handle, err);
                None
            }
        }
    }
}
