use anyhow::{ensure, Result};
use log::{debug, trace};
use nalgebra::Translation3;
use vbtracker_core::{Iso3, Real, TimeValue, Vec3};

use crate::{
    BeaconTarget, BodyId, ConfigParams, RansacPose, TargetHandle, TargetId, TargetLayout,
    TrackedBody, TrackedTarget, TrackingSystem, TrackingSystemFactory, VideoFrame,
};

/// Scalar-gain pose estimator for one body.
///
/// Position axes each carry a variance grown by their process-noise
/// autocorrelation times the elapsed time; rotation carries a single variance
/// grown by the mean rotational autocorrelation. Each measurement is blended
/// in with gain `P / (P + R)`.
#[derive(Debug, Clone)]
struct BodyEstimator {
    pose: Option<Iso3>,
    position_var: Vec3,
    rotation_var: Real,
    last_update: TimeValue,
}

fn gain(prior: Real, meas: Real) -> Real {
    let total = prior + meas;
    if total <= 0.0 {
        1.0
    } else {
        prior / total
    }
}

impl BodyEstimator {
    fn new() -> Self {
        Self {
            pose: None,
            position_var: Vec3::zeros(),
            rotation_var: 0.0,
            last_update: TimeValue::default(),
        }
    }

    fn update(&mut self, params: &ConfigParams, tv: TimeValue, meas: &RansacPose) {
        let r = params.measurement_variance();
        let Some(pose) = self.pose.as_mut() else {
            self.pose = Some(Iso3::from_parts(Translation3::from(meas.position), meas.orientation));
            self.position_var = Vec3::repeat(r);
            self.rotation_var = r;
            self.last_update = tv;
            return;
        };

        let dt = tv.duration_since(&self.last_update).max(0.0);
        let q = &params.process_noise_autocorrelation;
        for axis in 0..3 {
            self.position_var[axis] += q[axis].max(0.0) * dt;
        }
        self.rotation_var += (q[3..6].iter().sum::<Real>() / 3.0).max(0.0) * dt;

        let position = &mut pose.translation.vector;
        for axis in 0..3 {
            let k = gain(self.position_var[axis], r);
            position[axis] += k * (meas.position[axis] - position[axis]);
            self.position_var[axis] *= 1.0 - k;
        }

        let k = gain(self.rotation_var, r);
        pose.rotation = pose
            .rotation
            .try_slerp(&meas.orientation, k, 1e-9)
            .unwrap_or(meas.orientation);
        self.rotation_var *= 1.0 - k;
        self.last_update = tv;
        trace!(
            "body update dt={:.4} pos_var={:?} rot_var={:.3e}",
            dt,
            self.position_var,
            self.rotation_var
        );
    }
}

/// Body with its targets, as held by [`ReferenceTrackingSystem`].
#[derive(Debug, Clone)]
pub struct ReferenceBody {
    id: BodyId,
    targets: Vec<BeaconTarget>,
    estimator: BodyEstimator,
}

impl TrackedBody for ReferenceBody {
    fn id(&self) -> BodyId {
        self.id
    }

    fn has_pose_estimate(&self) -> bool {
        self.estimator.pose.is_some()
    }

    fn pose(&self) -> Iso3 {
        self.estimator.pose.unwrap_or_else(Iso3::identity)
    }
}

/// Tracking system that solves every frame per target and filters per body.
#[derive(Debug, Clone)]
pub struct ReferenceTrackingSystem {
    params: ConfigParams,
    bodies: Vec<ReferenceBody>,
}

impl ReferenceTrackingSystem {
    pub fn new(params: ConfigParams) -> Self {
        Self {
            params,
            bodies: Vec::new(),
        }
    }

    pub fn params(&self) -> &ConfigParams {
        &self.params
    }

    /// Add a body carrying a single target with the given layout.
    pub fn add_body(&mut self, layout: TargetLayout) -> TargetHandle {
        let id = BodyId(self.bodies.len());
        let handle = TargetHandle::new(id, TargetId(0));
        self.bodies.push(ReferenceBody {
            id,
            targets: vec![BeaconTarget::new(handle, layout, self.params.ransac.clone())],
            estimator: BodyEstimator::new(),
        });
        handle
    }
}

impl TrackingSystem for ReferenceTrackingSystem {
    fn update_bodies_from_video_data(&mut self, frame: VideoFrame) -> Vec<BodyId> {
        let mut updated = Vec::new();
        for body in &mut self.bodies {
            let best = body
                .targets
                .iter()
                .filter_map(|t| t.uncalibrated_ransac_pose_estimate(&frame.camera, &frame.measurements))
                .max_by_key(|p| p.inliers);
            if let Some(meas) = best {
                body.estimator.update(&self.params, frame.timestamp, &meas);
                updated.push(body.id);
            }
        }
        debug!("frame {}: updated {} bodies", frame.timestamp, updated.len());
        updated
    }

    fn body(&self, id: BodyId) -> Option<&dyn TrackedBody> {
        self.bodies.get(id.0).map(|b| b as &dyn TrackedBody)
    }

    fn target(&self, handle: TargetHandle) -> Option<&dyn TrackedTarget> {
        self.bodies
            .get(handle.body.0)?
            .targets
            .get(handle.target.0)
            .map(|t| t as &dyn TrackedTarget)
    }
}

/// Factory producing a one-body [`ReferenceTrackingSystem`] for a fixed layout.
#[derive(Debug, Clone)]
pub struct ReferenceSystemFactory {
    layout: TargetLayout,
}

impl ReferenceSystemFactory {
    pub fn new(layout: TargetLayout) -> Self {
        Self { layout }
    }
}

impl TrackingSystemFactory for ReferenceSystemFactory {
    fn build(&self, params: &ConfigParams) -> Result<Box<dyn TrackingSystem>> {
        ensure!(
            !self.layout.is_empty(),
            "target layout has no beacons; set `target.beacons` in the config"
        );
        ensure!(
            params.process_noise_autocorrelation.iter().all(|v| v.is_finite()),
            "process noise must be finite: {:?}",
            params.process_noise_autocorrelation
        );
        let mut system = ReferenceTrackingSystem::new(params.clone());
        system.add_body(self.layout.clone());
        Ok(Box::new(system))
    }
}
