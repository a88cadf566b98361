//! Scripted tracking system: the first blob of a frame *is* the pose.

#![allow(dead_code)]

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use anyhow::{bail, Result};
use nalgebra::Translation3;
use tempfile::NamedTempFile;
use vbtracker_core::{BeaconMeasurement, CameraParameters, Iso3, TimeValue, UnitQuat, Vec3};
use vbtracker_system::{
    BodyId, ConfigParams, RansacPose, TargetHandle, TargetId, TrackedBody, TrackedTarget,
    TrackingSystem, TrackingSystemFactory, VideoFrame,
};

pub fn pose_from_blobs(measurements: &[BeaconMeasurement]) -> Option<(Vec3, UnitQuat)> {
    let first = measurements.first()?;
    Some((
        Vec3::new(first.loc.x, first.loc.y, first.diameter),
        UnitQuat::from_euler_angles(0.0, 0.0, first.loc.x * 0.01),
    ))
}

pub struct ScriptedBody {
    pose: Option<Iso3>,
}

impl TrackedBody for ScriptedBody {
    fn id(&self) -> BodyId {
        BodyId(0)
    }

    fn has_pose_estimate(&self) -> bool {
        self.pose.is_some()
    }

    fn pose(&self) -> Iso3 {
        self.pose.unwrap_or_else(Iso3::identity)
    }
}

pub struct ScriptedTarget;

impl TrackedTarget for ScriptedTarget {
    fn handle(&self) -> TargetHandle {
        TargetHandle::default()
    }

    fn uncalibrated_ransac_pose_estimate(
        &self,
        _camera: &CameraParameters,
        measurements: &[BeaconMeasurement],
    ) -> Option<RansacPose> {
        pose_from_blobs(measurements).map(|(position, orientation)| RansacPose {
            position,
            orientation,
            inliers: measurements.len(),
        })
    }
}

pub struct ScriptedSystem {
    pub frames: Vec<TimeValue>,
    body: ScriptedBody,
    target: ScriptedTarget,
}

impl ScriptedSystem {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            body: ScriptedBody { pose: None },
            target: ScriptedTarget,
        }
    }
}

impl TrackingSystem for ScriptedSystem {
    fn update_bodies_from_video_data(&mut self, frame: VideoFrame) -> Vec<BodyId> {
        self.frames.push(frame.timestamp);
        match pose_from_blobs(&frame.measurements) {
            Some((p, q)) => {
                self.body.pose = Some(Iso3::from_parts(Translation3::from(p), q));
                vec![BodyId(0)]
            }
            None => Vec::new(),
        }
    }

    fn body(&self, id: BodyId) -> Option<&dyn TrackedBody> {
        (id == BodyId(0)).then_some(&self.body as &dyn TrackedBody)
    }

    fn target(&self, handle: TargetHandle) -> Option<&dyn TrackedTarget> {
        (handle == TargetHandle::new(BodyId(0), TargetId(0))).then_some(&self.target as &dyn TrackedTarget)
    }
}

/// Factory counting how many systems it built.
#[derive(Default, Clone)]
pub struct CountingFactory {
    pub builds: Rc<Cell<usize>>,
    pub fail: bool,
}

impl TrackingSystemFactory for CountingFactory {
    fn build(&self, _params: &ConfigParams) -> Result<Box<dyn TrackingSystem>> {
        if self.fail {
            bail!("scripted factory failure");
        }
        self.builds.set(self.builds.get() + 1);
        Ok(Box::new(ScriptedSystem::new()))
    }
}

pub const HEADER: &str = "refx,refy,refz,refqw,refqx,refqy,refqz,sec,usec,x,y,size";

pub fn write_log(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}
