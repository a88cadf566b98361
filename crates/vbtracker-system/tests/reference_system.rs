//! End-to-end checks of the reference tracking system on synthetic frames.

use nalgebra::Translation3;
use vbtracker_core::{BeaconMeasurement, CameraParameters, Iso3, Pt3, Real, TimeValue, UnitQuat};
use vbtracker_system::{
    BodyId, ConfigParams, ReferenceSystemFactory, TargetLayout, TrackingSystemFactory, VideoFrame,
};

fn layout() -> TargetLayout {
    let mut beacons = Vec::new();
    for z in 0..2 {
        for y in 0..3 {
            for x in 0..3 {
                beacons.push(Pt3::new(
                    (x as Real - 1.0) * 0.06,
                    (y as Real - 1.0) * 0.04,
                    z as Real * 0.05 + (x * y) as Real * 0.005,
                ));
            }
        }
    }
    TargetLayout::new(beacons)
}

fn frame(cam: &CameraParameters, pose: &Iso3, layout: &TargetLayout, tv: TimeValue) -> VideoFrame {
    let measurements = layout
        .beacons
        .iter()
        .map(|p| {
            let px = cam.project_point(&pose.transform_point(p)).unwrap();
            BeaconMeasurement::at_reference_size(px.x, px.y, 3.0)
        })
        .collect();
    VideoFrame {
        timestamp: tv,
        camera: cam.clone(),
        measurements,
    }
}

#[test]
fn static_target_is_tracked() {
    let cam = CameraParameters::default();
    let layout = layout();
    let gt = Iso3::from_parts(
        Translation3::new(0.02, 0.01, 0.5),
        UnitQuat::from_euler_angles(0.05, 0.1, -0.1),
    );

    let factory = ReferenceSystemFactory::new(layout.clone());
    let mut system = factory.build(&ConfigParams::default()).unwrap();
    let handle = factory.primary_target();

    for i in 0..5 {
        let updated = system.update_bodies_from_video_data(frame(
            &cam,
            &gt,
            &layout,
            TimeValue::new(0, i * 10_000),
        ));
        assert_eq!(updated, vec![BodyId(0)]);
    }

    let body = system.body(handle.body).unwrap();
    assert!(body.has_pose_estimate());
    let pose = body.pose();
    assert!((pose.translation.vector - gt.translation.vector).norm() < 1e-6);
    assert!(pose.rotation.angle_to(&gt.rotation) < 1e-6);

    let target = system.target(handle).unwrap();
    let ransac = target
        .uncalibrated_ransac_pose_estimate(&cam, &frame(&cam, &gt, &layout, TimeValue::default()).measurements)
        .unwrap();
    assert_eq!(ransac.inliers, layout.len());
    assert!((ransac.position - gt.translation.vector).norm() < 1e-6);
}

#[test]
fn sparse_frames_leave_body_untouched() {
    let cam = CameraParameters::default();
    let layout = layout();
    let factory = ReferenceSystemFactory::new(layout.clone());
    let mut system = factory.build(&ConfigParams::default()).unwrap();

    let gt = Iso3::translation(0.0, 0.0, 0.5);
    let mut f = frame(&cam, &gt, &layout, TimeValue::new(1, 0));
    f.measurements.truncate(4);
    assert!(system.update_bodies_from_video_data(f).is_empty());
    assert!(!system.body(BodyId(0)).unwrap().has_pose_estimate());
}

#[test]
fn factory_rejects_non_finite_noise() {
    let factory = ReferenceSystemFactory::new(layout());
    let mut params = ConfigParams::default();
    params.process_noise_autocorrelation[4] = f64::NAN;
    assert!(factory.build(&params).is_err());
}

#[test]
fn factory_rejects_empty_layout() {
    let factory = ReferenceSystemFactory::new(TargetLayout::default());
    let err = factory.build(&ConfigParams::default()).err().unwrap();
    assert!(err.to_string().contains("no beacons"));
}

#[test]
fn config_round_trips_through_json_with_defaults() {
    let params: ConfigParams = serde_json::from_str(r#"{"beacon_process_noise": 0.5}"#).unwrap();
    assert_eq!(params.beacon_process_noise, 0.5);
    assert_eq!(params.measurement_variance_scale_factor, 5e-2);
    assert_eq!(params.ransac, vbtracker_core::RansacOptions::default());
}
