mod support;

use vbtracker_core::{BeaconMeasurement, CameraParameters, OneEuroParams, Real, TimeValue};
use vbtracker_pipeline::{
    availability, replay_log, FullSystemStrategy, MeasurementLog, MeasurementRow, PoseFilter,
    PoseStrategy, RansacOneEuroStrategy,
};
use vbtracker_system::TargetHandle;

use support::{pose_from_blobs, ScriptedSystem};

fn row(seconds: i64, micros: i32, blob: Option<(Real, Real, Real)>) -> MeasurementRow {
    let mut fields = vec![
        "0".to_string(),
        "0".into(),
        "0".into(),
        "1".into(),
        "0".into(),
        "0".into(),
        "0".into(),
        seconds.to_string(),
        micros.to_string(),
    ];
    if let Some((x, y, d)) = blob {
        fields.extend([x.to_string(), y.to_string(), d.to_string()]);
    }
    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
    MeasurementRow::parse_fields(&fields).unwrap()
}

fn blobs(x: Real, y: Real, d: Real) -> Vec<BeaconMeasurement> {
    vec![BeaconMeasurement::at_reference_size(x, y, d)]
}

#[test]
fn failed_ransac_row_does_not_advance_filter_clock() {
    let rows = [
        row(10, 0, Some((1.0, 2.0, 3.0))),
        row(10, 500_000, None),
        row(11, 250_000, Some((4.0, 1.0, 2.0))),
    ];
    let cam = CameraParameters::default();
    let mut system = ScriptedSystem::new();
    let mut strategy = RansacOneEuroStrategy::default();

    let outputs: Vec<_> = rows
        .iter()
        .map(|r| strategy.estimate(&cam, &mut system, TargetHandle::default(), r))
        .collect();
    assert!(outputs[0].is_available());
    assert!(!outputs[1].is_available());
    assert!(outputs[2].is_available());
    assert_eq!(strategy.last_success(), Some(TimeValue::new(11, 250_000)));

    // The same filter fed directly: first dt is 1, second spans the failed row.
    let mut expected = PoseFilter::default();
    let (p0, q0) = pose_from_blobs(&blobs(1.0, 2.0, 3.0)).unwrap();
    let (p2, q2) = pose_from_blobs(&blobs(4.0, 1.0, 2.0)).unwrap();
    expected.filter(1.0, &p0, &q0);
    let dt = TimeValue::new(11, 250_000).duration_since(&TimeValue::new(10, 0));
    assert!((dt - 1.25).abs() < 1e-9);
    expected.filter(dt, &p2, &q2);

    let pose = outputs[2].pose.unwrap();
    assert!((pose.translation.vector - expected.position()).norm() < 1e-12);
    assert!(pose.rotation.angle_to(expected.orientation()) < 1e-12);

    // The RANSAC path never feeds the tracking system.
    assert!(system.frames.is_empty());
}

#[test]
fn first_success_uses_unit_step_even_after_failures() {
    let rows = [row(5, 0, None), row(7, 0, Some((2.0, 2.0, 2.0)))];
    let cam = CameraParameters::default();
    let mut system = ScriptedSystem::new();
    let mut strategy = RansacOneEuroStrategy::default();
    assert_eq!(strategy.last_success(), None);

    let first = strategy.estimate(&cam, &mut system, TargetHandle::default(), &rows[0]);
    assert!(!first.is_available());
    assert_eq!(strategy.last_success(), None);

    let second = strategy.estimate(&cam, &mut system, TargetHandle::default(), &rows[1]);
    let (p, _) = pose_from_blobs(&blobs(2.0, 2.0, 2.0)).unwrap();
    assert!((second.pose.unwrap().translation.vector - p).norm() < 1e-12);
}

#[test]
fn unknown_target_yields_no_estimate() {
    let cam = CameraParameters::default();
    let mut system = ScriptedSystem::new();
    let mut strategy = RansacOneEuroStrategy::new(OneEuroParams::default(), OneEuroParams::default());
    let handle = TargetHandle::new(vbtracker_system::BodyId(3), vbtracker_system::TargetId(0));
    let out = strategy.estimate(&cam, &mut system, handle, &row(1, 0, Some((1.0, 1.0, 1.0))));
    assert!(!out.is_available());
}

#[test]
fn full_system_reports_body_pose_unfiltered() {
    let cam = CameraParameters::default();
    let mut system = ScriptedSystem::new();
    let mut strategy = FullSystemStrategy;

    let none = strategy.estimate(&cam, &mut system, TargetHandle::default(), &row(1, 0, None));
    assert!(!none.is_available());

    let out = strategy.estimate(&cam, &mut system, TargetHandle::default(), &row(2, 0, Some((5.0, 6.0, 7.0))));
    let (p, q) = pose_from_blobs(&blobs(5.0, 6.0, 7.0)).unwrap();
    let pose = out.pose.unwrap();
    assert_eq!(pose.translation.vector, p);
    assert_eq!(pose.rotation, q);

    // A later empty frame keeps the body's previous pose.
    let kept = strategy.estimate(&cam, &mut system, TargetHandle::default(), &row(3, 0, None));
    assert_eq!(kept, out);
    assert_eq!(
        system.frames,
        vec![TimeValue::new(1, 0), TimeValue::new(2, 0), TimeValue::new(3, 0)]
    );
}

#[test]
fn replay_visits_every_row_with_every_strategy_in_order() {
    let log = MeasurementLog::from_rows(vec![
        row(1, 0, Some((1.0, 1.0, 1.0))),
        row(1, 100_000, None),
        row(1, 200_000, Some((1.5, 1.0, 1.0))),
    ]);
    let cam = CameraParameters::default();
    let mut system = ScriptedSystem::new();
    let mut strategies: Vec<Box<dyn PoseStrategy>> = vec![
        Box::new(FullSystemStrategy),
        Box::new(RansacOneEuroStrategy::default()),
    ];

    let frames = replay_log(&log, &cam, &mut system, TargetHandle::default(), &mut strategies);
    assert_eq!(frames.len(), 3);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.row_index, i);
        assert_eq!(frame.timestamp, log.get(i).unwrap().timestamp);
        let names: Vec<_> = frame.outputs.iter().map(|o| o.strategy.as_str()).collect();
        assert_eq!(names, ["full-system", "ransac-one-euro"]);
    }
    assert_eq!(system.frames.len(), 3);
    assert_eq!(
        availability(&frames),
        vec![("full-system".to_string(), 3), ("ransac-one-euro".to_string(), 2)]
    );
    assert!(frames[1].to_string().contains("ransac-one-euro: no pose"));
}

#[test]
fn empty_log_replays_to_nothing() {
    let cam = CameraParameters::default();
    let mut system = ScriptedSystem::new();
    let mut strategies: Vec<Box<dyn PoseStrategy>> = vec![Box::new(FullSystemStrategy)];
    let frames = replay_log(
        &MeasurementLog::default(),
        &cam,
        &mut system,
        TargetHandle::default(),
        &mut strategies,
    );
    assert!(frames.is_empty());
    assert!(system.frames.is_empty());
}
