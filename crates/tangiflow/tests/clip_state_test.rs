//! Clip-plane state machine tests
//!
//! Covers the axis lock hysteresis, sign flips, the camera filter bootstrap
//! and recovery from degenerate stylus poses.

use glam::{Mat4, Quat, UVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tangiflow::{
    ClipAxis, ClipParams, ClipStateMachine, DatasetInfo, NoPlane, Pose, Settings, SlicingMode,
};

fn info() -> DatasetInfo {
    DatasetInfo {
        dims: UVec3::new(64, 48, 32),
        spacing: Vec3::ONE,
    }
}

fn settings(mode: SlicingMode) -> Settings {
    Settings {
        slicing_mode: mode,
        zoom_factor: 1.0,
        clip_dist: 200.0,
        ..Default::default()
    }
}

/// Tangible centered on the clip plane with the given orientation.
fn tangible(rot: Quat) -> Pose {
    Pose::tangible_only(Mat4::from_rotation_translation(rot, Vec3::new(0.0, 0.0, 200.0)))
}

/// A locked axis may keep its identity, flip sign, or clear. Nothing else.
fn assert_lock_transition(prev: ClipAxis, next: ClipAxis) {
    if prev.is_none() || next.is_none() {
        return;
    }
    assert!(
        next == prev || next == prev.flipped(),
        "locked axis jumped from {:?} to {:?}",
        prev,
        next
    );
}

#[test]
fn test_near_tie_does_not_switch_locked_axis() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Axis);

    // Around 45 degrees about Y the local X and Z axes nearly tie
    machine.compute(&tangible(Quat::from_rotation_y(44f32.to_radians())), &s, &info()).unwrap();
    let first = machine.axes().locked;
    assert_eq!(first, ClipAxis::NegZ);

    for i in 0..50 {
        let deg = if i % 2 == 0 { 46.0f32 } else { 44.0 };
        let prev = machine.axes().locked;
        machine.compute(&tangible(Quat::from_rotation_y(deg.to_radians())), &s, &info()).unwrap();
        let axes = machine.axes();
        assert_lock_transition(prev, axes.locked);
        assert_eq!(axes.locked, ClipAxis::NegZ);
        // Inside the margin the candidate stays put too
        assert_eq!(axes.candidate, ClipAxis::NegZ);
    }
}

#[test]
fn test_clear_win_changes_candidate_but_not_lock() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Axis);
    machine.compute(&tangible(Quat::IDENTITY), &s, &info()).unwrap();
    assert_eq!(machine.axes().locked, ClipAxis::NegZ);

    // Local X now faces the viewer by far, but the Z lock holds
    machine.compute(&tangible(Quat::from_rotation_y(80f32.to_radians())), &s, &info()).unwrap();
    let axes = machine.axes();
    assert_eq!(axes.candidate, ClipAxis::PosX);
    assert!(axes.locked.same_axis(ClipAxis::PosZ));
}

#[test]
fn test_locked_axis_flips_sign() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Axis);
    machine.compute(&tangible(Quat::IDENTITY), &s, &info()).unwrap();
    assert_eq!(machine.axes().locked, ClipAxis::NegZ);

    // Turned over: local Z now points back at the viewer
    let plane = machine
        .compute(&tangible(Quat::from_rotation_x(std::f32::consts::PI)), &s, &info())
        .unwrap();
    assert_eq!(machine.axes().locked, ClipAxis::PosZ);
    // The plane normal keeps facing the viewer
    assert!(plane.normal.dot(-Vec3::Z) > 0.99);
}

#[test]
fn test_random_walk_never_jumps_axes() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Axis);
    let mut rot = Quat::IDENTITY;

    for _ in 0..2000 {
        let axis = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if axis.length() > 1e-3 {
            let step = Quat::from_axis_angle(axis.normalize(), rng.gen_range(-0.2..0.2));
            rot = (step * rot).normalize();
        }
        let pose = if rng.gen_bool(0.02) {
            Pose::default()
        } else {
            tangible(rot)
        };
        let prev = machine.axes().locked;
        let _ = machine.compute(&pose, &s, &info());
        assert_lock_transition(prev, machine.axes().locked);
    }
}

#[test]
fn test_hidden_tangible_resets_axes() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Axis);
    machine.compute(&tangible(Quat::IDENTITY), &s, &info()).unwrap();
    assert_eq!(
        machine.compute(&Pose::default(), &s, &info()),
        Err(NoPlane::TangibleHidden)
    );
    assert!(machine.axes().locked.is_none());
    assert!(machine.axes().candidate.is_none());
    assert!(machine.cross_section().is_empty());
}

#[test]
fn test_camera_filter_bootstraps_after_visibility_loss() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Camera);
    machine.compute(&tangible(Quat::IDENTITY), &s, &info()).unwrap();
    machine.compute(&Pose::default(), &s, &info()).unwrap_err();
    assert!(machine.camera_filter_state().is_none());

    // First frame back is taken as is, no blending with the old origin
    let pose = Pose::tangible_only(Mat4::from_translation(Vec3::new(0.0, 0.0, 150.0)));
    machine.compute(&pose, &s, &info()).unwrap();
    let state = machine.camera_filter_state().unwrap();
    assert!((state - Vec3::new(0.0, 0.0, 50.0)).length() < 1e-4, "{:?}", state);
}

#[test]
fn test_camera_filter_ignores_lateral_motion() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Camera);
    machine.compute(&tangible(Quat::IDENTITY), &s, &info()).unwrap();

    let moved = Pose::tangible_only(Mat4::from_translation(Vec3::new(30.0, 0.0, 200.0)));
    machine.compute(&moved, &s, &info()).unwrap();
    let state = machine.camera_filter_state().unwrap();
    // Lateral change passes straight through, depth stays where it was
    assert!((state - Vec3::new(-30.0, 0.0, 0.0)).length() < 1e-4, "{:?}", state);
}

#[test]
fn test_singular_stylus_reports_no_plane() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let s = settings(SlicingMode::Stylus);
    let base = Mat4::from_translation(Vec3::new(0.0, 0.0, 200.0));

    let good = Pose::both(base, Mat4::from_translation(Vec3::new(5.0, 5.0, 200.0)));
    let plane = machine.compute(&good, &s, &info()).unwrap();
    assert!(!machine.cross_section().is_empty());

    let flat = Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0));
    let bad = Pose::both(base, flat);
    assert_eq!(machine.compute(&bad, &s, &info()), Err(NoPlane::DegenerateStylus));

    // Recovers on the next good pose with the same result
    assert_eq!(machine.compute(&good, &s, &info()), Ok(plane));
}

#[test]
fn test_stylus_hidden() {
    let mut machine = ClipStateMachine::new(ClipParams::default());
    let pose = tangible(Quat::IDENTITY);
    assert_eq!(
        machine.compute(&pose, &settings(SlicingMode::Stylus), &info()),
        Err(NoPlane::StylusHidden)
    );
}
