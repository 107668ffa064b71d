//! Headless Session - drives the slicing and advection core with synthetic poses
//!
//! A vortex dataset is loaded, the tangible slowly turns in front of the
//! camera, particles are released from the data center and each slicing
//! mode gets about three seconds of real-time frames. Prints per-phase
//! metrics.
//!
//! Run with: RUST_LOG=debug cargo run --example headless_session

use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::{Mat4, Quat, UVec3, Vec3};
use tangiflow::{
    Dataset, FrameOrchestrator, Pose, ScalarGrid, SessionConfig, SlicingMode, VectorField,
};

const GRID: u32 = 48;
const FRAME_MS: u64 = 16;
const FRAMES_PER_PHASE: u32 = 180;
const TANGIBLE_DEPTH: f32 = 220.0;

/// Swirl around the Z axis with a slow updraft
fn vortex(v: UVec3) -> Vec3 {
    let c = (GRID / 2) as f32;
    let r = Vec3::new(v.x as f32 - c, v.y as f32 - c, 0.0);
    Vec3::new(-r.y, r.x, 2.0) * 0.05
}

fn tangible_pose(t: f32) -> Mat4 {
    let rot = Quat::from_rotation_y(0.6 * (t * TAU * 0.1).sin()) * Quat::from_rotation_x(0.3);
    Mat4::from_rotation_translation(rot, Vec3::new(0.0, 0.0, TANGIBLE_DEPTH))
}

fn stylus_pose(t: f32) -> Mat4 {
    let offset = Vec3::new(40.0 + 10.0 * (t * TAU * 0.2).cos(), 0.0, TANGIBLE_DEPTH - 10.0);
    Mat4::from_rotation_translation(Quat::from_rotation_z(0.2), offset)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dims = UVec3::splat(GRID);
    let c = (GRID / 2) as f32;
    let scalars = ScalarGrid::from_fn(dims, Vec3::ONE, |v| {
        let d = v.as_vec3() - Vec3::splat(c);
        (-d.length_squared() / (c * c)).exp()
    })?;
    let flow = VectorField::from_fn(dims, vortex)?;
    let dataset = Dataset::new(scalars).with_velocity(flow)?;

    let mut orchestrator = FrameOrchestrator::new(SessionConfig::default());
    let info = orchestrator.load_dataset(Arc::new(dataset))?;
    println!("=== Headless Session ===");
    println!("Grid: {:?}, default zoom {:.3}", info.dims, info.default_zoom());

    let controls = orchestrator.controls();
    let start = Instant::now();

    for mode in [SlicingMode::Camera, SlicingMode::Axis, SlicingMode::Stylus] {
        controls.set_slicing_mode(mode);
        controls.reset_particles();

        let mut planes = 0;
        let mut max_particles = 0;
        let mut section_points = 0;
        let mut released = None;

        for i in 0..FRAMES_PER_PHASE {
            let t = start.elapsed().as_secs_f32();
            controls.set_pose(Pose::both(tangible_pose(t), stylus_pose(t)));

            if i == 10 {
                // Seed at the data center
                controls.set_seed_point(0.0, 0.0, TANGIBLE_DEPTH);
                released = Some(controls.release_particles());
            }
            if i == 60 {
                controls.set_button_pressed(true);
            }
            if i == 90 {
                if let Some(pct) = controls.set_button_pressed(false) {
                    println!("  iso percentage committed: {:.3}", pct);
                }
            }

            let frame = orchestrator.frame(Instant::now());
            if frame.clip_plane.is_some() {
                planes += 1;
            }
            max_particles = max_particles.max(frame.particles.len());
            let points = orchestrator.shared().cross_section.with(|s| s.len());
            section_points = section_points.max(points);
            thread::sleep(Duration::from_millis(FRAME_MS));
        }

        println!("\n{:?} mode:", mode);
        println!("  release: {:?}", released);
        println!("  frames with a plane: {}/{}", planes, FRAMES_PER_PHASE);
        println!("  max cross-section points: {}", section_points);
        println!("  max particles drawn: {}", max_particles);
        println!("  clip axes: {:?}", orchestrator.shared().clip_axes.get());
    }

    Ok(())
}
