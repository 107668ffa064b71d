//! Signed principal axes used by axis-aligned slicing.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// One of the six signed data axes, or none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClipAxis {
    #[default]
    None,
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl ClipAxis {
    pub fn is_none(self) -> bool {
        self == ClipAxis::None
    }

    /// Unit direction in the tangible's local frame.
    pub fn direction(self) -> Option<Vec3> {
        match self {
            ClipAxis::None => None,
            ClipAxis::PosX => Some(Vec3::X),
            ClipAxis::NegX => Some(-Vec3::X),
            ClipAxis::PosY => Some(Vec3::Y),
            ClipAxis::NegY => Some(-Vec3::Y),
            ClipAxis::PosZ => Some(Vec3::Z),
            ClipAxis::NegZ => Some(-Vec3::Z),
        }
    }

    /// Same axis with the opposite sign.
    pub fn flipped(self) -> Self {
        match self {
            ClipAxis::None => ClipAxis::None,
            ClipAxis::PosX => ClipAxis::NegX,
            ClipAxis::NegX => ClipAxis::PosX,
            ClipAxis::PosY => ClipAxis::NegY,
            ClipAxis::NegY => ClipAxis::PosY,
            ClipAxis::PosZ => ClipAxis::NegZ,
            ClipAxis::NegZ => ClipAxis::PosZ,
        }
    }

    /// Axis index 0..3 ignoring sign.
    pub fn index(self) -> Option<usize> {
        match self {
            ClipAxis::None => None,
            ClipAxis::PosX | ClipAxis::NegX => Some(0),
            ClipAxis::PosY | ClipAxis::NegY => Some(1),
            ClipAxis::PosZ | ClipAxis::NegZ => Some(2),
        }
    }

    /// Whether both values name the same axis, regardless of sign.
    pub fn same_axis(self, other: ClipAxis) -> bool {
        match (self.index(), other.index()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Signed axis for local axis `index` given its view-space dot with +Z.
    ///
    /// The result always points back toward the viewer: a negative dot
    /// yields the positive axis.
    pub fn from_dot(index: usize, dot: f32) -> Self {
        let facing_away = dot < 0.0;
        match (index, facing_away) {
            (0, true) => ClipAxis::PosX,
            (0, false) => ClipAxis::NegX,
            (1, true) => ClipAxis::PosY,
            (1, false) => ClipAxis::NegY,
            (_, true) => ClipAxis::PosZ,
            (_, false) => ClipAxis::NegZ,
        }
    }

    /// Rotation taking the slice quad (XY plane) perpendicular to this axis.
    pub fn slice_rotation(self) -> Quat {
        let half_turn = Quat::from_axis_angle(Vec3::Z, PI);
        match self {
            ClipAxis::None | ClipAxis::PosZ => Quat::IDENTITY,
            ClipAxis::PosX => Quat::from_axis_angle(Vec3::Y, -FRAC_PI_2) * half_turn,
            ClipAxis::PosY => Quat::from_axis_angle(Vec3::X, FRAC_PI_2) * half_turn,
            ClipAxis::NegX => Quat::from_axis_angle(Vec3::Y, FRAC_PI_2) * half_turn,
            ClipAxis::NegY => Quat::from_axis_angle(Vec3::X, -FRAC_PI_2) * half_turn,
            ClipAxis::NegZ => Quat::from_axis_angle(Vec3::X, PI),
        }
    }

    /// Indicator color (red/green/blue for X/Y/Z).
    pub fn color(self) -> [f32; 3] {
        match self.index() {
            Some(0) => [1.0, 0.0, 0.0],
            Some(1) => [0.0, 1.0, 0.0],
            Some(_) => [0.0, 0.0, 1.0],
            None => [0.0, 0.0, 0.0],
        }
    }
}

/// Candidate and locked axes tracked by axis-mode slicing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClipAxes {
    /// Recomputed every frame from the tangible orientation
    pub candidate: ClipAxis,
    /// Persists until the cross-section empties or tracking is lost
    pub locked: ClipAxis,
}

impl ClipAxes {
    /// Axis in effect: the lock if any, else the candidate.
    pub fn active(&self) -> ClipAxis {
        if self.locked.is_none() {
            self.candidate
        } else {
            self.locked
        }
    }
}
