use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default tolerance for position and scale comparison, in world units.
pub const POSITION_TOLERANCE: f32 = 0.01;

/// Default tolerance for rotation comparison, in degrees.
pub const ANGLE_TOLERANCE_DEG: f32 = 0.01;

/// World transform of a node: position, Euler rotation in degrees, scale.
/// Rotation is stored as Euler angles because that is what the persisted
/// records carry; comparison wraps per-axis at 360°.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    #[inline]
    pub const fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// True when `other` matches within `pos_tol` units (position and scale)
    /// and `angle_tol` degrees (rotation, wrap-aware per axis).
    pub fn approx_eq(&self, other: &Transform, pos_tol: f32, angle_tol: f32) -> bool {
        vec_within(self.position, other.position, pos_tol)
            && vec_within(self.scale, other.scale, pos_tol)
            && angle_within(self.rotation.x, other.rotation.x, angle_tol)
            && angle_within(self.rotation.y, other.rotation.y, angle_tol)
            && angle_within(self.rotation.z, other.rotation.z, angle_tol)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[inline]
fn vec_within(a: Vec3, b: Vec3, tol: f32) -> bool {
    (a.x - b.x).abs() <= tol && (a.y - b.y).abs() <= tol && (a.z - b.z).abs() <= tol
}

#[inline]
fn angle_within(a: f32, b: f32, tol: f32) -> bool {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff) <= tol
}
