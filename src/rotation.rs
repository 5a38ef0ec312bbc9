//! 3D rotations stored as a 3×3 matrix.

use std::fmt;
use std::ops::{Mul, MulAssign};

use glam::{EulerRot, Mat3, Vec3};

use crate::coords::Point;

/// A Tait-Bryan rotation in 3D space.
///
/// Angles cannot simply be stored and summed when rotations compose, so the
/// rotation is kept as a matrix and composition is a matrix product. Because
/// the engine's coordinate convention swaps y and z, the conventional zxy
/// Tait-Bryan form becomes yxz here. Gimbal lock is not handled, and the
/// recovered [`yaw`](Rotation::yaw) / [`pitch`](Rotation::pitch) /
/// [`roll`](Rotation::roll) angles use a two-quadrant `atan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    matrix: Mat3,
}

impl Rotation {
    /// Builds a rotation from yaw, pitch, and roll in degrees.
    pub fn from_angles(yaw_degrees: f32, pitch_degrees: f32, roll_degrees: f32) -> Self {
        Self {
            matrix: Mat3::from_euler(
                EulerRot::YXZ,
                degrees_to_radians(yaw_degrees),
                degrees_to_radians(pitch_degrees),
                degrees_to_radians(roll_degrees),
            ),
        }
    }

    /// The simple non-3D notion of rotation: yaw only.
    pub fn from_degrees(degrees: f32) -> Self {
        Self::from_angles(degrees, 0.0, 0.0)
    }

    /// The identity rotation.
    pub fn none() -> Self {
        Self::from_degrees(0.0)
    }

    /// Rotates `pt` around `around_pt`.
    pub fn rotate_coord(&self, around_pt: Point, pt: Point) -> Point {
        let translated = pt - around_pt;
        let rotated = self.matrix * Vec3::new(translated.x, translated.y, translated.z);
        around_pt + Point::new(rotated.x, rotated.y, rotated.z)
    }

    /// Rotates `pt` around the origin.
    pub fn rotate_coord_origin(&self, pt: Point) -> Point {
        self.rotate_coord(Point::ZERO, pt)
    }

    /// The yaw-only reading of this rotation, in degrees.
    pub fn rotation(&self) -> f32 {
        self.yaw()
    }

    /// Yaw in degrees, recovered from the matrix.
    pub fn yaw(&self) -> f32 {
        // yxz Tait-Bryan recovery with the matrix in (row, column) terms:
        // yaw = atan(r02 / r22)
        radians_to_degrees((self.matrix.z_axis.x / self.matrix.z_axis.z).atan())
    }

    /// Pitch in degrees, recovered from the matrix.
    pub fn pitch(&self) -> f32 {
        let r12 = self.matrix.z_axis.y;
        radians_to_degrees((-r12 / (1.0 - r12 * r12).sqrt()).atan())
    }

    /// Roll in degrees, recovered from the matrix.
    pub fn roll(&self) -> f32 {
        radians_to_degrees((self.matrix.x_axis.y / self.matrix.y_axis.y).atan())
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::none()
    }
}

impl Mul for Rotation {
    type Output = Rotation;

    fn mul(self, rhs: Rotation) -> Rotation {
        Rotation { matrix: self.matrix * rhs.matrix }
    }
}

impl MulAssign for Rotation {
    fn mul_assign(&mut self, rhs: Rotation) {
        self.matrix *= rhs.matrix;
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rotation(yaw: {}, pitch: {}, roll: {})",
            self.yaw(),
            self.pitch(),
            self.roll()
        )
    }
}

/// Degree-to-radian conversion used for all rotation attributes.
pub fn degrees_to_radians(degrees: f32) -> f32 {
    (degrees * 3.1415) / 180.0
}

/// Radian-to-degree conversion used when reading angles back out.
pub fn radians_to_degrees(radians: f32) -> f32 {
    (180.0 / 3.1415) * radians
}
