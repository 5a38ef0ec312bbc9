//! Axis-aligned bounding boxes.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use crate::coords::{Axis, Point};
use crate::rotation::Rotation;

/// An axis-aligned box described by a base and an end corner.
///
/// Every operation keeps `base <= end` per axis. The zero bounds (both
/// corners at the origin) acts as the identity for union: `zero + b == b`,
/// so accumulating child bounds can start from `Bounds::default()`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Bounds {
    base: Point,
    end: Point,
}

impl Bounds {
    /// Builds bounds from two corners.
    pub fn new(base: Point, end: Point) -> Self {
        Self { base, end }
    }

    /// Builds origin-based bounds with the given extents.
    pub fn from_lengths(width: f32, height: f32, depth: f32) -> Self {
        Self { base: Point::ZERO, end: Point::new(width, height, depth) }
    }

    /// The lower corner.
    pub fn base(&self) -> Point {
        self.base
    }

    /// The upper corner.
    pub fn end(&self) -> Point {
        self.end
    }

    /// The center point.
    pub fn center(&self) -> Point {
        let (width, height, depth) = self.lengths();
        self.base + Point::new(width / 2.0, height / 2.0, depth / 2.0)
    }

    /// The lower corner; alias used by alignment code.
    pub fn bottom_left(&self) -> Point {
        self.base
    }

    /// The lower corner shifted to the far side of the x axis.
    pub fn bottom_right(&self) -> Point {
        self.base + Point::new(self.end.x, 0.0, 0.0)
    }

    /// These bounds translated back to the origin, keeping only the extents.
    pub fn strip_pos(&self) -> Bounds {
        let (width, height, depth) = self.lengths();
        Bounds::new(Point::ZERO, Point::new(width, height, depth))
    }

    /// Per-axis extents as `(width, height, depth)`.
    pub fn lengths(&self) -> (f32, f32, f32) {
        let diff = self.end - self.base;
        (diff.x.abs(), diff.y.abs(), diff.z.abs())
    }

    /// The extent along one axis.
    pub fn axis_length(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.width(),
            Axis::Y => self.height(),
            Axis::Z => self.depth(),
        }
    }

    /// Extent along x.
    pub fn width(&self) -> f32 {
        (self.end.x - self.base.x).abs()
    }

    /// Extent along y.
    pub fn height(&self) -> f32 {
        (self.end.y - self.base.y).abs()
    }

    /// Extent along z.
    pub fn depth(&self) -> f32 {
        (self.end.z - self.base.z).abs()
    }

    /// Rotates both corners around `rotation_pt` and re-derives an
    /// axis-aligned result. The base and end of a rotated box may no longer
    /// hold the per-axis minima and maxima, so they are recomputed.
    pub fn rotate_around(&self, rotation_pt: Point, rotation: &Rotation) -> Bounds {
        let calc_base = rotation.rotate_coord(rotation_pt, self.base);
        let calc_end = rotation.rotate_coord(rotation_pt, self.end);
        Bounds::new(
            Point::new(
                calc_base.x.min(calc_end.x),
                calc_base.y.min(calc_end.y),
                calc_base.z.min(calc_end.z),
            ),
            Point::new(
                calc_base.x.max(calc_end.x),
                calc_base.y.max(calc_end.y),
                calc_base.z.max(calc_end.z),
            ),
        )
    }

    /// True iff any corner component is NaN.
    pub fn is_nan(&self) -> bool {
        self.base.is_nan() || self.end.is_nan()
    }

    /// True iff both corners are finite.
    pub fn is_finite(&self) -> bool {
        self.base.is_finite() && self.end.is_finite()
    }
}

impl AddAssign for Bounds {
    /// Union. The zero bounds has no extent to contribute, so the other
    /// bounds is adopted wholesale.
    fn add_assign(&mut self, other: Bounds) {
        if self.base == Point::ZERO && self.end == Point::ZERO {
            *self = other;
            return;
        }

        self.base = Point::new(
            self.base.x.min(other.base.x),
            self.base.y.min(other.base.y),
            self.base.z.min(other.base.z),
        );
        self.end = Point::new(
            self.end.x.max(other.end.x),
            self.end.y.max(other.end.y),
            self.end.z.max(other.end.z),
        );
    }
}

impl Add for Bounds {
    type Output = Bounds;

    fn add(self, other: Bounds) -> Bounds {
        let mut bounds = self;
        bounds += other;
        bounds
    }
}

impl AddAssign<Point> for Bounds {
    fn add_assign(&mut self, offset: Point) {
        self.base += offset;
        self.end += offset;
    }
}

impl Add<Point> for Bounds {
    type Output = Bounds;

    fn add(self, offset: Point) -> Bounds {
        let mut bounds = self;
        bounds += offset;
        bounds
    }
}

impl SubAssign<Point> for Bounds {
    fn sub_assign(&mut self, offset: Point) {
        self.base -= offset;
        self.end -= offset;
    }
}

impl Sub<Point> for Bounds {
    type Output = Bounds;

    fn sub(self, offset: Point) -> Bounds {
        let mut bounds = self;
        bounds -= offset;
        bounds
    }
}

impl Mul<f32> for Bounds {
    type Output = Bounds;

    fn mul(self, factor: f32) -> Bounds {
        Bounds::new(self.base * factor, self.end * factor)
    }
}

impl MulAssign<f32> for Bounds {
    fn mul_assign(&mut self, factor: f32) {
        self.base *= factor;
        self.end *= factor;
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.base, self.end)
    }
}
