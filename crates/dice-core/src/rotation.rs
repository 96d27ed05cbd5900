#![forbid(unsafe_code)]

//! Accumulated rotation of the die.
//!
//! The renderer interpolates between successive rotations along the shortest
//! numeric path, so the angles are never wrapped: a rotation only ever grows.
//! Only the value modulo [`FULL_TURN`] decides which face is showing.
//!
//! # Invariants
//!
//! 1. Both axes are whole degrees.
//! 2. [`Rotation::turn`] only adds non-negative increments, so a rotation
//!    that is only ever turned is non-decreasing on both axes.

use std::fmt;

/// Degrees in one full revolution.
pub const FULL_TURN: i64 = 360;

/// Rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    X,
    Y,
}

/// Accumulated (x, y) rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rotation {
    pub x: i64,
    pub y: i64,
}

impl Rotation {
    /// The rest position of a fresh die.
    pub const ZERO: Rotation = Rotation { x: 0, y: 0 };

    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Angle on one axis.
    #[inline]
    #[must_use]
    pub const fn angle(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// Advance one axis by `degrees`.
    pub fn turn(&mut self, axis: Axis, degrees: u32) {
        let delta = i64::from(degrees);
        match axis {
            Axis::X => self.x = self.x.saturating_add(delta),
            Axis::Y => self.y = self.y.saturating_add(delta),
        }
    }

    /// Angles reduced into `[0, 360)`.
    #[must_use]
    pub const fn normalized(&self) -> (i64, i64) {
        (self.x.rem_euclid(FULL_TURN), self.y.rem_euclid(FULL_TURN))
    }

    /// `true` when neither axis of `self` is behind `earlier`.
    #[must_use]
    pub const fn is_forward_of(&self, earlier: &Rotation) -> bool {
        self.x >= earlier.x && self.y >= earlier.y
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}° y={}°", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_accumulates_without_wrapping() {
        let mut r = Rotation::ZERO;
        r.turn(Axis::X, 180);
        r.turn(Axis::X, 180);
        r.turn(Axis::X, 90);
        r.turn(Axis::Y, 90);
        assert_eq!(r, Rotation::new(450, 90));
        assert_eq!(r.normalized(), (90, 90));
    }

    #[test]
    fn normalized_handles_negative_angles() {
        assert_eq!(Rotation::new(-90, -450).normalized(), (270, 270));
    }

    #[test]
    fn forward_comparison_is_per_axis() {
        let a = Rotation::new(90, 180);
        assert!(Rotation::new(90, 180).is_forward_of(&a));
        assert!(Rotation::new(450, 180).is_forward_of(&a));
        assert!(!Rotation::new(450, 90).is_forward_of(&a));
    }

    #[test]
    fn angle_reads_axis() {
        let r = Rotation::new(7, 11);
        assert_eq!(r.angle(Axis::X), 7);
        assert_eq!(r.angle(Axis::Y), 11);
    }

    #[test]
    fn display_shows_degrees() {
        assert_eq!(Rotation::new(720, 90).to_string(), "x=720° y=90°");
    }
}
