#![forbid(unsafe_code)]

//! Face ↔ orientation mapping and forward-only target computation.
//!
//! # Target computation
//!
//! For a settle onto `face` with `extra_spins` additional revolutions, each
//! axis starts from the table's base angle for `face` (in `[0, 360)`) and is
//! pushed ahead by whole turns until it reaches at least
//! `current + extra_spins * 360`:
//!
//! ```text
//! floor  = current + extra_spins * 360
//! target = base + 360 * ceil(max(floor - base, 0) / 360)
//! ```
//!
//! # Invariants
//!
//! 1. `target ≡ base (mod 360)` on both axes, so the settled rotation shows
//!    exactly `face`.
//! 2. `target >= current` on both axes: a settle never spins backwards.
//! 3. For non-negative rotations, `target - current < (extra_spins + 1) * 360`
//!    on both axes: the settle adds the requested revolutions and less than
//!    one more.

use crate::face::Face;
use crate::rotation::{FULL_TURN, Rotation};

/// Canonical resting orientation of one face, angles in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Orientation {
    pub x: i64,
    pub y: i64,
}

impl Orientation {
    /// Build an orientation, reducing both angles modulo 360.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self {
            x: x.rem_euclid(FULL_TURN),
            y: y.rem_euclid(FULL_TURN),
        }
    }
}

/// Standard die layout: opposite faces sum to seven.
///
/// Face 1 faces the viewer, 6 is behind it, 2/5 sit on the y-axis sides and
/// 3/4 on the x-axis sides.
const STANDARD: [Orientation; 6] = [
    Orientation::new(0, 0),
    Orientation::new(0, 270),
    Orientation::new(270, 0),
    Orientation::new(90, 0),
    Orientation::new(0, 90),
    Orientation::new(0, 180),
];

/// Immutable mapping from each face to its canonical orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceOrientationTable {
    orientations: [Orientation; 6],
}

impl Default for FaceOrientationTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl FaceOrientationTable {
    /// The standard layout.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            orientations: STANDARD,
        }
    }

    /// Build a table from raw `(x, y)` angles indexed by face − 1.
    ///
    /// Angles are reduced modulo 360. Returns `None` when two faces would
    /// share an orientation, since the reverse lookup would be ambiguous.
    #[must_use]
    pub fn from_angles(angles: [(i64, i64); 6]) -> Option<Self> {
        let orientations = angles.map(|(x, y)| Orientation::new(x, y));
        for (i, a) in orientations.iter().enumerate() {
            if orientations[i + 1..].contains(a) {
                return None;
            }
        }
        Some(Self { orientations })
    }

    /// Canonical orientation of `face`.
    #[inline]
    #[must_use]
    pub fn orientation(&self, face: Face) -> Orientation {
        self.orientations[face.index()]
    }

    /// The face a rotation shows at rest, if it matches a canonical
    /// orientation exactly (mod 360).
    #[must_use]
    pub fn face_at(&self, rotation: Rotation) -> Option<Face> {
        let (x, y) = rotation.normalized();
        Face::ALL
            .into_iter()
            .find(|face| self.orientation(*face) == Orientation { x, y })
    }

    /// Forward-only target rotation that settles on `face`.
    #[must_use]
    pub fn compute_target(&self, current: Rotation, face: Face, extra_spins: u32) -> Rotation {
        let base = self.orientation(face);
        Rotation::new(
            forward_angle(current.x, base.x, extra_spins),
            forward_angle(current.y, base.y, extra_spins),
        )
    }
}

/// Smallest `base + 360k` (k ≥ 0) that is at least `current + extra * 360`.
fn forward_angle(current: i64, base: i64, extra_spins: u32) -> i64 {
    let floor = current.saturating_add(i64::from(extra_spins) * FULL_TURN);
    let deficit = floor.saturating_sub(base);
    if deficit <= 0 {
        return base;
    }
    let turns = (deficit + FULL_TURN - 1) / FULL_TURN;
    base.saturating_add(turns * FULL_TURN)
}
