//! Contractile muscles spanning two bones.
//!
//! A muscle is a spring-like actuator anchored to two points interpolated
//! along two bones. The anchor points are derived, never stored:
//!
//! ```text
//!   thigh  A ●━━━━━━━p━━━● B        p = lerp(A, B, attach_a)
//!                     \
//!                      \  muscle (rest_length)
//!                       \
//!   shin   A ●━━━━q━━━━━━● B        q = lerp(A, B, attach_b)
//! ```
//!
//! Actuation moves the muscle's current rest length toward its lower or
//! upper bound at a fixed rate; the bound is ±20% of the reference length
//! fixed at construction.

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::Bone;

/// Rate at which actuation moves the rest length, in length-units per second.
pub const ACTUATION_RATE: f64 = 0.4;

/// Lower bound on the current rest length, as a fraction of the reference.
pub const MIN_CONTRACTION: f64 = 0.8;

/// Upper bound on the current rest length, as a fraction of the reference.
pub const MAX_EXTENSION: f64 = 1.2;

/// A contractile muscle between two points interpolated along two bones.
///
/// Bone references are plain indices into the skeleton's bone sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Muscle {
    /// Index of the first bone.
    pub bone_a: usize,
    /// Index of the second bone.
    pub bone_b: usize,
    /// Attachment fraction along the first bone (0 = endpoint A, 1 = B).
    pub attach_a: f64,
    /// Attachment fraction along the second bone (0 = endpoint A, 1 = B).
    pub attach_b: f64,
    /// Current target length, mutated by actuation.
    pub rest_length: f64,
    /// Reference length fixed at construction; actuation bounds derive
    /// from this.
    pub reference_length: f64,
}

impl Muscle {
    /// Create a muscle between two bones with the given attachment
    /// fractions, using the current anchor distance as both the rest and
    /// reference length.
    #[must_use]
    pub fn from_bones(
        bones: &[Bone],
        bone_a: usize,
        attach_a: f64,
        bone_b: usize,
        attach_b: f64,
    ) -> Self {
        let (p, q) = anchor_points(&bones[bone_a], &bones[bone_b], attach_a, attach_b);
        let length = (q - p).norm();
        Self {
            bone_a,
            bone_b,
            attach_a,
            attach_b,
            rest_length: length,
            reference_length: length,
        }
    }

    /// Move the current rest length toward its lower bound (shorten) or
    /// upper bound (lengthen) at [`ACTUATION_RATE`], then clamp to
    /// `[0.8, 1.2] × reference_length`.
    pub fn adjust(&mut self, shorten: bool, dt: f64) {
        let delta = ACTUATION_RATE * dt;
        let target = if shorten {
            self.rest_length - delta
        } else {
            self.rest_length + delta
        };
        self.rest_length = target.clamp(
            MIN_CONTRACTION * self.reference_length,
            MAX_EXTENSION * self.reference_length,
        );
    }

    /// Compute the muscle's two anchor points from the referenced bones'
    /// current positions.
    #[must_use]
    pub fn anchors(&self, bones: &[Bone]) -> (Point2<f64>, Point2<f64>) {
        anchor_points(
            &bones[self.bone_a],
            &bones[self.bone_b],
            self.attach_a,
            self.attach_b,
        )
    }

    /// Current distance between the two anchor points.
    #[must_use]
    pub fn current_length(&self, bones: &[Bone]) -> f64 {
        let (p, q) = self.anchors(bones);
        (q - p).norm()
    }
}

/// Interpolate the anchor points along two bones.
fn anchor_points(
    bone_a: &Bone,
    bone_b: &Bone,
    attach_a: f64,
    attach_b: f64,
) -> (Point2<f64>, Point2<f64>) {
    let p = bone_a.a + (bone_a.b - bone_a.a) * attach_a;
    let q = bone_b.a + (bone_b.b - bone_b.a) * attach_b;
    (p, q)
}
