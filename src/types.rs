//! Core types for the ragdoll skeleton.
//!
//! This module provides the building blocks of the articulated body:
//!
//! - [`Bone`] - A rigid segment between two endpoints with a fixed rest length
//! - [`BoneEnd`] - Selector for one of a bone's two endpoints
//! - [`Joint`] - A constraint that two specific bone endpoints must coincide
//! - [`BoneFlags`] - Flags for bone behavior (ground contact, etc.)
//!
//! Bones store their previous-frame endpoint positions so the solver can
//! derive velocities Verlet-style instead of storing them explicitly:
//!
//! ```text
//!   A ●━━━━━━━━━━● B      v = (current - previous) * damping
//! ```

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selector for one of a bone's two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BoneEnd {
    /// The root endpoint (proximal end).
    A,
    /// The tip endpoint (distal end).
    B,
}

bitflags::bitflags! {
    /// Flags for bone behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct BoneFlags: u32 {
        /// Bone is a foot: its distal endpoint is subject to the ground
        /// constraint and the static-friction lock.
        const FOOT = 0b0000_0001;
    }
}

/// A rigid segment between two endpoints.
///
/// The rest length is fixed at construction; the solver restores it after
/// every completed step. Previous-frame positions are seeded equal to the
/// current positions, meaning zero initial velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bone {
    /// Current position of endpoint A.
    pub a: Point2<f64>,
    /// Current position of endpoint B.
    pub b: Point2<f64>,
    /// Previous-frame position of endpoint A.
    pub prev_a: Point2<f64>,
    /// Previous-frame position of endpoint B.
    pub prev_b: Point2<f64>,
    /// Anatomical length, fixed at construction.
    pub rest_length: f64,
    /// Behavior flags.
    pub flags: BoneFlags,
}

impl Bone {
    /// Create a new bone between two endpoints.
    ///
    /// The rest length is the distance between the endpoints; previous
    /// positions are seeded to the current ones (zero initial velocity).
    #[must_use]
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self {
            a,
            b,
            prev_a: a,
            prev_b: b,
            rest_length: (b - a).norm(),
            flags: BoneFlags::empty(),
        }
    }

    /// Create a new bone with the given flags.
    #[must_use]
    pub fn with_flags(a: Point2<f64>, b: Point2<f64>, flags: BoneFlags) -> Self {
        let mut bone = Self::new(a, b);
        bone.flags = flags;
        bone
    }

    /// Get the current position of the given endpoint.
    #[must_use]
    pub const fn point(&self, end: BoneEnd) -> Point2<f64> {
        match end {
            BoneEnd::A => self.a,
            BoneEnd::B => self.b,
        }
    }

    /// Get mutable access to the current position of the given endpoint.
    pub fn point_mut(&mut self, end: BoneEnd) -> &mut Point2<f64> {
        match end {
            BoneEnd::A => &mut self.a,
            BoneEnd::B => &mut self.b,
        }
    }

    /// Current length of the bone.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// Deviation of the current length from the rest length.
    #[must_use]
    pub fn length_error(&self) -> f64 {
        self.length() - self.rest_length
    }

    /// Whether this bone is a foot (subject to ground and friction).
    #[must_use]
    pub const fn is_foot(&self) -> bool {
        self.flags.contains(BoneFlags::FOOT)
    }
}

/// A constraint declaring that two specific bone endpoints must coincide.
///
/// Joints are topology only: two bone indices plus two endpoint selectors.
/// They carry no mutable state and are evaluated against the bones'
/// positions each relaxation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Joint {
    /// Index of the first bone.
    pub bone_i: usize,
    /// Bound endpoint of the first bone.
    pub end_i: BoneEnd,
    /// Index of the second bone.
    pub bone_j: usize,
    /// Bound endpoint of the second bone.
    pub end_j: BoneEnd,
}

impl Joint {
    /// Create a new joint binding `end_i` of bone `bone_i` to `end_j` of
    /// bone `bone_j`.
    #[must_use]
    pub const fn new(bone_i: usize, end_i: BoneEnd, bone_j: usize, end_j: BoneEnd) -> Self {
        Self {
            bone_i,
            end_i,
            bone_j,
            end_j,
        }
    }
}
