//! Skeleton aggregate and the biped construction routine.
//!
//! A [`Skeleton`] owns an ordered sequence of bones, an ordered sequence of
//! muscles, and an ordered sequence of joints. Muscles and joints reference
//! bones by plain index into the bone sequence (arena + index, never a
//! direct alias), so the solver can mutate bone positions in place without
//! borrow conflicts.
//!
//! The only construction routine is [`Skeleton::biped`]: a deterministic
//! two-legged figure built from fixed anatomical constants. The same
//! topology serves both the tethered variant (roots pinned to a world point)
//! and the free-fall variant; anchoring is solver configuration, not model
//! structure.
//!
//! ```text
//!                ● head
//!                │ neck
//!   clav  ●──────●──────●  clav
//!         │    chest    │
//!    arm  │      │      │  arm
//!         ●      │spine ●
//!         │      │      │
//!         ●      ● root ●
//!               ╱│╲
//!        thigh ╱ │ ╲ thigh
//!             ●  ●  ●
//!        shin │pelvis│ shin
//!             ●      ●   feet
//! ```

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::muscle::Muscle;
use crate::types::{Bone, BoneEnd, BoneFlags, Joint};

/// Named bone, muscle, and anchor indices for the biped topology.
pub mod biped {
    /// Left thigh (root at the pelvis point).
    pub const THIGH_LEFT: usize = 0;
    /// Right thigh (root at the pelvis point).
    pub const THIGH_RIGHT: usize = 1;
    /// Left shin (distal endpoint is the left foot).
    pub const SHIN_LEFT: usize = 2;
    /// Right shin (distal endpoint is the right foot).
    pub const SHIN_RIGHT: usize = 3;
    /// Spine (root at the pelvis point, tip at the chest).
    pub const SPINE: usize = 4;
    /// Neck (chest to head).
    pub const NECK: usize = 5;
    /// Left clavicle (chest to left shoulder).
    pub const CLAVICLE_LEFT: usize = 6;
    /// Right clavicle (chest to right shoulder).
    pub const CLAVICLE_RIGHT: usize = 7;
    /// Left upper arm (shoulder to elbow).
    pub const UPPER_ARM_LEFT: usize = 8;
    /// Right upper arm (shoulder to elbow).
    pub const UPPER_ARM_RIGHT: usize = 9;
    /// Left forearm (elbow to hand).
    pub const FOREARM_LEFT: usize = 10;
    /// Right forearm (elbow to hand).
    pub const FOREARM_RIGHT: usize = 11;
    /// Pelvis bar (sacrum stub hanging below the pelvis point).
    pub const PELVIS: usize = 12;

    /// Left quadriceps (thigh to shin).
    pub const QUADRICEPS_LEFT: usize = 0;
    /// Left hamstring (thigh to shin).
    pub const HAMSTRING_LEFT: usize = 1;
    /// Right quadriceps (thigh to shin).
    pub const QUADRICEPS_RIGHT: usize = 2;
    /// Right hamstring (thigh to shin).
    pub const HAMSTRING_RIGHT: usize = 3;
    /// Left arm flexor (upper arm to forearm).
    pub const FLEXOR_LEFT: usize = 4;
    /// Left arm extensor (upper arm to forearm).
    pub const EXTENSOR_LEFT: usize = 5;
    /// Right arm flexor (upper arm to forearm).
    pub const FLEXOR_RIGHT: usize = 6;
    /// Right arm extensor (upper arm to forearm).
    pub const EXTENSOR_RIGHT: usize = 7;

    /// Bone indices whose root endpoints are pinned in tethered mode.
    pub const TETHER_ANCHORS: [usize; 3] = [THIGH_LEFT, THIGH_RIGHT, SPINE];
}

// Anatomical constants. The pelvis point is the common root of both thighs,
// the spine, and the pelvis bar; the feet start exactly at y = 0.
const ROOT_X: f64 = 0.0;
const ROOT_Y: f64 = 0.5;
const LEG_SPLAY: f64 = 0.07;
const KNEE_HEIGHT: f64 = 0.25;
const SPINE_LEN: f64 = 0.3;
const NECK_LEN: f64 = 0.1;
const CLAVICLE_LEN: f64 = 0.12;
const UPPER_ARM_LEN: f64 = 0.18;
const FOREARM_LEN: f64 = 0.18;
const PELVIS_DROP: f64 = 0.12;

/// The articulated ragdoll: bones, muscles, and joints.
///
/// The skeleton is the sole owner of all bone and muscle state. It is
/// created by [`Skeleton::biped`] and replaced wholesale on
/// [`Skeleton::reset`]; topology never mutates at runtime.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Skeleton {
    pub(crate) bones: Vec<Bone>,
    pub(crate) muscles: Vec<Muscle>,
    pub(crate) joints: Vec<Joint>,
}

impl Skeleton {
    /// Build the two-legged biped.
    ///
    /// Deterministic and side-effect free: the same call always produces a
    /// bit-identical skeleton, which is also the state restored by
    /// [`Skeleton::reset`]. 13 bones, 8 muscles, 13 joints; every joint's
    /// two bound endpoints coincide at construction.
    #[must_use]
    pub fn biped() -> Self {
        use biped::*;

        let root = Point2::new(ROOT_X, ROOT_Y);
        let chest = Point2::new(ROOT_X, ROOT_Y + SPINE_LEN);
        let knee_l = Point2::new(ROOT_X - LEG_SPLAY, KNEE_HEIGHT);
        let knee_r = Point2::new(ROOT_X + LEG_SPLAY, KNEE_HEIGHT);
        let foot_l = Point2::new(ROOT_X - LEG_SPLAY, 0.0);
        let foot_r = Point2::new(ROOT_X + LEG_SPLAY, 0.0);
        let shoulder_l = Point2::new(ROOT_X - CLAVICLE_LEN, chest.y);
        let shoulder_r = Point2::new(ROOT_X + CLAVICLE_LEN, chest.y);
        let elbow_l = Point2::new(shoulder_l.x, chest.y - UPPER_ARM_LEN);
        let elbow_r = Point2::new(shoulder_r.x, chest.y - UPPER_ARM_LEN);
        let hand_l = Point2::new(shoulder_l.x, elbow_l.y - FOREARM_LEN);
        let hand_r = Point2::new(shoulder_r.x, elbow_r.y - FOREARM_LEN);
        let head = Point2::new(ROOT_X, chest.y + NECK_LEN);
        let sacrum = Point2::new(ROOT_X, ROOT_Y - PELVIS_DROP);

        // Bone order must match the `biped` index constants.
        let bones = vec![
            Bone::new(root, knee_l),
            Bone::new(root, knee_r),
            Bone::with_flags(knee_l, foot_l, BoneFlags::FOOT),
            Bone::with_flags(knee_r, foot_r, BoneFlags::FOOT),
            Bone::new(root, chest),
            Bone::new(chest, head),
            Bone::new(chest, shoulder_l),
            Bone::new(chest, shoulder_r),
            Bone::new(shoulder_l, elbow_l),
            Bone::new(shoulder_r, elbow_r),
            Bone::new(elbow_l, hand_l),
            Bone::new(elbow_r, hand_r),
            Bone::new(root, sacrum),
        ];

        let muscles = vec![
            Muscle::from_bones(&bones, THIGH_LEFT, 0.5, SHIN_LEFT, 0.5),
            Muscle::from_bones(&bones, THIGH_LEFT, 0.25, SHIN_LEFT, 0.75),
            Muscle::from_bones(&bones, THIGH_RIGHT, 0.5, SHIN_RIGHT, 0.5),
            Muscle::from_bones(&bones, THIGH_RIGHT, 0.25, SHIN_RIGHT, 0.75),
            Muscle::from_bones(&bones, UPPER_ARM_LEFT, 0.5, FOREARM_LEFT, 0.5),
            Muscle::from_bones(&bones, UPPER_ARM_LEFT, 0.25, FOREARM_LEFT, 0.75),
            Muscle::from_bones(&bones, UPPER_ARM_RIGHT, 0.5, FOREARM_RIGHT, 0.5),
            Muscle::from_bones(&bones, UPPER_ARM_RIGHT, 0.25, FOREARM_RIGHT, 0.75),
        ];

        let joints = vec![
            // Knees.
            Joint::new(THIGH_LEFT, BoneEnd::B, SHIN_LEFT, BoneEnd::A),
            Joint::new(THIGH_RIGHT, BoneEnd::B, SHIN_RIGHT, BoneEnd::A),
            // Neck base.
            Joint::new(SPINE, BoneEnd::B, NECK, BoneEnd::A),
            // Chest to clavicles.
            Joint::new(SPINE, BoneEnd::B, CLAVICLE_LEFT, BoneEnd::A),
            Joint::new(SPINE, BoneEnd::B, CLAVICLE_RIGHT, BoneEnd::A),
            // Shoulders.
            Joint::new(CLAVICLE_LEFT, BoneEnd::B, UPPER_ARM_LEFT, BoneEnd::A),
            Joint::new(CLAVICLE_RIGHT, BoneEnd::B, UPPER_ARM_RIGHT, BoneEnd::A),
            // Elbows.
            Joint::new(UPPER_ARM_LEFT, BoneEnd::B, FOREARM_LEFT, BoneEnd::A),
            Joint::new(UPPER_ARM_RIGHT, BoneEnd::B, FOREARM_RIGHT, BoneEnd::A),
            // Hip-to-hip and hip-to-spine: both thigh roots and the spine
            // root share the pelvis point.
            Joint::new(THIGH_LEFT, BoneEnd::A, THIGH_RIGHT, BoneEnd::A),
            Joint::new(THIGH_LEFT, BoneEnd::A, SPINE, BoneEnd::A),
            // Pelvis bar to hips.
            Joint::new(PELVIS, BoneEnd::A, THIGH_LEFT, BoneEnd::A),
            Joint::new(PELVIS, BoneEnd::A, THIGH_RIGHT, BoneEnd::A),
        ];

        tracing::debug!(
            bones = bones.len(),
            muscles = muscles.len(),
            joints = joints.len(),
            "built biped skeleton"
        );

        Self {
            bones,
            muscles,
            joints,
        }
    }

    /// Replace the skeleton with a freshly built biped.
    ///
    /// Discards all accumulated muscle contraction and position state; the
    /// result is identical to the skeleton produced at first construction.
    pub fn reset(&mut self) {
        *self = Self::biped();
    }

    /// The ordered bone sequence (read-only; rendering reads endpoints
    /// from here after each step).
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// The ordered muscle sequence.
    #[must_use]
    pub fn muscles(&self) -> &[Muscle] {
        &self.muscles
    }

    /// The ordered joint sequence.
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Number of bones.
    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    /// Number of muscles.
    #[must_use]
    pub fn num_muscles(&self) -> usize {
        self.muscles.len()
    }

    /// Actuate one muscle: move its rest length toward the contraction
    /// bound (`shorten`) or the extension bound, rate-limited by `dt`.
    ///
    /// Called once per active input per tick by the input-handling layer.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range. Topology is fixed and internally
    /// constructed, so an invalid muscle index is a programmer error.
    pub fn adjust_muscle(&mut self, index: usize, shorten: bool, dt: f64) {
        self.muscles[index].adjust(shorten, dt);
    }

    /// Recompute the anchor points of one muscle for drawing.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn muscle_anchors(&self, index: usize) -> (Point2<f64>, Point2<f64>) {
        self.muscles[index].anchors(&self.bones)
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::biped()
    }
}

/// Build the two-legged biped skeleton.
///
/// Free-function alias for [`Skeleton::biped`].
#[must_use]
pub fn build_biped() -> Skeleton {
    Skeleton::biped()
}
