//! Verlet integration and position-based constraint relaxation.
//!
//! This module implements the per-tick update for the ragdoll: predict
//! endpoint positions from implicit velocities, then iteratively relax the
//! bone-length, joint-coincidence, muscle-length, and ground constraints.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each tick:
//!   1. Pin anchored bone roots (tethered mode)
//!   2. Predict positions: x* = x + (x - x_prev) * damping + g * dt²
//!   3. Immediate bone-length correction
//!   4. Clamp positions to the [-15, 15] sandbox
//!   5. For each of 15 relaxation iterations:
//!      a. Solve bone-length constraints
//!      b. Solve joint-coincidence constraints
//!      c. Re-pin anchored roots
//!      d. Solve muscle-length constraints
//!      e. Re-pin anchored roots
//!      f. Clamp feet above the ground plane
//!   6. Final strict bone-length pass
//!   7. Optional static-friction foot lock
//! ```
//!
//! The fixed iteration count is a stability/performance trade-off:
//! Gauss-Seidel-style relaxation converges approximately within a bounded
//! budget, and the strict final pass guarantees bones exit the tick at
//! their rest length regardless of residual relaxation error.
//!
//! Numerical safety is local: a non-finite velocity, joint delta, or muscle
//! correction skips that one update and leaves prior valid state in place.
//! Only a malformed gravity impulse aborts the whole tick, with zero
//! mutation.

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{RagdollError, Result};
use crate::skeleton::Skeleton;
use crate::types::BoneEnd;

/// Gravitational acceleration, in distance units per second squared.
pub const GRAVITY: f64 = 9.8;

/// Maximum derived endpoint speed, in distance units per second.
///
/// A single integration step never moves an endpoint farther than
/// `MAX_SPEED * dt`, preventing one large step from ejecting a point.
pub const MAX_SPEED: f64 = 25.0;

/// Coordinate sandbox: every endpoint coordinate is clamped to
/// `[-POSITION_BOUND, POSITION_BOUND]` on both axes.
pub const POSITION_BOUND: f64 = 15.0;

/// Maximum muscle correction applied in one relaxation pass, in
/// distance units.
pub const MAX_MUSCLE_CORRECTION: f64 = 0.3;

/// Horizontal foot speed below which static friction locks the foot,
/// in distance units per second.
pub const FRICTION_THRESHOLD: f64 = 0.05;

/// Length below which a bone or muscle span is treated as degenerate
/// (no direction defined) and its correction skipped.
const GEOM_EPS: f64 = 1e-10;

/// Configuration for the constraint solver.
///
/// The anchored-bone index set selects the topology variant: empty for the
/// free-fall body, `{thigh roots, spine root}` for the tethered marionette.
/// All other knobs are forwarded unchanged from the UI/input layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Number of relaxation iterations per tick.
    pub iterations: u32,
    /// Scale factor applied to muscle corrections.
    pub muscle_scale: f64,
    /// Scale factor applied to gravity.
    pub gravity_scale: f64,
    /// Velocity damping factor in `(0, 1]`.
    pub damping: f64,
    /// Height of the infinite ground plane.
    pub ground_height: f64,
    /// Whether to apply the static-friction foot lock. The input layer
    /// disables this while a directional key is held so legs can be driven
    /// without fighting the lock.
    pub friction: bool,
    /// Indices of anchored bones; each anchored bone's A endpoint is pinned
    /// to `anchor_point` with zero velocity every tick.
    pub anchors: Vec<usize>,
    /// World point anchored bone roots are pinned to.
    pub anchor_point: Point2<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::free_fall()
    }
}

impl SolverConfig {
    /// Config for the free body: no anchors, body falls under gravity.
    #[must_use]
    pub fn free_fall() -> Self {
        Self {
            iterations: 15,
            muscle_scale: 0.5,
            gravity_scale: 1.0,
            damping: 0.98,
            ground_height: 0.0,
            friction: false,
            anchors: Vec::new(),
            anchor_point: Point2::new(0.0, 0.5),
        }
    }

    /// Config for the tethered marionette: both thigh roots and the spine
    /// root pinned to the pelvis anchor point.
    #[must_use]
    pub fn tethered() -> Self {
        Self {
            anchors: crate::skeleton::biped::TETHER_ANCHORS.to_vec(),
            ..Self::free_fall()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::InvalidConfig`] if the iteration count is
    /// zero, damping lies outside `(0, 1]`, or any scalar parameter is
    /// non-finite.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(RagdollError::invalid_config(
                "iterations must be at least 1",
            ));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(RagdollError::invalid_config(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if !self.muscle_scale.is_finite() || self.muscle_scale < 0.0 {
            return Err(RagdollError::invalid_config(format!(
                "muscle_scale must be finite and non-negative, got {}",
                self.muscle_scale
            )));
        }
        if !self.gravity_scale.is_finite() {
            return Err(RagdollError::invalid_config(format!(
                "gravity_scale must be finite, got {}",
                self.gravity_scale
            )));
        }
        if !self.ground_height.is_finite() {
            return Err(RagdollError::invalid_config(format!(
                "ground_height must be finite, got {}",
                self.ground_height
            )));
        }
        if !finite_vec(self.anchor_point.coords) {
            return Err(RagdollError::invalid_config(
                "anchor_point must be finite",
            ));
        }
        Ok(())
    }
}

/// Statistics from one solver tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepStats {
    /// Relaxation iterations performed.
    pub iterations: u32,
    /// Maximum residual bone-length error before the strict final pass.
    pub max_bone_error: f64,
    /// Number of bone/joint/muscle updates skipped by non-finite guards.
    pub skipped_updates: u32,
}

/// Position-based Verlet solver for the ragdoll skeleton.
///
/// The solver is stateless between calls apart from its configuration: a
/// tick is a function of the skeleton's mutable state and the tick
/// parameters, and runs to completion without yielding (mid-tick states are
/// intentionally inconsistent).
#[derive(Debug, Clone, Default)]
pub struct VerletSolver {
    config: SolverConfig,
}

impl VerletSolver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Get the solver configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Get mutable access to the configuration (UI knobs write here).
    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    /// Execute one simulation tick.
    ///
    /// Mutates bone positions in place; never allocates new topology. When
    /// an error is returned the skeleton has not been touched at all.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::InvalidConfig`] for an invalid configuration
    /// or non-positive `dt`, and [`RagdollError::NumericalError`] if the
    /// gravity impulse is non-finite.
    ///
    /// # Panics
    ///
    /// Panics if an anchored bone index is out of range; topology is fixed
    /// and internally constructed, so that is a programmer error.
    pub fn step(&self, skeleton: &mut Skeleton, dt: f64) -> Result<StepStats> {
        self.config.validate()?;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(RagdollError::invalid_config(format!(
                "timestep must be finite and positive, got {dt}"
            )));
        }

        let gravity = Vector2::new(0.0, -GRAVITY * self.config.gravity_scale * dt * dt);
        if !finite_vec(gravity) {
            return Err(RagdollError::numerical_error(
                "non-finite gravity impulse; aborting tick with no mutation",
            ));
        }

        let mut skipped = 0u32;

        // 1. Pin anchored roots, canceling any velocity at the anchor.
        self.apply_anchors(skeleton);

        // 2. Verlet prediction.
        self.predict_positions(skeleton, dt, gravity, &mut skipped);

        // 3. Immediate rigidity correction, before relaxation begins.
        self.enforce_bone_lengths(skeleton);

        // 4. Numerical sandbox.
        clamp_positions(skeleton);

        // 5. Relaxation loop.
        for _ in 0..self.config.iterations {
            self.enforce_bone_lengths(skeleton);
            self.solve_joints(skeleton, &mut skipped);
            self.apply_anchors(skeleton);
            self.solve_muscles(skeleton, &mut skipped);
            self.apply_anchors(skeleton);
            self.clamp_feet_to_ground(skeleton);
        }

        // 6. Strict final pass: bones exit the tick at rest length.
        let max_bone_error = self.enforce_bone_lengths(skeleton);

        // 7. Boundary conditions layered on the final pose.
        self.clamp_feet_to_ground(skeleton);
        if self.config.friction {
            self.apply_friction(skeleton, dt);
        }
        clamp_positions(skeleton);

        Ok(StepStats {
            iterations: self.config.iterations,
            max_bone_error,
            skipped_updates: skipped,
        })
    }

    fn is_anchored(&self, index: usize) -> bool {
        self.config.anchors.contains(&index)
    }

    /// Force every anchored bone's A endpoint (and its previous-frame
    /// position) to the anchor point.
    fn apply_anchors(&self, skeleton: &mut Skeleton) {
        for &index in &self.config.anchors {
            let bone = &mut skeleton.bones[index];
            bone.a = self.config.anchor_point;
            bone.prev_a = self.config.anchor_point;
        }
    }

    /// Verlet prediction: derive damped velocities, clamp their magnitude,
    /// and advance endpoints under the gravity impulse.
    fn predict_positions(
        &self,
        skeleton: &mut Skeleton,
        dt: f64,
        gravity: Vector2<f64>,
        skipped: &mut u32,
    ) {
        let max_step = MAX_SPEED * dt;
        for (index, bone) in skeleton.bones.iter_mut().enumerate() {
            let vel_a = clamp_norm((bone.a - bone.prev_a) * self.config.damping, max_step);
            let vel_b = clamp_norm((bone.b - bone.prev_b) * self.config.damping, max_step);

            if !finite_vec(vel_a) || !finite_vec(vel_b) {
                tracing::warn!(bone = index, "non-finite velocity, skipping bone update");
                *skipped += 1;
                continue;
            }

            bone.prev_a = bone.a;
            bone.prev_b = bone.b;
            bone.a += vel_a + gravity;
            bone.b += vel_b + gravity;
        }
    }

    /// One bone-length correction sweep.
    ///
    /// Anchored bones move only their B endpoint along the current A→B
    /// direction; free bones split the correction symmetrically about the
    /// midpoint. Degenerate (zero-length) and non-finite bones are skipped.
    /// Returns the maximum absolute length error observed before correcting.
    fn enforce_bone_lengths(&self, skeleton: &mut Skeleton) -> f64 {
        let mut max_error: f64 = 0.0;
        for index in 0..skeleton.bones.len() {
            let bone = &mut skeleton.bones[index];
            let delta = bone.b - bone.a;
            let length = delta.norm();
            if length < GEOM_EPS {
                continue;
            }
            let error = length - bone.rest_length;
            if !error.is_finite() {
                continue;
            }
            max_error = max_error.max(error.abs());

            let dir = delta / length;
            if self.is_anchored(index) {
                bone.b -= dir * error;
            } else {
                bone.a += dir * (error * 0.5);
                bone.b -= dir * (error * 0.5);
            }
        }
        max_error
    }

    /// One joint-coincidence sweep: move each bound endpoint to the pair's
    /// midpoint. An anchored bone's anchored end collapses the midpoint to
    /// the anchor point instead (the anchor always wins; with both ends
    /// anchored, the first bone's anchor is used).
    fn solve_joints(&self, skeleton: &mut Skeleton, skipped: &mut u32) {
        for joint_index in 0..skeleton.joints.len() {
            let joint = skeleton.joints[joint_index];
            let p_i = skeleton.bones[joint.bone_i].point(joint.end_i);
            let p_j = skeleton.bones[joint.bone_j].point(joint.end_j);

            let i_fixed = joint.end_i == BoneEnd::A && self.is_anchored(joint.bone_i);
            let j_fixed = joint.end_j == BoneEnd::A && self.is_anchored(joint.bone_j);

            let target = if i_fixed || j_fixed {
                self.config.anchor_point
            } else {
                Point2::from((p_i.coords + p_j.coords) * 0.5)
            };

            let delta_i = target - p_i;
            let delta_j = target - p_j;
            if !finite_vec(delta_i) || !finite_vec(delta_j) {
                tracing::warn!(joint = joint_index, "non-finite joint delta, skipping");
                *skipped += 1;
                continue;
            }

            if !i_fixed {
                *skeleton.bones[joint.bone_i].point_mut(joint.end_i) += delta_i;
            }
            if !j_fixed {
                *skeleton.bones[joint.bone_j].point_mut(joint.end_j) += delta_j;
            }
        }
    }

    /// One muscle sweep: pull each muscle's derived anchor points toward
    /// its current rest length, scaled by `muscle_scale` and clamped to
    /// [`MAX_MUSCLE_CORRECTION`] per pass.
    fn solve_muscles(&self, skeleton: &mut Skeleton, skipped: &mut u32) {
        for index in 0..skeleton.muscles.len() {
            let muscle = skeleton.muscles[index];
            let (p, q) = muscle.anchors(&skeleton.bones);
            let delta = q - p;
            let length = delta.norm();
            if length < GEOM_EPS {
                continue;
            }

            let error = length - muscle.rest_length;
            let correction = clamp_norm(
                delta * (error * self.config.muscle_scale / length),
                MAX_MUSCLE_CORRECTION,
            );
            if !finite_vec(correction) {
                tracing::warn!(muscle = index, "non-finite muscle correction, skipping");
                *skipped += 1;
                continue;
            }

            let half = correction * 0.5;
            self.apply_muscle_correction(skeleton, muscle.bone_a, muscle.attach_a, half);
            self.apply_muscle_correction(skeleton, muscle.bone_b, muscle.attach_b, -half);
        }
    }

    /// Distribute a muscle correction onto one bone's endpoints, weighted
    /// by the attachment fraction. An anchored bone takes its whole share
    /// on the free endpoint.
    fn apply_muscle_correction(
        &self,
        skeleton: &mut Skeleton,
        bone_index: usize,
        attach: f64,
        delta: Vector2<f64>,
    ) {
        let anchored = self.is_anchored(bone_index);
        let bone = &mut skeleton.bones[bone_index];
        if anchored {
            bone.b += delta * attach;
        } else {
            bone.a += delta * (1.0 - attach);
            bone.b += delta * attach;
        }
    }

    /// One-sided ground constraint: feet never sink below the ground
    /// plane, and are never pushed down onto it.
    fn clamp_feet_to_ground(&self, skeleton: &mut Skeleton) {
        for bone in &mut skeleton.bones {
            if bone.is_foot() && bone.b.y < self.config.ground_height {
                bone.b.y = self.config.ground_height;
            }
        }
    }

    /// Static-friction approximation: a foot moving horizontally slower
    /// than [`FRICTION_THRESHOLD`] is locked to its previous horizontal
    /// position, preventing jitter when nominally stationary.
    fn apply_friction(&self, skeleton: &mut Skeleton, dt: f64) {
        for bone in &mut skeleton.bones {
            if !bone.is_foot() {
                continue;
            }
            let horizontal_speed = (bone.b.x - bone.prev_b.x) / dt;
            if horizontal_speed.abs() < FRICTION_THRESHOLD {
                bone.b.x = bone.prev_b.x;
            }
        }
    }
}

/// Clamp every endpoint coordinate to the position sandbox.
fn clamp_positions(skeleton: &mut Skeleton) {
    for bone in &mut skeleton.bones {
        clamp_point(&mut bone.a);
        clamp_point(&mut bone.b);
    }
}

fn clamp_point(p: &mut Point2<f64>) {
    p.x = p.x.clamp(-POSITION_BOUND, POSITION_BOUND);
    p.y = p.y.clamp(-POSITION_BOUND, POSITION_BOUND);
}

/// Clamp a vector's magnitude to `max`.
fn clamp_norm(v: Vector2<f64>, max: f64) -> Vector2<f64> {
    let norm = v.norm();
    if norm > max {
        v * (max / norm)
    } else {
        v
    }
}

fn finite_vec(v: Vector2<f64>) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::skeleton::biped;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 120.0;

    #[test]
    fn test_free_fall_body_falls() {
        let mut skeleton = Skeleton::biped();
        let solver = VerletSolver::new(SolverConfig {
            ground_height: -10.0,
            ..SolverConfig::free_fall()
        });

        let chest_before = skeleton.bones()[biped::SPINE].b.y;
        for _ in 0..30 {
            solver.step(&mut skeleton, DT).expect("step should succeed");
        }
        assert!(
            skeleton.bones()[biped::SPINE].b.y < chest_before,
            "chest should fall under gravity"
        );
    }

    #[test]
    fn test_rest_length_invariant_after_steps() {
        let mut skeleton = Skeleton::biped();
        let solver = VerletSolver::new(SolverConfig::free_fall());

        for _ in 0..50 {
            solver.step(&mut skeleton, DT).expect("step should succeed");
            for bone in skeleton.bones() {
                assert!(
                    bone.length_error().abs() < 1e-3,
                    "bone length error {} exceeds tolerance",
                    bone.length_error()
                );
            }
        }
    }

    #[test]
    fn test_anchored_roots_stay_pinned() {
        let mut skeleton = Skeleton::biped();
        let solver = VerletSolver::new(SolverConfig::tethered());
        let anchor = solver.config().anchor_point;

        for _ in 0..100 {
            solver.step(&mut skeleton, DT).expect("step should succeed");
            for &index in &biped::TETHER_ANCHORS {
                assert_eq!(skeleton.bones()[index].a, anchor);
            }
        }
    }

    #[test]
    fn test_nan_gravity_scale_is_zero_mutation_error() {
        let mut skeleton = Skeleton::biped();
        // Disturb the pose so prior state is non-trivial.
        let solver = VerletSolver::new(SolverConfig::free_fall());
        for _ in 0..10 {
            solver.step(&mut skeleton, DT).expect("step should succeed");
        }
        let snapshot = skeleton.clone();

        let bad = VerletSolver::new(SolverConfig {
            gravity_scale: f64::NAN,
            ..SolverConfig::free_fall()
        });
        let result = bad.step(&mut skeleton, DT);

        assert!(result.is_err());
        assert_eq!(skeleton, snapshot, "failed step must not mutate state");
    }

    #[test]
    fn test_invalid_damping_rejected() {
        let mut skeleton = Skeleton::biped();
        for damping in [0.0, -0.5, 1.5, f64::NAN] {
            let solver = VerletSolver::new(SolverConfig {
                damping,
                ..SolverConfig::free_fall()
            });
            assert!(
                matches!(
                    solver.step(&mut skeleton, DT),
                    Err(RagdollError::InvalidConfig(_))
                ),
                "damping {damping} should be rejected"
            );
        }
    }

    #[test]
    fn test_non_positive_dt_rejected() {
        let mut skeleton = Skeleton::biped();
        let solver = VerletSolver::new(SolverConfig::free_fall());
        assert!(solver.step(&mut skeleton, 0.0).is_err());
        assert!(solver.step(&mut skeleton, -DT).is_err());
        assert!(solver.step(&mut skeleton, f64::NAN).is_err());
    }

    #[test]
    fn test_ground_raises_feet() {
        let mut skeleton = Skeleton::biped();
        let solver = VerletSolver::new(SolverConfig {
            ground_height: 0.1,
            ..SolverConfig::free_fall()
        });

        // Feet start at y = 0, below this ground plane.
        solver.step(&mut skeleton, DT).expect("step should succeed");
        for &index in &[biped::SHIN_LEFT, biped::SHIN_RIGHT] {
            assert!(skeleton.bones()[index].b.y >= 0.1);
        }
    }

    #[test]
    fn test_velocity_clamp_bounds_displacement() {
        let mut skeleton = Skeleton::biped();
        // Give the head a violent velocity by faking a large previous
        // position offset.
        skeleton.bones[biped::NECK].prev_b.x -= 100.0;

        let solver = VerletSolver::new(SolverConfig::free_fall());
        let before = skeleton.bones()[biped::NECK].b;
        solver.step(&mut skeleton, DT).expect("step should succeed");
        let after = skeleton.bones()[biped::NECK].b;

        // Prediction is capped at MAX_SPEED * dt; relaxation can add only
        // bounded corrections on top.
        assert!((after - before).norm() < MAX_SPEED * DT + 1.0);
        assert!(finite_vec(after.coords));
    }

    #[test]
    fn test_nonfinite_bone_does_not_poison_others() {
        let mut skeleton = Skeleton::biped();
        skeleton.bones[biped::FOREARM_LEFT].a.x = f64::NAN;

        let solver = VerletSolver::new(SolverConfig::free_fall());
        let stats = solver.step(&mut skeleton, DT).expect("step should succeed");

        assert!(stats.skipped_updates > 0);
        for (index, bone) in skeleton.bones().iter().enumerate() {
            if index == biped::FOREARM_LEFT {
                continue;
            }
            assert!(
                finite_vec(bone.a.coords) && finite_vec(bone.b.coords),
                "bone {index} should stay finite"
            );
        }
    }

    #[test]
    fn test_friction_locks_settled_feet() {
        let mut skeleton = Skeleton::biped();
        let solver = VerletSolver::new(SolverConfig {
            friction: true,
            ..SolverConfig::free_fall()
        });

        // Let the body settle onto the ground.
        for _ in 0..400 {
            solver.step(&mut skeleton, DT).expect("step should succeed");
        }

        let left_before = skeleton.bones()[biped::SHIN_LEFT].b.x;
        solver.step(&mut skeleton, DT).expect("step should succeed");
        let left_after = skeleton.bones()[biped::SHIN_LEFT].b.x;

        assert_relative_eq!(left_before, left_after, epsilon = 1e-12);
    }

    #[test]
    fn test_config_presets() {
        assert!(SolverConfig::free_fall().anchors.is_empty());
        assert_eq!(
            SolverConfig::tethered().anchors,
            biped::TETHER_ANCHORS.to_vec()
        );
        assert!(SolverConfig::free_fall().validate().is_ok());
        assert!(SolverConfig::tethered().validate().is_ok());
    }

    #[test]
    fn test_stats_reported() {
        let mut skeleton = Skeleton::biped();
        let solver = VerletSolver::new(SolverConfig::free_fall());
        let stats = solver.step(&mut skeleton, DT).expect("step should succeed");

        assert_eq!(stats.iterations, 15);
        assert_eq!(stats.skipped_updates, 0);
        assert!(stats.max_bone_error < 1e-2);
    }
}
