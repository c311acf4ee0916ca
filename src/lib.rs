//! 2D articulated ragdoll simulation with Verlet integration.
//!
//! This crate simulates a small humanoid figure as a system of rigid bones
//! connected by coincidence joints and actuated by contractile muscles,
//! using position-based dynamics:
//!
//! - **Bones**: Rigid segments that restore their rest length every step
//! - **Joints**: Endpoint-coincidence constraints forming the articulation
//! - **Muscles**: Length constraints with an adjustable target, the
//!   actuation interface for gameplay or learned controllers
//! - **Ground**: A one-sided plane constraint on designated foot bones,
//!   with an optional static-friction lock
//!
//! # Physics Model
//!
//! Integration is Verlet-style: each endpoint stores its current and
//! previous position, and velocity is implicit in their difference. All
//! constraints are solved by iterative position relaxation (Gauss-Seidel
//! over the constraint list), which is unconditionally stable for the
//! fixed 120 Hz substep the [`Stepper`] produces.
//!
//! ```text
//! For each substep:
//!   1. Pin anchored roots (tethered mode)
//!   2. Predict positions: x* = x + (x - x_prev)*damping + g*dt²
//!   3. For each of 15 relaxation iterations:
//!      a. Solve bone-length constraints
//!      b. Solve joint-coincidence constraints
//!      c. Solve muscle-length constraints
//!      d. Clamp feet above the ground
//!   4. Strict final bone-length pass
//! ```
//!
//! # Topology Variants
//!
//! The same skeleton runs in two configurations selected by
//! [`SolverConfig`]:
//!
//! - [`SolverConfig::free_fall`]: no anchors, the body collapses and falls
//! - [`SolverConfig::tethered`]: thigh and spine roots pinned at the
//!   pelvis point, a marionette that dangles and can be puppeteered
//!
//! # Quick Start
//!
//! ```
//! use sim_ragdoll::{Skeleton, SolverConfig, Stepper, VerletSolver};
//!
//! let mut skeleton = Skeleton::biped();
//! let solver = VerletSolver::new(SolverConfig::tethered());
//! let mut stepper = Stepper::new();
//!
//! // Contract the left quadriceps while advancing one 60 Hz frame.
//! skeleton.adjust_muscle(sim_ragdoll::biped::QUADRICEPS_LEFT, true, 1.0 / 60.0);
//! stepper.advance(&solver, &mut skeleton, 1.0 / 60.0)?;
//!
//! for bone in skeleton.bones() {
//!     assert!(bone.length_error().abs() < 1e-3);
//! }
//! # Ok::<(), sim_ragdoll::RagdollError>(())
//! ```
//!
//! # Rendering
//!
//! The crate is headless. A renderer reads bone endpoints through
//! [`Skeleton::bones`] and muscle anchor segments through
//! [`Skeleton::muscle_anchors`] after each frame; no drawing state lives
//! here.

#![doc(html_root_url = "https://docs.rs/sim-ragdoll/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
// Allow precision loss when converting indices to f64 - these are small values
#![allow(clippy::cast_precision_loss)]
#![cfg_attr(test, allow(clippy::uninlined_format_args, clippy::float_cmp))]

pub mod error;
pub mod muscle;
pub mod skeleton;
pub mod solver;
pub mod stepper;
pub mod types;

// Re-export main types at crate root
pub use error::{RagdollError, Result};
pub use muscle::Muscle;
pub use skeleton::{biped, Skeleton};
pub use solver::{SolverConfig, StepStats, VerletSolver};
pub use stepper::Stepper;
pub use types::{Bone, BoneEnd, BoneFlags, Joint};
