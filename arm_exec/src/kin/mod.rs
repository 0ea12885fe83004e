//! # Kinematics module
//!
//! Provides the [`KinematicsSolver`] interface and the [`SerialChain`] solver for a serial arm
//! made of revolute joints.
//!
//! All poses are of the tool point expressed in the arm base frame. Joint positions are passed as
//! `DVector<f64>` in radians, ordered from the base outwards.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod serial_chain;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Isometry3};

pub use params::*;
pub use serial_chain::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose of the tool point in the base frame.
pub type Pose = Isometry3<f64>;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A kinematics solver for an arm.
///
/// Passing joint vectors of the wrong length is a programmer error and will panic. Solvers are
/// immutable once built so they can be shared between threads.
pub trait KinematicsSolver: Send + Sync {
    /// Number of joints in the arm.
    fn num_joints(&self) -> usize;

    /// Get the pose of the tool point for the given joint positions.
    fn forward_kinematics(&self, joints_rad: &DVector<f64>) -> Pose;

    /// Find joint positions which place the tool point at the target pose, starting the search
    /// from `initial_guess_rad`.
    ///
    /// Returns [`KinError::NoSolution`] if the solver does not converge.
    fn inverse_kinematics(
        &self,
        target: &Pose,
        initial_guess_rad: &DVector<f64>,
    ) -> Result<DVector<f64>, KinError>;

    /// Get the 6xN geometric Jacobian at the given joint positions.
    ///
    /// The first three rows give the linear velocity of the tool point, the last three the
    /// angular velocity of the tool, both in the base frame.
    fn jacobian(&self, joints_rad: &DVector<f64>) -> DMatrix<f64>;

    /// Returns true if every joint is within its limits.
    ///
    /// A vector of the wrong length is invalid.
    fn is_valid_joint_angles(&self, joints_rad: &DVector<f64>) -> bool;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur in the kinematics module.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KinError {
    #[error(
        "Inverse kinematics did not converge after {iterations} iterations \
         (final error norm {error_norm:.3e})"
    )]
    NoSolution { iterations: usize, error_norm: f64 },

    #[error("Invalid kinematic parameters: {0}")]
    InvalidParams(String),
}
