//! # Dynamics module
//!
//! Provides the [`DynamicsSolver`] interface and the recursive Newton-Euler solver
//! [`NewtonEuler`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod newton_euler;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};

pub use newton_euler::*;
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A force and moment exerted by the tool on its environment, expressed in the tool frame about
/// the tool point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wrench {
    pub force_n: Vector3<f64>,
    pub moment_nm: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A dynamics model of an arm.
///
/// Passing vectors of the wrong length is a programmer error and will panic.
pub trait DynamicsSolver: Send + Sync {
    /// Number of joints in the model.
    fn num_joints(&self) -> usize;

    /// Joint torques required to produce the given accelerations.
    fn inverse_dynamics(
        &self,
        joints_rad: &DVector<f64>,
        rates_rads: &DVector<f64>,
        accels_radss: &DVector<f64>,
        tool_wrench: Option<&Wrench>,
    ) -> DVector<f64>;

    /// Joint accelerations produced by the given torques.
    fn forward_dynamics(
        &self,
        joints_rad: &DVector<f64>,
        rates_rads: &DVector<f64>,
        torques_nm: &DVector<f64>,
        tool_wrench: Option<&Wrench>,
    ) -> Result<DVector<f64>, DynError>;

    /// The joint space mass matrix.
    fn mass_matrix(&self, joints_rad: &DVector<f64>) -> DMatrix<f64>;

    /// Coriolis and centrifugal torques at the given rates.
    fn coriolis_centrifugal(
        &self,
        joints_rad: &DVector<f64>,
        rates_rads: &DVector<f64>,
    ) -> DVector<f64>;

    /// Torques needed to hold the arm still against gravity.
    fn gravity_torques(&self, joints_rad: &DVector<f64>) -> DVector<f64>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur in the dynamics module.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DynError {
    #[error("The mass matrix is singular, cannot compute forward dynamics")]
    SingularMassMatrix,

    #[error("Invalid dynamic parameters: {0}")]
    InvalidParams(String),
}
