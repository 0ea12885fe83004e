//! # Controllers module
//!
//! This module provides the joint space control laws used during trajectory execution. Every
//! controller implements [`Controller`] so the weld controller can select one from its parameters
//! without depending on which law is in use.
//!
//! Each controller owns its accumulated state (integrals, previous errors, parameter estimates)
//! and only [`Controller::reset`] clears it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod adaptive;
mod impedance;
mod params;
mod pid;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::DVector;

pub use adaptive::*;
pub use impedance::*;
pub use params::*;
pub use pid::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A multi-channel control law.
pub trait Controller: Send {
    /// Compute the control output for one step.
    ///
    /// # Panics
    /// - If `current` or `desired` doesn't have one entry per channel.
    fn compute_control(
        &mut self,
        current: &DVector<f64>,
        desired: &DVector<f64>,
        dt_s: f64,
    ) -> DVector<f64>;

    /// Clear all accumulated state.
    fn reset(&mut self);

    /// Replace the controller's parameters with a flat parameter vector.
    ///
    /// The layout of the vector is specific to each controller.
    fn set_parameters(&mut self, params: &DVector<f64>) -> Result<(), CtrlError>;

    /// Get the controller's parameters as a flat vector, in the same layout accepted by
    /// [`Controller::set_parameters`].
    fn get_parameters(&self) -> DVector<f64>;

    /// Number of channels the controller acts on.
    fn num_channels(&self) -> usize;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur in the controllers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CtrlError {
    #[error("Expected a parameter vector of length {expected}, found {found}")]
    InvalidParamLength { expected: usize, found: usize },

    #[error("Invalid controller parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the controller selected in the parameters for the given number of channels.
pub fn build(
    params: &CtrlParams,
    num_channels: usize,
) -> Result<Box<dyn Controller + Send>, CtrlError> {
    debug!("Building {:?} controller for {} channels", params.kind, num_channels);

    Ok(match params.kind {
        CtrlKind::Pid => Box::new(PidController::new(&params.pid, num_channels)?),
        CtrlKind::Impedance => {
            Box::new(ImpedanceController::new(&params.impedance, num_channels)?)
        }
        CtrlKind::Adaptive => Box::new(AdaptiveController::new(&params.adaptive, num_channels)?),
    })
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Expand a per-channel parameter list, a single value is applied to every channel.
fn per_channel(name: &str, values: &[f64], num_channels: usize) -> Result<DVector<f64>, CtrlError> {
    match values.len() {
        1 => Ok(DVector::from_element(num_channels, values[0])),
        n if n == num_channels => Ok(DVector::from_column_slice(values)),
        n => Err(CtrlError::InvalidParams(format!(
            "{} has {} entries, expected 1 or {}",
            name, n, num_channels
        ))),
    }
}

fn check_param_len(params: &DVector<f64>, expected: usize) -> Result<(), CtrlError> {
    if params.len() != expected {
        Err(CtrlError::InvalidParamLength {
            expected,
            found: params.len(),
        })
    } else {
        Ok(())
    }
}
