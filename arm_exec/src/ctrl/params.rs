//! Parameters for the joint controllers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller parameters.
///
/// Per-channel lists may hold a single value, which is then used for every channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CtrlParams {
    /// Which controller to use during execution
    pub kind: CtrlKind,

    pub pid: PidParams,

    pub impedance: ImpedanceParams,

    pub adaptive: AdaptiveParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PidParams {
    pub k_p: Vec<f64>,
    pub k_i: Vec<f64>,
    pub k_d: Vec<f64>,

    /// Absolute limit on each channel's integral term (anti-windup)
    pub integral_limit: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpedanceParams {
    /// Diagonal of the stiffness matrix
    pub stiffness: Vec<f64>,

    /// Diagonal of the damping matrix
    pub damping: Vec<f64>,

    /// Offset added to the desired state to give the equilibrium point
    pub equilibrium_offset: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveParams {
    /// Initial parameter estimates, `3 * num_channels` long: feed-forward gains, then
    /// proportional gains, then integral gains.
    ///
    /// A single value is applied to every estimate.
    pub initial_estimates: Vec<f64>,

    /// Scalar adaptation rate
    pub adaptation_rate: f64,

    /// Diagonal of the adaptation gain matrix, one entry per estimate (or a single value)
    pub adaptation_gains: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtrlKind {
    Pid,
    Impedance,
    Adaptive,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CtrlParams {
    fn default() -> Self {
        Self {
            kind: CtrlKind::Pid,
            pid: PidParams::default(),
            impedance: ImpedanceParams::default(),
            adaptive: AdaptiveParams::default(),
        }
    }
}

impl Default for PidParams {
    fn default() -> Self {
        Self {
            k_p: vec![5.0],
            k_i: vec![0.1],
            k_d: vec![0.01],
            integral_limit: vec![1.0],
        }
    }
}

impl Default for ImpedanceParams {
    fn default() -> Self {
        Self {
            stiffness: vec![50.0],
            damping: vec![5.0],
            equilibrium_offset: vec![0.0],
        }
    }
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            initial_estimates: vec![0.0],
            adaptation_rate: 0.1,
            adaptation_gains: vec![1.0],
        }
    }
}
