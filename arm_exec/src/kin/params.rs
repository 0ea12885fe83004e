//! Parameters structure for the kinematics solvers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::KinError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for a serial arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinParams {
    // ---- GEOMETRY ----
    /// Length of each link, measured along the link's local X axis from its joint to the next.
    ///
    /// Units: meters.
    pub link_lengths_m: Vec<f64>,

    /// Rotation axis of each joint in the frame of the previous link. Need not be normalised.
    pub joint_axes: Vec<[f64; 3]>,

    // ---- CAPABILITIES ----
    /// Minimum position of each joint.
    ///
    /// Units: radians
    pub min_joint_pos_rad: Vec<f64>,

    /// Maximum position of each joint.
    ///
    /// Units: radians
    pub max_joint_pos_rad: Vec<f64>,

    // ---- INVERSE KINEMATICS ----
    /// Norm of the combined position/orientation error below which the solver has converged.
    pub ik_tolerance: f64,

    /// Maximum number of solver iterations.
    pub ik_max_iterations: usize,

    /// Largest change to any joint in a single iteration.
    ///
    /// Units: radians
    pub ik_max_step_rad: f64,

    /// Manipulability below which the damping increases.
    pub ik_manipulability_threshold: f64,

    /// Damping used at a singularity.
    pub ik_max_damping: f64,

    /// Damping used away from singularities.
    pub ik_min_damping: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for KinParams {
    fn default() -> Self {
        Self {
            link_lengths_m: vec![0.4, 0.3, 0.2, 0.1, 0.1, 0.05],
            joint_axes: vec![
                [0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            min_joint_pos_rad: vec![-PI; 6],
            max_joint_pos_rad: vec![PI; 6],
            ik_tolerance: 1e-6,
            ik_max_iterations: 200,
            ik_max_step_rad: 0.3,
            ik_manipulability_threshold: 0.01,
            ik_max_damping: 0.15,
            ik_min_damping: 0.001,
        }
    }
}

impl KinParams {
    /// Number of joints described by these parameters.
    pub fn num_joints(&self) -> usize {
        self.link_lengths_m.len()
    }

    /// Check the parameters describe a consistent arm.
    pub fn validate(&self) -> Result<(), KinError> {
        let n = self.num_joints();

        if n == 0 {
            return Err(KinError::InvalidParams("the arm has no links".into()));
        }

        if self.joint_axes.len() != n
            || self.min_joint_pos_rad.len() != n
            || self.max_joint_pos_rad.len() != n
        {
            return Err(KinError::InvalidParams(format!(
                "expected {} joint axes and limits, found {} axes, {} min limits, {} max limits",
                n,
                self.joint_axes.len(),
                self.min_joint_pos_rad.len(),
                self.max_joint_pos_rad.len()
            )));
        }

        for (i, axis) in self.joint_axes.iter().enumerate() {
            if axis.iter().map(|a| a * a).sum::<f64>() < 1e-12 {
                return Err(KinError::InvalidParams(format!("joint {} has a zero axis", i)));
            }
        }

        for (i, (min, max)) in self
            .min_joint_pos_rad
            .iter()
            .zip(self.max_joint_pos_rad.iter())
            .enumerate()
        {
            if min > max {
                return Err(KinError::InvalidParams(format!(
                    "joint {} minimum limit {} is greater than maximum {}",
                    i, min, max
                )));
            }
        }

        if self.ik_tolerance <= 0.0 || self.ik_max_iterations == 0 || self.ik_max_step_rad <= 0.0 {
            return Err(KinError::InvalidParams(
                "inverse kinematics tolerance, iterations and step must be positive".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let p = KinParams::default();
        assert_eq!(p.num_joints(), 6);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let mut p = KinParams::default();
        p.joint_axes.pop();
        assert!(p.validate().is_err());

        let mut p = KinParams::default();
        p.joint_axes[2] = [0.0; 3];
        assert!(p.validate().is_err());

        let mut p = KinParams::default();
        p.min_joint_pos_rad[0] = 1.0;
        p.max_joint_pos_rad[0] = -1.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let p: KinParams = toml_from_str("link_lengths_m = [0.4, 0.3, 0.2, 0.1, 0.1, 0.05]");
        assert_eq!(p.ik_max_iterations, 200);
        assert_eq!(p.joint_axes.len(), 6);
    }

    fn toml_from_str(s: &str) -> KinParams {
        util::params::ParamTable::parse(&format!("[kin]\n{}", s))
            .unwrap()
            .get_typed("kin")
            .unwrap()
    }
}
