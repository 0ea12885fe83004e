//! # Mechanisms Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::EqptError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands that are sent to the arm mechanisms, indexed by joint number from the base.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MechDems {
    /// The demanded position of each joint in radians.
    pub pos_rad: Vec<f64>,

    /// The demanded rate of each joint in radians/second
    pub rate_rads: Vec<f64>,

    /// Feed-forward torque for each joint in newton metres
    pub torque_nm: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The arm mechanisms.
pub trait MotionInterface: Send + Sync {
    /// Command the arm to the demanded joint state, returning once the move has been accepted.
    fn move_to_joints(&self, dems: &MechDems) -> Result<(), EqptError>;

    /// Stop any motion in progress.
    fn stop(&self) -> Result<(), EqptError>;

    /// Halt all motion immediately and hold brakes.
    fn emergency_stop(&self) -> Result<(), EqptError>;

    /// Returns true if all joints have been calibrated.
    fn is_calibrated(&self) -> bool;

    /// The current measured joint positions in radians.
    fn current_joints(&self) -> Vec<f64>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MechDems {
    /// Create position-only demands, with zero rate and torque.
    pub fn from_positions(pos_rad: Vec<f64>) -> Self {
        let n = pos_rad.len();
        Self {
            pos_rad,
            rate_rads: vec![0.0; n],
            torque_nm: vec![0.0; n],
        }
    }

    /// Number of joints in the demands.
    pub fn num_joints(&self) -> usize {
        self.pos_rad.len()
    }

    /// Returns true if every field has the same number of entries.
    pub fn is_consistent(&self) -> bool {
        self.rate_rads.len() == self.pos_rad.len() && self.torque_nm.len() == self.pos_rad.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mech_dems() {
        let mut dems = MechDems::from_positions(vec![0.1, 0.2, 0.3]);
        assert_eq!(dems.num_joints(), 3);
        assert!(dems.is_consistent());
        assert_eq!(dems.torque_nm, vec![0.0; 3]);

        dems.rate_rads.pop();
        assert!(!dems.is_consistent());
    }

    #[test]
    fn test_mech_dems_serde() {
        let dems = MechDems {
            pos_rad: vec![1.0],
            rate_rads: vec![0.5],
            torque_nm: vec![-2.0],
        };
        let s = serde_json::to_string(&dems).unwrap();
        assert!(s.contains("\"rate_rads\":[0.5]"));
    }
}
