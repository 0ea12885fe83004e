//! Pre-task safety check

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info};
use nalgebra::DVector;

use super::{Eqpt, WeldTask};
use crate::kin::{KinematicsSolver, Pose};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a task can be rejected by the safety check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SafetyError {
    #[error("The arm is not calibrated")]
    NotCalibrated,

    #[error("The welding equipment is not ready")]
    EqptNotReady,

    #[error("The process sensors are not connected")]
    SensorsDisconnected,

    #[error("The arm reported {found} joint positions, expected {expected}")]
    InvalidJointReadback { expected: usize, found: usize },

    #[error("The {0} is {1:.3} m from the base, outside the {2:.3} m workspace")]
    OutsideWorkspace(&'static str, f64, f64),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that the cell is in a state where the task can be executed.
///
/// The checks have no side effects, so a rejected task leaves the cell untouched.
pub fn check(
    kin: &dyn KinematicsSolver,
    eqpt: &Eqpt,
    task: &WeldTask,
    workspace_radius_m: f64,
) -> Result<(), SafetyError> {
    let result = check_inner(kin, eqpt, task, workspace_radius_m);

    match &result {
        Ok(()) => info!("Safety check passed"),
        Err(e) => error!("Safety check failed: {}", e),
    }

    result
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_inner(
    kin: &dyn KinematicsSolver,
    eqpt: &Eqpt,
    task: &WeldTask,
    workspace_radius_m: f64,
) -> Result<(), SafetyError> {
    if !eqpt.motion.is_calibrated() {
        return Err(SafetyError::NotCalibrated);
    }

    if !eqpt.weld.is_ready() {
        return Err(SafetyError::EqptNotReady);
    }

    if !eqpt.sensors.is_connected() {
        return Err(SafetyError::SensorsDisconnected);
    }

    let joints = eqpt.motion.current_joints();
    if joints.len() != kin.num_joints() {
        return Err(SafetyError::InvalidJointReadback {
            expected: kin.num_joints(),
            found: joints.len(),
        });
    }

    let tool = kin.forward_kinematics(&DVector::from_vec(joints));

    for (name, pose) in [("torch", &tool), ("task start", &task.start), ("task end", &task.end)] {
        check_in_workspace(name, pose, workspace_radius_m)?;
    }

    Ok(())
}

fn check_in_workspace(name: &'static str, pose: &Pose, radius_m: f64) -> Result<(), SafetyError> {
    let dist_m = pose.translation.vector.norm();

    if dist_m > radius_m {
        Err(SafetyError::OutsideWorkspace(name, dist_m, radius_m))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        kin::{KinParams, SerialChain},
        sim_eqpt::SimCell,
        weld_ctrl::{Params, WeldParams},
    };
    use eqpt_if::WeldEqpt;

    fn setup() -> (SerialChain, SimCell, WeldTask) {
        let params = Params::default();
        let kin = SerialChain::new(params.kin.clone()).unwrap();
        let cell = SimCell::new(&params.home_joints_rad);
        cell.weld.connect().unwrap();
        let task = WeldTask::from_points(
            [1.0, -0.01, 0.0],
            [0.0; 3],
            [1.0, 0.01, 0.0],
            [0.0; 3],
            WeldParams::default(),
            "mild_steel".into(),
            3.0,
        );
        (kin, cell, task)
    }

    #[test]
    fn test_check_passes() {
        let (kin, cell, task) = setup();
        assert_eq!(check(&kin, &cell.eqpt(), &task, 1.2), Ok(()));
    }

    #[test]
    fn test_check_order() {
        let (kin, cell, task) = setup();

        cell.sensors.set_connected(false);
        assert_eq!(
            check(&kin, &cell.eqpt(), &task, 1.2),
            Err(SafetyError::SensorsDisconnected)
        );

        cell.weld.set_ready(false);
        assert_eq!(
            check(&kin, &cell.eqpt(), &task, 1.2),
            Err(SafetyError::EqptNotReady)
        );

        cell.motion.set_calibrated(false);
        assert_eq!(
            check(&kin, &cell.eqpt(), &task, 1.2),
            Err(SafetyError::NotCalibrated)
        );
    }

    #[test]
    fn test_check_workspace() {
        let (kin, cell, mut task) = setup();

        task.end = Pose::translation(1.5, 0.0, 0.0);
        assert!(matches!(
            check(&kin, &cell.eqpt(), &task, 1.2),
            Err(SafetyError::OutsideWorkspace("task end", _, _))
        ));

        // Home pose is about 1.08 m out
        let (_, _, task) = setup();
        assert!(matches!(
            check(&kin, &cell.eqpt(), &task, 1.0),
            Err(SafetyError::OutsideWorkspace("torch", _, _))
        ));
    }

    #[test]
    fn test_check_bad_readback() {
        let (_, cell, task) = setup();
        let mut kin_params = KinParams::default();
        kin_params.link_lengths_m.pop();
        kin_params.joint_axes.pop();
        kin_params.min_joint_pos_rad.pop();
        kin_params.max_joint_pos_rad.pop();
        let kin = SerialChain::new(kin_params).unwrap();

        assert_eq!(
            check(&kin, &cell.eqpt(), &task, 1.2),
            Err(SafetyError::InvalidJointReadback {
                expected: 5,
                found: 6
            })
        );
    }
}
