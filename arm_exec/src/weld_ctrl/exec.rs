//! Trajectory execution thread

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, trace, warn};
use nalgebra::DVector;
use std::{sync::atomic::Ordering, thread, time::Duration};

use super::{Shared, WeldCtrlError};
use crate::{ctrl::Controller, kin::Pose, traj::Trajectory};
use eqpt_if::MechDems;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute the trajectory, turning the arc off once finished.
///
/// Returns early without error if the run flag is cleared.
pub(super) fn run(
    shared: &Shared,
    traj: &Trajectory,
    mut controller: Box<dyn Controller + Send>,
) -> Result<(), WeldCtrlError> {
    info!("Execution started");

    let result = follow(shared, traj, controller.as_mut());

    // Runs on both success and failure
    let stop_result = shared.stop_process();

    info!("Execution finished");

    result.and(stop_result)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn follow(
    shared: &Shared,
    traj: &Trajectory,
    controller: &mut (dyn Controller + Send),
) -> Result<(), WeldCtrlError> {
    let num_joints = shared.kin.num_joints();
    let delay = Duration::from_secs_f64(shared.params.waypoint_delay_s);

    // ---- APPROACH ----

    let mut current = initial_joints(shared);

    let start = solve(shared, 0, &traj.first().pose, &current)?;
    shared
        .eqpt
        .motion
        .move_to_joints(&MechDems::from_positions(start.as_slice().to_vec()))
        .map_err(|e| WeldCtrlError::WaypointFailed(0, e))?;
    current = start;
    update_status(shared, &current, 0)?;

    debug!("Reached start of the seam");

    if !shared.start_process()? {
        return Ok(());
    }

    // ---- SEAM ----

    let mut prev_time_s = traj.first().time_s;

    for (i, wp) in traj.iter().enumerate() {
        if !shared.run.load(Ordering::Acquire) {
            info!("Execution interrupted before waypoint {}", i);
            break;
        }

        let target = solve(shared, i, &wp.pose, &current)?;

        let dt_s = wp.time_s - prev_time_s;
        prev_time_s = wp.time_s;

        let rates = controller.compute_control(&current, &target, dt_s);
        let torques = shared.dynamics.inverse_dynamics(
            &target,
            &rates,
            &DVector::zeros(num_joints),
            None,
        );

        let dems = MechDems {
            pos_rad: target.as_slice().to_vec(),
            rate_rads: rates.as_slice().to_vec(),
            torque_nm: torques.as_slice().to_vec(),
        };

        trace!("Waypoint {}: {:?}", i, dems);

        shared
            .eqpt
            .motion
            .move_to_joints(&dems)
            .map_err(|e| WeldCtrlError::WaypointFailed(i, e))?;

        current = target;
        update_status(shared, &current, i)?;

        thread::sleep(delay);
    }

    Ok(())
}

/// Joint positions to start the approach from.
fn initial_joints(shared: &Shared) -> DVector<f64> {
    let joints = shared.eqpt.motion.current_joints();

    if joints.len() == shared.kin.num_joints() {
        DVector::from_vec(joints)
    } else {
        warn!(
            "Mechanisms reported {} joints, starting from home instead",
            joints.len()
        );
        DVector::from_column_slice(&shared.params.home_joints_rad)
    }
}

/// Solve inverse kinematics for a waypoint and check the result is within the joint limits.
fn solve(
    shared: &Shared,
    index: usize,
    pose: &Pose,
    guess: &DVector<f64>,
) -> Result<DVector<f64>, WeldCtrlError> {
    let q = shared
        .kin
        .inverse_kinematics(pose, guess)
        .map_err(|e| WeldCtrlError::WaypointUnreachable(index, e))?;

    if !shared.kin.is_valid_joint_angles(&q) {
        return Err(WeldCtrlError::InvalidJointSolution(index));
    }

    Ok(q)
}

fn update_status(
    shared: &Shared,
    joints: &DVector<f64>,
    index: usize,
) -> Result<(), WeldCtrlError> {
    let pose = shared.kin.forward_kinematics(joints);

    let mut status = shared.status.write()?;
    status.current_pose = pose;
    status.waypoint_index = index;

    Ok(())
}
