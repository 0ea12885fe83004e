//! # Arm library.
//!
//! This library provides the motion core of the welding cell: arm kinematics and dynamics, the
//! joint controllers, trajectory planning and the weld controller which executes tasks.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Joint controllers - PID, impedance and adaptive control laws behind a common interface
pub mod ctrl;

/// Dynamics - recursive Newton-Euler model of the arm
pub mod dynamics;

/// Kinematics - forward/inverse kinematics and the Jacobian of the arm
pub mod kin;

/// Executable parameters
pub mod params;

/// Simulated equipment for running the cell without hardware
pub mod sim_eqpt;

/// Trajectory planning - converts a start/end pose into timed waypoints
pub mod traj;

/// Weld control - executes weld tasks while monitoring the process
pub mod weld_ctrl;
