//! # Equipment interface crate.
//!
//! Provides the contracts between the arm controller and the equipment it
//! drives: the welding power source, the sensor bus and the arm mechanisms.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Interface traits and data records for equipment (welder, sensors, mechanisms)
pub mod eqpt;

// ------------------------------------------------------------------------------------------------
// RE-EXPORTS
// ------------------------------------------------------------------------------------------------

pub use eqpt::{
    mech::{MechDems, MotionInterface},
    sens::{SensorData, SensorInterface},
    weld::WeldEqpt,
    EqptError,
};
