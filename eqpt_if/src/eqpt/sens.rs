//! # Process Sensors

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::EqptError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One reading of the process sensor bus.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorData {
    /// Measured arc voltage in volts
    pub voltage_v: f64,

    /// Measured arc current in amps
    pub current_a: f64,

    /// Measured arc length in millimetres
    pub arc_length_mm: f64,

    /// Measured torch temperature in degrees celcius
    pub temperature_degc: f64,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Process sensor bus.
pub trait SensorInterface: Send + Sync {
    /// Read the latest sensor values.
    fn read_sensors(&self) -> Result<SensorData, EqptError>;

    /// Returns true if the sensor bus is connected.
    fn is_connected(&self) -> bool;
}
