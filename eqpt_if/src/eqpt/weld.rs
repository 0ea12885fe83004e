//! # Welding Power Source

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::EqptError;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The welding power source and its wire feeder and gas supply.
///
/// Commands may be issued concurrently from the execution and monitor threads, so implementations
/// must accept any interleaving of set, stop and reduce commands.
pub trait WeldEqpt: Send + Sync {
    /// Connect to the power source.
    fn connect(&self) -> Result<(), EqptError>;

    /// Strike the arc and start the process.
    fn start(&self) -> Result<(), EqptError>;

    /// Stop the process.
    fn stop(&self) -> Result<(), EqptError>;

    /// Set the voltage setpoint in volts.
    fn set_voltage(&self, voltage_v: f64) -> Result<(), EqptError>;

    /// Set the current setpoint in amps.
    fn set_current(&self, current_a: f64) -> Result<(), EqptError>;

    /// Set the wire feed rate in millimetres per second.
    fn set_wire_feed_rate(&self, rate_mms: f64) -> Result<(), EqptError>;

    /// Set the shielding gas flow rate in litres per minute.
    fn set_gas_flow_rate(&self, rate_lpm: f64) -> Result<(), EqptError>;

    /// Scale the current setpoint by the given factor.
    fn reduce_current(&self, factor: f64) -> Result<(), EqptError>;

    /// Cut all output immediately.
    fn emergency_stop(&self) -> Result<(), EqptError>;

    /// Returns true if the power source is connected and able to start.
    fn is_ready(&self) -> bool;
}
