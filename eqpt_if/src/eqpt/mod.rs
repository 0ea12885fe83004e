//! # Equipment Interface
//!
//! This module defines the traits and data structures used to talk to the cell's equipment. All
//! interfaces take `&self` so that a single instance can be shared between the execution and
//! monitor threads, implementors are responsible for their own interior synchronisation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod mech;
pub mod sens;
pub mod weld;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can be raised by any piece of equipment.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum EqptError {
    #[error("Could not connect to the equipment: {0}")]
    ConnectionFailed(String),

    #[error("The equipment is not connected")]
    NotConnected,

    #[error("The equipment is not ready")]
    NotReady,

    #[error("The equipment rejected the command: {0}")]
    CommandRejected(String),

    #[error("Demands were invalid: {0}")]
    DemsInvalid(String),

    #[error("The equipment is in an emergency stop state")]
    EmergencyStopped,
}
