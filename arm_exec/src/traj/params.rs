//! Parameters for trajectory planning

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::TrajError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the trajectory planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajParams {
    /// Nominal time between waypoints, the waypoint spacing is this multiplied by the travel
    /// speed.
    ///
    /// Units: seconds
    pub waypoint_period_s: f64,

    /// Upper bound on the number of waypoints in one trajectory. Long paths are planned with a
    /// coarser spacing to stay within it.
    pub max_waypoints: usize,

    /// How progress along the path varies with time
    pub time_scaling: TimeScaling,

    /// Below this distance between start and end the pose pair is treated as a single point.
    ///
    /// Units: meters
    pub min_path_length_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Time scaling from normalised time to normalised path position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScaling {
    /// Constant speed along the path
    Linear,

    /// Fifth order polynomial with zero velocity and acceleration at both ends
    Quintic,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajParams {
    fn default() -> Self {
        Self {
            waypoint_period_s: 0.05,
            max_waypoints: 1000,
            time_scaling: TimeScaling::Linear,
            min_path_length_m: 1e-6,
        }
    }
}

impl TrajParams {
    pub fn validate(&self) -> Result<(), TrajError> {
        if !(self.waypoint_period_s > 0.0) || !self.waypoint_period_s.is_finite() {
            return Err(TrajError::InvalidParams(format!(
                "waypoint_period_s must be positive, found {}",
                self.waypoint_period_s
            )));
        }
        if self.max_waypoints < 2 {
            return Err(TrajError::InvalidParams(format!(
                "max_waypoints must be at least 2, found {}",
                self.max_waypoints
            )));
        }
        if self.min_path_length_m < 0.0 {
            return Err(TrajError::InvalidParams(
                "min_path_length_m must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl TimeScaling {
    /// Map normalised time in [0, 1] to normalised path position in [0, 1].
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            TimeScaling::Linear => t,
            TimeScaling::Quintic => t.powi(3) * (10.0 - 15.0 * t + 6.0 * t.powi(2)),
        }
    }
}
