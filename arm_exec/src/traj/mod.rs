//! # Trajectory module
//!
//! A [`Trajectory`] is an ordered, non-empty list of [`Waypoint`]s produced once per task by the
//! [`TrajPlanner`] and then consumed in order by the executor. It cannot be modified once built.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod planner;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{kin::Pose, weld_ctrl::WeldParams};

pub use params::*;
pub use planner::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point along a trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    /// Pose of the tool point in the arm base frame
    pub pose: Pose,

    /// Time since the start of the trajectory at which this point should be reached
    pub time_s: f64,

    /// Process parameters to use at this point
    pub params: WeldParams,
}

/// An ordered, non-empty sequence of waypoints.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    waypoints: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while building a trajectory.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TrajError {
    #[error("A trajectory must contain at least one waypoint")]
    Empty,

    #[error("Travel speed must be positive and finite, found {0}")]
    InvalidSpeed(f64),

    #[error("Invalid trajectory parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a trajectory from a list of waypoints.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, TrajError> {
        if waypoints.is_empty() {
            return Err(TrajError::Empty);
        }

        Ok(Self { waypoints })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false, a trajectory can't be built empty.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    pub fn last(&self) -> &Waypoint {
        &self.waypoints[self.waypoints.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    /// Time at which the final waypoint is reached.
    pub fn duration_s(&self) -> f64 {
        self.last().time_s
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Waypoint;
    type IntoIter = std::slice::Iter<'a, Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(Trajectory::new(Vec::new()), Err(TrajError::Empty)));
    }

    #[test]
    fn test_accessors() {
        let wps = (0..3)
            .map(|i| Waypoint {
                pose: Pose::translation(i as f64, 0.0, 0.0),
                time_s: i as f64 * 0.5,
                params: WeldParams::default(),
            })
            .collect();
        let traj = Trajectory::new(wps).unwrap();

        assert_eq!(traj.len(), 3);
        assert!(!traj.is_empty());
        assert_eq!(traj.first().time_s, 0.0);
        assert_eq!(traj.last().pose.translation.vector[0], 2.0);
        assert_eq!(traj.duration_s(), 1.0);
        assert_eq!((&traj).into_iter().count(), 3);
    }
}
