//! Live status of the weld controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::WeldCtrlState;
use crate::kin::Pose;
use eqpt_if::SensorData;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Snapshot of the weld controller's live status.
///
/// The status is written in groups by different threads: the execution thread writes the pose and
/// waypoint progress, the monitor thread writes the sensor readings, and the caller's thread
/// writes the state on stop. A snapshot is therefore a consistent copy of each group but the
/// groups may come from slightly different instants, e.g. `current_pose` may lag `sensors` by up
/// to one waypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeldStatus {
    pub state: WeldCtrlState,

    /// True while a task's execution thread is running
    pub is_running: bool,

    /// Pose of the torch computed from the last commanded joint positions
    pub current_pose: Pose,

    /// Last readings from the process sensors
    pub sensors: SensorData,

    /// Index of the last waypoint commanded
    pub waypoint_index: usize,

    /// Number of waypoints in the current trajectory
    pub num_waypoints: usize,

    /// Reason for the last failure or emergency stop
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for WeldStatus {
    fn default() -> Self {
        Self {
            state: WeldCtrlState::Uninitialised,
            is_running: false,
            current_pose: Pose::identity(),
            sensors: SensorData::default(),
            waypoint_index: 0,
            num_waypoints: 0,
            error_message: None,
        }
    }
}

impl WeldStatus {
    /// Reset the per-task fields at the start of a new task.
    pub(crate) fn start_task(&mut self, num_waypoints: usize) {
        self.state = WeldCtrlState::TaskRunning;
        self.is_running = true;
        self.waypoint_index = 0;
        self.num_waypoints = num_waypoints;
        self.error_message = None;
    }
}
