//! Weld controller lifecycle state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle state of the weld controller.
///
/// ```text
/// Uninitialised -> Initialised -> TaskRunning -> Completed | Failed | Stopped
/// ```
///
/// The terminal states accept a new task, which returns the controller to `TaskRunning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeldCtrlState {
    Uninitialised,
    Initialised,
    TaskRunning,
    Completed,
    Failed,
    Stopped,
}

/// Result of executing a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Every waypoint was reached
    Completed,

    /// Execution was aborted by a runtime failure, with the reason
    Failed(String),

    /// Execution was interrupted by a stop or emergency stop
    Stopped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for WeldCtrlState {
    fn default() -> Self {
        WeldCtrlState::Uninitialised
    }
}

impl WeldCtrlState {
    /// Returns true if a new task may be started from this state.
    pub fn accepts_task(&self) -> bool {
        !matches!(self, WeldCtrlState::Uninitialised | WeldCtrlState::TaskRunning)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accepts_task() {
        assert!(!WeldCtrlState::Uninitialised.accepts_task());
        assert!(!WeldCtrlState::TaskRunning.accepts_task());
        assert!(WeldCtrlState::Initialised.accepts_task());
        assert!(WeldCtrlState::Completed.accepts_task());
        assert!(WeldCtrlState::Failed.accepts_task());
        assert!(WeldCtrlState::Stopped.accepts_task());
    }

    #[test]
    fn test_default() {
        assert_eq!(WeldCtrlState::default(), WeldCtrlState::Uninitialised);
    }
}
