//! Weld controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{ctrl::CtrlParams, dynamics::DynParams, kin::KinParams, traj::TrajParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the weld controller and everything it builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- COLLABORATORS ----
    pub kin: KinParams,

    pub dynamics: DynParams,

    pub ctrl: CtrlParams,

    pub traj: TrajParams,

    // ---- EXECUTION ----
    /// Delay after commanding each waypoint.
    ///
    /// Units: seconds
    pub waypoint_delay_s: f64,

    /// Joint positions the arm rests at between tasks, used to seed inverse kinematics when the
    /// mechanisms can't report a usable position.
    ///
    /// Units: radians
    pub home_joints_rad: Vec<f64>,

    /// If true each planned trajectory is saved into the session directory.
    pub archive_trajectories: bool,

    // ---- MONITORING ----
    /// Period between sensor polls.
    ///
    /// Units: seconds
    pub monitor_period_s: f64,

    /// Torch temperature above which the current is reduced.
    ///
    /// Units: degrees celcius
    pub temp_limit_degc: f64,

    /// Factor applied to the current when the temperature limit is exceeded.
    pub current_reduction_factor: f64,

    /// Largest allowed difference between the measured and commanded voltage before a warning is
    /// raised.
    ///
    /// Units: volts
    pub voltage_deviation_limit_v: f64,

    // ---- SAFETY ----
    /// Radius around the arm base in which the torch may operate.
    ///
    /// Units: meters
    pub workspace_radius_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            kin: KinParams::default(),
            dynamics: DynParams::default(),
            ctrl: CtrlParams::default(),
            traj: TrajParams::default(),
            waypoint_delay_s: 0.01,
            home_joints_rad: vec![0.0, 0.5, -1.0, 0.0, 0.5, 0.0],
            archive_trajectories: true,
            monitor_period_s: 0.05,
            temp_limit_degc: 80.0,
            current_reduction_factor: 0.9,
            voltage_deviation_limit_v: 2.0,
            workspace_radius_m: 1.2,
        }
    }
}

impl Params {
    /// Check the values which the collaborators don't validate themselves.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.waypoint_delay_s >= 0.0) {
            return Err(format!("waypoint_delay_s must be >= 0, found {}", self.waypoint_delay_s));
        }
        if !(self.monitor_period_s > 0.0) {
            return Err(format!("monitor_period_s must be > 0, found {}", self.monitor_period_s));
        }
        if !(self.current_reduction_factor > 0.0 && self.current_reduction_factor <= 1.0) {
            return Err(format!(
                "current_reduction_factor must be in (0, 1], found {}",
                self.current_reduction_factor
            ));
        }
        if !(self.workspace_radius_m > 0.0) {
            return Err(format!(
                "workspace_radius_m must be > 0, found {}",
                self.workspace_radius_m
            ));
        }
        if self.home_joints_rad.len() != self.kin.num_joints() {
            return Err(format!(
                "home_joints_rad has {} entries but the arm has {} joints",
                self.home_joints_rad.len(),
                self.kin.num_joints()
            ));
        }

        Ok(())
    }
}
