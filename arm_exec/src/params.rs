//! # Arm Executable Parameters
//!
//! This module provides parameters for the arm executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::weld_ctrl::{Material, WeldParams, WeldTask};
use util::{
    logger::LevelFilter,
    params::{LoadError, ParamTable},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ArmExecParams {
    /// Name of the weld controller parameter file in the params directory
    pub weld_ctrl_params: String,

    /// Minimum level of messages to log
    pub log_level: LevelFilter,

    /// Period at which the status is logged while a task runs.
    ///
    /// Units: seconds
    pub status_period_s: f64,

    /// Joint positions the simulated arm starts at.
    ///
    /// Units: radians
    pub sim_start_joints_rad: Vec<f64>,

    /// The task executed by the demo
    pub demo_task: DemoTask,
}

/// A weld task as written in the parameter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoTask {
    /// Units: meters
    pub start_m: [f64; 3],

    /// Roll, pitch and yaw of the torch at the start.
    ///
    /// Units: radians
    pub start_rpy_rad: [f64; 3],

    /// Units: meters
    pub end_m: [f64; 3],

    /// Units: radians
    pub end_rpy_rad: [f64; 3],

    pub params: WeldParams,

    pub material: Material,

    /// Units: millimetres
    pub thickness_mm: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ArmExecParamsError {
    #[error("Could not load the exec parameters: {0}")]
    Load(#[from] LoadError),

    #[error("Invalid exec parameters: {0}")]
    Invalid(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmExecParams {
    /// Load the parameters from a file in the params directory.
    pub fn load(param_file_path: &str) -> Result<Self, ArmExecParamsError> {
        Self::from_table(&ParamTable::load(param_file_path)?)
    }

    /// Read the parameters from a table, using defaults for anything missing.
    pub fn from_table(table: &ParamTable) -> Result<Self, ArmExecParamsError> {
        let log_level = table
            .get_str("log_level", "debug")
            .parse()
            .unwrap_or(LevelFilter::Debug);

        let sim_start_joints_rad = table
            .get_typed("sim.start_joints_rad")
            .unwrap_or_else(|| vec![0.0, 0.5, -1.0, 0.0, 0.5, 0.0]);

        let status_period_s = table.get_f64("status_period_s", 0.1);
        if !(status_period_s.is_finite() && status_period_s > 0.0) {
            return Err(ArmExecParamsError::Invalid(format!(
                "status_period_s must be positive, got {}",
                status_period_s
            )));
        }

        Ok(Self {
            weld_ctrl_params: table.get_str("weld_ctrl_params", "weld_ctrl.toml"),
            log_level,
            status_period_s,
            sim_start_joints_rad,
            demo_task: table.get_typed("demo_task").unwrap_or_default(),
        })
    }
}

impl Default for DemoTask {
    fn default() -> Self {
        Self {
            start_m: [1.0, -0.05, 0.0],
            start_rpy_rad: [0.0; 3],
            end_m: [1.0, 0.05, 0.0],
            end_rpy_rad: [0.0; 3],
            params: WeldParams::default(),
            material: Material::MildSteel,
            thickness_mm: 3.0,
        }
    }
}

impl DemoTask {
    pub fn to_task(&self) -> WeldTask {
        WeldTask::from_points(
            self.start_m,
            self.start_rpy_rad,
            self.end_m,
            self.end_rpy_rad,
            self.params.clone(),
            self.material.clone(),
            self.thickness_mm,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_table() {
        let t = ParamTable::parse(
            r#"
            log_level = "info"
            status_period_s = 0.25

            [sim]
            start_joints_rad = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]

            [demo_task]
            end_m = [1.0, 0.1, 0.0]
            material = "aluminum"

            [demo_task.params]
            voltage_v = 22.0
            "#,
        )
        .unwrap();

        let p = ArmExecParams::from_table(&t).unwrap();
        assert_eq!(p.log_level, LevelFilter::Info);
        assert_eq!(p.status_period_s, 0.25);
        assert_eq!(p.weld_ctrl_params, "weld_ctrl.toml");
        assert_eq!(p.sim_start_joints_rad, vec![0.0; 6]);
        assert_eq!(p.demo_task.material, Material::Aluminum);
        assert_eq!(p.demo_task.params.voltage_v, 22.0);
        assert_eq!(p.demo_task.params.current_a, 150.0);
        assert_eq!(p.demo_task.start_m, [1.0, -0.05, 0.0]);

        let task = p.demo_task.to_task();
        assert!((task.end.translation.vector.y - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_defaults() {
        let p = ArmExecParams::from_table(&ParamTable::parse("log_level = \"loud\"").unwrap())
            .unwrap();
        assert_eq!(p.log_level, LevelFilter::Debug);
        assert_eq!(p.sim_start_joints_rad.len(), 6);
        assert_eq!(p.demo_task.thickness_mm, 3.0);
        assert_eq!(p.status_period_s, 0.1);
    }

    #[test]
    fn test_invalid_status_period() {
        for bad in ["-0.5", "0", "0.0"] {
            let t = ParamTable::parse(&format!("status_period_s = {}", bad)).unwrap();
            assert!(matches!(
                ArmExecParams::from_table(&t),
                Err(ArmExecParamsError::Invalid(_))
            ));
        }
    }
}
