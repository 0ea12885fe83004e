//! Weld task definition and preprocessing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::kin::Pose;
use util::maths::isometry_from_rpy;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Shielding gas flow used for stainless steel.
///
/// Units: litres/minute
const STAINLESS_GAS_FLOW_LPM: f64 = 15.0;

/// Voltage multiplier used for aluminium.
const ALUMINIUM_VOLTAGE_FACTOR: f64 = 1.1;

/// Wire feed multiplier used for aluminium.
const ALUMINIUM_WIRE_FEED_FACTOR: f64 = 0.9;

/// Seams thicker than this need more heat input.
///
/// Units: millimetres
const THICK_SEAM_MM: f64 = 5.0;

const THICK_SEAM_CURRENT_FACTOR: f64 = 1.2;

const THICK_SEAM_SPEED_FACTOR: f64 = 0.8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Process parameters of the welding equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldParams {
    pub process_type: ProcessType,

    /// Arc voltage.
    ///
    /// Units: volts
    pub voltage_v: f64,

    /// Arc current.
    ///
    /// Units: amps
    pub current_a: f64,

    /// Travel speed of the torch along the seam.
    ///
    /// Units: millimetres/second
    pub speed_mms: f64,

    /// Units: millimetres/second
    pub wire_feed_rate_mms: f64,

    /// Units: litres/minute
    pub gas_flow_rate_lpm: f64,
}

/// A single straight seam to be welded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeldTask {
    /// Start pose of the torch in the arm base frame
    pub start: Pose,

    /// End pose of the torch in the arm base frame
    pub end: Pose,

    pub params: WeldParams,

    pub material: Material,

    /// Units: millimetres
    pub thickness_mm: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Welding process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessType {
    Mig,
    Mag,
    Tig,
}

/// Workpiece material.
///
/// Materials are named by lowercase snake case strings in parameter files, unknown names are kept
/// as [`Material::Other`] and receive no material specific preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Material {
    MildSteel,
    StainlessSteel,
    Aluminum,
    Other(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for WeldParams {
    fn default() -> Self {
        Self {
            process_type: ProcessType::Mig,
            voltage_v: 24.0,
            current_a: 150.0,
            speed_mms: 5.0,
            wire_feed_rate_mms: 6.0,
            gas_flow_rate_lpm: 12.0,
        }
    }
}

impl WeldTask {
    /// Build a task from start/end points and roll-pitch-yaw orientations.
    ///
    /// Points are in metres, angles in radians.
    pub fn from_points(
        start_m: [f64; 3],
        start_rpy_rad: [f64; 3],
        end_m: [f64; 3],
        end_rpy_rad: [f64; 3],
        params: WeldParams,
        material: Material,
        thickness_mm: f64,
    ) -> Self {
        Self {
            start: isometry_from_rpy(&Vector3::from(start_m), &Vector3::from(start_rpy_rad)),
            end: isometry_from_rpy(&Vector3::from(end_m), &Vector3::from(end_rpy_rad)),
            params,
            material,
            thickness_mm,
        }
    }

    /// Apply the material and thickness rules to the process parameters, returning the adjusted
    /// task.
    ///
    /// Material rules are applied before thickness rules.
    pub fn preprocess(&self) -> WeldTask {
        let mut task = self.clone();
        let p = &mut task.params;

        match task.material {
            Material::StainlessSteel => p.gas_flow_rate_lpm = STAINLESS_GAS_FLOW_LPM,
            Material::Aluminum => {
                p.voltage_v *= ALUMINIUM_VOLTAGE_FACTOR;
                p.wire_feed_rate_mms *= ALUMINIUM_WIRE_FEED_FACTOR;
            }
            Material::MildSteel | Material::Other(_) => (),
        }

        if task.thickness_mm > THICK_SEAM_MM {
            p.current_a *= THICK_SEAM_CURRENT_FACTOR;
            p.speed_mms *= THICK_SEAM_SPEED_FACTOR;
        }

        debug!("Preprocessed weld parameters: {:?}", p);

        task
    }
}

impl From<String> for Material {
    fn from(s: String) -> Self {
        Material::from(s.as_str())
    }
}

impl From<&str> for Material {
    fn from(s: &str) -> Self {
        match s {
            "mild_steel" => Material::MildSteel,
            "stainless_steel" => Material::StainlessSteel,
            "aluminum" | "aluminium" => Material::Aluminum,
            other => Material::Other(other.to_string()),
        }
    }
}

impl From<Material> for String {
    fn from(m: Material) -> Self {
        match m {
            Material::MildSteel => "mild_steel".into(),
            Material::StainlessSteel => "stainless_steel".into(),
            Material::Aluminum => "aluminum".into(),
            Material::Other(s) => s,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn task(material: &str, thickness_mm: f64) -> WeldTask {
        WeldTask::from_points(
            [1.0, -0.05, 0.0],
            [0.0; 3],
            [1.0, 0.05, 0.0],
            [0.0; 3],
            WeldParams::default(),
            material.into(),
            thickness_mm,
        )
    }

    #[test]
    fn test_preprocess_mild_steel() {
        let t = task("mild_steel", 3.0).preprocess();
        assert_eq!(t.params, WeldParams::default());
    }

    #[test]
    fn test_preprocess_stainless() {
        let t = task("stainless_steel", 3.0).preprocess();
        assert_eq!(t.params.gas_flow_rate_lpm, 15.0);
        assert_eq!(t.params.voltage_v, 24.0);
    }

    #[test]
    fn test_preprocess_aluminum() {
        let t = task("aluminum", 3.0).preprocess();
        assert!((t.params.voltage_v - 26.4).abs() < 1e-9);
        assert!((t.params.wire_feed_rate_mms - 5.4).abs() < 1e-9);
        assert_eq!(t.params.current_a, 150.0);
    }

    #[test]
    fn test_preprocess_thick_seam() {
        let t = task("mild_steel", 6.0).preprocess();
        assert!((t.params.current_a - 180.0).abs() < 1e-9);
        assert!((t.params.speed_mms - 4.0).abs() < 1e-9);

        // Exactly at the threshold is not thick
        let t = task("mild_steel", 5.0).preprocess();
        assert_eq!(t.params.current_a, 150.0);
    }

    #[test]
    fn test_preprocess_combined() {
        let original = task("aluminum", 8.0);
        let t = original.preprocess();
        assert!((t.params.voltage_v - 26.4).abs() < 1e-9);
        assert!((t.params.current_a - 180.0).abs() < 1e-9);

        // The input task is untouched
        assert_eq!(original.params, WeldParams::default());
    }

    #[test]
    fn test_material_names() {
        assert_eq!(Material::from("stainless_steel"), Material::StainlessSteel);
        assert_eq!(Material::from("aluminium"), Material::Aluminum);
        assert_eq!(Material::from("copper"), Material::Other("copper".into()));
        assert_eq!(String::from(Material::MildSteel), "mild_steel");
    }

    #[test]
    fn test_task_serde() {
        let t = task("stainless_steel", 2.0);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"stainless_steel\""));
        assert!(json.contains("\"MIG\""));

        let back: WeldTask = serde_json::from_str(&json).unwrap();
        assert_eq!(back.material, Material::StainlessSteel);
        assert!((back.end.translation.vector.y - 0.05).abs() < 1e-12);
    }
}
