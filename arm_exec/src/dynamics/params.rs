//! Parameters for the dynamics model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::DynError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the dynamics model of the arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DynParams {
    /// Inertial properties of each link, from the base outwards.
    pub links: Vec<LinkInertia>,

    /// Gravitational acceleration in the base frame.
    ///
    /// Units: meters/second^2
    pub gravity_ms2: [f64; 3],
}

/// Inertial properties of a single link, expressed in the link frame (origin at the link's
/// joint, X along the link).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkInertia {
    /// Units: kilograms
    pub mass_kg: f64,

    /// Position of the centre of mass.
    ///
    /// Units: meters
    pub com_m: [f64; 3],

    /// Inertia tensor about the centre of mass, row major.
    ///
    /// Units: kilogram meters^2
    pub inertia_kgm2: [[f64; 3]; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DynParams {
    fn default() -> Self {
        let lengths_m = [0.4, 0.3, 0.2, 0.1, 0.1, 0.05];
        let masses_kg = [8.0, 5.0, 3.0, 1.5, 1.0, 0.5];

        Self {
            links: lengths_m
                .iter()
                .zip(masses_kg.iter())
                .map(|(l, m)| LinkInertia::rod(*m, *l, 0.03))
                .collect(),
            gravity_ms2: [0.0, 0.0, -9.81],
        }
    }
}

impl DynParams {
    /// Check the parameters are physically meaningful for an arm with `num_joints` joints.
    pub fn validate(&self, num_joints: usize) -> Result<(), DynError> {
        if self.links.len() != num_joints {
            return Err(DynError::InvalidParams(format!(
                "expected inertial data for {} links, found {}",
                num_joints,
                self.links.len()
            )));
        }

        for (i, link) in self.links.iter().enumerate() {
            if !(link.mass_kg > 0.0) {
                return Err(DynError::InvalidParams(format!(
                    "link {} has non-positive mass {}",
                    i, link.mass_kg
                )));
            }

            let diag = [
                link.inertia_kgm2[0][0],
                link.inertia_kgm2[1][1],
                link.inertia_kgm2[2][2],
            ];
            if diag.iter().any(|d| *d < 0.0) {
                return Err(DynError::InvalidParams(format!(
                    "link {} has a negative principal inertia",
                    i
                )));
            }
        }

        Ok(())
    }
}

impl LinkInertia {
    /// A solid cylinder of the given mass, length and radius lying along the link's X axis.
    pub fn rod(mass_kg: f64, length_m: f64, radius_m: f64) -> Self {
        let i_xx = 0.5 * mass_kg * radius_m.powi(2);
        let i_yy = mass_kg * (3.0 * radius_m.powi(2) + length_m.powi(2)) / 12.0;

        Self {
            mass_kg,
            com_m: [0.5 * length_m, 0.0, 0.0],
            inertia_kgm2: [[i_xx, 0.0, 0.0], [0.0, i_yy, 0.0], [0.0, 0.0, i_yy]],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(DynParams::default().validate(6).is_ok());
        assert!(DynParams::default().validate(5).is_err());
    }

    #[test]
    fn test_rejects_massless_link() {
        let mut p = DynParams::default();
        p.links[3].mass_kg = 0.0;
        assert!(p.validate(6).is_err());
    }
}
