//! Straight line trajectory planner

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::{Translation3, UnitQuaternion};

use super::{TrajError, TrajParams, Trajectory, Waypoint};
use crate::{kin::Pose, weld_ctrl::WeldParams};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Angle below which slerp is treated as a straight interpolation.
const SLERP_EPSILON_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plans straight line tool paths between two poses.
#[derive(Debug, Clone)]
pub struct TrajPlanner {
    params: TrajParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajPlanner {
    /// Create a new planner from the parameters.
    pub fn new(params: TrajParams) -> Result<Self, TrajError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TrajParams {
        &self.params
    }

    /// Plan a straight line from `start` to `end` at the given travel speed.
    ///
    /// Waypoints are spaced `speed_ms * waypoint_period_s` apart along the line (fewer if that
    /// would exceed `max_waypoints`) and include both endpoints. The orientation is slerped from
    /// the start to the end orientation. If the two positions are closer than
    /// `min_path_length_m` a single waypoint at `end` is produced.
    ///
    /// Every waypoint carries a copy of `weld_params`.
    pub fn plan(
        &self,
        start: &Pose,
        end: &Pose,
        speed_ms: f64,
        weld_params: &WeldParams,
    ) -> Result<Trajectory, TrajError> {
        if !speed_ms.is_finite() || speed_ms <= 0.0 {
            return Err(TrajError::InvalidSpeed(speed_ms));
        }

        let delta = end.translation.vector - start.translation.vector;
        let length_m = delta.norm();

        if length_m < self.params.min_path_length_m {
            debug!("Degenerate path of length {:.3e} m, planning a single waypoint", length_m);
            return Trajectory::new(vec![Waypoint {
                pose: *end,
                time_s: 0.0,
                params: weld_params.clone(),
            }]);
        }

        let spacing_m = speed_ms * self.params.waypoint_period_s;
        let num_segments = ((length_m / spacing_m).ceil() as usize)
            .max(1)
            .min(self.params.max_waypoints - 1);
        let duration_s = length_m / speed_ms;

        let waypoints = (0..=num_segments)
            .map(|k| {
                let t = k as f64 / num_segments as f64;
                let s = self.params.time_scaling.apply(t);

                Waypoint {
                    pose: Pose::from_parts(
                        Translation3::from(start.translation.vector + delta * s),
                        interpolate_rotation(&start.rotation, &end.rotation, s),
                    ),
                    time_s: t * duration_s,
                    params: weld_params.clone(),
                }
            })
            .collect();

        let traj = Trajectory::new(waypoints)?;

        debug!(
            "Planned {} waypoints over {:.3} m lasting {:.2} s",
            traj.len(),
            length_m,
            traj.duration_s()
        );

        Ok(traj)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Slerp between two orientations. Slerp is undefined for opposite orientations, in which case
/// the nearer endpoint is used.
fn interpolate_rotation(
    from: &UnitQuaternion<f64>,
    to: &UnitQuaternion<f64>,
    s: f64,
) -> UnitQuaternion<f64> {
    match from.try_slerp(to, s, SLERP_EPSILON_RAD) {
        Some(q) => q,
        None if s < 0.5 => *from,
        None => *to,
    }
}
