//! Serial chain kinematics solver
//!
//! The arm is modelled as a chain of revolute joints. Joint `i` rotates about its axis (given in
//! the frame of link `i - 1`) and link `i` then extends `link_lengths_m[i]` along its local X
//! axis, so the tool transform is
//!
//! ```text
//! T = Rot(a_0, q_0) Trans(L_0 x) Rot(a_1, q_1) Trans(L_1 x) ... Rot(a_n, q_n) Trans(L_n x)
//! ```
//!
//! With every joint at zero the arm lies along the base X axis and the tool frame is aligned with
//! the base frame.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{
    DMatrix, DVector, Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3,
};

use util::{check_len, maths};

use super::{KinError, KinParams, KinematicsSolver, Pose};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematics solver for a serial chain of revolute joints.
#[derive(Debug, Clone)]
pub struct SerialChain {
    params: KinParams,

    /// Normalised joint axes in the frame of the previous link
    axes: Vec<Unit<Vector3<f64>>>,
}

/// The origin and world-frame axis of a joint at some configuration.
#[derive(Debug, Clone, Copy)]
struct JointFrame {
    origin: Point3<f64>,
    axis: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SerialChain {
    /// Build a new solver from the given parameters.
    pub fn new(params: KinParams) -> Result<Self, KinError> {
        params.validate()?;

        let axes = params
            .joint_axes
            .iter()
            .map(|a| Unit::new_normalize(Vector3::from(*a)))
            .collect();

        Ok(Self { params, axes })
    }

    /// The parameters the solver was built with.
    pub fn params(&self) -> &KinParams {
        &self.params
    }

    /// Walk the chain, returning the frame of every joint and the tool pose.
    fn walk(&self, joints_rad: &DVector<f64>) -> (Vec<JointFrame>, Pose) {
        check_len!("Joint positions", joints_rad, self.num_joints());

        let mut frames = Vec::with_capacity(self.num_joints());
        let mut pose = Isometry3::identity();

        for (i, axis) in self.axes.iter().enumerate() {
            frames.push(JointFrame {
                origin: pose.translation.vector.into(),
                axis: pose.rotation * axis.into_inner(),
            });

            pose *= Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(axis, joints_rad[i]),
            );
            pose *= Translation3::new(self.params.link_lengths_m[i], 0.0, 0.0);
        }

        (frames, pose)
    }

    /// Error between the current and target pose as (position, axis-angle orientation).
    fn pose_error(current: &Pose, target: &Pose) -> DVector<f64> {
        let pos = target.translation.vector - current.translation.vector;
        let rot = maths::rotation_error(&current.rotation, &target.rotation);

        DVector::from_row_slice(&[pos[0], pos[1], pos[2], rot[0], rot[1], rot[2]])
    }

    /// Nakamura variable damping, large near singularities and small elsewhere.
    fn damping(&self, jjt: &DMatrix<f64>) -> f64 {
        let det = jjt.determinant();
        let manipulability = if det > 0.0 { det.sqrt() } else { 0.0 };
        let threshold = self.params.ik_manipulability_threshold;

        if manipulability < threshold {
            let ratio = manipulability / threshold;
            (self.params.ik_max_damping * (1.0 - ratio * ratio).sqrt())
                .max(self.params.ik_min_damping)
        } else {
            self.params.ik_min_damping
        }
    }
}

impl KinematicsSolver for SerialChain {
    fn num_joints(&self) -> usize {
        self.params.num_joints()
    }

    fn forward_kinematics(&self, joints_rad: &DVector<f64>) -> Pose {
        self.walk(joints_rad).1
    }

    /// Solve by damped least squares, `dq = J^T (J J^T + l^2 I)^-1 e`.
    ///
    /// Each step is scaled so no joint moves by more than `ik_max_step_rad`, and the solution is
    /// wrapped into (-pi, pi].
    fn inverse_kinematics(
        &self,
        target: &Pose,
        initial_guess_rad: &DVector<f64>,
    ) -> Result<DVector<f64>, KinError> {
        check_len!("Initial guess", initial_guess_rad, self.num_joints());

        let mut q = initial_guess_rad.clone();
        let mut error_norm = f64::INFINITY;
        let mut iterations = 0;

        while iterations < self.params.ik_max_iterations {
            let (frames, pose) = self.walk(&q);
            let error = Self::pose_error(&pose, target);
            error_norm = error.norm();

            if error_norm < self.params.ik_tolerance {
                trace!(
                    "IK converged in {} iterations, error {:.3e}",
                    iterations,
                    error_norm
                );
                return Ok(q.map(maths::wrap_pi));
            }

            let jac = jacobian_from_frames(&frames, &pose);
            let jjt = &jac * jac.transpose();
            let lambda = self.damping(&jjt);
            let damped = jjt + DMatrix::identity(6, 6) * (lambda * lambda);

            let mut dq = match damped.cholesky() {
                Some(c) => jac.transpose() * c.solve(&error),
                None => break,
            };
            if dq.iter().any(|v| !v.is_finite()) {
                break;
            }

            let max_step = dq.amax();
            if max_step > self.params.ik_max_step_rad {
                dq *= self.params.ik_max_step_rad / max_step;
            }

            q += dq;
            iterations += 1;
        }

        Err(KinError::NoSolution {
            iterations,
            error_norm,
        })
    }

    fn jacobian(&self, joints_rad: &DVector<f64>) -> DMatrix<f64> {
        let (frames, pose) = self.walk(joints_rad);
        jacobian_from_frames(&frames, &pose)
    }

    fn is_valid_joint_angles(&self, joints_rad: &DVector<f64>) -> bool {
        joints_rad.len() == self.num_joints()
            && joints_rad
                .iter()
                .zip(self.params.min_joint_pos_rad.iter())
                .zip(self.params.max_joint_pos_rad.iter())
                .all(|((q, min), max)| q.is_finite() && q >= min && q <= max)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Column `j` is `(z_j x (p_e - o_j), z_j)` for joint axis `z_j` and origin `o_j`.
fn jacobian_from_frames(frames: &[JointFrame], tool: &Pose) -> DMatrix<f64> {
    let p_e: Point3<f64> = tool.translation.vector.into();
    let mut jac = DMatrix::zeros(6, frames.len());

    for (j, f) in frames.iter().enumerate() {
        let lin = f.axis.cross(&(p_e - f.origin));
        jac.fixed_view_mut::<3, 1>(0, j).copy_from(&lin);
        jac.fixed_view_mut::<3, 1>(3, j).copy_from(&f.axis);
    }

    jac
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn chain() -> SerialChain {
        SerialChain::new(KinParams::default()).unwrap()
    }

    fn q(v: [f64; 6]) -> DVector<f64> {
        DVector::from_row_slice(&v)
    }

    #[test]
    fn test_fk_zero() {
        let pose = chain().forward_kinematics(&DVector::zeros(6));

        assert!((pose.translation.vector - Vector3::new(1.15, 0.0, 0.0)).norm() < 1e-12);
        assert!(pose.rotation.angle() < 1e-12);
    }

    #[test]
    fn test_fk_base_rotation() {
        // Rotating the base by 90 degrees swings the extended arm onto the Y axis
        let pose = chain().forward_kinematics(&q([PI / 2.0, 0.0, 0.0, 0.0, 0.0, 0.0]));

        assert!((pose.translation.vector - Vector3::new(0.0, 1.15, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_fk_shoulder_pitch() {
        // Positive rotation about Y takes X towards -Z
        let pose = chain().forward_kinematics(&q([0.0, PI / 2.0, 0.0, 0.0, 0.0, 0.0]));

        assert!((pose.translation.vector - Vector3::new(0.4, 0.0, -0.75)).norm() < 1e-9);
    }

    #[test]
    #[should_panic]
    fn test_fk_wrong_length() {
        chain().forward_kinematics(&DVector::zeros(5));
    }

    #[test]
    fn test_ik_round_trip() {
        let chain = chain();
        let configs = [
            [0.3, 0.4, -0.6, 0.2, 0.5, -0.3],
            [-0.5, 0.2, -1.0, -0.3, 0.6, 0.4],
            [1.0, -0.3, 0.8, 0.5, -0.4, 0.1],
        ];

        for c in configs.iter() {
            let q_true = q(*c);
            let target = chain.forward_kinematics(&q_true);
            let guess = q_true.add_scalar(0.15);

            let sol = chain.inverse_kinematics(&target, &guess).unwrap();
            let reached = chain.forward_kinematics(&sol);

            assert!(
                (reached.translation.vector - target.translation.vector).norm() < 1e-5,
                "Position not reached for {:?}",
                c
            );
            assert!(reached.rotation.angle_to(&target.rotation) < 1e-5);
        }
    }

    #[test]
    fn test_ik_solution_is_wrapped() {
        let chain = chain();
        let q_true = q([0.3, 0.4, -0.6, 0.2, 0.5, -0.3]);
        let target = chain.forward_kinematics(&q_true);

        // Same configuration one full turn away on the base
        let mut guess = q_true.clone();
        guess[0] += 2.0 * PI + 0.1;

        let sol = chain.inverse_kinematics(&target, &guess).unwrap();
        assert!(sol.iter().all(|a| *a > -PI && *a <= PI));
        assert!((sol[0] - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_ik_unreachable() {
        let chain = chain();
        let target = Pose::translation(5.0, 0.0, 0.0);

        match chain.inverse_kinematics(&target, &q([0.1, 0.3, -0.5, 0.1, 0.2, 0.1])) {
            Err(KinError::NoSolution { iterations, .. }) => assert_eq!(iterations, 200),
            other => panic!("Expected no solution, got {:?}", other),
        }
    }

    #[test]
    fn test_ik_reports_iterations_run() {
        let chain = chain();
        let target = Pose::translation(f64::NAN, 0.0, 0.0);

        // The first step isn't finite so the solver gives up straight away
        match chain.inverse_kinematics(&target, &q([0.1, 0.3, -0.5, 0.1, 0.2, 0.1])) {
            Err(KinError::NoSolution { iterations, .. }) => assert_eq!(iterations, 0),
            other => panic!("Expected no solution, got {:?}", other),
        }
    }

    #[test]
    fn test_jacobian_matches_finite_difference() {
        let chain = chain();
        let eps = 1e-6;

        for c in [
            [0.3, 0.4, -0.6, 0.2, 0.5, -0.3],
            [-1.2, 0.9, 0.4, -0.7, 1.1, 2.0],
        ]
        .iter()
        {
            let q0 = q(*c);
            let jac = chain.jacobian(&q0);

            for j in 0..6 {
                let mut qp = q0.clone();
                let mut qm = q0.clone();
                qp[j] += eps;
                qm[j] -= eps;

                let pp = chain.forward_kinematics(&qp);
                let pm = chain.forward_kinematics(&qm);

                let lin = (pp.translation.vector - pm.translation.vector) / (2.0 * eps);
                let ang = (pp.rotation * pm.rotation.inverse()).scaled_axis() / (2.0 * eps);

                for r in 0..3 {
                    assert!((jac[(r, j)] - lin[r]).abs() < 1e-3, "linear ({}, {})", r, j);
                    assert!((jac[(r + 3, j)] - ang[r]).abs() < 1e-3, "angular ({}, {})", r, j);
                }
            }
        }
    }

    #[test]
    fn test_valid_joint_angles() {
        let chain = chain();

        assert!(chain.is_valid_joint_angles(&DVector::zeros(6)));
        assert!(chain.is_valid_joint_angles(&q([PI, -PI, 0.0, 0.0, 0.0, 0.0])));
        assert!(!chain.is_valid_joint_angles(&q([0.0, 0.0, 2.0 * PI, 0.0, 0.0, 0.0])));
        assert!(!chain.is_valid_joint_angles(&q([0.0, 0.0, 0.0, 0.0, 0.0, -3.5])));
        assert!(!chain.is_valid_joint_angles(&q([f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0])));
        assert!(!chain.is_valid_joint_angles(&DVector::zeros(5)));
    }

    #[test]
    fn test_new_rejects_bad_params() {
        let mut params = KinParams::default();
        params.link_lengths_m.clear();
        assert!(SerialChain::new(params).is_err());
    }
}
