//! Recursive Newton-Euler dynamics
//!
//! Velocities and accelerations are propagated from the base out to the tool, then forces and
//! moments are propagated back from the tool to the base. All link quantities are expressed in the
//! link's own frame, which uses the same geometry as [`crate::kin::SerialChain`]: joint `i`'s
//! frame sits at the end of link `i - 1` and is rotated by `Rot(a_i, q_i)` relative to it.
//!
//! Gravity is included by accelerating the base upwards at `-g`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Matrix3, Rotation3, Unit, Vector3};

use util::check_len;

use super::{DynError, DynParams, DynamicsSolver, Wrench};
use crate::kin::KinParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Recursive Newton-Euler dynamics solver.
#[derive(Debug, Clone)]
pub struct NewtonEuler {
    links: Vec<Link>,
    gravity_ms2: Vector3<f64>,
}

/// Everything the recursion needs to know about one link.
#[derive(Debug, Clone)]
struct Link {
    /// Joint axis in the link frame (which is also its axis in the previous link's frame)
    axis: Unit<Vector3<f64>>,

    /// Offset from this link's joint to the next joint, in this link's frame
    next_joint_m: Vector3<f64>,

    mass_kg: f64,
    com_m: Vector3<f64>,
    inertia_kgm2: Matrix3<f64>,
}

/// Motion of one link frame found in the outward pass.
#[derive(Debug, Clone, Copy)]
struct LinkMotion {
    /// Rotation of this frame relative to the previous one
    rot: Rotation3<f64>,
    force_n: Vector3<f64>,
    moment_nm: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NewtonEuler {
    /// Create a new solver from the arm's kinematic and dynamic parameters.
    pub fn new(kin: &KinParams, params: &DynParams) -> Result<Self, DynError> {
        kin.validate()
            .map_err(|e| DynError::InvalidParams(e.to_string()))?;
        params.validate(kin.num_joints())?;

        let links = kin
            .joint_axes
            .iter()
            .zip(kin.link_lengths_m.iter())
            .zip(params.links.iter())
            .map(|((axis, length_m), inertia)| Link {
                axis: Unit::new_normalize(Vector3::from(*axis)),
                next_joint_m: Vector3::new(*length_m, 0.0, 0.0),
                mass_kg: inertia.mass_kg,
                com_m: Vector3::from(inertia.com_m),
                inertia_kgm2: Matrix3::from_fn(|r, c| inertia.inertia_kgm2[r][c]),
            })
            .collect();

        Ok(Self {
            links,
            gravity_ms2: Vector3::from(params.gravity_ms2),
        })
    }

    /// Run the full recursion with an explicit gravity vector.
    fn rnea(
        &self,
        joints_rad: &DVector<f64>,
        rates_rads: &DVector<f64>,
        accels_radss: &DVector<f64>,
        gravity_ms2: &Vector3<f64>,
        tool_wrench: Option<&Wrench>,
    ) -> DVector<f64> {
        let n = self.num_joints();
        check_len!("Joint positions", joints_rad, n);
        check_len!("Joint rates", rates_rads, n);
        check_len!("Joint accelerations", accels_radss, n);

        // ---- OUTWARD PASS ----

        let mut motion = Vec::with_capacity(n);

        let mut omega = Vector3::zeros();
        let mut omega_dot = Vector3::zeros();
        let mut accel = -gravity_ms2;
        let mut offset = Vector3::zeros();

        for (i, link) in self.links.iter().enumerate() {
            let rot = Rotation3::from_axis_angle(&link.axis, joints_rad[i]);
            let rot_t = rot.transpose();
            let axis = link.axis.into_inner();

            // Linear acceleration of this frame's origin uses the previous frame's motion
            accel = rot_t * (omega_dot.cross(&offset) + omega.cross(&omega.cross(&offset)) + accel);

            let omega_prev = rot_t * omega;
            omega = omega_prev + rates_rads[i] * axis;
            omega_dot = rot_t * omega_dot
                + omega_prev.cross(&(rates_rads[i] * axis))
                + accels_radss[i] * axis;

            let com_accel =
                omega_dot.cross(&link.com_m) + omega.cross(&omega.cross(&link.com_m)) + accel;

            motion.push(LinkMotion {
                rot,
                force_n: link.mass_kg * com_accel,
                moment_nm: link.inertia_kgm2 * omega_dot
                    + omega.cross(&(link.inertia_kgm2 * omega)),
            });

            offset = link.next_joint_m;
        }

        // ---- INWARD PASS ----

        let (mut f, mut m) = match tool_wrench {
            Some(w) => (w.force_n, w.moment_nm),
            None => (Vector3::zeros(), Vector3::zeros()),
        };
        // The tool frame has the same orientation as the last link
        let mut next_rot = Rotation3::identity();
        let mut torques = DVector::zeros(n);

        for i in (0..n).rev() {
            let link = &self.links[i];
            let lm = &motion[i];

            let f_next = next_rot * f;
            let m_next = next_rot * m;

            f = f_next + lm.force_n;
            m = lm.moment_nm
                + m_next
                + link.com_m.cross(&lm.force_n)
                + link.next_joint_m.cross(&f_next);

            torques[i] = link.axis.dot(&m);
            next_rot = lm.rot;
        }

        torques
    }
}

impl DynamicsSolver for NewtonEuler {
    fn num_joints(&self) -> usize {
        self.links.len()
    }

    fn inverse_dynamics(
        &self,
        joints_rad: &DVector<f64>,
        rates_rads: &DVector<f64>,
        accels_radss: &DVector<f64>,
        tool_wrench: Option<&Wrench>,
    ) -> DVector<f64> {
        self.rnea(
            joints_rad,
            rates_rads,
            accels_radss,
            &self.gravity_ms2,
            tool_wrench,
        )
    }

    /// Solves `M qdd = tau - b`, where the bias `b` is the inverse dynamics at zero acceleration.
    fn forward_dynamics(
        &self,
        joints_rad: &DVector<f64>,
        rates_rads: &DVector<f64>,
        torques_nm: &DVector<f64>,
        tool_wrench: Option<&Wrench>,
    ) -> Result<DVector<f64>, DynError> {
        let n = self.num_joints();
        check_len!("Joint torques", torques_nm, n);

        let bias = self.inverse_dynamics(joints_rad, rates_rads, &DVector::zeros(n), tool_wrench);
        let rhs = torques_nm - bias;
        let mass = self.mass_matrix(joints_rad);

        if let Some(chol) = mass.clone().cholesky() {
            return Ok(chol.solve(&rhs));
        }

        mass.lu().solve(&rhs).ok_or(DynError::SingularMassMatrix)
    }

    /// Column `j` is the torque needed for a unit acceleration of joint `j` with no velocity or
    /// gravity.
    fn mass_matrix(&self, joints_rad: &DVector<f64>) -> DMatrix<f64> {
        let n = self.num_joints();
        let zeros = DVector::zeros(n);
        let mut mass = DMatrix::zeros(n, n);

        for j in 0..n {
            let mut unit = DVector::zeros(n);
            unit[j] = 1.0;
            let col = self.rnea(joints_rad, &zeros, &unit, &Vector3::zeros(), None);
            mass.set_column(j, &col);
        }

        // Remove round-off asymmetry
        (&mass + mass.transpose()) * 0.5
    }

    fn coriolis_centrifugal(
        &self,
        joints_rad: &DVector<f64>,
        rates_rads: &DVector<f64>,
    ) -> DVector<f64> {
        let n = self.num_joints();
        self.rnea(
            joints_rad,
            rates_rads,
            &DVector::zeros(n),
            &Vector3::zeros(),
            None,
        )
    }

    fn gravity_torques(&self, joints_rad: &DVector<f64>) -> DVector<f64> {
        let n = self.num_joints();
        self.rnea(
            joints_rad,
            &DVector::zeros(n),
            &DVector::zeros(n),
            &self.gravity_ms2,
            None,
        )
    }
}

/// Torques produced at the joints by a wrench in the tool frame, via the Jacobian transpose.
///
/// `tool_rot` is the orientation of the tool in the base frame and `jacobian` the 6xN geometric
/// Jacobian at the same configuration.
pub fn wrench_to_torques(
    jacobian: &DMatrix<f64>,
    tool_rot: &nalgebra::UnitQuaternion<f64>,
    wrench: &Wrench,
) -> DVector<f64> {
    let f = tool_rot * wrench.force_n;
    let m = tool_rot * wrench.moment_nm;
    let w = DVector::from_row_slice(&[f[0], f[1], f[2], m[0], m[1], m[2]]);

    jacobian.transpose() * w
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kin::{KinematicsSolver, SerialChain};

    fn solver() -> NewtonEuler {
        NewtonEuler::new(&KinParams::default(), &DynParams::default()).unwrap()
    }

    fn q(v: [f64; 6]) -> DVector<f64> {
        DVector::from_row_slice(&v)
    }

    #[test]
    fn test_gravity_zero_config() {
        let ne = solver();
        let params = DynParams::default();
        let lengths = KinParams::default().link_lengths_m;

        let tau = ne.gravity_torques(&DVector::zeros(6));

        // Base joint is vertical so gravity has no effect on it
        assert!(tau[0].abs() < 1e-9);

        // Shoulder holds up everything outboard of it. Positive rotation about Y lowers the arm,
        // so the holding torque is negative.
        let mut expected = 0.0;
        let mut joint_x = 0.0;
        for k in 0..6 {
            if k >= 1 {
                let com_x = joint_x + params.links[k].com_m[0];
                expected -= params.links[k].mass_kg * 9.81 * (com_x - lengths[0]);
            }
            joint_x += lengths[k];
        }
        assert!((tau[1] - expected).abs() < 1e-9, "{} != {}", tau[1], expected);

        // Wrist roll is along the arm
        assert!(tau[3].abs() < 1e-9);
    }

    #[test]
    fn test_mass_matrix_spd() {
        let ne = solver();
        let m = ne.mass_matrix(&q([0.3, 0.4, -0.6, 0.2, 0.5, -0.3]));

        assert!((&m - m.transpose()).amax() < 1e-12);
        assert!(m.clone().cholesky().is_some());
        assert!((0..6).all(|i| m[(i, i)] > 0.0));
    }

    #[test]
    fn test_forward_inverse_round_trip() {
        let ne = solver();
        let joints = q([0.3, 0.4, -0.6, 0.2, 0.5, -0.3]);
        let rates = q([0.5, -0.2, 0.3, 1.0, -0.7, 0.4]);
        let accels = q([1.0, -2.0, 0.5, 0.3, -0.1, 2.0]);

        let tau = ne.inverse_dynamics(&joints, &rates, &accels, None);
        let back = ne.forward_dynamics(&joints, &rates, &tau, None).unwrap();

        assert!((back - accels).amax() < 1e-8);
    }

    #[test]
    fn test_decomposition() {
        let ne = solver();
        let joints = q([-0.4, 0.7, 0.2, -0.5, 0.9, 1.1]);
        let rates = q([0.2, 0.4, -0.6, 0.1, 0.3, -0.5]);
        let accels = q([0.3, -0.3, 0.6, -1.0, 0.2, 0.4]);

        let full = ne.inverse_dynamics(&joints, &rates, &accels, None);
        let parts = ne.mass_matrix(&joints) * &accels
            + ne.coriolis_centrifugal(&joints, &rates)
            + ne.gravity_torques(&joints);

        assert!((full - parts).amax() < 1e-9);
    }

    #[test]
    fn test_coriolis_zero_at_rest() {
        let ne = solver();
        let c = ne.coriolis_centrifugal(&q([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]), &DVector::zeros(6));
        assert!(c.amax() < 1e-12);
    }

    #[test]
    fn test_tool_wrench_matches_jacobian() {
        let ne = solver();
        let chain = SerialChain::new(KinParams::default()).unwrap();
        let joints = q([0.3, 0.4, -0.6, 0.2, 0.5, -0.3]);
        let zeros = DVector::zeros(6);

        let wrench = Wrench {
            force_n: Vector3::new(10.0, -5.0, 20.0),
            moment_nm: Vector3::new(0.5, 1.0, -0.3),
        };

        let with = ne.inverse_dynamics(&joints, &zeros, &zeros, Some(&wrench));
        let without = ne.inverse_dynamics(&joints, &zeros, &zeros, None);

        let pose = chain.forward_kinematics(&joints);
        let expected = wrench_to_torques(&chain.jacobian(&joints), &pose.rotation, &wrench);

        assert!((with - without - expected).amax() < 1e-9);
    }

    #[test]
    #[should_panic]
    fn test_wrong_length() {
        solver().gravity_torques(&DVector::zeros(4));
    }
}
