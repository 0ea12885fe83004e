//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use num_traits::Float;

// ---------------------------------------------------------------------------
// SCALAR FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let mut r = rem_euclid(value + pi_t, tau_t) - pi_t;
    if r <= -pi_t {
        r = r + tau_t;
    }
    r
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

// ---------------------------------------------------------------------------
// ROTATION FUNCTIONS
// ---------------------------------------------------------------------------

/// Build an isometry from a position and roll-pitch-yaw angles (radians).
pub fn isometry_from_rpy(position: &Vector3<f64>, rpy_rad: &Vector3<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(
        (*position).into(),
        UnitQuaternion::from_euler_angles(rpy_rad[0], rpy_rad[1], rpy_rad[2]),
    )
}

/// Get the rotation error between two orientations as an axis-angle vector,
/// expressed in the common base frame.
///
/// Rotating `from` by the returned vector (applied in the base frame) gives
/// `to`.
pub fn rotation_error(from: &UnitQuaternion<f64>, to: &UnitQuaternion<f64>) -> Vector3<f64> {
    (to * from.inverse()).scaled_axis()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(TAU + 1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_pi(-PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI / 2.0) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(7.0, 4.0), 3.0);
        assert_eq!(rem_euclid(-1.0, 4.0), 3.0);
    }

    #[test]
    fn test_isometry_from_rpy() {
        let iso = isometry_from_rpy(&Vector3::new(1.0, 2.0, 3.0), &Vector3::new(0.0, 0.0, FRAC_PI_2));

        assert_eq!(iso.translation.vector, Vector3::new(1.0, 2.0, 3.0));
        let x = iso.rotation * Vector3::x();
        assert!((x - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_error() {
        let from = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2);
        let to = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5);
        let err = rotation_error(&from, &to);
        assert!((err - Vector3::new(0.3, 0.0, 0.0)).norm() < 1e-12);
        assert!(rotation_error(&to, &to).norm() < 1e-12);

        // Error is in the base frame
        let from = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let to = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.1) * from;
        assert!((rotation_error(&from, &to) - Vector3::new(0.1, 0.0, 0.0)).norm() < 1e-12);
    }
}
