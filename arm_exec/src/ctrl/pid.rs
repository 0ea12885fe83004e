//! PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::DVector;
use serde::Serialize;

use util::check_len;

use super::{check_param_len, per_channel, Controller, CtrlError, PidParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A per-channel PID controller with a clamped integral.
///
/// Parameter vector layout: `[k_p | k_i | k_d]`, one block per gain, each `num_channels` long.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: DVector<f64>,

    /// Integral gain
    k_i: DVector<f64>,

    /// Dervative gain
    k_d: DVector<f64>,

    /// Absolute limit of the integral accumulation
    integral_limit: DVector<f64>,

    /// Previous error
    prev_error: Option<DVector<f64>>,

    /// The integral accumulation
    integral: DVector<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller from the parameters.
    pub fn new(params: &PidParams, num_channels: usize) -> Result<Self, CtrlError> {
        let integral_limit = per_channel("integral_limit", &params.integral_limit, num_channels)?;
        if integral_limit.iter().any(|l| *l < 0.0) {
            return Err(CtrlError::InvalidParams(
                "integral_limit must not be negative".into(),
            ));
        }

        Ok(Self {
            k_p: per_channel("k_p", &params.k_p, num_channels)?,
            k_i: per_channel("k_i", &params.k_i, num_channels)?,
            k_d: per_channel("k_d", &params.k_d, num_channels)?,
            integral_limit,
            prev_error: None,
            integral: DVector::zeros(num_channels),
        })
    }

    /// The current integral accumulation.
    pub fn integral(&self) -> &DVector<f64> {
        &self.integral
    }
}

impl Controller for PidController {
    fn compute_control(
        &mut self,
        current: &DVector<f64>,
        desired: &DVector<f64>,
        dt_s: f64,
    ) -> DVector<f64> {
        let n = self.num_channels();
        check_len!("Current state", current, n);
        check_len!("Desired state", desired, n);

        let error = desired - current;

        // If there's no time difference we don't accumulate the integral or take a derivative,
        // adding the raw error would give a spike compared to normal operation.
        let deriv = if dt_s > 0.0 {
            self.integral += &error * dt_s;
            for i in 0..n {
                let limit = self.integral_limit[i];
                self.integral[i] = self.integral[i].clamp(-limit, limit);
            }

            match self.prev_error {
                Some(ref e) => (&error - e) / dt_s,
                None => DVector::zeros(n),
            }
        } else {
            DVector::zeros(n)
        };

        let out = self.k_p.component_mul(&error)
            + self.k_i.component_mul(&self.integral)
            + self.k_d.component_mul(&deriv);

        self.prev_error = Some(error);

        out
    }

    fn reset(&mut self) {
        self.integral.fill(0.0);
        self.prev_error = None;
    }

    fn set_parameters(&mut self, params: &DVector<f64>) -> Result<(), CtrlError> {
        let n = self.num_channels();
        check_param_len(params, 3 * n)?;

        self.k_p = params.rows(0, n).into_owned();
        self.k_i = params.rows(n, n).into_owned();
        self.k_d = params.rows(2 * n, n).into_owned();

        Ok(())
    }

    fn get_parameters(&self) -> DVector<f64> {
        let n = self.num_channels();
        let mut params = DVector::zeros(3 * n);
        params.rows_mut(0, n).copy_from(&self.k_p);
        params.rows_mut(n, n).copy_from(&self.k_i);
        params.rows_mut(2 * n, n).copy_from(&self.k_d);
        params
    }

    fn num_channels(&self) -> usize {
        self.k_p.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pid(k_p: f64, k_i: f64, k_d: f64, limit: f64) -> PidController {
        PidController::new(
            &PidParams {
                k_p: vec![k_p],
                k_i: vec![k_i],
                k_d: vec![k_d],
                integral_limit: vec![limit],
            },
            2,
        )
        .unwrap()
    }

    fn v(a: f64, b: f64) -> DVector<f64> {
        DVector::from_column_slice(&[a, b])
    }

    #[test]
    fn test_proportional() {
        let mut c = pid(2.0, 0.0, 0.0, 1.0);
        let out = c.compute_control(&v(0.0, 1.0), &v(1.0, 0.5), 0.1);
        assert_eq!(out, v(2.0, -1.0));
    }

    #[test]
    fn test_first_step_has_no_derivative() {
        let mut c = pid(0.0, 0.0, 1.0, 1.0);
        let out = c.compute_control(&v(0.0, 0.0), &v(1.0, 1.0), 0.1);
        assert_eq!(out, v(0.0, 0.0));

        // Error goes from 1 to 0.5 over 0.1 s
        let out = c.compute_control(&v(0.5, 0.5), &v(1.0, 1.0), 0.1);
        assert!((out - v(-5.0, -5.0)).amax() < 1e-9);
    }

    #[test]
    fn test_integral_anti_windup() {
        let mut c = pid(0.0, 1.0, 0.0, 0.5);

        for _ in 0..100 {
            c.compute_control(&v(0.0, 0.0), &v(1.0, -1.0), 0.1);
        }

        assert_eq!(c.integral(), &v(0.5, -0.5));
        let out = c.compute_control(&v(0.0, 0.0), &v(1.0, -1.0), 0.1);
        assert_eq!(out, v(0.5, -0.5));
    }

    #[test]
    fn test_zero_dt() {
        let mut c = pid(1.0, 1.0, 1.0, 10.0);
        let out = c.compute_control(&v(0.0, 0.0), &v(1.0, 2.0), 0.0);
        assert_eq!(out, v(1.0, 2.0));
        assert_eq!(c.integral(), &v(0.0, 0.0));
    }

    #[test]
    fn test_reset() {
        let mut c = pid(1.0, 1.0, 1.0, 10.0);
        let first = c.compute_control(&v(0.0, 0.0), &v(1.0, 1.0), 0.1);
        c.compute_control(&v(0.2, 0.2), &v(1.0, 1.0), 0.1);

        c.reset();

        assert_eq!(c.integral(), &v(0.0, 0.0));
        let again = c.compute_control(&v(0.0, 0.0), &v(1.0, 1.0), 0.1);
        assert_eq!(first, again);
    }

    #[test]
    fn test_parameters() {
        let mut c = pid(1.0, 2.0, 3.0, 1.0);
        assert_eq!(
            c.get_parameters(),
            DVector::from_column_slice(&[1.0, 1.0, 2.0, 2.0, 3.0, 3.0])
        );

        let p = DVector::from_column_slice(&[4.0, 5.0, 0.0, 0.0, 0.0, 0.0]);
        c.set_parameters(&p).unwrap();
        assert_eq!(c.get_parameters(), p);
        assert_eq!(c.compute_control(&v(0.0, 0.0), &v(1.0, 1.0), 0.1), v(4.0, 5.0));

        assert!(matches!(
            c.set_parameters(&DVector::zeros(5)),
            Err(CtrlError::InvalidParamLength { expected: 6, found: 5 })
        ));
    }

    #[test]
    #[should_panic]
    fn test_wrong_length() {
        let mut c = pid(1.0, 0.0, 0.0, 1.0);
        c.compute_control(&DVector::zeros(3), &DVector::zeros(3), 0.1);
    }
}
