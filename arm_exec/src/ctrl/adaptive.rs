//! Adaptive controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use util::check_len;

use super::{check_param_len, per_channel, AdaptiveParams, Controller, CtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A gradient-law adaptive controller.
///
/// The output is linear in a vector of parameter estimates `theta` through the regression matrix
///
/// ```text
/// Y = [ diag(desired) | diag(e) | diag(integral of e) ]
/// u = Y theta
/// ```
///
/// and after each step the estimates follow `theta += rate * Gamma * Y^T e * dt`.
///
/// Parameter vector layout: the `3 * num_channels` initial estimates. Setting parameters also
/// resets the live estimates to them.
#[derive(Debug, Serialize, Clone)]
pub struct AdaptiveController {
    initial_estimates: DVector<f64>,
    estimates: DVector<f64>,

    adaptation_rate: f64,

    /// Diagonal of the adaptation gain matrix
    adaptation_gains: DVector<f64>,

    error_integral: DVector<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AdaptiveController {
    /// Create a new controller from the parameters.
    pub fn new(params: &AdaptiveParams, num_channels: usize) -> Result<Self, CtrlError> {
        if !params.adaptation_rate.is_finite() || params.adaptation_rate < 0.0 {
            return Err(CtrlError::InvalidParams(format!(
                "adaptation_rate must be non-negative, found {}",
                params.adaptation_rate
            )));
        }

        let initial_estimates =
            per_channel("initial_estimates", &params.initial_estimates, 3 * num_channels)?;

        Ok(Self {
            estimates: initial_estimates.clone(),
            initial_estimates,
            adaptation_rate: params.adaptation_rate,
            adaptation_gains: per_channel(
                "adaptation_gains",
                &params.adaptation_gains,
                3 * num_channels,
            )?,
            error_integral: DVector::zeros(num_channels),
        })
    }

    /// The current parameter estimates.
    pub fn parameter_estimates(&self) -> &DVector<f64> {
        &self.estimates
    }

    fn regression(&self, desired: &DVector<f64>, error: &DVector<f64>) -> DMatrix<f64> {
        let n = self.num_channels();
        let mut y = DMatrix::zeros(n, 3 * n);

        for i in 0..n {
            y[(i, i)] = desired[i];
            y[(i, n + i)] = error[i];
            y[(i, 2 * n + i)] = self.error_integral[i];
        }

        y
    }
}

impl Controller for AdaptiveController {
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
        if dt_s > 0.0 {
            self.error_integral += &error * dt_s;
        }

        let y = self.regression(desired, &error);
        let out = &y * &self.estimates;

        if dt_s > 0.0 {
            let gradient = y.transpose() * &error;
            self.estimates +=
                self.adaptation_gains.component_mul(&gradient) * (self.adaptation_rate * dt_s);
        }

        out
    }

    fn reset(&mut self) {
        self.estimates.copy_from(&self.initial_estimates);
        self.error_integral.fill(0.0);
    }

    fn set_parameters(&mut self, params: &DVector<f64>) -> Result<(), CtrlError> {
        check_param_len(params, 3 * self.num_channels())?;

        self.initial_estimates.copy_from(params);
        self.estimates.copy_from(params);

        Ok(())
    }

    fn get_parameters(&self) -> DVector<f64> {
        self.initial_estimates.clone()
    }

    fn num_channels(&self) -> usize {
        self.error_integral.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctrl(initial: Vec<f64>, rate: f64) -> AdaptiveController {
        AdaptiveController::new(
            &AdaptiveParams {
                initial_estimates: initial,
                adaptation_rate: rate,
                adaptation_gains: vec![1.0],
            },
            2,
        )
        .unwrap()
    }

    fn v(a: f64, b: f64) -> DVector<f64> {
        DVector::from_column_slice(&[a, b])
    }

    #[test]
    fn test_fixed_estimates_act_as_pi() {
        // Proportional estimate 2, integral estimate 1, no adaptation
        let mut c = ctrl(vec![0.0, 0.0, 2.0, 2.0, 1.0, 1.0], 0.0);

        let out = c.compute_control(&v(0.0, 0.0), &v(1.0, -1.0), 0.5);
        // integral is 0.5 after the first step
        assert_eq!(out, v(2.5, -2.5));
        assert_eq!(c.parameter_estimates(), &c.get_parameters());
    }

    #[test]
    fn test_estimates_adapt() {
        let mut c = ctrl(vec![0.0], 1.0);

        c.compute_control(&v(0.0, 0.0), &v(1.0, 2.0), 0.1);

        // Feed-forward estimates grow by desired * e * dt, proportional by e^2 * dt
        let est = c.parameter_estimates().clone();
        assert!((est[0] - 0.1).abs() < 1e-12);
        assert!((est[1] - 0.4).abs() < 1e-12);
        assert!((est[2] - 0.1).abs() < 1e-12);
        assert!((est[3] - 0.4).abs() < 1e-12);

        // A persistent error keeps increasing the output
        let out_1 = c.compute_control(&v(0.0, 0.0), &v(1.0, 2.0), 0.1);
        let out_2 = c.compute_control(&v(0.0, 0.0), &v(1.0, 2.0), 0.1);
        assert!(out_2[0] > out_1[0] && out_2[1] > out_1[1]);
    }

    #[test]
    fn test_reset_restores_initial_estimates() {
        let mut c = ctrl(vec![0.5], 1.0);
        let first = c.compute_control(&v(0.0, 0.0), &v(1.0, 2.0), 0.1);
        c.compute_control(&v(0.0, 0.0), &v(1.0, 2.0), 0.1);

        c.reset();

        assert_eq!(c.parameter_estimates(), &DVector::from_element(6, 0.5));
        assert_eq!(c.compute_control(&v(0.0, 0.0), &v(1.0, 2.0), 0.1), first);
    }

    #[test]
    fn test_parameters() {
        let mut c = ctrl(vec![0.0], 1.0);
        assert!(c.set_parameters(&DVector::zeros(4)).is_err());

        let p = DVector::from_column_slice(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        c.set_parameters(&p).unwrap();
        assert_eq!(c.get_parameters(), p);
        assert_eq!(c.parameter_estimates(), &p);
    }

    #[test]
    fn test_rejects_negative_rate() {
        assert!(AdaptiveController::new(
            &AdaptiveParams {
                initial_estimates: vec![0.0],
                adaptation_rate: -1.0,
                adaptation_gains: vec![1.0],
            },
            2
        )
        .is_err());
    }
}
