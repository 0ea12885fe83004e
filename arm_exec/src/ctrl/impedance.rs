//! Impedance controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use util::check_len;

use super::{check_param_len, per_channel, Controller, CtrlError, ImpedanceParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An impedance controller, making each channel behave like a spring-damper pulled towards the
/// desired state plus an equilibrium offset.
///
/// ```text
/// u = K ((desired + offset) - current) - D v
/// ```
///
/// where `v` is estimated from successive values of `current`.
///
/// Parameter vector layout: `[K | D | offset]`, with `K` and `D` flattened column-major.
#[derive(Debug, Serialize, Clone)]
pub struct ImpedanceController {
    stiffness: DMatrix<f64>,
    damping: DMatrix<f64>,
    equilibrium_offset: DVector<f64>,

    prev_state: Option<DVector<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ImpedanceController {
    /// Create a new controller with diagonal stiffness and damping from the parameters.
    pub fn new(params: &ImpedanceParams, num_channels: usize) -> Result<Self, CtrlError> {
        Ok(Self {
            stiffness: DMatrix::from_diagonal(&per_channel(
                "stiffness",
                &params.stiffness,
                num_channels,
            )?),
            damping: DMatrix::from_diagonal(&per_channel(
                "damping",
                &params.damping,
                num_channels,
            )?),
            equilibrium_offset: per_channel(
                "equilibrium_offset",
                &params.equilibrium_offset,
                num_channels,
            )?,
            prev_state: None,
        })
    }

    /// Set a full stiffness matrix.
    pub fn set_stiffness(&mut self, stiffness: DMatrix<f64>) -> Result<(), CtrlError> {
        self.check_square("stiffness", &stiffness)?;
        self.stiffness = stiffness;
        Ok(())
    }

    /// Set a full damping matrix.
    pub fn set_damping(&mut self, damping: DMatrix<f64>) -> Result<(), CtrlError> {
        self.check_square("damping", &damping)?;
        self.damping = damping;
        Ok(())
    }

    fn check_square(&self, name: &str, m: &DMatrix<f64>) -> Result<(), CtrlError> {
        let n = self.num_channels();
        if m.nrows() != n || m.ncols() != n {
            return Err(CtrlError::InvalidParams(format!(
                "{} matrix must be {}x{}, found {}x{}",
                name,
                n,
                n,
                m.nrows(),
                m.ncols()
            )));
        }
        Ok(())
    }
}

impl Controller for ImpedanceController {
    fn compute_control(
        &mut self,
        current: &DVector<f64>,
        desired: &DVector<f64>,
        dt_s: f64,
    ) -> DVector<f64> {
        let n = self.num_channels();
        check_len!("Current state", current, n);
        check_len!("Desired state", desired, n);

        let velocity = match self.prev_state {
            Some(ref prev) if dt_s > 0.0 => (current - prev) / dt_s,
            _ => DVector::zeros(n),
        };

        let equilibrium = desired + &self.equilibrium_offset;
        let out = &self.stiffness * (equilibrium - current) - &self.damping * velocity;

        self.prev_state = Some(current.clone());

        out
    }

    fn reset(&mut self) {
        self.prev_state = None;
    }

    fn set_parameters(&mut self, params: &DVector<f64>) -> Result<(), CtrlError> {
        let n = self.num_channels();
        check_param_len(params, 2 * n * n + n)?;

        let flat = params.as_slice();
        self.stiffness = DMatrix::from_column_slice(n, n, &flat[0..n * n]);
        self.damping = DMatrix::from_column_slice(n, n, &flat[n * n..2 * n * n]);
        self.equilibrium_offset = params.rows(2 * n * n, n).into_owned();

        Ok(())
    }

    fn get_parameters(&self) -> DVector<f64> {
        let n = self.num_channels();
        let mut params = DVector::zeros(2 * n * n + n);
        params
            .rows_mut(0, n * n)
            .copy_from_slice(self.stiffness.as_slice());
        params
            .rows_mut(n * n, n * n)
            .copy_from_slice(self.damping.as_slice());
        params
            .rows_mut(2 * n * n, n)
            .copy_from(&self.equilibrium_offset);
        params
    }

    fn num_channels(&self) -> usize {
        self.equilibrium_offset.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctrl(k: f64, d: f64, offset: f64) -> ImpedanceController {
        ImpedanceController::new(
            &ImpedanceParams {
                stiffness: vec![k],
                damping: vec![d],
                equilibrium_offset: vec![offset],
            },
            2,
        )
        .unwrap()
    }

    fn v(a: f64, b: f64) -> DVector<f64> {
        DVector::from_column_slice(&[a, b])
    }

    #[test]
    fn test_spring() {
        let mut c = ctrl(10.0, 1.0, 0.0);
        // No velocity estimate on the first step
        let out = c.compute_control(&v(0.0, 1.0), &v(0.5, 1.0), 0.1);
        assert_eq!(out, v(5.0, 0.0));
    }

    #[test]
    fn test_damping() {
        let mut c = ctrl(0.0, 2.0, 0.0);
        c.compute_control(&v(0.0, 0.0), &v(0.0, 0.0), 0.1);

        // Moved 0.1 in 0.1 s, so velocity is 1
        let out = c.compute_control(&v(0.1, -0.1), &v(0.0, 0.0), 0.1);
        assert!((out - v(-2.0, 2.0)).amax() < 1e-9);
    }

    #[test]
    fn test_equilibrium_offset() {
        let mut c = ctrl(1.0, 0.0, 0.25);
        let out = c.compute_control(&v(0.0, 0.0), &v(0.0, 1.0), 0.1);
        assert_eq!(out, v(0.25, 1.25));
    }

    #[test]
    fn test_reset_clears_velocity() {
        let mut c = ctrl(0.0, 1.0, 0.0);
        c.compute_control(&v(0.0, 0.0), &v(0.0, 0.0), 0.1);
        c.reset();
        let out = c.compute_control(&v(1.0, 1.0), &v(0.0, 0.0), 0.1);
        assert_eq!(out, v(0.0, 0.0));
    }

    #[test]
    fn test_full_stiffness() {
        let mut c = ctrl(1.0, 0.0, 0.0);
        c.set_stiffness(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 1.0]))
            .unwrap();
        let out = c.compute_control(&v(0.0, 0.0), &v(1.0, 1.0), 0.1);
        assert_eq!(out, v(3.0, 1.0));

        assert!(c.set_damping(DMatrix::zeros(3, 3)).is_err());
    }

    #[test]
    fn test_parameters() {
        let mut c = ctrl(3.0, 4.0, 0.5);
        let p = c.get_parameters();
        assert_eq!(p.len(), 10);
        assert_eq!(
            p,
            DVector::from_column_slice(&[3.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0, 4.0, 0.5, 0.5])
        );

        let new = DVector::from_column_slice(&[1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        c.set_parameters(&new).unwrap();
        assert_eq!(c.get_parameters(), new);
        assert_eq!(c.compute_control(&v(0.0, 0.0), &v(1.0, 1.0), 0.1), v(1.0, 2.0));

        assert!(c.set_parameters(&DVector::zeros(9)).is_err());
    }
}
