//! Plaintext controller definition and reference implementation

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::math::matrix::vec_add;
use crate::math::Matrix;
use crate::params::Dimensions;

/// Gains of the two PID loops (cart angle and cart position)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub lp: f64,
    pub li: f64,
    pub ld: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 34.0,
            ki: 2.0,
            kd: 42.0,
            lp: 40.0,
            li: 0.0,
            ld: 3.0,
        }
    }
}

/// Plaintext `F, G, H, J` and initial state `x₀`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerMatrices {
    pub f: Matrix,
    pub g: Matrix,
    pub h: Matrix,
    pub j: Matrix,
    pub x0: Vec<f64>,
}

impl ControllerMatrices {
    pub fn new(f: Matrix, g: Matrix, h: Matrix, j: Matrix, x0: Vec<f64>) -> Result<Self> {
        let matrices = Self { f, g, h, j, x0 };
        matrices.validate()?;
        Ok(matrices)
    }

    /// Two discrete PID loops in state-space form.
    ///
    /// State per loop: (integral of e, previous e). Measurements are the
    /// angle and position errors; the output is one actuator command.
    pub fn pid(gains: &PidGains) -> Self {
        let PidGains {
            kp,
            ki,
            kd,
            lp,
            li,
            ld,
        } = *gains;
        let mut f = Matrix::zeros(4, 4);
        f.set(0, 0, 1.0);
        f.set(2, 2, 1.0);

        let mut g = Matrix::zeros(4, 2);
        g.set(0, 0, 1.0);
        g.set(1, 0, 1.0);
        g.set(2, 1, 1.0);
        g.set(3, 1, 1.0);

        let mut h = Matrix::zeros(1, 4);
        for (col, v) in [ki, -kd, li, -ld].into_iter().enumerate() {
            h.set(0, col, v);
        }

        let mut j = Matrix::zeros(1, 2);
        j.set(0, 0, kp + ki + kd);
        j.set(0, 1, lp + li + ld);

        Self {
            f,
            g,
            h,
            j,
            x0: vec![0.0; 4],
        }
    }

    /// Dimensions implied by the matrices: n from F, m from H, p from G.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            n: self.f.rows(),
            m: self.h.rows(),
            p: self.g.cols(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let dims = self.dimensions();
        dims.validate()?;
        let Dimensions { n, m, p } = dims;
        self.f.expect_shape("F", n, n)?;
        self.g.expect_shape("G", n, p)?;
        self.h.expect_shape("H", m, n)?;
        self.j.expect_shape("J", m, p)?;
        if self.x0.len() != n {
            return Err(ControlError::Dimension(format!(
                "x0 has {} entries, expected {}",
                self.x0.len(),
                n
            )));
        }
        Ok(())
    }
}

/// Plaintext controller run alongside the encrypted one for comparison.
#[derive(Debug, Clone)]
pub struct ReferenceController {
    matrices: ControllerMatrices,
    x: Vec<f64>,
}

impl ReferenceController {
    pub fn new(matrices: ControllerMatrices) -> Result<Self> {
        matrices.validate()?;
        let x = matrices.x0.clone();
        Ok(Self { matrices, x })
    }

    /// u = H·x + J·y, then x ← F·x + G·y
    pub fn step(&mut self, y: &[f64]) -> Result<Vec<f64>> {
        let p = self.matrices.g.cols();
        if y.len() != p {
            return Err(ControlError::Dimension(format!(
                "measurement has {} entries, expected {}",
                y.len(),
                p
            )));
        }
        let m = &self.matrices;
        let u = vec_add(&m.h.mul_vec(&self.x), &m.j.mul_vec(y));
        self.x = vec_add(&m.f.mul_vec(&self.x), &m.g.mul_vec(y));
        Ok(u)
    }

    pub fn state(&self) -> &[f64] {
        &self.x
    }

    pub fn reset(&mut self) {
        self.x = self.matrices.x0.clone();
    }

    pub fn matrices(&self) -> &ControllerMatrices {
        &self.matrices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_shapes() {
        let m = ControllerMatrices::pid(&PidGains::default());
        m.validate().unwrap();
        assert_eq!(m.dimensions(), Dimensions { n: 4, m: 1, p: 2 });
        assert_eq!(m.j.get(0, 0), 34.0 + 2.0 + 42.0);
        assert_eq!(m.h.get(0, 1), -42.0);
    }

    #[test]
    fn test_reference_matches_pid_law() {
        let gains = PidGains {
            kp: 1.0,
            ki: 0.5,
            kd: 0.25,
            lp: 0.0,
            li: 0.0,
            ld: 0.0,
        };
        let mut ctrl = ReferenceController::new(ControllerMatrices::pid(&gains)).unwrap();

        // e = 1, 2, 0 on the angle loop
        let u0 = ctrl.step(&[1.0, 0.0]).unwrap()[0];
        let u1 = ctrl.step(&[2.0, 0.0]).unwrap()[0];
        let u2 = ctrl.step(&[0.0, 0.0]).unwrap()[0];

        // kp·e + ki·Σe + kd·(e − e_prev)
        assert!((u0 - (1.0 + 0.5 + 0.25)).abs() < 1e-12);
        assert!((u1 - (2.0 + 0.5 * 3.0 + 0.25 * 1.0)).abs() < 1e-12);
        assert!((u2 - (0.0 + 0.5 * 3.0 - 0.25 * 2.0)).abs() < 1e-12);

        ctrl.reset();
        assert_eq!(ctrl.state(), &[0.0; 4]);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let mut m = ControllerMatrices::pid(&PidGains::default());
        m.x0 = vec![0.0; 3];
        assert!(m.validate().is_err());

        let mut ctrl = ReferenceController::new(ControllerMatrices::pid(&PidGains::default()))
            .unwrap();
        assert!(ctrl.step(&[1.0]).is_err());
    }

    #[test]
    fn test_json_with_short_matrix_data_rejected() {
        let good = serde_json::to_value(ControllerMatrices::pid(&PidGains::default())).unwrap();
        assert!(serde_json::from_value::<ControllerMatrices>(good.clone()).is_ok());

        let mut bad = good;
        bad["g"]["data"] = serde_json::json!([]);
        assert!(serde_json::from_value::<ControllerMatrices>(bad).is_err());
    }
}
