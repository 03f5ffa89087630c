//! Fixed-point quantization of real vectors and matrices
//!
//! Rounding is half away from zero (`f64::round`) on both sides of the
//! loop. Values beyond the i64 range saturate; the packing layer rejects
//! anything whose scaled magnitude does not fit below q/2.

use crate::error::{ControlError, Result};
use crate::math::Matrix;
use crate::params::ScalingParams;

/// `round(v / step)`
#[inline]
pub fn quantize_scalar(v: f64, step: f64) -> i64 {
    (v / step).round() as i64
}

/// Element-wise `round(v_i / step)`
pub fn quantize(v: &[f64], step: f64) -> Vec<i64> {
    v.iter().map(|&x| quantize_scalar(x, step)).collect()
}

/// Element-wise `v_i * step`
pub fn dequantize(v: &[i64], step: f64) -> Vec<f64> {
    v.iter().map(|&x| x as f64 * step).collect()
}

/// Element-wise `round(M_ij / step)`
pub fn quantize_matrix(m: &Matrix, step: f64) -> Matrix<i64> {
    m.map(|v| quantize_scalar(v, step))
}

/// Exact conversion of an integer-valued matrix.
pub fn integer_matrix(name: &'static str, m: &Matrix) -> Result<Matrix<i64>> {
    for (row, col, value) in m.entries() {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(ControlError::NonIntegerMatrix {
                name,
                row,
                col,
                value,
            });
        }
    }
    Ok(m.map(|v| v as i64))
}

/// Quantized controller matrices, tagged by their power of `s`.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizedMatrices {
    /// F̄ = F (power 0)
    pub f: Matrix<i64>,
    /// Ḡ = G/s (power 1)
    pub g: Matrix<i64>,
    /// H̄ = H/s (power 1)
    pub h: Matrix<i64>,
    /// J̄ = J/s² (power 2)
    pub j: Matrix<i64>,
}

impl QuantizedMatrices {
    pub const F_POWER: u32 = 0;
    pub const G_POWER: u32 = 1;
    pub const H_POWER: u32 = 1;
    pub const J_POWER: u32 = 2;

    pub fn new(
        f: &Matrix,
        g: &Matrix,
        h: &Matrix,
        j: &Matrix,
        scaling: &ScalingParams,
    ) -> Result<Self> {
        let s = scaling.s;
        Ok(Self {
            f: integer_matrix("F", f)?,
            g: quantize_matrix(g, s),
            h: quantize_matrix(h, s),
            j: quantize_matrix(j, s * s),
        })
    }
}

/// x̄₀ = x₀ / (r·s)
pub fn quantize_state(x0: &[f64], scaling: &ScalingParams) -> Vec<i64> {
    quantize(x0, scaling.r * scaling.s)
}

/// ȳ = y / r
pub fn quantize_measurement(y: &[f64], scaling: &ScalingParams) -> Vec<i64> {
    quantize(y, scaling.r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(quantize(&[0.5, -0.5, 1.5, -2.5, 0.49], 1.0), vec![1, -1, 2, -3, 0]);
    }

    #[test]
    fn test_roundtrip_within_half_step() {
        let step = 1e-3;
        let values = [0.0, 1.0, -0.12345, 3.14159, -40.0004, 1e-4];
        let back = dequantize(&quantize(&values, step), step);
        for (v, b) in values.iter().zip(&back) {
            assert!((v - b).abs() <= step / 2.0 + 1e-12, "{} -> {}", v, b);
        }
    }

    #[test]
    fn test_integer_matrix() {
        let f = Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, -2.0]]).unwrap();
        assert_eq!(integer_matrix("F", &f).unwrap().get(1, 1), -2);

        let bad = Matrix::from_rows(vec![vec![1.0, 0.5]]).unwrap();
        match integer_matrix("F", &bad) {
            Err(ControlError::NonIntegerMatrix { row, col, .. }) => {
                assert_eq!((row, col), (0, 1));
            }
            other => panic!("expected NonIntegerMatrix, got {:?}", other),
        }
    }

    #[test]
    fn test_quantized_matrices_scales() {
        let scaling = ScalingParams::new(1e-3, 0.1, 1e-6).unwrap();
        let f = Matrix::from_rows(vec![vec![1.0]]).unwrap();
        let g = Matrix::from_rows(vec![vec![1.0]]).unwrap();
        let h = Matrix::from_rows(vec![vec![0.26]]).unwrap();
        let j = Matrix::from_rows(vec![vec![1.6]]).unwrap();

        let q = QuantizedMatrices::new(&f, &g, &h, &j, &scaling).unwrap();
        assert_eq!(q.f.get(0, 0), 1);
        assert_eq!(q.g.get(0, 0), 10);
        assert_eq!(q.h.get(0, 0), 3);
        assert_eq!(q.j.get(0, 0), 160);

        assert_eq!(quantize_state(&[0.002], &scaling), vec![20]);
        assert_eq!(quantize_measurement(&[1.0, -0.0004], &scaling), vec![1000, 0]);
    }
}
