//! Encrypted linear algebra
//!
//! A plaintext matrix M̄ (m×n, integer) is encrypted column by column:
//! column j becomes RGSW(Σ_i M̄_ij · X^{slot(i)}). Multiplying by a vector
//! that has been unpacked into one RLWE ciphertext per entry is then a sum
//! of external products, and the result lands back in the packed layout:
//!
//! ```text
//! mult_pack(M, x) = Σ_j RGSW(col_j) ⊡ RLWE(x_j)  →  packed RLWE(M̄ · x)
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::math::{GaussianSampler, Matrix, ModQ, NttContext, Poly};
use crate::packing::{PackedCiphertext, PackingLayout};
use crate::rgsw::{DecomposedCiphertext, GadgetVector, ProductAccumulator, RgswCiphertext};
use crate::rlwe::{RlweCiphertext, RlweSecretKey};

/// RGSW-encrypted integer matrix, tagged with its power of `s`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedMatrix {
    columns: Vec<RgswCiphertext>,
    rows: usize,
    s_power: u32,
}

impl EncryptedMatrix {
    pub fn encrypt(
        sk: &RlweSecretKey,
        matrix: &Matrix<i64>,
        s_power: u32,
        layout: &PackingLayout,
        gadget: &GadgetVector,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Result<Self> {
        layout.check_count(matrix.rows())?;
        let q = sk.modulus();

        let columns = (0..matrix.cols())
            .map(|j| {
                let mut poly = Poly::zero(layout.ring_dim(), q);
                for (i, v) in matrix.column(j).into_iter().enumerate() {
                    poly.set_coeff(layout.slot_index(i), ModQ::from_signed(v, q));
                }
                RgswCiphertext::encrypt(sk, &poly, gadget, sampler, ctx)
            })
            .collect();

        Ok(Self {
            columns,
            rows: matrix.rows(),
            s_power,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn s_power(&self) -> u32 {
        self.s_power
    }

    pub fn ring_dim(&self) -> usize {
        self.columns.first().map(|c| c.ring_dim()).unwrap_or(0)
    }

    pub fn gadget(&self) -> Option<&GadgetVector> {
        self.columns.first().map(|c| &c.gadget)
    }

    /// Every column must be encrypted under `gadget` with 2ℓ rows.
    pub fn expect_gadget(&self, name: &str, gadget: &GadgetVector) -> Result<()> {
        let bad = self
            .columns
            .iter()
            .position(|c| c.gadget != *gadget || c.rows.len() != 2 * gadget.len);
        match bad {
            Some(j) => Err(ControlError::InvalidParams(format!(
                "encrypted matrix {} column {} does not use gadget base {} with {} digits",
                name, j, gadget.base, gadget.len
            ))),
            None => Ok(()),
        }
    }

    /// Shape check against the dimensions the caller expects
    pub fn expect_shape(&self, name: &str, rows: usize, cols: usize) -> Result<()> {
        if self.rows != rows || self.cols() != cols {
            return Err(ControlError::Dimension(format!(
                "encrypted matrix {} is {}x{}, expected {}x{}",
                name,
                self.rows,
                self.cols(),
                rows,
                cols
            )));
        }
        Ok(())
    }

    /// Packed M̄·x, at power `self.s_power + x.s_power`
    pub fn mult_pack(&self, x: &PreparedVector, ctx: &NttContext) -> Result<PackedCiphertext> {
        if x.len() != self.cols() {
            return Err(ControlError::Dimension(format!(
                "matrix has {} columns but vector has {} entries",
                self.cols(),
                x.len()
            )));
        }

        let first = self
            .columns
            .first()
            .ok_or_else(|| ControlError::Dimension("encrypted matrix has no columns".into()))?;
        let mut acc = ProductAccumulator::new(first.ring_dim(), first.modulus());
        for (digits, column) in x.digits.iter().zip(&self.columns) {
            acc.add_product(digits, column, ctx);
        }

        Ok(PackedCiphertext::new(
            acc.finish(ctx),
            self.rows,
            self.s_power + x.s_power,
        ))
    }
}

/// Unpacked vector with every entry already gadget-decomposed and in the
/// NTT domain, ready to be multiplied by several encrypted matrices.
#[derive(Clone, Debug)]
pub struct PreparedVector {
    digits: Vec<DecomposedCiphertext>,
    s_power: u32,
}

impl PreparedVector {
    pub fn new(
        cts: &[RlweCiphertext],
        s_power: u32,
        gadget: &GadgetVector,
        ctx: &NttContext,
    ) -> Self {
        let digits = cts
            .par_iter()
            .map(|ct| DecomposedCiphertext::new(ct, gadget, ctx))
            .collect();
        Self { digits, s_power }
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn s_power(&self) -> u32 {
        self.s_power
    }
}

/// Homomorphic addition of two packed vectors at the same scale
pub fn add_packed(lhs: &PackedCiphertext, rhs: &PackedCiphertext) -> Result<PackedCiphertext> {
    if lhs.s_power != rhs.s_power {
        return Err(ControlError::ScaleMismatch {
            left: lhs.s_power,
            right: rhs.s_power,
        });
    }
    if lhs.slots != rhs.slots {
        return Err(ControlError::Dimension(format!(
            "cannot add packed vectors of {} and {} slots",
            lhs.slots, rhs.slots
        )));
    }
    Ok(PackedCiphertext::new(
        lhs.ct.add(&rhs.ct),
        lhs.slots,
        lhs.s_power,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::GaloisKeySet;
    use crate::packing::{decrypt_slots, encrypt_packed, unpack};
    use crate::params::SchemeParams;

    const FACTOR: u64 = 1 << 34;
    const NOISE: i64 = 1 << 30;

    fn test_params() -> SchemeParams {
        SchemeParams::insecure_d256()
    }

    #[test]
    fn test_mult_pack_matches_plaintext() {
        let params = test_params();
        let ctx = params.ntt_context();
        let gadget = params.gadget();
        let mut sampler = GaussianSampler::with_seed(params.sigma, 81);
        let sk = RlweSecretKey::generate(&params, &mut sampler);
        let keys = GaloisKeySet::generate(&sk, &gadget, &mut sampler, &ctx);
        let layout = PackingLayout::new(params.ring_dim, 4).unwrap();

        let m = Matrix::from_rows(vec![
            vec![1i64, 0, -3],
            vec![2, 5, 0],
            vec![0, -1, 4],
            vec![7, 0, 0],
        ])
        .unwrap();
        let enc = EncryptedMatrix::encrypt(&sk, &m, 1, &layout, &gadget, &mut sampler, &ctx)
            .unwrap();
        assert_eq!((enc.rows(), enc.cols()), (4, 3));

        let x = [3i64, -2, 10];
        let packed = encrypt_packed(&sk, &x, &layout, FACTOR, 1, &mut sampler, &ctx).unwrap();
        let unpacked = unpack(&packed, 3, &layout, &keys, &ctx).unwrap();
        let prepared = PreparedVector::new(&unpacked, packed.s_power, &gadget, &ctx);

        let product = enc.mult_pack(&prepared, &ctx).unwrap();
        assert_eq!(product.s_power, 2);
        assert_eq!(product.slots, 4);

        let slots = decrypt_slots(&sk, &product, &layout, &ctx).unwrap();
        let expected = [3 - 30, 6 - 10, 2 + 40, 21];
        for (i, (&got, &want)) in slots.iter().zip(&expected).enumerate() {
            let want = want * FACTOR as i64;
            assert!((got - want).abs() < NOISE, "row {}: {} vs {}", i, got, want);
        }
    }

    #[test]
    fn test_add_packed_checks_scale() {
        let params = test_params();
        let ctx = params.ntt_context();
        let mut sampler = GaussianSampler::with_seed(params.sigma, 82);
        let sk = RlweSecretKey::generate(&params, &mut sampler);
        let layout = PackingLayout::new(params.ring_dim, 2).unwrap();

        let a = encrypt_packed(&sk, &[1, 2], &layout, FACTOR, 1, &mut sampler, &ctx).unwrap();
        let b = encrypt_packed(&sk, &[10, -20], &layout, FACTOR, 1, &mut sampler, &ctx).unwrap();
        let c = encrypt_packed(&sk, &[1, 1], &layout, FACTOR, 2, &mut sampler, &ctx).unwrap();

        let sum = add_packed(&a, &b).unwrap();
        let slots = decrypt_slots(&sk, &sum, &layout, &ctx).unwrap();
        assert!((slots[0] - 11 * FACTOR as i64).abs() < 100);
        assert!((slots[1] + 18 * FACTOR as i64).abs() < 100);

        match add_packed(&a, &c) {
            Err(ControlError::ScaleMismatch { left: 1, right: 2 }) => {}
            other => panic!("expected ScaleMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_mult_pack_rejects_wrong_length() {
        let params = test_params();
        let ctx = params.ntt_context();
        let gadget = params.gadget();
        let mut sampler = GaussianSampler::with_seed(params.sigma, 83);
        let sk = RlweSecretKey::generate(&params, &mut sampler);
        let layout = PackingLayout::new(params.ring_dim, 2).unwrap();

        let m = Matrix::from_rows(vec![vec![1i64, 1]]).unwrap();
        let enc = EncryptedMatrix::encrypt(&sk, &m, 0, &layout, &gadget, &mut sampler, &ctx)
            .unwrap();
        let ct = RlweCiphertext::zero(params.ring_dim, params.q);
        let prepared = PreparedVector::new(&[ct], 1, &gadget, &ctx);
        assert!(enc.mult_pack(&prepared, &ctx).is_err());
        assert!(enc.expect_shape("M", 1, 2).is_ok());
        assert!(enc.expect_shape("M", 2, 1).is_err());
    }
}
