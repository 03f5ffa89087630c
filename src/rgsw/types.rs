//! RGSW ciphertext and gadget types.

use crate::math::{GaussianSampler, NttContext, Poly};
use crate::rlwe::{RlweCiphertext, RlweSecretKey};
use serde::{Deserialize, Serialize};

/// Gadget vector g_z = [1, z, z², ..., z^(ℓ-1)]^T.
///
/// Decomposing a polynomial against the gadget yields ℓ pieces with
/// balanced coefficients in [−z/2, z/2], which keeps noise growth in key
/// switching and external products proportional to z rather than q.
///
/// # Example
///
/// ```
/// use encctl::rgsw::GadgetVector;
/// use encctl::math::DEFAULT_Q;
///
/// let gadget = GadgetVector::new(1 << 10, 6, DEFAULT_Q);
/// assert_eq!(gadget.powers()[1], 1024);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetVector {
    /// Gadget base z (power of two).
    pub base: u64,
    /// Number of digits ℓ = ⌈log_z(q)⌉.
    pub len: usize,
    /// Ciphertext modulus q.
    pub q: u64,
}

impl GadgetVector {
    pub fn new(base: u64, len: usize, q: u64) -> Self {
        debug_assert!(base > 1, "Gadget base must be > 1");
        debug_assert!(len > 0, "Gadget length must be > 0");
        Self { base, len, q }
    }

    /// Gadget with ℓ = ⌈log_z(q)⌉
    pub fn from_base(base: u64, q: u64) -> Self {
        let len = ((q as f64).log2() / (base as f64).log2()).ceil() as usize;
        Self::new(base, len, q)
    }

    /// All powers [1, z, z², ..., z^(ℓ-1)] mod q
    pub fn powers(&self) -> Vec<u64> {
        let mut powers = Vec::with_capacity(self.len);
        let mut current = 1u128;
        let base = self.base as u128;
        let q = self.q as u128;

        for _ in 0..self.len {
            powers.push(current as u64);
            current = (current * base) % q;
        }
        powers
    }
}

/// RGSW ciphertext: 2ℓ RLWE rows, stored in the NTT domain.
///
/// ```text
/// Row i      (i < ℓ): RLWE(0) + (μ·z^i, 0)   decrypts to μ·z^i·s
/// Row ℓ + i         : RLWE(0) + (0, μ·z^i)   decrypts to μ·z^i
/// ```
///
/// The external product RLWE(m) ⊡ RGSW(μ) yields RLWE(μ·m).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RgswCiphertext {
    /// 2ℓ RLWE ciphertexts in NTT domain
    pub rows: Vec<RlweCiphertext>,
    /// Gadget parameters
    pub gadget: GadgetVector,
}

impl RgswCiphertext {
    pub fn from_rows(rows: Vec<RlweCiphertext>, gadget: GadgetVector) -> Self {
        debug_assert_eq!(rows.len(), 2 * gadget.len, "RGSW must have 2ℓ rows");
        Self { rows, gadget }
    }

    /// Encrypt a message polynomial under the given secret key
    pub fn encrypt(
        sk: &RlweSecretKey,
        message: &Poly,
        gadget: &GadgetVector,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let d = sk.ring_dim();
        let q = sk.modulus();
        let ell = gadget.len;
        let powers = gadget.powers();
        let zero = Poly::zero(d, q);

        let mut rows = Vec::with_capacity(2 * ell);
        for half in 0..2 {
            for power in powers.iter() {
                let mut row = RlweCiphertext::encrypt_with_sampler(sk, &zero, sampler, ctx);
                let scaled_msg = message.scalar_mul(*power);
                if half == 0 {
                    row.a += &scaled_msg;
                } else {
                    row.b += &scaled_msg;
                }
                row.a.to_ntt(ctx);
                row.b.to_ntt(ctx);
                rows.push(row);
            }
        }

        Self {
            rows,
            gadget: gadget.clone(),
        }
    }

    /// Encrypt a signed scalar (constant polynomial)
    pub fn encrypt_scalar(
        sk: &RlweSecretKey,
        message: i64,
        gadget: &GadgetVector,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let mut coeffs = vec![0i64; sk.ring_dim()];
        coeffs[0] = message;
        let msg_poly = Poly::from_signed(&coeffs, sk.modulus());
        Self::encrypt(sk, &msg_poly, gadget, sampler, ctx)
    }

    pub fn ring_dim(&self) -> usize {
        self.rows[0].ring_dim()
    }

    pub fn modulus(&self) -> u64 {
        self.rows[0].modulus()
    }

    pub fn gadget_len(&self) -> usize {
        self.gadget.len
    }
}
