//! External product operation: RLWE × RGSW → RLWE
//!
//! The input ciphertext is decomposed and moved into the NTT domain once
//! ([`DecomposedCiphertext`]); every RGSW ciphertext that consumes it then
//! costs only pointwise multiply-accumulates into a [`ProductAccumulator`].

use crate::math::{NttContext, Poly};
use crate::rlwe::RlweCiphertext;

use super::types::{GadgetVector, RgswCiphertext};

/// Decompose a polynomial coefficient-wise into balanced base-z digits
///
/// Each coefficient c is first centred into (−q/2, q/2], then split into
/// digits [c₀, c₁, ..., c_{ℓ-1}] in [−z/2, z/2) such that
/// c = c₀ + c₁·z + ... + c_{ℓ-1}·z^{ℓ-1}. The top digit absorbs the final
/// carry, so it may reach z/2. Digits are stored mod q and have zero mean
/// over uniform input.
pub fn gadget_decompose(poly: &Poly, gadget: &GadgetVector) -> Vec<Poly> {
    assert!(!poly.is_ntt(), "Decomposition requires coefficient domain");
    let d = poly.dimension();
    let q = poly.modulus();
    let half_q = q / 2;
    let base = gadget.base as i64;
    let half_base = base / 2;
    let ell = gadget.len;

    let mut digits = vec![vec![0u64; d]; ell];
    for (j, &c) in poly.coeffs().iter().enumerate() {
        let mut val = if c > half_q {
            c as i64 - q as i64
        } else {
            c as i64
        };
        for (i, digit) in digits.iter_mut().enumerate() {
            let di = if i + 1 == ell {
                val
            } else {
                let r = val.rem_euclid(base);
                if r >= half_base {
                    r - base
                } else {
                    r
                }
            };
            val = (val - di) / base;
            digit[j] = if di < 0 {
                q - di.unsigned_abs()
            } else {
                di as u64
            };
        }
    }

    digits
        .into_iter()
        .map(|coeffs| Poly::from_coeffs(coeffs, q))
        .collect()
}

/// Reconstruct a polynomial from its gadget decomposition
pub fn gadget_reconstruct(decomposed: &[Poly], gadget: &GadgetVector) -> Poly {
    assert_eq!(
        decomposed.len(),
        gadget.len,
        "Decomposition length must match gadget length"
    );

    let mut result = Poly::zero(decomposed[0].dimension(), decomposed[0].modulus());
    for (poly, power) in decomposed.iter().zip(gadget.powers()) {
        result += &poly.scalar_mul(power);
    }
    result
}

/// Gadget digits of both ciphertext components, in the NTT domain.
#[derive(Clone, Debug)]
pub struct DecomposedCiphertext {
    pub a_digits: Vec<Poly>,
    pub b_digits: Vec<Poly>,
}

impl DecomposedCiphertext {
    pub fn new(ct: &RlweCiphertext, gadget: &GadgetVector, ctx: &NttContext) -> Self {
        let to_ntt = |digits: Vec<Poly>| -> Vec<Poly> {
            digits
                .into_iter()
                .map(|mut p| {
                    p.to_ntt(ctx);
                    p
                })
                .collect()
        };

        Self {
            a_digits: to_ntt(gadget_decompose(&ct.a, gadget)),
            b_digits: to_ntt(gadget_decompose(&ct.b, gadget)),
        }
    }

    pub fn gadget_len(&self) -> usize {
        self.a_digits.len()
    }
}

/// Running NTT-domain sum of external products.
#[derive(Clone, Debug)]
pub struct ProductAccumulator {
    a: Poly,
    b: Poly,
}

impl ProductAccumulator {
    pub fn new(ring_dim: usize, q: u64) -> Self {
        Self {
            a: Poly::zero_ntt(ring_dim, q),
            b: Poly::zero_ntt(ring_dim, q),
        }
    }

    /// self += RLWE(m) ⊡ RGSW(μ)
    pub fn add_product(
        &mut self,
        input: &DecomposedCiphertext,
        rgsw: &RgswCiphertext,
        ctx: &NttContext,
    ) {
        let ell = rgsw.gadget.len;
        assert_eq!(rgsw.rows.len(), 2 * ell, "RGSW must have 2ℓ rows");
        assert_eq!(input.gadget_len(), ell, "Gadget length mismatch");

        for i in 0..ell {
            let row_a = &rgsw.rows[i];
            self.a.mul_acc_ntt_domain(&input.a_digits[i], &row_a.a, ctx);
            self.b.mul_acc_ntt_domain(&input.a_digits[i], &row_a.b, ctx);

            let row_b = &rgsw.rows[ell + i];
            self.a.mul_acc_ntt_domain(&input.b_digits[i], &row_b.a, ctx);
            self.b.mul_acc_ntt_domain(&input.b_digits[i], &row_b.b, ctx);
        }
    }

    /// Back to a coefficient-domain ciphertext
    pub fn finish(mut self, ctx: &NttContext) -> RlweCiphertext {
        self.a.from_ntt(ctx);
        self.b.from_ntt(ctx);
        RlweCiphertext::from_parts(self.a, self.b)
    }
}

/// Compute the external product: RLWE(m₀) ⊡ RGSW(m₁) → RLWE(m₀·m₁)
///
/// # Algorithm
///
/// Given RLWE ciphertext (a, b) and RGSW ciphertext C:
/// 1. Decompose a and b using gadget inverse: g⁻¹(a), g⁻¹(b)
/// 2. Compute: (a', b') = Σᵢ [g⁻¹(a)ᵢ · C[i] + g⁻¹(b)ᵢ · C[ℓ+i]]
pub fn external_product(
    rlwe: &RlweCiphertext,
    rgsw: &RgswCiphertext,
    ctx: &NttContext,
) -> RlweCiphertext {
    let decomposed = DecomposedCiphertext::new(rlwe, &rgsw.gadget, ctx);
    let mut acc = ProductAccumulator::new(rlwe.ring_dim(), rlwe.modulus());
    acc.add_product(&decomposed, rgsw, ctx);
    acc.finish(ctx)
}
