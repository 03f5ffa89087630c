//! Key-switching operation

use crate::math::{NttContext, Poly};
use crate::rgsw::gadget_decompose;
use crate::rlwe::RlweCiphertext;

use super::setup::KeySwitchingMatrix;

/// Apply key-switching to transform a ciphertext from key s to key s'
///
/// Given ciphertext (a, b) under key s and key-switching matrix K,
/// computes a new ciphertext (a', b') valid under key s'.
///
/// # Algorithm
///
/// 1. Decompose a using gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
/// 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]
///
/// The digits are transformed once and multiplied against the NTT-domain
/// rows; only the two accumulated components are transformed back.
pub fn key_switch(
    ct: &RlweCiphertext,
    ks_matrix: &KeySwitchingMatrix,
    ctx: &NttContext,
) -> RlweCiphertext {
    let d = ct.ring_dim();
    let q = ct.modulus();

    let mut acc_a = Poly::zero_ntt(d, q);
    let mut acc_b = Poly::zero_ntt(d, q);

    for (mut digit, row) in gadget_decompose(&ct.a, &ks_matrix.gadget)
        .into_iter()
        .zip(&ks_matrix.rows)
    {
        digit.to_ntt(ctx);
        acc_a.mul_acc_ntt_domain(&digit, &row.a, ctx);
        acc_b.mul_acc_ntt_domain(&digit, &row.b, ctx);
    }

    acc_a.from_ntt(ctx);
    acc_b.from_ntt(ctx);
    acc_b += &ct.b;

    RlweCiphertext::from_parts(acc_a, acc_b)
}
