//! Homomorphic unpacking of a packed ciphertext into per-slot ciphertexts
//!
//! # Algorithm
//!
//! 1. Multiply by N⁻¹ mod q; every later stage doubles the slot content.
//! 2. Trace down to the sub-ring Y = X^stride: for each of the log2(stride)
//!    elements g = N/2^k + 1, c ← c + KS(σ_g(c)). This clears every
//!    coefficient that is not a multiple of the stride.
//! 3. Split log2(τ) times. At stage i with g = τ/2^i + 1 and
//!    shift = stride·2^i:
//!    - even = c + KS(σ_g(c)) keeps slots whose Y-exponent has bit i clear
//!    - odd = (c − KS(σ_g(c)))·X^(−shift) keeps the others, shifted down
//!
//! Storing the halves interleaved (even at 2t, odd at 2t+1) leaves slot j
//! in output j, at coefficient 0, thanks to the bit-reversed layout.

use tracing::debug;

use crate::error::{ControlError, Result};
use crate::ks::GaloisKeySet;
use crate::math::{ModQ, NttContext};
use crate::rlwe::RlweCiphertext;

use super::layout::PackingLayout;
use super::pack::PackedCiphertext;

/// Expand `packed` into `count` ciphertexts, output t holding slot t as its
/// constant coefficient. The scale tag is unchanged.
pub fn unpack(
    packed: &PackedCiphertext,
    count: usize,
    layout: &PackingLayout,
    keys: &GaloisKeySet,
    ctx: &NttContext,
) -> Result<Vec<RlweCiphertext>> {
    layout.check_count(count)?;
    if count == 0 {
        return Ok(Vec::new());
    }
    if keys.ring_dim() != layout.ring_dim() {
        return Err(ControlError::Dimension(format!(
            "Galois keys are for ring {}, layout is for ring {}",
            keys.ring_dim(),
            layout.ring_dim()
        )));
    }
    packed.ct.check_ring(layout.ring_dim(), ctx.modulus())?;

    let n = layout.ring_dim();
    let q = packed.ct.modulus();
    let n_inv = ModQ::inverse(n as u64 % q, q).ok_or_else(|| {
        ControlError::InvalidParams(format!("ring dimension {} not invertible mod q", n))
    })?;

    let mut c = packed.ct.scalar_mul(n_inv);
    for g in layout.trace_elements() {
        let rotated = keys.apply(&c, g, ctx)?;
        c.add_assign(&rotated);
    }

    let log_tau = layout.log_tau();
    let two_n = 2 * n;
    let mut level = vec![c];

    for i in 0..log_tau {
        let (g, shift) = layout.split_stage(i);
        let mut next = Vec::with_capacity(level.len() * 2);
        for ct in &level {
            let rotated = keys.apply(ct, g, ctx)?;
            next.push(ct.add(&rotated));
            next.push(ct.sub(&rotated).mul_monomial(two_n - shift));
        }

        let remaining = log_tau - i - 1;
        let keep = count.div_ceil(1 << remaining);
        next.truncate(keep);
        level = next;
    }

    debug!(count, tau = layout.tau(), "unpacked ciphertext");
    Ok(level)
}
