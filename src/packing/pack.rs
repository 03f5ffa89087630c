//! Packing a quantized vector into one RLWE ciphertext

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::math::{GaussianSampler, ModQ, NttContext, Poly};
use crate::rlwe::{RlweCiphertext, RlweSecretKey};

use super::layout::PackingLayout;

/// An RLWE ciphertext holding `slots` values in the packing layout, tagged
/// with the power of `s` its values are scaled by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedCiphertext {
    pub ct: RlweCiphertext,
    pub slots: usize,
    pub s_power: u32,
}

impl PackedCiphertext {
    pub fn new(ct: RlweCiphertext, slots: usize, s_power: u32) -> Self {
        Self { ct, slots, s_power }
    }

    pub fn ring_dim(&self) -> usize {
        self.ct.ring_dim()
    }
}

/// Message polynomial with `factor · v_j` at the coefficient of slot j.
///
/// Every scaled value must have magnitude below q/2.
pub fn pack(values: &[i64], layout: &PackingLayout, factor: u64, q: u64) -> Result<Poly> {
    layout.check_count(values.len())?;

    let half_q = (q / 2) as i128;
    let mut msg = Poly::zero(layout.ring_dim(), q);
    for (j, &v) in values.iter().enumerate() {
        let scaled = v as i128 * factor as i128;
        if scaled.abs() >= half_q {
            return Err(ControlError::InvalidParams(format!(
                "slot {} value {} scaled by {} exceeds q/2",
                j, v, factor
            )));
        }
        msg.set_coeff(layout.slot_index(j), ModQ::from_wide(scaled, q));
    }
    Ok(msg)
}

/// Fresh encryption of a packed vector
pub fn encrypt_packed(
    sk: &RlweSecretKey,
    values: &[i64],
    layout: &PackingLayout,
    factor: u64,
    s_power: u32,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> Result<PackedCiphertext> {
    let msg = pack(values, layout, factor, sk.modulus())?;
    let ct = RlweCiphertext::encrypt_with_sampler(sk, &msg, sampler, ctx);
    Ok(PackedCiphertext::new(ct, values.len(), s_power))
}

/// Signed slot coefficients of a decrypted packed ciphertext.
///
/// The result still carries the packing factor and noise; divide by the
/// factor (or multiply by the full rescale) to decode.
pub fn decrypt_slots(
    sk: &RlweSecretKey,
    packed: &PackedCiphertext,
    layout: &PackingLayout,
    ctx: &NttContext,
) -> Result<Vec<i64>> {
    layout.check_count(packed.slots)?;
    packed.ct.check_ring(layout.ring_dim(), ctx.modulus())?;
    let q = packed.ct.modulus();
    let phase = packed.ct.decrypt_raw(sk, ctx);
    Ok((0..packed.slots)
        .map(|j| ModQ::to_signed(phase.coeff(layout.slot_index(j)), q))
        .collect())
}

/// Constant coefficient of each unpacked ciphertext
pub fn decrypt_unpack(sk: &RlweSecretKey, cts: &[RlweCiphertext], ctx: &NttContext) -> Vec<i64> {
    cts.iter()
        .map(|ct| ModQ::to_signed(ct.decrypt_raw(sk, ctx).coeff(0), ct.modulus()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SchemeParams;

    #[test]
    fn test_pack_places_slots() {
        let q = 97 * 512 + 1;
        let layout = PackingLayout::new(16, 4).unwrap();
        let msg = pack(&[1, -2, 3], &layout, 10, q).unwrap();

        assert_eq!(msg.coeff(0), 10);
        assert_eq!(msg.coeff(8), q - 20);
        assert_eq!(msg.coeff(4), 30);
        assert_eq!(msg.coeff(12), 0);
        assert_eq!(msg.coeffs().iter().filter(|&&c| c != 0).count(), 3);
    }

    #[test]
    fn test_pack_rejects_overflow() {
        let params = SchemeParams::insecure_d256();
        let layout = PackingLayout::new(params.ring_dim, 4).unwrap();
        let factor = 1_000_000_000u64;

        assert!(pack(&[576_460_752], &layout, factor, params.q).is_ok());
        assert!(pack(&[0, -576_460_753], &layout, factor, params.q).is_err());
        assert!(pack(&[i64::MAX], &layout, factor, params.q).is_err());
        assert!(pack(&[1, 2, 3, 4, 5], &layout, 1, params.q).is_err());
    }

    #[test]
    fn test_encrypt_decrypt_slots() {
        let params = SchemeParams::insecure_d256();
        let ctx = params.ntt_context();
        let mut sampler = GaussianSampler::with_seed(params.sigma, 61);
        let sk = RlweSecretKey::generate(&params, &mut sampler);
        let layout = PackingLayout::new(params.ring_dim, 4).unwrap();

        let values = [5, -7, 0, 123_456];
        let packed =
            encrypt_packed(&sk, &values, &layout, 1 << 20, 1, &mut sampler, &ctx).unwrap();
        assert_eq!(packed.slots, 4);
        assert_eq!(packed.s_power, 1);

        let raw = decrypt_slots(&sk, &packed, &layout, &ctx).unwrap();
        for (r, v) in raw.iter().zip(&values) {
            assert!((r - (v << 20)).abs() < 100, "{} vs {}", r, v << 20);
        }
    }

    #[test]
    fn test_decrypt_slots_rejects_malformed_ciphertext() {
        let params = SchemeParams::insecure_d256();
        let ctx = params.ntt_context();
        let mut sampler = GaussianSampler::with_seed(params.sigma, 62);
        let sk = RlweSecretKey::generate(&params, &mut sampler);
        let layout = PackingLayout::new(params.ring_dim, 2).unwrap();
        let packed = encrypt_packed(&sk, &[1, 2], &layout, 1 << 20, 0, &mut sampler, &ctx).unwrap();

        let mut short = packed.clone();
        short.ct.a = Poly::from_coeffs(short.ct.a.coeffs()[..128].to_vec(), params.q);
        assert!(matches!(
            decrypt_slots(&sk, &short, &layout, &ctx),
            Err(ControlError::Dimension(_))
        ));

        let mut transformed = packed;
        transformed.ct.b.to_ntt(&ctx);
        assert!(matches!(
            decrypt_slots(&sk, &transformed, &layout, &ctx),
            Err(ControlError::Frame(_))
        ));
    }
}
