//! Key-switching matrix generation

use crate::math::{GaussianSampler, NttContext};
use crate::rgsw::GadgetVector;
use crate::rlwe::{apply_automorphism, RlweCiphertext, RlweSecretKey};
use serde::{Deserialize, Serialize};

/// Key-switching matrix from secret key s to secret key s'
///
/// The matrix consists of ℓ RLWE ciphertexts encrypting s·z^i under s':
/// ```text
/// K[i] = RLWE_{s'}(s·z^i) = (a_i, -a_i·s' + e_i + s·z^i)
/// ```
///
/// Rows are stored in the NTT domain so switching costs one forward
/// transform per digit and two inverse transforms in total.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeySwitchingMatrix {
    /// ℓ RLWE ciphertexts (NTT domain)
    pub rows: Vec<RlweCiphertext>,
    /// Gadget parameters
    pub gadget: GadgetVector,
}

impl KeySwitchingMatrix {
    pub fn from_rows(rows: Vec<RlweCiphertext>, gadget: GadgetVector) -> Self {
        debug_assert_eq!(rows.len(), gadget.len, "KS matrix must have ℓ rows");
        Self { rows, gadget }
    }

    pub fn ring_dim(&self) -> usize {
        self.rows[0].ring_dim()
    }

    pub fn modulus(&self) -> u64 {
        self.rows[0].modulus()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Generate a key-switching matrix from secret key s to secret key s'
///
/// # Arguments
/// * `from_key` - Source secret key s
/// * `to_key` - Target secret key s'
/// * `gadget` - Gadget vector parameters
/// * `sampler` - Gaussian sampler for `a` and error
/// * `ctx` - NTT context
pub fn generate_ks_matrix(
    from_key: &RlweSecretKey,
    to_key: &RlweSecretKey,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    debug_assert_eq!(
        from_key.ring_dim(),
        to_key.ring_dim(),
        "Keys must have same ring dimension"
    );

    let rows = gadget
        .powers()
        .into_iter()
        .map(|power| {
            let s_scaled = from_key.poly.scalar_mul(power);
            let mut row = RlweCiphertext::encrypt_with_sampler(to_key, &s_scaled, sampler, ctx);
            row.a.to_ntt(ctx);
            row.b.to_ntt(ctx);
            row
        })
        .collect();

    KeySwitchingMatrix {
        rows,
        gadget: gadget.clone(),
    }
}

/// Generate a key-switching matrix for automorphism σ_g, from σ_g(s) to s.
pub fn generate_automorphism_ks_matrix(
    sk: &RlweSecretKey,
    g: usize,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    let auto_s = RlweSecretKey::from_poly(apply_automorphism(&sk.poly, g));
    generate_ks_matrix(&auto_s, sk, gadget, sampler, ctx)
}
