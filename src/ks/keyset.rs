//! Galois key set used by unpacking

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ControlError, Result};
use crate::math::{GaussianSampler, NttContext};
use crate::rgsw::GadgetVector;
use crate::rlwe::{automorphism_ciphertext, RlweCiphertext, RlweSecretKey};

use super::setup::{generate_automorphism_ks_matrix, KeySwitchingMatrix};
use super::switch::key_switch;

/// Evaluation keys for σ_g, g ∈ {N/2^i + 1 : 0 ≤ i < log2 N}.
///
/// This is everything the controller needs besides the encrypted matrices;
/// the set carries no secret material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaloisKeySet {
    ring_dim: usize,
    keys: BTreeMap<usize, KeySwitchingMatrix>,
}

impl GaloisKeySet {
    /// Galois elements N/2^i + 1 for every i < log2 N
    pub fn elements(ring_dim: usize) -> Vec<usize> {
        let log_n = ring_dim.trailing_zeros() as usize;
        (0..log_n).map(|i| (ring_dim >> i) + 1).collect()
    }

    pub fn generate(
        sk: &RlweSecretKey,
        gadget: &GadgetVector,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let ring_dim = sk.ring_dim();
        let keys = Self::elements(ring_dim)
            .into_iter()
            .map(|g| (g, generate_automorphism_ks_matrix(sk, g, gadget, sampler, ctx)))
            .collect();
        Self { ring_dim, keys }
    }

    pub fn ring_dim(&self) -> usize {
        self.ring_dim
    }

    pub fn contains(&self, g: usize) -> bool {
        self.keys.contains_key(&g)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn expect_gadget(&self, gadget: &GadgetVector) -> Result<()> {
        for (g, ks) in &self.keys {
            if ks.gadget != *gadget || ks.rows.len() != gadget.len {
                return Err(ControlError::InvalidParams(format!(
                    "Galois key {} has {} rows with base {}, expected {} with base {}",
                    g,
                    ks.rows.len(),
                    ks.gadget.base,
                    gadget.len,
                    gadget.base
                )));
            }
        }
        Ok(())
    }

    /// KS(σ_g(ct)): same message with X replaced by X^g, under the original key
    pub fn apply(&self, ct: &RlweCiphertext, g: usize, ctx: &NttContext) -> Result<RlweCiphertext> {
        let ks = self.keys.get(&g).ok_or_else(|| {
            ControlError::InvalidParams(format!("no Galois key for element {}", g))
        })?;
        Ok(key_switch(&automorphism_ciphertext(ct, g), ks, ctx))
    }

    /// SHA-256 over the serialized key set
    pub fn fingerprint(&self) -> Result<[u8; 32]> {
        let bytes = bincode::serialize(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let out = hasher.finalize();
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&out);
        Ok(arr)
    }
}
