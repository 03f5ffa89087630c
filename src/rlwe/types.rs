//! RLWE ciphertext and key types.
//!
//! Ring-LWE over R_q = Z_q[X]/(X^N + 1).

use crate::error::{ControlError, Result};
use crate::math::Poly;
use serde::{Deserialize, Serialize};

/// RLWE secret key: ternary polynomial in R_q.
///
/// Only the plant and the offline setup ever hold one; the controller works
/// with evaluation keys alone.
///
/// # Example
///
/// ```
/// use encctl::rlwe::RlweSecretKey;
/// use encctl::math::{Poly, DEFAULT_Q};
///
/// let sk = RlweSecretKey::from_poly(Poly::zero(256, DEFAULT_Q));
/// assert_eq!(sk.ring_dim(), 256);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct RlweSecretKey {
    /// Secret polynomial in R_q.
    pub poly: Poly,
}

/// RLWE ciphertext: (a, b) ∈ R_q × R_q where b = -a·s + e + m.
///
/// Messages are integers already multiplied by the packing factor, so
/// decryption `b + a·s = m + e` needs no rounding division; the caller
/// rescales the centred result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    /// Random polynomial in R_q.
    pub a: Poly,
    /// Encrypted polynomial: b = -a·s + e + m.
    pub b: Poly,
}

impl RlweSecretKey {
    pub fn from_poly(poly: Poly) -> Self {
        Self { poly }
    }

    pub fn ring_dim(&self) -> usize {
        self.poly.dimension()
    }

    pub fn modulus(&self) -> u64 {
        self.poly.modulus()
    }
}

impl std::fmt::Debug for RlweSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RlweSecretKey")
            .field("ring_dim", &self.ring_dim())
            .finish_non_exhaustive()
    }
}

impl RlweCiphertext {
    /// Creates a ciphertext from component polynomials.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `a` and `b` have the same dimension and modulus.
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(
            a.dimension(),
            b.dimension(),
            "Ciphertext polynomials must have same dimension"
        );
        debug_assert_eq!(
            a.modulus(),
            b.modulus(),
            "Ciphertext polynomials must have same modulus"
        );
        Self { a, b }
    }

    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    pub fn modulus(&self) -> u64 {
        self.a.modulus()
    }

    /// Checks that a ciphertext built outside this process fits the ring.
    ///
    /// Both components need N coefficients below `q`, modulus `q`, and the
    /// coefficient domain. Arithmetic on a ciphertext that fails this check
    /// would trip the NTT and polynomial assertions.
    pub fn check_ring(&self, ring_dim: usize, q: u64) -> Result<()> {
        for (name, poly) in [("a", &self.a), ("b", &self.b)] {
            if poly.dimension() != ring_dim {
                return Err(ControlError::Dimension(format!(
                    "ciphertext component {} has {} coefficients, expected {}",
                    name,
                    poly.dimension(),
                    ring_dim
                )));
            }
            if poly.modulus() != q {
                return Err(ControlError::Frame(format!(
                    "ciphertext component {} is modulo {}, expected {}",
                    name,
                    poly.modulus(),
                    q
                )));
            }
            if poly.is_ntt() {
                return Err(ControlError::Frame(format!(
                    "ciphertext component {} is in the NTT domain",
                    name
                )));
            }
            if poly.coeffs().iter().any(|&c| c >= q) {
                return Err(ControlError::Frame(format!(
                    "ciphertext component {} has a coefficient outside [0, q)",
                    name
                )));
            }
        }
        Ok(())
    }
}
