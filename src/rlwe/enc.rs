//! RLWE encryption and decryption
//!
//! Implements encryption: b = -a·s + e + m, with m already carrying the
//! packing factor.

use crate::math::{GaussianSampler, ModQ, NttContext, Poly};
use crate::params::SchemeParams;

use super::types::{RlweCiphertext, RlweSecretKey};

impl RlweSecretKey {
    /// Generate a ternary secret key
    pub fn generate(params: &SchemeParams, sampler: &mut GaussianSampler) -> Self {
        Self {
            poly: Poly::sample_ternary(params.ring_dim, params.q, sampler),
        }
    }
}

impl RlweCiphertext {
    /// Encrypt a message polynomial
    ///
    /// Computes: (a, b) where b = -a·s + e + m
    ///
    /// # Arguments
    /// * `sk` - Secret key
    /// * `message` - Message polynomial, already scaled
    /// * `a_random` - Uniform polynomial a ∈ R_q
    /// * `error` - Error polynomial e sampled from Gaussian
    /// * `ctx` - NTT context for polynomial multiplication
    pub fn encrypt(
        sk: &RlweSecretKey,
        message: &Poly,
        a_random: Poly,
        error: &Poly,
        ctx: &NttContext,
    ) -> Self {
        let a_s = a_random.mul_ntt(&sk.poly, ctx);
        let b = &(&(-&a_s) + error) + message;
        Self { a: a_random, b }
    }

    /// Encrypt, drawing `a` and `e` from the sampler
    pub fn encrypt_with_sampler(
        sk: &RlweSecretKey,
        message: &Poly,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let d = message.dimension();
        let q = message.modulus();
        let a = Poly::random_with_sampler(d, q, sampler);
        let e = Poly::sample_gaussian(d, q, sampler);
        Self::encrypt(sk, message, a, &e, ctx)
    }

    /// Decryption without decoding: b + a·s = m + e
    pub fn decrypt_raw(&self, sk: &RlweSecretKey, ctx: &NttContext) -> Poly {
        let a_s = self.a.mul_ntt(&sk.poly, ctx);
        &a_s + &self.b
    }

    /// Decrypt to centred integers in [-q/2, q/2]
    pub fn decrypt_signed(&self, sk: &RlweSecretKey, ctx: &NttContext) -> Vec<i64> {
        let q = self.modulus();
        self.decrypt_raw(sk, ctx)
            .coeffs()
            .iter()
            .map(|&c| ModQ::to_signed(c, q))
            .collect()
    }

    /// Homomorphic addition: decrypts to m1 + m2
    pub fn add(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a + &other.a,
            b: &self.b + &other.b,
        }
    }

    /// In-place homomorphic addition
    pub fn add_assign(&mut self, other: &RlweCiphertext) {
        self.a += &other.a;
        self.b += &other.b;
    }

    /// Homomorphic subtraction: decrypts to m1 - m2
    pub fn sub(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a - &other.a,
            b: &self.b - &other.b,
        }
    }

    /// Multiply ciphertext by a scalar: decrypts to c·m
    pub fn scalar_mul(&self, scalar: u64) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.scalar_mul(scalar),
            b: self.b.scalar_mul(scalar),
        }
    }

    /// Multiply by X^exp: decrypts to X^exp · m
    pub fn mul_monomial(&self, exp: usize) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_monomial(exp),
            b: self.b.mul_monomial(exp),
        }
    }

    /// Encryption of zero with zero error, the identity for addition
    pub fn zero(ring_dim: usize, q: u64) -> RlweCiphertext {
        RlweCiphertext {
            a: Poly::zero(ring_dim, q),
            b: Poly::zero(ring_dim, q),
        }
    }

    /// Trivial encryption (0, m); decrypts correctly under any key
    pub fn trivial(message: &Poly) -> RlweCiphertext {
        RlweCiphertext {
            a: Poly::zero(message.dimension(), message.modulus()),
            b: message.clone(),
        }
    }
}
