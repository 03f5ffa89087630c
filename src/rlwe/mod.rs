//! RLWE (Ring Learning With Errors) encryption module
//!
//! This module implements RLWE encryption over the ring R_q = Z_q[X]/(X^N + 1).
//!
//! # Overview
//!
//! - Secret key s is a ternary polynomial
//! - Ciphertext (a, b) encrypts message m as b = -a·s + e + m
//! - Messages carry the packing factor 1/L; there is no Δ = q/p rounding
//!
//! # Galois Automorphisms
//!
//! Automorphisms σ_g(X) = X^g, followed by key switching, drive the
//! unpacking of packed measurement and state vectors.
//!
//! # Example
//!
//! ```
//! use encctl::math::{GaussianSampler, Poly};
//! use encctl::params::SchemeParams;
//! use encctl::rlwe::{RlweCiphertext, RlweSecretKey};
//!
//! let params = SchemeParams::insecure_d256();
//! let ctx = params.ntt_context();
//! let mut sampler = GaussianSampler::with_seed(params.sigma, 7);
//!
//! let sk = RlweSecretKey::generate(&params, &mut sampler);
//! let message = Poly::constant(1_000_000, params.ring_dim, params.q);
//! let ct = RlweCiphertext::encrypt_with_sampler(&sk, &message, &mut sampler, &ctx);
//! let decrypted = ct.decrypt_signed(&sk, &ctx);
//! assert!((decrypted[0] - 1_000_000).abs() < 32);
//! ```

mod enc;
mod galois;
mod types;

pub use galois::{
    apply_automorphism, automorphism_ciphertext, compose_automorphisms, is_valid_galois_element,
};
pub use types::{RlweCiphertext, RlweSecretKey};
