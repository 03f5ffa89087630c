//! RGSW (Ring-GSW) encryption module
//!
//! RGSW ciphertexts hold the controller matrix columns. Multiplying an
//! encrypted state or measurement scalar by a column is one external
//! product, RLWE(m) ⊡ RGSW(μ) → RLWE(μ·m), with noise growing additively in
//! the gadget base rather than multiplicatively in q.
//!
//! # Example
//!
//! ```
//! use encctl::math::{GaussianSampler, Poly};
//! use encctl::params::SchemeParams;
//! use encctl::rgsw::{external_product, RgswCiphertext};
//! use encctl::rlwe::{RlweCiphertext, RlweSecretKey};
//!
//! let params = SchemeParams::insecure_d256();
//! let ctx = params.ntt_context();
//! let mut sampler = GaussianSampler::with_seed(params.sigma, 1);
//! let sk = RlweSecretKey::generate(&params, &mut sampler);
//!
//! let msg = Poly::constant(1 << 40, params.ring_dim, params.q);
//! let ct = RlweCiphertext::encrypt_with_sampler(&sk, &msg, &mut sampler, &ctx);
//! let three = RgswCiphertext::encrypt_scalar(&sk, 3, &params.gadget(), &mut sampler, &ctx);
//!
//! let product = external_product(&ct, &three, &ctx).decrypt_signed(&sk, &ctx);
//! assert!((product[0] - 3 * (1i64 << 40)).abs() < 1 << 22);
//! ```

mod external_product;
mod types;

pub use external_product::{
    external_product, gadget_decompose, gadget_reconstruct, DecomposedCiphertext,
    ProductAccumulator,
};
pub use types::{GadgetVector, RgswCiphertext};
