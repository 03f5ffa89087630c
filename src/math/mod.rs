//! Mathematical primitives for the encrypted controller.
//!
//! - **Modular arithmetic** over Z_q
//! - **Number-Theoretic Transform (NTT)** with Montgomery multiplication
//! - **Polynomial operations** over R_q = Z_q[X]/(X^N + 1)
//! - **Discrete Gaussian sampling** for error and secret terms
//! - **Plaintext matrices** for controller definitions
//!
//! # Example
//!
//! ```
//! use encctl::math::{GaussianSampler, NttContext, Poly};
//!
//! let ctx = NttContext::with_default_q(256);
//! let mut sampler = GaussianSampler::with_seed(3.2, 1);
//! let mut poly = Poly::random_with_sampler(256, ctx.modulus(), &mut sampler);
//! poly.to_ntt(&ctx);
//! ```

pub mod gaussian;
pub mod matrix;
pub mod modular;
pub mod ntt;
pub mod poly;

pub use gaussian::GaussianSampler;
pub use matrix::Matrix;
pub use modular::ModQ;
pub use ntt::NttContext;
pub use poly::Poly;

/// Default ciphertext modulus: q = 2^60 - 2^14 + 1 (NTT-friendly up to N = 8192)
pub const DEFAULT_Q: u64 = 1152921504606830593;
