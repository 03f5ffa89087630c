//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Implements Cooley-Tukey radix-2 NTT for negacyclic convolution over
//! R_q = Z_q[X]/(X^d + 1).
//!
//! # Theory
//!
//! For negacyclic convolution (multiplication modulo X^n + 1), we use a
//! primitive 2n-th root of unity ψ where ψ^n = -1. The NTT evaluates a
//! polynomial at odd powers of ψ, enabling pointwise multiplication in the
//! evaluation domain.
//!
//! Values in the evaluation domain are kept in Montgomery form, so products
//! of two transformed polynomials stay in Montgomery form and `inverse`
//! returns plain coefficients.
//!
//! # Requirements
//!
//! The modulus q must satisfy q ≡ 1 (mod 2n) and q < 2^62. The default
//! modulus `DEFAULT_Q` supports n up to 4096.
//!
//! # Example
//!
//! ```
//! use encctl::math::NttContext;
//!
//! let ctx = NttContext::with_default_q(256);
//!
//! let mut coeffs = vec![1u64; 256];
//! ctx.forward(&mut coeffs);
//! ctx.inverse(&mut coeffs);
//! assert_eq!(coeffs[0], 1);
//! ```

use super::DEFAULT_Q;

/// Precomputed NTT context with twiddle factors.
///
/// Create once per session and share it (it is `Sync`) between the plant
/// codec, the controller and every ciphertext operation.
#[derive(Clone)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// Modulus.
    q: u64,
    /// -q^(-1) mod 2^64.
    q_inv_neg: u64,
    /// 2^128 mod q, for conversion into Montgomery form.
    r_squared: u64,
    /// Forward twiddle factors (powers of ψ) in bit-reversed order.
    psi_powers: Vec<u64>,
    /// Inverse twiddle factors (powers of ψ^(-1)) in bit-reversed order.
    psi_inv_powers: Vec<u64>,
    /// n^(-1) mod q in Montgomery form.
    n_inv: u64,
}

impl std::fmt::Debug for NttContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NttContext")
            .field("n", &self.n)
            .field("q", &self.q)
            .finish()
    }
}

impl NttContext {
    /// Creates an NTT context for the given dimension and modulus.
    ///
    /// # Arguments
    ///
    /// * `n` - Ring dimension (must be a power of two)
    /// * `q` - Modulus (must satisfy q ≡ 1 mod 2n)
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or `q` does not satisfy
    /// q ≡ 1 (mod 2n). `SchemeParams::validate` checks both up front.
    pub fn new(n: usize, q: u64) -> Self {
        assert!(n.is_power_of_two(), "n must be a power of two");
        assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");
        assert!(q < (1u64 << 62), "q must be below 2^62");

        let q_inv_neg = Self::compute_q_inv_neg(q);
        let r_squared = Self::compute_r_squared(q);

        let psi = Self::find_primitive_root(2 * n as u64, q);
        let psi_mont = Self::to_montgomery(psi, q, r_squared, q_inv_neg);
        let psi_powers = Self::compute_twiddle_factors(n, psi_mont, q, q_inv_neg, r_squared);

        let psi_inv = Self::mod_pow(psi, q - 2, q);
        let psi_inv_mont = Self::to_montgomery(psi_inv, q, r_squared, q_inv_neg);
        let psi_inv_powers =
            Self::compute_twiddle_factors(n, psi_inv_mont, q, q_inv_neg, r_squared);

        let n_inv_val = Self::mod_pow(n as u64, q - 2, q);
        let n_inv = Self::to_montgomery(n_inv_val, q, r_squared, q_inv_neg);

        Self {
            n,
            q,
            q_inv_neg,
            r_squared,
            psi_powers,
            psi_inv_powers,
            n_inv,
        }
    }

    /// Creates an NTT context with the default modulus.
    pub fn with_default_q(n: usize) -> Self {
        Self::new(n, DEFAULT_Q)
    }

    /// Returns the ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Returns the modulus q.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Performs forward NTT in-place using Cooley-Tukey decimation-in-time.
    ///
    /// Input coefficients are converted to Montgomery form first.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n`.
    pub fn forward(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "Input length must match dimension");

        for c in coeffs.iter_mut() {
            *c = Self::to_montgomery(*c, self.q, self.r_squared, self.q_inv_neg);
        }

        let n = self.n;
        let q = self.q;
        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = self.psi_powers[m + i];

                for j in j1..(j1 + t) {
                    let u = coeffs[j];
                    let v = self.montgomery_mul(coeffs[j + t], w);

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    /// Performs inverse NTT in-place using Gentleman-Sande decimation-in-frequency.
    ///
    /// Output is converted back from Montgomery form.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n`.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "Input length must match dimension");

        let n = self.n;
        let q = self.q;
        let mut t = 1;
        let mut m = n;

        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j1 = i * 2 * t;
                let w = self.psi_inv_powers[m + i];

                for j in j1..(j1 + t) {
                    let u = coeffs[j];
                    let v = coeffs[j + t];

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.montgomery_mul(diff, w);
                }
            }
            t <<= 1;
        }

        // n^(-1) scaling and Montgomery exit in one pass: mont(mont(c, n_inv), 1)
        for c in coeffs.iter_mut() {
            let scaled = self.montgomery_mul(*c, self.n_inv);
            *c = self.montgomery_mul(scaled, 1);
        }
    }

    /// Performs pointwise multiplication in NTT domain.
    ///
    /// # Panics
    ///
    /// Panics if any slice length differs from n.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        assert_eq!(a.len(), self.n, "Input length must match dimension");
        assert_eq!(b.len(), self.n, "Input length must match dimension");
        assert_eq!(result.len(), self.n, "Output length must match dimension");

        for i in 0..self.n {
            result[i] = self.montgomery_mul(a[i], b[i]);
        }
    }

    /// Fused pointwise multiply-accumulate: `acc += a ∘ b`.
    pub fn pointwise_mul_acc(&self, acc: &mut [u64], a: &[u64], b: &[u64]) {
        assert_eq!(acc.len(), self.n, "Accumulator length must match dimension");
        assert_eq!(a.len(), self.n, "Input length must match dimension");
        assert_eq!(b.len(), self.n, "Input length must match dimension");

        let q = self.q;
        for i in 0..self.n {
            let sum = acc[i] + self.montgomery_mul(a[i], b[i]);
            acc[i] = if sum >= q { sum - q } else { sum };
        }
    }

    #[inline]
    fn montgomery_mul(&self, a: u64, b: u64) -> u64 {
        let q = self.q;
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(self.q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (r_squared as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result = 1u64;
        base %= m;
        while exp > 0 {
            if exp & 1 == 1 {
                result = ((result as u128 * base as u128) % m as u128) as u64;
            }
            exp >>= 1;
            base = ((base as u128 * base as u128) % m as u128) as u64;
        }
        result
    }

    /// Find a primitive n-th root of unity modulo q
    fn find_primitive_root(n: u64, q: u64) -> u64 {
        let exp = (q - 1) / n;

        for g in 2..q {
            let candidate = Self::mod_pow(g, exp, q);
            if Self::mod_pow(candidate, n / 2, q) != 1 {
                return candidate;
            }
        }
        panic!("No primitive root found (should not happen for valid parameters)");
    }

    /// Twiddle factors ψ^(bitrev(m)) for m in 1..n, in Montgomery form
    fn compute_twiddle_factors(
        n: usize,
        psi: u64,
        q: u64,
        q_inv_neg: u64,
        r_squared: u64,
    ) -> Vec<u64> {
        let mont_mul = |a: u64, b: u64| -> u64 {
            let ab = (a as u128) * (b as u128);
            let mm = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
            let t = ((ab + mm * (q as u128)) >> 64) as u64;
            if t >= q {
                t - q
            } else {
                t
            }
        };

        let mut factors = vec![0u64; n];
        let one = Self::to_montgomery(1, q, r_squared, q_inv_neg);

        for m in 1..n {
            if m.is_power_of_two() {
                // bitrev(m) for m = 2^k is n / (2m)
                let exp = n / (2 * m);
                let mut pow = one;
                for _ in 0..exp {
                    pow = mont_mul(pow, psi);
                }
                factors[m] = pow;
            } else {
                // bit reversal is additive over disjoint bits
                let prev_idx = m & (m - 1);
                let step_idx = m & (!m + 1);
                factors[m] = mont_mul(factors[prev_idx], factors[step_idx]);
            }
        }

        factors
    }
}
