//! Polynomial operations over R_q = Z_q[X]/(X^N + 1).
//!
//! Polynomials live either in the coefficient domain or in the NTT
//! (Montgomery) domain. Key-switching and RGSW rows are kept in the NTT
//! domain; ciphertext components travel in the coefficient domain.
//!
//! # Example
//!
//! ```
//! use encctl::math::{NttContext, Poly, DEFAULT_Q};
//!
//! let ctx = NttContext::with_default_q(256);
//! let a = Poly::constant(3, 256, DEFAULT_Q);
//! let b = Poly::constant(5, 256, DEFAULT_Q);
//! assert_eq!(a.mul_ntt(&b, &ctx).coeff(0), 15);
//! ```

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::gaussian::GaussianSampler;
use super::modular::ModQ;
use super::ntt::NttContext;

/// Polynomial in R_q = Z_q[X]/(X^N + 1).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly {
    /// Coefficients in coefficient or NTT domain.
    coeffs: Vec<u64>,
    /// Modulus q.
    q: u64,
    /// Whether coefficients are in NTT domain.
    is_ntt: bool,
}

impl Poly {
    /// Zero polynomial
    pub fn zero(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            is_ntt: false,
        }
    }

    /// Zero polynomial tagged as NTT domain (the transform fixes zero)
    pub fn zero_ntt(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            is_ntt: true,
        }
    }

    /// Create polynomial from coefficient vector, reducing mod q
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let mut p = Self {
            coeffs,
            q,
            is_ntt: false,
        };
        p.reduce();
        p
    }

    /// Create polynomial from signed coefficients
    pub fn from_signed(values: &[i64], q: u64) -> Self {
        Self {
            coeffs: values.iter().map(|&v| ModQ::from_signed(v, q)).collect(),
            q,
            is_ntt: false,
        }
    }

    /// Constant polynomial `value`
    pub fn constant(value: u64, dim: usize, q: u64) -> Self {
        let mut coeffs = vec![0; dim];
        coeffs[0] = value % q;
        Self {
            coeffs,
            q,
            is_ntt: false,
        }
    }

    /// Uniformly random polynomial drawn from the sampler's stream
    pub fn random_with_sampler(dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.uniform_vec(dim, q),
            q,
            is_ntt: false,
        }
    }

    /// Polynomial with discrete Gaussian coefficients
    pub fn sample_gaussian(dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.sample_vec_centered(dim, q),
            q,
            is_ntt: false,
        }
    }

    /// Polynomial with uniform ternary coefficients
    pub fn sample_ternary(dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.sample_ternary_vec(dim, q),
            q,
            is_ntt: false,
        }
    }

    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    pub fn modulus(&self) -> u64 {
        self.q
    }

    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    #[inline]
    pub fn coeff(&self, i: usize) -> u64 {
        self.coeffs[i]
    }

    #[inline]
    pub fn set_coeff(&mut self, i: usize, value: u64) {
        self.coeffs[i] = value % self.q;
    }

    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    fn reduce(&mut self) {
        for c in &mut self.coeffs {
            *c %= self.q;
        }
    }

    /// Convert to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Copy in NTT domain
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Scalar multiplication (valid in either domain)
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let scalar = scalar % self.q;
        Self {
            coeffs: self
                .coeffs
                .iter()
                .map(|&c| ModQ::mul(c, scalar, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }

    /// Polynomial multiplication using NTT (negacyclic for X^N + 1)
    pub fn mul_ntt(&self, other: &Self, ctx: &NttContext) -> Self {
        assert_eq!(self.q, other.q, "Moduli must match");
        assert_eq!(
            self.coeffs.len(),
            other.coeffs.len(),
            "Dimensions must match"
        );

        let a = self.to_ntt_new(ctx);
        let b = other.to_ntt_new(ctx);
        let mut poly = a.mul_ntt_domain(&b, ctx);
        poly.from_ntt(ctx);
        poly
    }

    /// Pointwise product of two NTT-domain polynomials
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        assert_eq!(self.q, other.q, "Moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);

        Self {
            coeffs: result,
            q: self.q,
            is_ntt: true,
        }
    }

    /// In-place multiply-accumulate in NTT domain: self += a * b
    pub fn mul_acc_ntt_domain(&mut self, a: &Self, b: &Self, ctx: &NttContext) {
        assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "All polynomials must be in NTT domain"
        );
        assert_eq!(self.q, a.q, "Moduli must match");
        assert_eq!(self.q, b.q, "Moduli must match");

        ctx.pointwise_mul_acc(&mut self.coeffs, &a.coeffs, &b.coeffs);
    }

    /// Multiply by the monomial X^exp in R_q.
    ///
    /// `exp` is taken mod 2N; since X^N = -1, exponents in [N, 2N) flip
    /// the sign of every wrapped coefficient.
    pub fn mul_monomial(&self, exp: usize) -> Self {
        assert!(!self.is_ntt, "Monomial shift requires coefficient domain");
        let n = self.coeffs.len();
        let exp = exp % (2 * n);
        let mut out = vec![0u64; n];

        for (i, &c) in self.coeffs.iter().enumerate() {
            let target = i + exp;
            let wraps = (target / n) % 2 == 1;
            let idx = target % n;
            out[idx] = if wraps { ModQ::negate(c, self.q) } else { c };
        }

        Self {
            coeffs: out,
            q: self.q,
            is_ntt: false,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Largest centered coefficient magnitude
    pub fn linf_norm(&self) -> u64 {
        let half = self.q / 2;
        self.coeffs
            .iter()
            .map(|&c| if c > half { self.q - c } else { c })
            .max()
            .unwrap_or(0)
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "Domains must match");
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .zip(&rhs.coeffs)
                .map(|(&a, &b)| ModQ::add(a, b, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Poly) {
        assert_eq!(self.is_ntt, rhs.is_ntt, "Domains must match");
        let q = self.q;
        for (a, &b) in self.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a = ModQ::add(*a, b, q);
        }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "Domains must match");
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .zip(&rhs.coeffs)
                .map(|(&a, &b)| ModQ::sub(a, b, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Poly) {
        assert_eq!(self.is_ntt, rhs.is_ntt, "Domains must match");
        let q = self.q;
        for (a, &b) in self.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a = ModQ::sub(*a, b, q);
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .map(|&c| ModQ::negate(c, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}
