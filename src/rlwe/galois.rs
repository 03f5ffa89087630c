//! Galois automorphisms for RLWE
//!
//! Galois automorphisms σ_g: R → R are ring automorphisms defined by
//! σ_g(X) = X^g for odd g ∈ Z_{2N}^*. Unpacking uses the elements
//! `N/2^k + 1`, each of which fixes a sub-ring and negates its complement.

use crate::math::{ModQ, Poly};

use super::types::RlweCiphertext;

/// Apply Galois automorphism σ_g to a polynomial
///
/// σ_g(p(X)) = p(X^g) mod (X^N + 1)
///
/// X^i maps to X^(g·i mod 2N), negated when the exponent lands in [N, 2N).
pub fn apply_automorphism(poly: &Poly, g: usize) -> Poly {
    assert!(!poly.is_ntt(), "Automorphism requires coefficient domain");
    let d = poly.dimension();
    let q = poly.modulus();
    let two_d = 2 * d;

    let mut result = vec![0u64; d];
    for (i, &coeff) in poly.coeffs().iter().enumerate() {
        if coeff == 0 {
            continue;
        }
        let new_idx = (g * i) % two_d;
        if new_idx < d {
            result[new_idx] = ModQ::add(result[new_idx], coeff, q);
        } else {
            let idx = new_idx - d;
            result[idx] = ModQ::sub(result[idx], coeff, q);
        }
    }

    Poly::from_coeffs(result, q)
}

/// Apply automorphism to RLWE ciphertext
///
/// The result is encrypted under σ_g(s); key switching brings it back to s.
pub fn automorphism_ciphertext(ct: &RlweCiphertext, g: usize) -> RlweCiphertext {
    RlweCiphertext {
        a: apply_automorphism(&ct.a, g),
        b: apply_automorphism(&ct.b, g),
    }
}

/// Check if g is a valid Galois element (odd and below 2N)
pub fn is_valid_galois_element(g: usize, d: usize) -> bool {
    g % 2 == 1 && g < 2 * d
}

/// Compose two automorphisms: σ_{g1} ∘ σ_{g2} = σ_{g1·g2 mod 2N}
pub fn compose_automorphisms(g1: usize, g2: usize, d: usize) -> usize {
    (g1 * g2) % (2 * d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DEFAULT_Q;

    const D: usize = 256;

    fn ramp() -> Poly {
        Poly::from_coeffs((0..D as u64).map(|i| i + 1).collect(), DEFAULT_Q)
    }

    #[test]
    fn test_automorphism_identity() {
        let poly = ramp();
        assert_eq!(apply_automorphism(&poly, 1), poly);
    }

    #[test]
    fn test_automorphism_composition() {
        let poly = ramp();
        for (g1, g2) in [(3usize, 5usize), (D + 1, 129), (2 * D - 1, 3)] {
            let sequential = apply_automorphism(&apply_automorphism(&poly, g2), g1);
            let direct = apply_automorphism(&poly, compose_automorphisms(g1, g2, D));
            assert_eq!(sequential, direct, "g1={} g2={}", g1, g2);
        }
    }

    #[test]
    fn test_n_plus_one_negates_odd_coefficients() {
        // σ_{N+1}(X^i) = X^{i(N+1)} = (-1)^i X^i
        let poly = ramp();
        let result = apply_automorphism(&poly, D + 1);
        for i in 0..D {
            let expected = if i % 2 == 0 {
                poly.coeff(i)
            } else {
                DEFAULT_Q - poly.coeff(i)
            };
            assert_eq!(result.coeff(i), expected, "coefficient {}", i);
        }
    }

    #[test]
    fn test_trace_annihilates_complement() {
        // Two trace stages keep coefficients at multiples of 4, scaled by 4
        let poly = ramp();
        let mut acc = poly.clone();
        for g in [D + 1, D / 2 + 1] {
            acc = &acc + &apply_automorphism(&acc, g);
        }
        for i in 0..D {
            if i % 4 == 0 {
                assert_eq!(acc.coeff(i), 4 * poly.coeff(i) % DEFAULT_Q);
            } else {
                assert_eq!(acc.coeff(i), 0, "coefficient {} should vanish", i);
            }
        }
    }

    #[test]
    fn test_valid_elements() {
        assert!(is_valid_galois_element(D + 1, D));
        assert!(!is_valid_galois_element(4, D));
        assert!(!is_valid_galois_element(2 * D + 1, D));
    }
}
