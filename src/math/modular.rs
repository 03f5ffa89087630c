//! Modular arithmetic over Z_q for q < 2^62.

/// Modular arithmetic operations over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = a + b;
        if sum >= q {
            sum - q
        } else {
            sum
        }
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        let prod = (a as u128) * (b as u128);
        (prod % (q as u128)) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Convert a signed integer to its representation in Z_q
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        Self::from_wide(val as i128, q)
    }

    /// Convert a signed 128-bit integer to its representation in Z_q.
    ///
    /// Used for scaled plaintexts whose product with the packing factor
    /// does not fit in 64 bits before reduction.
    #[inline]
    pub fn from_wide(val: i128, q: u64) -> u64 {
        let r = val.rem_euclid(q as i128);
        r as u64
    }

    /// Convert from Z_q to signed representation in [-q/2, q/2]
    #[inline]
    pub fn to_signed(val: u64, q: u64) -> i64 {
        if val <= q / 2 {
            val as i64
        } else {
            -((q - val) as i64)
        }
    }

    /// Modular exponentiation by squaring
    pub fn pow(mut base: u64, mut exp: u64, q: u64) -> u64 {
        let mut result = 1u64 % q;
        base %= q;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, q);
            }
            exp >>= 1;
            base = Self::mul(base, base, q);
        }
        result
    }

    /// Multiplicative inverse modulo a prime q (Fermat).
    ///
    /// Returns `None` when `a ≡ 0 (mod q)`.
    pub fn inverse(a: u64, q: u64) -> Option<u64> {
        if a % q == 0 {
            return None;
        }
        Some(Self::pow(a, q - 2, q))
    }
}
