//! Rational arithmetic for presentation-time ordering.
//!
//! The builder orders interleaved blocks by `start_time * scale / rate`,
//! which must be compared exactly. Everything here is unsigned because
//! rate/scale come from 32-bit header fields and start times are
//! non-negative tick counts.

use std::cmp::Ordering;
use std::fmt;

/// An unsigned rational number.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator
    pub num: u64,
    /// Denominator (never zero)
    pub den: u64,
}

impl Rational {
    /// Create a new rational number, reduced to simplest form.
    ///
    /// # Panics
    ///
    /// Panics if the denominator is zero. Callers validate rate/scale
    /// fields before constructing time coefficients.
    pub fn new(num: u64, den: u64) -> Self {
        assert!(den != 0, "denominator cannot be zero");
        Self { num, den }.reduce()
    }

    /// Create a zero rational.
    pub const fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    /// Reduce the rational to its simplest form.
    pub fn reduce(self) -> Self {
        if self.num == 0 {
            return Self { num: 0, den: 1 };
        }
        let g = gcd(self.num, self.den);
        Self {
            num: self.num / g,
            den: self.den / g,
        }
    }

    /// Multiply by an integer, cancelling against the denominator first
    /// to keep intermediate values small.
    pub fn mul_int(self, n: u64) -> Self {
        if n == 0 || self.num == 0 {
            return Self::zero();
        }
        let g = gcd(n, self.den);
        Self {
            num: self.num * (n / g),
            den: self.den / g,
        }
    }

    /// Convert to f64.
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.num as u128 * other.den as u128;
        let rhs = other.num as u128 * self.den as u128;
        lhs.cmp(&rhs)
    }
}

/// Calculate the greatest common divisor using the Euclidean algorithm.
fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
