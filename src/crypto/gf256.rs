//! GF(2^8) arithmetic over the AES field.
//!
//! Elements are bytes; addition and subtraction are both XOR. Multiplication
//! reduces modulo the AES irreducible polynomial x^8 + x^4 + x^3 + x + 1
//! (0x11B). Every routine here is bit-exact with the AES field so that
//! split/combine round-trips for all 256 byte values.

use super::shamir::ShamirError;

/// Low byte of the AES modulus 0x11B, folded in after each doubling.
const REDUCTION: u8 = 0x1b;

/// Carry-less multiply with modular reduction ("Russian peasant").
pub fn mul(mut a: u8, mut b: u8) -> u8 {
    let mut r: u8 = 0;
    for _ in 0..8 {
        if (b & 1) != 0 {
            r ^= a;
        }
        let hi = (a & 0x80) != 0;
        a <<= 1;
        if hi {
            a ^= REDUCTION;
        }
        b >>= 1;
    }
    r
}

/// Multiplicative inverse, `a^254`.
///
/// The multiplicative group has order 255, so `a^254 = a^-1`. The exponent
/// 254 = 2 + 4 + ... + 128, which is accumulated over seven squarings.
pub fn inverse(a: u8) -> Result<u8, ShamirError> {
    if a == 0 {
        return Err(ShamirError::DivisionByZero);
    }
    let mut square = a;
    let mut acc = 1u8;
    for _ in 0..7 {
        square = mul(square, square);
        acc = mul(acc, square);
    }
    Ok(acc)
}

pub fn div(a: u8, b: u8) -> Result<u8, ShamirError> {
    Ok(mul(a, inverse(b)?))
}

/// Horner evaluation; `coeffs[0]` is the constant term.
pub fn eval_polynomial(coeffs: &[u8], x: u8) -> u8 {
    coeffs.iter().rev().fold(0u8, |acc, &c| mul(acc, x) ^ c)
}

/// Value at `x` of the unique polynomial of degree < `xs.len()` passing
/// through the points `(xs[i], ys[i])`.
///
/// Points are passed as parallel slices so callers can keep the y-values in
/// a zeroizing buffer. Duplicate x-coordinates yield `DivisionByZero`.
pub fn lagrange_interpolate(xs: &[u8], ys: &[u8], x: u8) -> Result<u8, ShamirError> {
    if xs.len() != ys.len() {
        return Err(ShamirError::LengthMismatch { expected: xs.len(), actual: ys.len() });
    }
    if xs.is_empty() {
        return Err(ShamirError::InsufficientShares { have: 0, need: 1 });
    }
    let mut acc = 0u8;
    for (j, (&xj, &yj)) in xs.iter().zip(ys.iter()).enumerate() {
        let mut num = 1u8;
        let mut den = 1u8;
        for (m, &xm) in xs.iter().enumerate() {
            if m == j {
                continue;
            }
            num = mul(num, x ^ xm);
            den = mul(den, xj ^ xm);
        }
        acc ^= mul(yj, div(num, den)?);
    }
    Ok(acc)
}

/// Secret recovery: interpolation at zero.
pub fn interpolate_at_zero(xs: &[u8], ys: &[u8]) -> Result<u8, ShamirError> {
    lagrange_interpolate(xs, ys, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_aes_products() {
        // FIPS-197 section 4.2 worked example
        assert_eq!(mul(0x57, 0x83), 0xc1);
        assert_eq!(mul(0x57, 0x13), 0xfe);
        assert_eq!(mul(0x02, 0x80), 0x1b);
    }

    #[test]
    fn test_identity_and_zero() {
        for a in 0..=255u8 {
            assert_eq!(mul(a, 1), a);
            assert_eq!(mul(a, 0), 0);
        }
    }

    #[test]
    fn test_inverse_every_nonzero_element() {
        for a in 1..=255u8 {
            let inv = inverse(a).unwrap();
            assert_eq!(mul(a, inv), 1, "inverse failed for {a:#04x}");
        }
        // known pair from the AES S-box construction
        assert_eq!(inverse(0x53).unwrap(), 0xca);
    }

    #[test]
    fn test_inverse_of_zero_fails() {
        assert!(matches!(inverse(0), Err(ShamirError::DivisionByZero)));
        assert!(matches!(div(7, 0), Err(ShamirError::DivisionByZero)));
    }

    #[test]
    fn test_divide_then_multiply_all_pairs() {
        for a in 0..=255u8 {
            for b in 1..=255u8 {
                assert_eq!(mul(div(a, b).unwrap(), b), a);
            }
        }
    }

    #[test]
    fn test_mul_commutative_and_distributive() {
        for a in (0..=255u8).step_by(7) {
            for b in (0..=255u8).step_by(11) {
                assert_eq!(mul(a, b), mul(b, a));
                for c in [0u8, 1, 0x1b, 0x80, 0xff] {
                    assert_eq!(mul(a, b ^ c), mul(a, b) ^ mul(a, c));
                }
            }
        }
    }

    #[test]
    fn test_eval_polynomial_horner() {
        // p(x) = 5 + 3x + 2x^2
        let coeffs = [5u8, 3, 2];
        assert_eq!(eval_polynomial(&coeffs, 0), 5);
        let x = 4u8;
        let expected = 5 ^ mul(3, x) ^ mul(2, mul(x, x));
        assert_eq!(eval_polynomial(&coeffs, x), expected);
        assert_eq!(eval_polynomial(&[], 9), 0);
    }

    #[test]
    fn test_interpolate_recovers_constant_term() {
        let coeffs = [0xa7u8, 0x3c, 0x91];
        let xs = [1u8, 2, 3];
        let ys: Vec<u8> = xs.iter().map(|&x| eval_polynomial(&coeffs, x)).collect();
        assert_eq!(interpolate_at_zero(&xs, &ys).unwrap(), 0xa7);
        // also at a non-zero abscissa
        assert_eq!(lagrange_interpolate(&xs, &ys, 9).unwrap(), eval_polynomial(&coeffs, 9));
    }

    #[test]
    fn test_interpolate_duplicate_x_fails() {
        assert!(matches!(
            interpolate_at_zero(&[1, 1], &[10, 11]),
            Err(ShamirError::DivisionByZero)
        ));
    }

    #[test]
    fn test_interpolate_rejects_ragged_points() {
        assert!(matches!(
            interpolate_at_zero(&[1, 2], &[10]),
            Err(ShamirError::LengthMismatch { .. })
        ));
        assert!(interpolate_at_zero(&[], &[]).is_err());
    }
}
