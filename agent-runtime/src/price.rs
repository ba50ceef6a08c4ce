//! Price normalization: converts an oracle `(mantissa, exponent)` pair into
//! a single comparable fixed-point value.
//!
//! Sharp edge: for the common negative-exponent feeds the canonical scale is
//! defined to equal the feed's native scale, so trigger prices must be
//! supplied already scaled for the feed in question (e.g. `3000_00000000`
//! for a USD feed with exponent -8). Feeds with different exponents are not
//! directly comparable.

use alloy::primitives::U256;

use crate::error::AgentError;

/// Normalize an oracle observation to the canonical scale.
///
/// Fails with `InvalidPrice` for non-positive mantissas; those are not
/// economically meaningful and must never reach a trigger comparison.
pub fn normalize(mantissa: i64, expo: i32) -> Result<U256, AgentError> {
    if mantissa <= 0 {
        return Err(AgentError::InvalidPrice(mantissa));
    }
    let magnitude = U256::from(mantissa as u64);
    if expo < 0 {
        // Native-scale policy: the mantissa already carries the canonical scale.
        return Ok(magnitude);
    }
    // Rare whole-number feeds: scale up by 10^expo. U256 arithmetic keeps the
    // full precision of any representable i64 mantissa.
    let scale = U256::from(10u64)
        .checked_pow(U256::from(expo as u32))
        .ok_or_else(|| AgentError::OracleError(format!("exponent {expo} overflows price scaling")))?;
    magnitude
        .checked_mul(scale)
        .ok_or_else(|| AgentError::OracleError(format!("exponent {expo} overflows price scaling")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_expo_used_as_is() {
        // ETH/USD at expo -8: 3000.00000000
        let p = normalize(3000_00000000, -8).unwrap();
        assert_eq!(p, U256::from(3000_00000000u64));
    }

    #[test]
    fn test_zero_expo() {
        let p = normalize(42, 0).unwrap();
        assert_eq!(p, U256::from(42u64));
    }

    #[test]
    fn test_positive_expo_scales_up() {
        let p = normalize(3, 2).unwrap();
        assert_eq!(p, U256::from(300u64));
    }

    #[test]
    fn test_max_mantissa_large_expo_no_overflow() {
        // i64::MAX * 10^18 is far beyond u128 but fits comfortably in U256.
        let p = normalize(i64::MAX, 18).unwrap();
        let expected = U256::from(i64::MAX as u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(p, expected);
    }

    #[test]
    fn test_zero_mantissa_rejected() {
        assert!(matches!(normalize(0, -8), Err(AgentError::InvalidPrice(0))));
    }

    #[test]
    fn test_negative_mantissa_rejected() {
        assert!(matches!(normalize(-1, -8), Err(AgentError::InvalidPrice(-1))));
    }

    #[test]
    fn test_absurd_expo_rejected() {
        assert!(normalize(1, i32::MAX).is_err());
    }
}
