//! Payment amounts in whole-coin units.
//!
//! Amounts travel through the core as precise decimals and are converted
//! to the ledger's smallest unit (wei, 18 decimals) only at the adapter
//! boundary.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wei per whole coin (18 decimals).
const WEI_PER_COIN: u64 = 1_000_000_000_000_000_000;

/// A payment amount in whole-coin units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal value. Positivity is checked by callers that attach
    /// the amount to a transaction.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// The underlying decimal value.
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Whether the amount is strictly positive.
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Convert to wei, truncating anything below 10^-18.
    ///
    /// Returns `None` for negative amounts or values too large for u128.
    pub fn to_wei(self) -> Option<u128> {
        if self.0 < Decimal::ZERO {
            return None;
        }
        let scaled = self.0.checked_mul(Decimal::from(WEI_PER_COIN))?;
        scaled.trunc().to_u128()
    }

    /// Convert a wei quantity back to whole-coin units. Saturates at
    /// `Decimal::MAX` for quantities beyond the decimal range.
    pub fn from_wei(wei: u128) -> Self {
        let value = Decimal::from_u128(wei).unwrap_or(Decimal::MAX);
        Self(value / Decimal::from(WEI_PER_COIN))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positivity() {
        assert!(Amount::new(dec!(0.5)).is_positive());
        assert!(!Amount::ZERO.is_positive());
        assert!(!Amount::new(dec!(-1)).is_positive());
    }

    #[test]
    fn test_to_wei_whole_and_fractional() {
        assert_eq!(Amount::new(dec!(1)).to_wei(), Some(u128::from(WEI_PER_COIN)));
        assert_eq!(
            Amount::new(dec!(0.5)).to_wei(),
            Some(u128::from(WEI_PER_COIN / 2))
        );
        assert_eq!(Amount::ZERO.to_wei(), Some(0));
    }

    #[test]
    fn test_to_wei_rejects_negative() {
        assert_eq!(Amount::new(dec!(-0.1)).to_wei(), None);
    }

    #[test]
    fn test_wei_round_trip() {
        let amount = Amount::new(dec!(2.25));
        let wei = amount.to_wei().unwrap();
        assert_eq!(Amount::from_wei(wei), amount);
    }
}
