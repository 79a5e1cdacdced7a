//! Basis points.

use crate::error::TypesError;
use crate::u256::U256;
use std::fmt;

/// A ratio in basis points: 1 bps = 0.01%, 10000 bps = 100%.
///
/// Always within `0..=10000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bps(u16);

impl Bps {
    /// Denominator of every basis-point ratio.
    pub const DENOMINATOR: u16 = 10_000;

    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(Self::DENOMINATOR);

    pub fn new(value: u16) -> Result<Self, TypesError> {
        if value > Self::DENOMINATOR {
            return Err(TypesError::BpsOutOfRange(value as u32));
        }
        Ok(Self(value))
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    pub fn to_u256(self) -> U256 {
        U256::from(self.0)
    }

    /// `amount * self / 10000`, truncating. `None` on overflow.
    pub fn apply(self, amount: &U256) -> Option<U256> {
        amount
            .checked_mul(&self.to_u256())?
            .checked_div(&U256::from(Self::DENOMINATOR))
    }
}

impl TryFrom<u32> for Bps {
    type Error = TypesError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map_err(|_| TypesError::BpsOutOfRange(value))
            .and_then(Self::new)
    }
}

impl TryFrom<u16> for Bps {
    type Error = TypesError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Bps> for u16 {
    fn from(bps: Bps) -> Self {
        bps.0
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        assert!(Bps::new(0).is_ok());
        assert!(Bps::new(10_000).is_ok());
        assert_eq!(Bps::new(10_001), Err(TypesError::BpsOutOfRange(10_001)));
        assert_eq!(Bps::try_from(70_000u32), Err(TypesError::BpsOutOfRange(70_000)));
    }

    #[test]
    fn test_apply_truncates() {
        let bps = Bps::new(1_000).unwrap();
        assert_eq!(bps.apply(&U256::from(200u64)), Some(U256::from(20u64)));
        assert_eq!(bps.apply(&U256::from(209u64)), Some(U256::from(20u64)));
        assert_eq!(Bps::MAX.apply(&U256::from(77u64)), Some(U256::from(77u64)));
        assert_eq!(Bps::ZERO.apply(&U256::MAX), Some(U256::ZERO));
        assert_eq!(Bps::MAX.apply(&U256::MAX), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Bps::new(1_000).unwrap().to_string(), "10.00%");
        assert_eq!(Bps::new(1_505).unwrap().to_string(), "15.05%");
        assert_eq!(Bps::MAX.to_string(), "100.00%");
    }
}
