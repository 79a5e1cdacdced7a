use crate::error::TypesError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 256-bit unsigned integer for vote counts and token supplies.
///
/// Little-endian `u64` limbs. Arithmetic is checked only: every operation that
/// can leave the 256-bit range returns `None`, so callers decide how overflow
/// surfaces.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]);

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl U256 {
    pub const ZERO: Self = Self([0; 4]);
    pub const ONE: Self = Self([1, 0, 0, 0]);
    pub const MAX: Self = Self([u64::MAX; 4]);

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub const fn as_limbs(&self) -> &[u64; 4] {
        &self.0
    }

    pub const fn from_u64(val: u64) -> Self {
        Self([val, 0, 0, 0])
    }

    pub const fn from_u128(val: u128) -> Self {
        Self([val as u64, (val >> 64) as u64, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    /// Number of significant bits.
    pub fn bit_len(&self) -> u32 {
        match self.0.iter().rposition(|&limb| limb != 0) {
            Some(i) => (i as u32 + 1) * 64 - self.0[i].leading_zeros(),
            None => 0,
        }
    }

    fn bit(&self, pos: u32) -> bool {
        (self.0[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
    }

    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        let (sum, carry) = self.overflowing_add(rhs);
        (!carry).then_some(sum)
    }

    fn overflowing_add(&self, rhs: &Self) -> (Self, bool) {
        let mut out = [0u64; 4];
        let mut carry = false;
        for (i, limb) in out.iter_mut().enumerate() {
            let (s, c1) = self.0[i].overflowing_add(rhs.0[i]);
            let (s, c2) = s.overflowing_add(carry as u64);
            *limb = s;
            carry = c1 || c2;
        }
        (Self(out), carry)
    }

    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        let (diff, borrow) = self.overflowing_sub(rhs);
        (!borrow).then_some(diff)
    }

    fn overflowing_sub(&self, rhs: &Self) -> (Self, bool) {
        let mut out = [0u64; 4];
        let mut borrow = false;
        for (i, limb) in out.iter_mut().enumerate() {
            let (d, b1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (d, b2) = d.overflowing_sub(borrow as u64);
            *limb = d;
            borrow = b1 || b2;
        }
        (Self(out), borrow)
    }

    /// Schoolbook multiplication; `None` if any partial product spills past
    /// the fourth limb.
    pub fn checked_mul(&self, rhs: &Self) -> Option<Self> {
        let mut wide = [0u64; 8];
        for i in 0..4 {
            if self.0[i] == 0 {
                continue;
            }
            let mut carry = 0u128;
            for j in 0..4 {
                let cur = wide[i + j] as u128 + self.0[i] as u128 * rhs.0[j] as u128 + carry;
                wide[i + j] = cur as u64;
                carry = cur >> 64;
            }
            wide[i + 4] = carry as u64;
        }
        if wide[4..].iter().any(|&limb| limb != 0) {
            return None;
        }
        Some(Self([wide[0], wide[1], wide[2], wide[3]]))
    }

    /// Truncating division with remainder. `None` on division by zero.
    pub fn checked_div_rem(&self, rhs: &Self) -> Option<(Self, Self)> {
        if rhs.is_zero() {
            return None;
        }
        if self < rhs {
            return Some((Self::ZERO, *self));
        }
        if rhs.0[1..] == [0; 3] {
            let (q, r) = self.div_rem_u64(rhs.0[0]);
            return Some((q, Self::from_u64(r)));
        }

        let mut quotient = Self::ZERO;
        let mut remainder = Self::ZERO;
        for pos in (0..self.bit_len()).rev() {
            let (shifted, spilled) = remainder.shl1();
            remainder = shifted;
            remainder.0[0] |= self.bit(pos) as u64;
            if spilled || remainder >= *rhs {
                remainder = remainder.overflowing_sub(rhs).0;
                quotient.0[(pos / 64) as usize] |= 1 << (pos % 64);
            }
        }
        Some((quotient, remainder))
    }

    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        self.checked_div_rem(rhs).map(|(q, _)| q)
    }

    pub fn checked_rem(&self, rhs: &Self) -> Option<Self> {
        self.checked_div_rem(rhs).map(|(_, r)| r)
    }

    /// Divide by a single limb. Panics on zero, callers check first.
    fn div_rem_u64(&self, divisor: u64) -> (Self, u64) {
        let mut out = [0u64; 4];
        let mut rem = 0u128;
        for i in (0..4).rev() {
            let cur = (rem << 64) | self.0[i] as u128;
            out[i] = (cur / divisor as u128) as u64;
            rem = cur % divisor as u128;
        }
        (Self(out), rem as u64)
    }

    fn shl1(&self) -> (Self, bool) {
        let mut out = [0u64; 4];
        let mut carry = 0u64;
        for (i, limb) in out.iter_mut().enumerate() {
            *limb = (self.0[i] << 1) | carry;
            carry = self.0[i] >> 63;
        }
        (Self(out), carry == 1)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (chunk, limb) in bytes.chunks_exact_mut(8).zip(self.0.iter().rev()) {
            chunk.copy_from_slice(&limb.to_be_bytes());
        }
        bytes
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (limb, chunk) in limbs.iter_mut().rev().zip(bytes.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *limb = u64::from_be_bytes(buf);
        }
        Self(limbs)
    }

    /// Parse a base-10 string of ASCII digits.
    pub fn from_decimal_str(s: &str) -> Result<Self, TypesError> {
        if s.is_empty() {
            return Err(TypesError::InvalidU256String(s.to_string()));
        }
        let ten = Self::from_u64(10);
        s.bytes().try_fold(Self::ZERO, |acc, b| {
            if !b.is_ascii_digit() {
                return Err(TypesError::InvalidU256String(s.to_string()));
            }
            acc.checked_mul(&ten)
                .and_then(|v| v.checked_add(&Self::from_u64((b - b'0') as u64)))
                .ok_or(TypesError::U256Overflow)
        })
    }
}

impl From<u64> for U256 {
    fn from(val: u64) -> Self {
        Self::from_u64(val)
    }
}

impl From<u128> for U256 {
    fn from(val: u128) -> Self {
        Self::from_u128(val)
    }
}

impl From<u32> for U256 {
    fn from(val: u32) -> Self {
        Self::from_u64(val as u64)
    }
}

impl From<u16> for U256 {
    fn from(val: u16) -> Self {
        Self::from_u64(val as u64)
    }
}

impl TryFrom<U256> for u64 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        match value.0 {
            [low, 0, 0, 0] => Ok(low),
            _ => Err(TypesError::U256Overflow),
        }
    }
}

impl TryFrom<U256> for u128 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        match value.0 {
            [low, high, 0, 0] => Ok(((high as u128) << 64) | low as u128),
            _ => Err(TypesError::U256Overflow),
        }
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const CHUNK: u64 = 10_000_000_000_000_000_000; // 10^19

        let mut chunks = Vec::new();
        let mut n = *self;
        loop {
            let (q, r) = n.div_rem_u64(CHUNK);
            chunks.push(r);
            if q.is_zero() {
                break;
            }
            n = q;
        }

        let mut out = String::new();
        for (i, chunk) in chunks.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&chunk.to_string());
            } else {
                out.push_str(&format!("{chunk:019}"));
            }
        }
        f.pad_integral(true, "", &out)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({self})")
    }
}

impl fmt::LowerHex for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl FromStr for U256 {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) else {
            return Self::from_decimal_str(s);
        };
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(padded)?;
        if bytes.len() > 32 {
            return Err(TypesError::U256Overflow);
        }
        let mut buf = [0u8; 32];
        buf[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self::from_be_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ordering_uses_high_limbs_first() {
        let low = U256::from_limbs([u64::MAX, 0, 0, 0]);
        let high = U256::from_limbs([0, 1, 0, 0]);
        assert!(low < high);
        assert!(U256::MAX > high);
        assert_eq!(U256::ZERO.cmp(&U256::ZERO), Ordering::Equal);
    }

    #[test]
    fn test_add_sub_overflow() {
        assert!(U256::MAX.checked_add(&U256::ONE).is_none());
        assert!(U256::ZERO.checked_sub(&U256::ONE).is_none());
        assert_eq!(
            U256::from(300u64).checked_sub(&U256::from(200u64)),
            Some(U256::from(100u64))
        );
    }

    #[test]
    fn test_add_carries_across_limbs() {
        let a = U256::from_limbs([u64::MAX, u64::MAX, 0, 0]);
        assert_eq!(a.checked_add(&U256::ONE), Some(U256::from_limbs([0, 0, 1, 0])));
    }

    #[test]
    fn test_mul() {
        let supply = U256::from(1_000_000_000_000_000_000_000u128);
        let product = supply.checked_mul(&U256::from(10_000u64)).unwrap();
        assert_eq!(product.to_string(), "10000000000000000000000000");
        assert!(U256::MAX.checked_mul(&U256::from(2u64)).is_none());
        assert_eq!(U256::MAX.checked_mul(&U256::ZERO), Some(U256::ZERO));
    }

    #[test]
    fn test_div_truncates() {
        assert_eq!(U256::from(38u64).checked_div(&U256::from(10u64)), Some(U256::from(3u64)));
        assert_eq!(U256::from(38u64).checked_rem(&U256::from(10u64)), Some(U256::from(8u64)));
        assert!(U256::ONE.checked_div(&U256::ZERO).is_none());
    }

    #[test]
    fn test_div_by_wide_divisor() {
        let divisor = U256::from_limbs([0, 0, 1, 0]);
        let dividend = U256::from_limbs([5, 0, 7, 3]);
        let (q, r) = dividend.checked_div_rem(&divisor).unwrap();
        assert_eq!(q, U256::from_limbs([7, 3, 0, 0]));
        assert_eq!(r, U256::from(5u64));
    }

    #[test]
    fn test_div_max_by_large_divisor() {
        let divisor = U256::from_limbs([0, 0, 0, 1 << 63]);
        let (q, r) = U256::MAX.checked_div_rem(&divisor).unwrap();
        assert_eq!(q, U256::ONE);
        assert_eq!(r, U256::from_limbs([u64::MAX, u64::MAX, u64::MAX, (1 << 63) - 1]));
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(U256::ZERO.to_string(), "0");
        let s = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(U256::MAX.to_string(), s);
        assert_eq!(s.parse::<U256>().unwrap(), U256::MAX);
        assert_eq!("0x1f4".parse::<U256>().unwrap(), U256::from(500u64));
        assert_eq!("0xabc".parse::<U256>().unwrap(), U256::from(0xabcu64));
        assert_eq!(format!("{:>5}", U256::from(42u64)), "   42");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("".parse::<U256>(), Err(TypesError::InvalidU256String(_))));
        assert!(matches!("12a".parse::<U256>(), Err(TypesError::InvalidU256String(_))));
        assert!(matches!("0xzz".parse::<U256>(), Err(TypesError::InvalidHex(_))));
        let too_big = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert_eq!(too_big.parse::<U256>(), Err(TypesError::U256Overflow));
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(u64::try_from(U256::from(7u64)), Ok(7));
        assert!(u64::try_from(U256::from(u128::MAX)).is_err());
        assert_eq!(u128::try_from(U256::from(u128::MAX)), Ok(u128::MAX));
    }

    proptest! {
        #[test]
        fn prop_matches_u128_arithmetic(a in any::<u64>(), b in 1u64..=u64::MAX) {
            let (wa, wb) = (U256::from(a), U256::from(b));
            let product = wa.checked_mul(&wb).unwrap();
            prop_assert_eq!(u128::try_from(product).unwrap(), a as u128 * b as u128);
            let (q, r) = product.checked_div_rem(&wb).unwrap();
            prop_assert_eq!(q, wa);
            prop_assert!(r.is_zero());
        }

        #[test]
        fn prop_div_rem_reconstructs(limbs in any::<[u64; 4]>(), d in any::<[u64; 4]>()) {
            let n = U256::from_limbs(limbs);
            let d = U256::from_limbs(d);
            prop_assume!(!d.is_zero());
            let (q, r) = n.checked_div_rem(&d).unwrap();
            prop_assert!(r < d);
            let back = q.checked_mul(&d).and_then(|v| v.checked_add(&r));
            prop_assert_eq!(back, Some(n));
        }

        #[test]
        fn prop_decimal_display_parses_back(limbs in any::<[u64; 4]>()) {
            let n = U256::from_limbs(limbs);
            prop_assert_eq!(n.to_string().parse::<U256>().unwrap(), n);
        }
    }
}
