use std::fmt;

use bytemuck::{Pod, Zeroable};

const SIGN_MASK: u32 = 0x8000_0000;
const SCALE_SHIFT: u32 = 16;
const SCALE_MASK: u32 = 0x00FF_0000;
const MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// A 128-bit fixed-point decimal in the .NET `System.Decimal` memory layout:
/// a 96-bit unsigned mantissa, a sign bit and a power-of-ten scale in `0..=28`.
///
/// Equality is structural: `1.0` and `1.00` have different scales and compare unequal.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Decimal {
    flags: u32,
    hi: u32,
    lo: u64,
}

impl Decimal {
    pub const MAX_SCALE: u32 = 28;
    pub const ZERO: Decimal = Decimal {
        flags: 0,
        hi: 0,
        lo: 0,
    };

    /// Builds `mantissa * 10^-scale`.
    ///
    /// Returns `None` when the scale exceeds [`Decimal::MAX_SCALE`] or the mantissa
    /// does not fit in 96 bits.
    pub fn from_parts(mantissa: i128, scale: u32) -> Option<Decimal> {
        let magnitude = mantissa.unsigned_abs();
        if scale > Self::MAX_SCALE || magnitude > MAX_MANTISSA {
            return None;
        }
        let mut flags = scale << SCALE_SHIFT;
        if mantissa < 0 {
            flags |= SIGN_MASK;
        }
        Some(Decimal {
            flags,
            hi: (magnitude >> 64) as u32,
            lo: magnitude as u64,
        })
    }

    /// Shorthand for the common case of a 64-bit mantissa.
    ///
    /// # Panics
    ///
    /// Panics if `scale` exceeds [`Decimal::MAX_SCALE`].
    pub fn new(mantissa: i64, scale: u32) -> Decimal {
        Decimal::from_parts(mantissa as i128, scale)
            .unwrap_or_else(|| panic!("decimal scale {scale} exceeds {}", Self::MAX_SCALE))
    }

    pub fn mantissa(&self) -> i128 {
        let magnitude = ((self.hi as i128) << 64) | self.lo as i128;
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn scale(&self) -> u32 {
        (self.flags & SCALE_MASK) >> SCALE_SHIFT
    }

    pub fn is_negative(&self) -> bool {
        self.flags & SIGN_MASK != 0
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa() as f64 / 10f64.powi(self.scale() as i32)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa().unsigned_abs().to_string();
        let scale = self.scale() as usize;
        if self.is_negative() {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{int}.{frac}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let d = Decimal::new(-12345, 2);
        assert_eq!(d.mantissa(), -12345);
        assert_eq!(d.scale(), 2);
        assert!(d.is_negative());
        assert_eq!(d.to_string(), "-123.45");
        assert_eq!(Decimal::new(5, 3).to_string(), "0.005");
        assert_eq!(Decimal::ZERO.to_string(), "0");
    }

    #[test]
    fn test_wide_mantissa() {
        let m = MAX_MANTISSA as i128;
        let d = Decimal::from_parts(m, 0).unwrap();
        assert_eq!(d.mantissa(), m);
        assert!(Decimal::from_parts(m + 1, 0).is_none());
        assert!(Decimal::from_parts(1, 29).is_none());
        assert_eq!(std::mem::size_of::<Decimal>(), 16);
    }
}
