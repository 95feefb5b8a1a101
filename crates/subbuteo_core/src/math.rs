//! Fixed-point planar math for the pitch surface.
//!
//! Everything the rules core measures on the pitch (figure positions, hold
//! points, flick directions, impulses) lives on the ground plane, so vectors
//! carry an `x` and a `z` component. Fixed-point keeps activation tests and
//! impulse magnitudes bit-identical across platforms, which replays and state
//! hashes rely on.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all rules math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point vector on the ground plane (world `x` / `z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlanarVec {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-edited decimals.
///
/// Config files write `0.08`, not raw bits, so this adapter goes through
/// `f64`. Only used for configuration, never for replicated state.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

impl PlanarVec {
    /// Create a new planar vector.
    #[must_use]
    pub const fn new(x: Fixed, z: Fixed) -> Self {
        Self { x, z }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Build from engine floats (used by adapters at the physics boundary).
    #[must_use]
    pub fn from_f32(x: f32, z: f32) -> Self {
        Self {
            x: Fixed::saturating_from_num(x),
            z: Fixed::saturating_from_num(z),
        }
    }

    /// Convert back to engine floats.
    #[must_use]
    pub fn to_f32(self) -> (f32, f32) {
        (self.x.to_num(), self.z.to_num())
    }

    /// Squared length (avoids sqrt for comparisons).
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Calculate squared distance.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        (self - other).length_squared()
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (self - other).length()
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x.saturating_mul(other.x) + self.z.saturating_mul(other.z)
    }

    /// Scale both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self {
            x: self.x.saturating_mul(factor),
            z: self.z.saturating_mul(factor),
        }
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Returns [`PlanarVec::ZERO`] for a zero-length input.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.z / len)
    }

    /// Normalize, or `None` when shorter than `min_length`.
    #[must_use]
    pub fn try_normalize(self, min_length: Fixed) -> Option<Self> {
        let len = self.length();
        if len < min_length || len == Fixed::ZERO {
            return None;
        }
        Some(Self::new(self.x / len, self.z / len))
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Ratio `numerator / denominator` of two millisecond counts as a fixed value.
///
/// Returns zero when `denominator` is zero.
#[must_use]
pub fn ratio_ms(numerator: u64, denominator: u64) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    let num = Fixed::saturating_from_num(numerator);
    let den = Fixed::saturating_from_num(denominator);
    num / den
}

impl std::ops::Add for PlanarVec {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for PlanarVec {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, z: f64) -> PlanarVec {
        PlanarVec::new(Fixed::from_num(x), Fixed::from_num(z))
    }

    #[test]
    fn test_distance_squared() {
        let a = v(3.0, 0.0);
        let b = v(0.0, 4.0);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_length_small_values() {
        // Pitch-scale distances are well below one unit.
        let len = v(0.06, 0.08).length();
        let err = (len - Fixed::from_num(0.1)).abs();
        assert!(err < Fixed::from_num(0.000_001), "got {len}");
    }

    #[test]
    fn test_normalize() {
        let norm = v(3.0, 4.0).normalize();
        let one = Fixed::ONE;
        let epsilon = one / Fixed::from_num(10000);
        assert!((norm.length_squared() - one).abs() < epsilon);

        // Direction preserved: x/z ratio matches 3/4.
        let ratio_diff = (norm.x * Fixed::from_num(4)) - (norm.z * Fixed::from_num(3));
        assert!(ratio_diff.abs() < epsilon);
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(PlanarVec::ZERO.normalize(), PlanarVec::ZERO);
    }

    #[test]
    fn test_try_normalize_rejects_short_vectors() {
        let min = Fixed::from_num(0.01);
        assert!(v(0.005, 0.0).try_normalize(min).is_none());
        assert!(v(0.02, 0.0).try_normalize(min).is_some());
    }

    #[test]
    fn test_ratio_ms() {
        assert_eq!(ratio_ms(1000, 2000), Fixed::from_num(0.5));
        assert_eq!(ratio_ms(5, 0), Fixed::ZERO);
    }

    #[test]
    fn test_f32_round_trip() {
        let p = PlanarVec::from_f32(0.25, -1.5);
        assert_eq!(p.to_f32(), (0.25, -1.5));
    }
}
