//! Fixed-point planar math.
//!
//! Anchor positions and every distance derived from them use fixed-point
//! arithmetic so the same seed yields the same campaign on every platform.
//! Squared distances are kept as exact 128-bit products of the raw bits.
//! They stay exact, and their square roots fit a [`Fixed`], for every pair
//! of positions inside [`MAX_COORDINATE`].

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number used for positions and distances.
///
/// 32 integer bits, 32 fractional bits.
pub type Fixed = I32F32;

/// A position on the map plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Largest absolute coordinate, in world units, an anchor may have.
pub const MAX_COORDINATE: i32 = 1 << 29;

/// Whether both coordinates lie within [`MAX_COORDINATE`].
#[must_use]
pub fn in_bounds(position: Vec2Fixed) -> bool {
    let limit = Fixed::from_num(MAX_COORDINATE);
    let range = -limit..=limit;
    range.contains(&position.x) && range.contains(&position.y)
}

/// Exact squared distance, in raw fixed-point bits squared (2^64 per square
/// world unit). Orders like the true distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DistanceSquared(u128);

impl DistanceSquared {
    /// Zero distance.
    pub const ZERO: Self = Self(0);
    /// Larger than any distance between two positions.
    pub const MAX: Self = Self(u128::MAX);

    /// Squared distance between two positions. Saturates only for pairs far
    /// outside [`MAX_COORDINATE`].
    #[must_use]
    pub fn between(a: Vec2Fixed, b: Vec2Fixed) -> Self {
        let dx = i128::from(a.x.to_bits()).abs_diff(i128::from(b.x.to_bits()));
        let dy = i128::from(a.y.to_bits()).abs_diff(i128::from(b.y.to_bits()));
        Self(dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)))
    }

    /// Square of a whole-unit limit. `u32::MAX` means "unbounded".
    #[must_use]
    pub fn from_units(units: u32) -> Self {
        if units == u32::MAX {
            return Self::MAX;
        }
        let units = u128::from(units);
        Self((units * units).checked_mul(1 << 64).unwrap_or(u128::MAX))
    }

    /// Square root as a fixed-point distance, truncated.
    #[must_use]
    pub fn sqrt(self) -> Fixed {
        Fixed::from_bits(i64::try_from(isqrt(self.0)).unwrap_or(i64::MAX))
    }
}

/// Serde adapter storing a [`Fixed`] as its raw `i64` bits, so values
/// survive a round trip bit for bit.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write the raw bits.
    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_bits().serialize(serializer)
    }

    /// Read the raw bits.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        i64::deserialize(deserializer).map(Fixed::from_bits)
    }
}

impl Vec2Fixed {
    /// The origin.
    pub const ZERO: Self = Self::new(Fixed::ZERO, Fixed::ZERO);

    /// Position from fixed-point coordinates.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Position from whole world units.
    #[must_use]
    pub fn from_units(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Exact squared planar distance. Use for comparisons.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> DistanceSquared {
        DistanceSquared::between(self, other)
    }

    /// Planar distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        self.distance_squared(other).sqrt()
    }

    /// Halfway point.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new(
            self.x / 2 + other.x / 2,
            self.y / 2 + other.y / 2,
        )
    }
}

fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = 1u128 << ((128 - n.leading_zeros()).div_ceil(2));
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Squared distance threshold for a whole-unit limit.
#[must_use]
pub fn squared_units(units: u32) -> DistanceSquared {
    DistanceSquared::from_units(units)
}
