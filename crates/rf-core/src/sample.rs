//! Polyphonic sample types
//!
//! Every audio-rate buffer in the engine is a run of [`PolyFloat`] frames.
//! One frame carries four lanes: left/right of two voices.
//!
//! ```text
//! lane:   0        1        2        3
//!         v0 L     v0 R     v1 L     v1 R
//! ```
//!
//! Lanes never mix except through the explicit packing helpers on
//! [`PolyPacked`], which the halfband decimators use to run the even and odd
//! oversampled phases side by side.

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::simd::num::SimdFloat;
use std::simd::{f32x4, f32x8};

/// Lanes per [`PolyFloat`]
pub const POLY_LANES: usize = 4;

/// Lanes per [`PolyPacked`] (two phases per poly lane)
pub const PACKED_LANES: usize = POLY_LANES * 2;

// ═══════════════════════════════════════════════════════════════════════════════
// POLY FLOAT
// ═══════════════════════════════════════════════════════════════════════════════

/// One sample per polyphonic lane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(transparent)]
pub struct PolyFloat(pub f32x4);

impl PolyFloat {
    pub const ZERO: Self = Self(f32x4::from_array([0.0; POLY_LANES]));

    #[inline]
    pub fn splat(value: f32) -> Self {
        Self(f32x4::splat(value))
    }

    #[inline]
    pub const fn from_array(lanes: [f32; POLY_LANES]) -> Self {
        Self(f32x4::from_array(lanes))
    }

    #[inline]
    pub fn to_array(self) -> [f32; POLY_LANES] {
        self.0.to_array()
    }

    /// Value of a single lane
    #[inline]
    pub fn lane(self, index: usize) -> f32 {
        self.0[index]
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Largest absolute value across lanes
    #[inline]
    pub fn max_abs(self) -> f32 {
        self.0.abs().reduce_max()
    }

    /// True when no lane is NaN or infinite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite().all()
    }

    /// Per-lane choice: `on` where the mask is set, `self` elsewhere
    #[inline]
    pub fn select(self, mask: PolyMask, on: Self) -> Self {
        let mut lanes = self.to_array();
        let on = on.to_array();
        for (i, lane) in lanes.iter_mut().enumerate() {
            if mask.lane(i) {
                *lane = on[i];
            }
        }
        Self::from_array(lanes)
    }
}

impl From<f32> for PolyFloat {
    #[inline]
    fn from(value: f32) -> Self {
        Self::splat(value)
    }
}

impl Add for PolyFloat {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for PolyFloat {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for PolyFloat {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Mul<f32> for PolyFloat {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self(self.0 * f32x4::splat(rhs))
    }
}

impl Neg for PolyFloat {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl AddAssign for PolyFloat {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for PolyFloat {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl MulAssign for PolyFloat {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        self.0 *= rhs.0;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POLY MASK
// ═══════════════════════════════════════════════════════════════════════════════

/// Lane selection for voice resets, one bit per lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PolyMask(u8);

impl PolyMask {
    pub const EMPTY: Self = Self(0);
    pub const FULL: Self = Self((1 << POLY_LANES) - 1);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::FULL.0)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn from_array(lanes: [bool; POLY_LANES]) -> Self {
        let bits = lanes
            .iter()
            .enumerate()
            .fold(0u8, |bits, (i, &on)| if on { bits | (1 << i) } else { bits });
        Self(bits)
    }

    /// Both stereo lanes of one voice
    #[inline]
    pub const fn voice(index: usize) -> Self {
        if index >= POLY_LANES / 2 {
            return Self::EMPTY;
        }
        Self::from_bits(0b11u8 << (2 * index))
    }

    #[inline]
    pub const fn lane(self, index: usize) -> bool {
        index < POLY_LANES && self.0 & (1 << index) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_full(self) -> bool {
        self.0 == Self::FULL.0
    }

    /// Mask over [`PolyPacked`] lanes: each poly lane covers its even and odd phase
    #[inline]
    pub fn packed(self) -> [bool; PACKED_LANES] {
        std::array::from_fn(|i| self.lane(i / 2))
    }
}

impl std::ops::BitOr for PolyMask {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for PolyMask {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::ops::Not for PolyMask {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self(!self.0 & Self::FULL.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PACKED PHASES
// ═══════════════════════════════════════════════════════════════════════════════

/// Two consecutive oversampled frames, interleaved phase by phase
///
/// `consolidate(even, odd)` gives `[e0, o0, e1, o1, e2, o2, e3, o3]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(transparent)]
pub struct PolyPacked(pub f32x8);

impl PolyPacked {
    pub const ZERO: Self = Self(f32x8::from_array([0.0; PACKED_LANES]));

    /// Coefficient vector: `even` on even-phase lanes, `odd` on odd-phase lanes
    #[inline]
    pub const fn pair(even: f32, odd: f32) -> Self {
        Self(f32x8::from_array([even, odd, even, odd, even, odd, even, odd]))
    }

    #[inline]
    pub fn consolidate(even: PolyFloat, odd: PolyFloat) -> Self {
        let e = even.to_array();
        let o = odd.to_array();
        Self(f32x8::from_array([
            e[0], o[0], e[1], o[1], e[2], o[2], e[3], o[3],
        ]))
    }

    /// Fold each even/odd pair back into one poly lane
    #[inline]
    pub fn sum_split(self) -> PolyFloat {
        let p = self.0.to_array();
        PolyFloat::from_array([p[0] + p[1], p[2] + p[3], p[4] + p[5], p[6] + p[7]])
    }

    /// Zero the lanes selected by `mask`, keep the rest
    #[inline]
    pub fn clear_lanes(self, mask: PolyMask) -> Self {
        if mask.is_full() {
            return Self::ZERO;
        }
        let mut lanes = self.0.to_array();
        for (lane, clear) in lanes.iter_mut().zip(mask.packed()) {
            if clear {
                *lane = 0.0;
            }
        }
        Self(f32x8::from_array(lanes))
    }

    #[inline]
    pub fn to_array(self) -> [f32; PACKED_LANES] {
        self.0.to_array()
    }
}

impl Add for PolyPacked {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for PolyPacked {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for PolyPacked {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl AddAssign for PolyPacked {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
