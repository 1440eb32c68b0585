//! 64-bit lane arithmetic over pairs of 32-bit halves


use core::ops::{BitXor, BitXorAssign};

/// 64-bit unsigned value stored as high and low 32-bit halves.
///
/// All arithmetic wraps modulo 2^64, the value is always `hi * 2^32 + lo`.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Lane {
    hi: u32,
    lo: u32,
}

impl From<u64> for Lane {
    #[inline(always)]
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<Lane> for u64 {
    #[inline(always)]
    fn from(lane: Lane) -> Self {
        lane.to_u64()
    }
}

impl BitXor for Lane {
    type Output = Self;

    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self::Output {
        self.xor(rhs)
    }
}

impl BitXorAssign for Lane {
    #[inline(always)]
    fn bitxor_assign(&mut self, rhs: Self) {
        *self = self.xor(rhs);
    }
}

impl Lane {
    /// Zero lane
    pub const ZERO: Self = Self::new(0, 0);

    /// Create lane from high and low halves
    #[inline(always)]
    pub const fn new(hi: u32, lo: u32) -> Self {
        Self { hi, lo }
    }

    /// Create lane from a pair of block words, low half comes first
    #[inline(always)]
    pub const fn from_words(lo: u32, hi: u32) -> Self {
        Self { hi, lo }
    }

    /// Create lane from a 64-bit value
    #[inline(always)]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            hi: (value >> 32) as u32,
            lo: value as u32,
        }
    }

    /// Lane as a 64-bit value
    #[inline(always)]
    pub const fn to_u64(self) -> u64 {
        ((self.hi as u64) << 32) | self.lo as u64
    }

    /// High 32 bits
    #[inline(always)]
    pub const fn hi(self) -> u32 {
        self.hi
    }

    /// Low 32 bits
    #[inline(always)]
    pub const fn lo(self) -> u32 {
        self.lo
    }

    /// Bitwise XOR, usable in const contexts
    #[inline(always)]
    pub const fn xor(self, rhs: Self) -> Self {
        Self {
            hi: self.hi ^ rhs.hi,
            lo: self.lo ^ rhs.lo,
        }
    }

    /// `self + rhs mod 2^64`, carry out of the low half goes into the high half
    #[inline(always)]
    pub const fn wrapping_add(self, rhs: Self) -> Self {
        let (lo, carry) = self.lo.overflowing_add(rhs.lo);
        let hi = self.hi.wrapping_add(rhs.hi).wrapping_add(carry as u32);

        Self { hi, lo }
    }

    /// `self + b + c mod 2^64`.
    ///
    /// Low halves are summed first, the high half receives up to two carries.
    #[inline(always)]
    pub const fn wrapping_add3(self, b: Self, c: Self) -> Self {
        let (lo, carry_b) = self.lo.overflowing_add(b.lo);
        let (lo, carry_c) = lo.overflowing_add(c.lo);
        let hi = self
            .hi
            .wrapping_add(b.hi)
            .wrapping_add(c.hi)
            .wrapping_add(carry_b as u32)
            .wrapping_add(carry_c as u32);

        Self { hi, lo }
    }

    /// Full 64-bit product of two 32-bit values, assembled from four 16x16-bit partial products
    /// so that no intermediate exceeds 32 bits
    #[inline(always)]
    pub const fn mul32x32(a: u32, b: u32) -> Self {
        let (a_hi, a_lo) = (a >> 16, a & 0xffff);
        let (b_hi, b_lo) = (b >> 16, b & 0xffff);

        let lo_lo = a_lo.wrapping_mul(b_lo);
        let hi_lo = a_hi.wrapping_mul(b_lo);
        let lo_hi = a_lo.wrapping_mul(b_hi);
        let hi_hi = a_hi.wrapping_mul(b_hi);

        // At most `0xfffe + 0xffff + 0xfffe0001`, fits into 32 bits
        let cross = (lo_lo >> 16)
            .wrapping_add(hi_lo & 0xffff)
            .wrapping_add(lo_hi);

        Self {
            hi: hi_hi
                .wrapping_add(hi_lo >> 16)
                .wrapping_add(cross >> 16),
            lo: (cross << 16) | (lo_lo & 0xffff),
        }
    }

    /// `2 * self mod 2^64`
    #[inline(always)]
    pub const fn double(self) -> Self {
        Self {
            hi: (self.hi << 1) | (self.lo >> 31),
            lo: self.lo << 1,
        }
    }

    /// Rotate right by `S` bits, `S` must be in `1..64`
    #[inline(always)]
    pub const fn rotate_right<const S: u32>(self) -> Self {
        const {
            assert!(S > 0 && S < 64, "Rotation must be in 1..64");
        }

        if S == 32 {
            return Self {
                hi: self.lo,
                lo: self.hi,
            };
        }

        // Rotation by more than 32 bits is a swap of halves followed by rotation by `S - 32`
        let (hi, lo) = if S < 32 {
            (self.hi, self.lo)
        } else {
            (self.lo, self.hi)
        };
        let s = S % 32;

        Self {
            hi: (hi >> s) | (lo << (32 - s)),
            lo: (lo >> s) | (hi << (32 - s)),
        }
    }

    /// BLAMKA addition: `self + rhs + 2 * lo32(self) * lo32(rhs) mod 2^64`
    #[inline(always)]
    pub const fn blamka(self, rhs: Self) -> Self {
        let product = Self::mul32x32(self.lo, rhs.lo).double();

        self.wrapping_add3(rhs, product)
    }
}
