//! Value and counter types accepted by [`BinaryTrie`](crate::BinaryTrie).

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{AddAssign, BitAnd, BitXor, Not, Sub, SubAssign};

/// Unsigned integer stored in the trie.
///
/// Implemented for `u8`, `u16`, `u32`, `u64` and `usize`. Bits are addressed
/// LSB-first: bit `0` is the least significant bit, bit `BITS - 1` the most
/// significant one (the first level walked from the root).
pub trait TrieValue:
    Copy
    + Eq
    + Ord
    + Hash
    + Debug
    + BitXor<Output = Self>
    + BitAnd<Output = Self>
    + Not<Output = Self>
{
    /// Width of the type in bits.
    const BITS: u32;

    const ZERO: Self;

    /// Returns bit `i` as a child direction (`0` or `1`).
    fn bit(self, i: u32) -> usize;

    /// Returns `self` with bit `i` set to `b`, assuming it was clear.
    fn with_bit(self, i: u32, b: usize) -> Self;

    /// Mask covering the low `bits` bits. `bits` must not exceed `BITS`.
    fn low_mask(bits: u32) -> Self;

    /// Widening conversion, used for error reporting.
    fn to_u64(self) -> u64;
}

macro_rules! impl_trie_value {
    ($($t:ty),*) => {$(
        impl TrieValue for $t {
            const BITS: u32 = <$t>::BITS;
            const ZERO: Self = 0;

            #[inline(always)]
            fn bit(self, i: u32) -> usize {
                debug_assert!(i < Self::BITS);
                ((self >> i) & 1) as usize
            }

            #[inline(always)]
            fn with_bit(self, i: u32, b: usize) -> Self {
                debug_assert!(b <= 1);
                self | ((b as $t) << i)
            }

            #[inline(always)]
            fn low_mask(bits: u32) -> Self {
                debug_assert!(bits <= Self::BITS);
                if bits >= Self::BITS {
                    <$t>::MAX
                } else {
                    ((1 as $t) << bits) - 1
                }
            }

            #[inline(always)]
            fn to_u64(self) -> u64 {
                self as u64
            }
        }
    )*};
}

impl_trie_value!(u8, u16, u32, u64, usize);

/// Unsigned multiplicity counter.
///
/// Counters are unsigned so negative counts and ranks cannot be expressed.
/// Plain `+=` is used on the unchecked paths; [`checked_add`](Self::checked_add)
/// backs the checked API.
pub trait TrieCount:
    Copy + Ord + Default + Debug + AddAssign + Sub<Output = Self> + SubAssign
{
    const ZERO: Self;
    const ONE: Self;

    fn checked_add(self, rhs: Self) -> Option<Self>;

    /// Widening conversion, used for error reporting.
    fn to_u64(self) -> u64;
}

macro_rules! impl_trie_count {
    ($($t:ty),*) => {$(
        impl TrieCount for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline(always)]
            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$t>::checked_add(self, rhs)
            }

            #[inline(always)]
            fn to_u64(self) -> u64 {
                self as u64
            }
        }
    )*};
}

impl_trie_count!(u8, u16, u32, u64, usize);
