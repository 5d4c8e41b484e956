//! 48-bit linear congruential generator compatible with the reference
//! `java.util.Random` algorithm used by structure placement.

const MULTIPLIER: i64 = 0x5_DEEC_E66D;
const ADDEND: i64 = 0xB;
const MASK: i64 = (1 << 48) - 1;

/// Bit-exact replica of the legacy 48-bit LCG.
///
/// Downstream chunk coordinates diverge from the host generator if any draw
/// differs, so every operation mirrors the reference arithmetic including its
/// 32-bit overflow behaviour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyRandom {
    state: i64,
}

impl LegacyRandom {
    /// Seeds the generator, applying the reference scrambling step.
    #[must_use]
    pub const fn new(seed: i64) -> Self {
        Self {
            state: (seed ^ MULTIPLIER) & MASK,
        }
    }

    /// Advances the generator once and returns its top `bits` bits.
    pub fn next_bits(&mut self, bits: u32) -> i32 {
        debug_assert!((1..=32).contains(&bits), "bits must be within 1..=32");
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(ADDEND) & MASK;
        (self.state >> (48 - bits)) as i32
    }

    /// Draws a value uniformly from `[0, bound)`.
    ///
    /// Powers of two take the multiply-shift path; every other bound uses
    /// rejection sampling with the reference retry condition, which relies on
    /// wrapping 32-bit arithmetic.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is not positive, matching the reference contract.
    pub fn next_int(&mut self, bound: i32) -> i32 {
        assert!(bound > 0, "bound must be positive, got {bound}");

        let mask = bound - 1;
        if bound & mask == 0 {
            return ((i64::from(bound) * i64::from(self.next_bits(31))) >> 31) as i32;
        }

        loop {
            let draw = self.next_bits(31);
            let value = draw % bound;
            if draw.wrapping_sub(value).wrapping_add(mask) >= 0 {
                return value;
            }
        }
    }
}
