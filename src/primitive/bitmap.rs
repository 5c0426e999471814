//! One bit per slot occupancy tracking.

use crate::error::Result;
use crate::policy::try_filled_vec;

#[derive(Clone, Debug, Default)]
pub(crate) struct OccupancyBitmap {
    words: Vec<u64>,
}

impl OccupancyBitmap {
    pub(crate) const fn empty() -> Self {
        Self { words: Vec::new() }
    }

    pub(crate) fn try_with_len(bits: usize) -> Result<Self> {
        Ok(Self {
            words: try_filled_vec(bits.div_ceil(64), || 0)?,
        })
    }

    #[inline]
    pub(crate) fn get(&self, i: usize) -> bool {
        (self.words[i / 64] >> (i % 64)) & 1 != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize) {
        self.words[i / 64] |= 1 << (i % 64);
    }

    #[inline]
    pub(crate) fn unset(&mut self, i: usize) {
        self.words[i / 64] &= !(1 << (i % 64));
    }

    /// Index of the first set bit at or after word `*word`, advancing
    /// `*word` past empty words.
    pub(crate) fn next_set(&self, word: &mut usize) -> Option<usize> {
        while let Some(&bits) = self.words.get(*word) {
            if bits != 0 {
                return Some(*word * 64 + bits.trailing_zeros() as usize);
            }
            *word += 1;
        }
        None
    }

    /// Clear word `w` and return the bits it held.
    pub(crate) fn take_word(&mut self, w: usize) -> u64 {
        core::mem::take(&mut self.words[w])
    }

    pub(crate) fn word_count(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn clear(&mut self) {
        self.words.fill(0);
    }
}
