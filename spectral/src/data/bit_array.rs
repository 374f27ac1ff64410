// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::data::BitBlock;
use crate::data::HashSink;
use crate::error::Error;

/// Dense bit set over packed 64-bit words with an O(1) population count.
///
/// The spectral filter uses this as a transaction cache: positions marked
/// during a batch collapse into single bits and are later drained, and
/// consumed, through [`clearing_iter`](Self::clearing_iter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitArray {
    block: BitBlock,
    bit_count: u64,
}

impl BitArray {
    /// Creates a zeroed bit set with room for at least `min_bits` bits.
    ///
    /// The addressable size is rounded up to a whole number of words; see
    /// [`size`](Self::size).
    ///
    /// # Panics
    ///
    /// Panics if `min_bits` is 0.
    pub fn new(min_bits: u64) -> Self {
        assert!(min_bits > 0, "min_bits must be greater than 0");
        BitArray {
            block: BitBlock::with_bit_capacity(min_bits),
            bit_count: 0,
        }
    }

    /// Adopts an existing word buffer, e.g. one previously exported through
    /// [`raw_words`](Self::raw_words).
    ///
    /// The population count is recomputed from the adopted words.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidDimension`](crate::error::ErrorKind) if
    /// `words` is empty.
    pub fn from_words(words: Vec<u64>) -> Result<Self, Error> {
        if words.is_empty() {
            return Err(Error::invalid_dimension("word buffer is empty"));
        }
        let block = BitBlock::from_words(words);
        let bit_count = block.count_ones();
        Ok(BitArray { block, bit_count })
    }

    /// Number of addressable bits (a multiple of 64).
    pub fn size(&self) -> u64 {
        self.block.num_words() as u64 * 64
    }

    /// Returns the bit at `index` as 0 or 1.
    pub fn get(&self, index: u64) -> u32 {
        self.block.bit(index)
    }

    /// Sets the bit at `index` and returns whether it was previously zero.
    pub fn set(&mut self, index: u64) -> bool {
        if self.block.bit(index) == 0 {
            self.block.set_bit(index);
            self.bit_count += 1;
            return true;
        }
        false
    }

    /// Number of set bits.
    pub fn population_count(&self) -> u64 {
        self.bit_count
    }

    /// Zeros every word. A no-op when the set is already empty.
    pub fn clear(&mut self) {
        if self.bit_count > 0 {
            self.block.clear();
            self.bit_count = 0;
        }
    }

    /// In-place bitwise OR with `other`.
    ///
    /// # Panics
    ///
    /// Panics if the two sets are not backed by the same number of words.
    pub fn union(&mut self, other: &BitArray) {
        assert!(
            self.block.num_words() == other.block.num_words(),
            "bit arrays must be of equal length ({} != {})",
            self.block.num_words(),
            other.block.num_words()
        );
        self.bit_count = self.block.or_assign(&other.block);
    }

    /// In-place bitwise AND with `other`.
    ///
    /// # Panics
    ///
    /// Panics if the two sets are not backed by the same number of words.
    pub fn intersect(&mut self, other: &BitArray) {
        assert!(
            self.block.num_words() == other.block.num_words(),
            "bit arrays must be of equal length ({} != {})",
            self.block.num_words(),
            other.block.num_words()
        );
        self.bit_count = self.block.and_assign(&other.block);
    }

    /// The backing word buffer.
    pub fn raw_words(&self) -> &[u64] {
        self.block.words()
    }

    /// Returns an iterator over the indices of the set bits, in ascending
    /// order, clearing each bit before its index is yielded.
    ///
    /// Once the iterator is exhausted every backing word is zero and
    /// [`population_count`](Self::population_count) is 0.
    pub fn clearing_iter(&mut self) -> ClearingBits<'_> {
        ClearingBits {
            array: self,
            word: 0,
        }
    }
}

impl HashSink for BitArray {
    fn position_size(&self) -> u64 {
        self.size()
    }

    fn get(&self, index: u64) -> u32 {
        BitArray::get(self, index)
    }

    fn set(&mut self, index: u64) -> bool {
        BitArray::set(self, index)
    }
}

/// Destructive iterator over the set bits of a [`BitArray`].
///
/// See [`BitArray::clearing_iter`].
#[derive(Debug)]
pub struct ClearingBits<'a> {
    array: &'a mut BitArray,
    word: usize,
}

impl Iterator for ClearingBits<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let num_words = self.array.block.num_words();
        while self.word < num_words && self.array.block.word(self.word) == 0 {
            self.word += 1;
        }
        if self.word >= num_words {
            return None;
        }

        // Isolate the lowest set bit, consume it, and translate it back to
        // a global index.
        let word = self.array.block.word(self.word);
        let lowest = word & word.wrapping_neg();
        self.array.block.xor_word(self.word, lowest);
        self.array.bit_count -= 1;
        Some(((self.word as u64) << 6) + lowest.trailing_zeros() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::common::RandomSource;
    use crate::common::XorShift64;

    #[test]
    fn test_set_reports_transitions() {
        let mut bits = BitArray::new(128);
        assert!(bits.set(3));
        assert!(!bits.set(3));
        assert_eq!(bits.get(3), 1);
        assert_eq!(bits.get(4), 0);
        assert_eq!(bits.population_count(), 1);
    }

    #[test]
    fn test_from_words_recounts_bits() {
        let mut bits = BitArray::new(10_000);
        let mut rng = XorShift64::seeded(3);
        for _ in 0..500 {
            bits.set(rng.next_below(10_000));
        }
        let words = bits.raw_words().to_vec();

        let adopted = BitArray::from_words(words).unwrap();
        assert_eq!(adopted.population_count(), bits.population_count());
        assert_eq!(adopted, bits);
    }

    #[test]
    fn test_from_words_rejects_empty_buffer() {
        let err = BitArray::from_words(vec![]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidDimension);
    }

    #[test]
    fn test_size_rounds_up_to_words() {
        assert_eq!(BitArray::new(1).size(), 64);
        assert_eq!(BitArray::new(64).size(), 64);
        assert_eq!(BitArray::new(65).size(), 128);
    }

    #[test]
    fn test_clearing_iter_drains_in_ascending_order() {
        let range = 10_000;
        let mut expected = BTreeSet::new();
        let mut bits = BitArray::new(range);
        let mut rng = XorShift64::seeded(1);
        while expected.len() < 1000 {
            let value = rng.next_below(range);
            assert_eq!(expected.insert(value), bits.set(value));
        }
        assert_eq!(bits.population_count(), 1000);

        let drained: Vec<u64> = bits.clearing_iter().collect();
        let expected: Vec<u64> = expected.into_iter().collect();
        assert_eq!(drained, expected);

        assert_eq!(bits.population_count(), 0);
        for &word in bits.raw_words() {
            assert_eq!(word, 0);
        }
    }

    #[test]
    fn test_clearing_iter_is_idempotent_on_exhaustion() {
        let mut bits = BitArray::new(64);
        bits.set(17);
        let mut iter = bits.clearing_iter();
        assert_eq!(iter.next(), Some(17));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_union_recomputes_population() {
        let mut left = BitArray::new(128);
        let mut right = BitArray::new(128);
        left.set(1);
        left.set(70);
        right.set(70);
        right.set(99);

        left.union(&right);
        assert_eq!(left.population_count(), 3);
        assert_eq!(left.get(1), 1);
        assert_eq!(left.get(70), 1);
        assert_eq!(left.get(99), 1);
    }

    #[test]
    fn test_intersect_recomputes_population() {
        let mut left = BitArray::new(128);
        let mut right = BitArray::new(128);
        left.set(1);
        left.set(70);
        right.set(70);
        right.set(99);

        left.intersect(&right);
        assert_eq!(left.population_count(), 1);
        assert_eq!(left.get(1), 0);
        assert_eq!(left.get(70), 1);
    }

    #[test]
    #[should_panic(expected = "bit arrays must be of equal length")]
    fn test_union_rejects_mismatched_lengths() {
        let mut left = BitArray::new(64);
        let right = BitArray::new(128);
        left.union(&right);
    }

    #[test]
    fn test_clear_resets_population() {
        let mut bits = BitArray::new(256);
        bits.set(0);
        bits.set(255);
        bits.clear();
        assert_eq!(bits.population_count(), 0);
        assert_eq!(bits.get(0), 0);
        bits.clear();
        assert_eq!(bits.population_count(), 0);
    }
}
