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

/// Array of unsigned saturating counters of `b` bits each, `1 <= b <= 31`,
/// packed back to back into 64-bit words.
///
/// Every counter (*cell*) clamps at the ceiling `2^b - 1`; once saturated it
/// never changes again. Increments touch only the bits that differ between
/// the old and new value, which keeps updates cheap even when a cell
/// straddles a word boundary.
///
/// As a [`HashSink`], `set` performs a saturating *increment* rather than
/// storing a one — the filters feed hash positions to a `BitArray` and a
/// `CellArray` through the same contract, and "register a hit" means
/// different things to each.
#[derive(Debug, Clone)]
pub struct CellArray {
    block: BitBlock,
    bits_per_cell: u32,
    cell_mask: u32,
    num_cells: u64,
    /// Cached number of non-zero cells; `None` after adopting foreign words.
    set_cells: Option<u64>,
}

impl CellArray {
    /// Creates a zeroed array with room for at least `min_cells` cells of
    /// `bits_per_cell` bits each.
    ///
    /// The word buffer is sized to `ceil(min_cells * bits_per_cell / 64)`
    /// words and the addressable size is everything that fits, so
    /// [`size`](Self::size) may exceed `min_cells`.
    ///
    /// # Panics
    ///
    /// Panics if `min_cells` is 0 or `bits_per_cell` is outside `[1, 31]`.
    pub fn new(min_cells: u64, bits_per_cell: u32) -> Self {
        assert!(min_cells > 0, "min_cells must be greater than 0");
        assert!(
            (1..=31).contains(&bits_per_cell),
            "bits_per_cell ({bits_per_cell}) must be between 1 and 31"
        );
        let block = BitBlock::with_bit_capacity(min_cells * bits_per_cell as u64);
        let num_cells = block.num_words() as u64 * 64 / bits_per_cell as u64;
        CellArray {
            block,
            bits_per_cell,
            cell_mask: (1 << bits_per_cell) - 1,
            num_cells,
            set_cells: Some(0),
        }
    }

    /// Adopts an existing word buffer, e.g. one previously exported through
    /// [`raw_words`](Self::raw_words).
    ///
    /// The cached non-zero count is invalidated;
    /// [`population_count`](Self::population_count) recounts on demand.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidDimension`](crate::error::ErrorKind) if
    /// `words` is empty or `bits_per_cell` is outside `[1, 31]`.
    pub fn from_words(words: Vec<u64>, bits_per_cell: u32) -> Result<Self, Error> {
        if words.is_empty() {
            return Err(Error::invalid_dimension("word buffer is empty"));
        }
        if !(1..=31).contains(&bits_per_cell) {
            return Err(
                Error::invalid_dimension("bits_per_cell must be between 1 and 31")
                    .with_context("bits_per_cell", bits_per_cell),
            );
        }
        let block = BitBlock::from_words(words);
        let num_cells = block.num_words() as u64 * 64 / bits_per_cell as u64;
        Ok(CellArray {
            block,
            bits_per_cell,
            cell_mask: (1 << bits_per_cell) - 1,
            num_cells,
            set_cells: None,
        })
    }

    /// Number of addressable cells.
    pub fn size(&self) -> u64 {
        self.num_cells
    }

    /// Width of a cell in bits.
    pub fn bits_per_cell(&self) -> u32 {
        self.bits_per_cell
    }

    /// The saturation ceiling `2^b - 1`, which is also the bit mask of a
    /// cell.
    pub fn cell_mask(&self) -> u32 {
        self.cell_mask
    }

    /// Returns the value of cell `index`.
    pub fn get(&self, index: u64) -> u32 {
        self.block.load_cell(index, self.bits_per_cell, self.cell_mask)
    }

    /// Increments cell `index` by one, clamped at the ceiling.
    ///
    /// Returns whether the stored value changed.
    pub fn increment(&mut self, index: u64) -> bool {
        self.add(index, 1)
    }

    /// Adds `delta` to cell `index`, clamped at the ceiling. `delta == 0` is
    /// a no-op.
    ///
    /// Returns whether the stored value changed.
    pub fn add(&mut self, index: u64, delta: u32) -> bool {
        if delta == 0 {
            return false;
        }
        let value = self.get(index);
        if value == self.cell_mask {
            return false;
        }
        if value == 0 {
            if let Some(count) = self.set_cells.as_mut() {
                *count += 1;
            }
        }

        let next = (value as u64 + delta as u64).min(self.cell_mask as u64) as u32;
        self.block.xor_cell(index, self.bits_per_cell, value ^ next);
        true
    }

    /// Number of non-zero cells.
    ///
    /// Answered from a cache where possible; after
    /// [`from_words`](Self::from_words) the count is recomputed by a full
    /// scan.
    pub fn population_count(&self) -> u64 {
        match self.set_cells {
            Some(count) => count,
            None => (0..self.num_cells).filter(|&cell| self.get(cell) != 0).count() as u64,
        }
    }

    /// Zeros every word. A no-op when the array is already empty.
    pub fn clear(&mut self) {
        if self.population_count() > 0 {
            self.block.clear();
        }
        self.set_cells = Some(0);
    }

    /// Cell-wise saturating addition: for every `i`,
    /// `self[i] = min(ceiling, self[i] + other[i])`.
    ///
    /// # Panics
    ///
    /// Panics if the arrays differ in cell width or word length.
    pub fn union(&mut self, other: &CellArray) {
        assert!(
            self.bits_per_cell == other.bits_per_cell,
            "cell arrays must have the same cell width ({} != {})",
            self.bits_per_cell,
            other.bits_per_cell
        );
        assert!(
            self.block.num_words() == other.block.num_words(),
            "cell arrays must be of equal length ({} != {})",
            self.block.num_words(),
            other.block.num_words()
        );
        for cell in 0..self.num_cells {
            self.add(cell, other.get(cell));
        }
    }

    /// Cell-wise intersection is not defined for saturating counters and is
    /// intentionally left unimplemented.
    ///
    /// # Errors
    ///
    /// Always returns
    /// [`ErrorKind::UnsupportedOperation`](crate::error::ErrorKind).
    pub fn intersect(&mut self, _other: &CellArray) -> Result<(), Error> {
        Err(Error::unsupported(
            "intersect is not supported on cell arrays",
        ))
    }

    /// The backing word buffer.
    pub fn raw_words(&self) -> &[u64] {
        self.block.words()
    }

    /// Returns a cursor over `(index, value)` pairs of all non-zero cells,
    /// in ascending index order.
    pub fn cursor(&self) -> CellCursor<'_> {
        CellCursor {
            array: self,
            word: 0,
            cell: u64::MAX,
            value: 0,
        }
    }

    /// Like [`cursor`](Self::cursor), but zeros each word once the cursor
    /// has moved past it.
    ///
    /// After the cursor is exhausted every backing word is zero and
    /// [`population_count`](Self::population_count) is 0. While the
    /// traversal is in flight the cached count is invalid.
    pub fn clearing_cursor(&mut self) -> ClearingCellCursor<'_> {
        self.set_cells = None;
        ClearingCellCursor {
            array: self,
            word: 0,
            cell: u64::MAX,
            value: 0,
        }
    }
}

impl PartialEq for CellArray {
    fn eq(&self, other: &Self) -> bool {
        // The population cache is bookkeeping, not content.
        self.bits_per_cell == other.bits_per_cell && self.block == other.block
    }
}

impl Eq for CellArray {}

impl HashSink for CellArray {
    fn position_size(&self) -> u64 {
        self.size()
    }

    fn get(&self, index: u64) -> u32 {
        CellArray::get(self, index)
    }

    /// Registers a hit by incrementing the cell — see the type-level note
    /// on the sink contract.
    fn set(&mut self, index: u64) -> bool {
        self.increment(index)
    }
}

/// Cursor over the non-zero cells of a [`CellArray`].
///
/// See [`CellArray::cursor`].
#[derive(Debug)]
pub struct CellCursor<'a> {
    array: &'a CellArray,
    word: usize,
    cell: u64,
    value: u32,
}

impl Iterator for CellCursor<'_> {
    type Item = (u64, u32);

    fn next(&mut self) -> Option<(u64, u32)> {
        let width = self.array.bits_per_cell as u64;
        let num_cells = self.array.num_cells;
        let num_words = self.array.block.num_words();
        loop {
            // Mini-skip: advance cell by cell while we stay inside the
            // current word.
            let mut new_word;
            loop {
                self.cell = self.cell.wrapping_add(1);
                new_word = ((self.cell * width) >> 6) as usize;
                if new_word != self.word || self.cell >= num_cells {
                    break;
                }
                self.value = self.array.get(self.cell);
                if self.value != 0 {
                    break;
                }
            }
            if self.cell >= num_cells {
                return None;
            }
            if new_word == self.word {
                return Some((self.cell, self.value));
            }

            // Fast-skip whole zero words.
            let mut word = self.word + 1;
            while word < num_words && self.array.block.word(word) == 0 {
                word += 1;
            }
            self.word = word;
            if self.word >= num_words {
                return None;
            }

            // Realign the cell cursor to the first set bit of the new word.
            let high_bit = ((self.word as u64) << 6)
                + self.array.block.word(self.word).leading_zeros() as u64;
            let hint = high_bit / width;
            if hint >= self.cell {
                self.cell = hint;
                self.value = self.array.get(self.cell);
                return Some((self.cell, self.value));
            }
            // The first set bit belongs to a cell that straddles back into
            // already-visited territory; rewind and mini-skip from there.
            self.cell = hint;
        }
    }
}

/// Destructive cursor over the non-zero cells of a [`CellArray`].
///
/// See [`CellArray::clearing_cursor`].
#[derive(Debug)]
pub struct ClearingCellCursor<'a> {
    array: &'a mut CellArray,
    word: usize,
    cell: u64,
    value: u32,
}

impl Iterator for ClearingCellCursor<'_> {
    type Item = (u64, u32);

    fn next(&mut self) -> Option<(u64, u32)> {
        let width = self.array.bits_per_cell as u64;
        let num_cells = self.array.num_cells;
        let num_words = self.array.block.num_words();
        loop {
            let mut new_word;
            loop {
                self.cell = self.cell.wrapping_add(1);
                new_word = ((self.cell * width) >> 6) as usize;
                if new_word != self.word || self.cell >= num_cells {
                    break;
                }
                self.value = self.array.get(self.cell);
                if self.value != 0 {
                    break;
                }
            }
            if self.cell >= num_cells {
                // The final word still holds visited cells; drop it too.
                if self.word < num_words {
                    self.array.block.zero_word(self.word);
                }
                self.array.set_cells = Some(0);
                return None;
            }
            if new_word == self.word {
                return Some((self.cell, self.value));
            }

            // Leaving a word consumes it.
            self.array.block.zero_word(self.word);
            let mut word = self.word + 1;
            while word < num_words && self.array.block.word(word) == 0 {
                word += 1;
            }
            self.word = word;
            if self.word >= num_words {
                self.array.set_cells = Some(0);
                return None;
            }

            let high_bit = ((self.word as u64) << 6)
                + self.array.block.word(self.word).leading_zeros() as u64;
            let hint = high_bit / width;
            if hint >= self.cell {
                self.cell = hint;
                self.value = self.array.get(self.cell);
                return Some((self.cell, self.value));
            }
            self.cell = hint;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::common::RandomSource;
    use crate::common::XorShift64;

    #[test]
    fn test_unaligned_roundtrip() {
        let num_cells = 1000;
        let mut cells = CellArray::new(num_cells, 7);
        let mut rng = XorShift64::seeded(42);
        let mut written = Vec::new();
        for index in 0..num_cells {
            let value = (rng.next_u64() & 0x7f) as u32;
            written.push(value);
            cells.add(index, value);
            assert_eq!(cells.get(index), value, "during writes at index {index}");
        }
        for (index, &value) in written.iter().enumerate() {
            assert_eq!(cells.get(index as u64), value, "at index {index}");
        }
    }

    #[test]
    fn test_size_is_derived_from_words() {
        // 100 cells of 31 bits need 49 words, which fit 101 cells.
        let cells = CellArray::new(100, 31);
        assert_eq!(cells.size(), 101);
        assert_eq!(cells.cell_mask(), (1 << 31) - 1);

        // Exact fit when the width divides the word size.
        let cells = CellArray::new(64, 1);
        assert_eq!(cells.size(), 64);
    }

    #[test]
    fn test_increment_saturates_at_ceiling() {
        let mut cells = CellArray::new(100, 3);
        for round in 0..7 {
            assert!(cells.increment(5), "round {round}");
        }
        assert_eq!(cells.get(5), 7);
        assert!(!cells.increment(5));
        assert!(!cells.add(5, 100));
        assert_eq!(cells.get(5), 7);
    }

    #[test]
    fn test_add_clamps_and_skips_zero_delta() {
        let mut cells = CellArray::new(100, 4);
        assert!(!cells.add(3, 0));
        assert_eq!(cells.get(3), 0);
        assert!(cells.add(3, 9));
        assert_eq!(cells.get(3), 9);
        assert!(cells.add(3, 100));
        assert_eq!(cells.get(3), 15);
    }

    #[test]
    fn test_sink_set_is_an_increment() {
        let mut cells = CellArray::new(100, 4);
        assert!(HashSink::set(&mut cells, 7));
        assert!(HashSink::set(&mut cells, 7));
        assert_eq!(cells.get(7), 2);
    }

    #[test]
    fn test_population_count_tracks_zero_transitions() {
        let mut cells = CellArray::new(100, 4);
        assert_eq!(cells.population_count(), 0);
        cells.add(1, 3);
        cells.add(2, 1);
        cells.add(1, 1);
        assert_eq!(cells.population_count(), 2);
        cells.clear();
        assert_eq!(cells.population_count(), 0);
    }

    #[test]
    fn test_population_count_recounts_after_from_words() {
        let mut cells = CellArray::new(100, 7);
        cells.add(0, 1);
        cells.add(50, 13);
        cells.add(99, 127);
        let words = cells.raw_words().to_vec();

        let adopted = CellArray::from_words(words, 7).unwrap();
        assert_eq!(adopted.population_count(), 3);
        assert_eq!(adopted.get(50), 13);
        assert_eq!(adopted, cells);
    }

    #[test]
    fn test_from_words_rejects_bad_dimensions() {
        assert!(CellArray::from_words(vec![], 7).is_err());
        assert!(CellArray::from_words(vec![0; 4], 0).is_err());
        assert!(CellArray::from_words(vec![0; 4], 32).is_err());
    }

    fn seeded_contents(num_cells: u64, width: u32, seed: u64) -> (CellArray, BTreeMap<u64, u32>) {
        let ceiling = (1u64 << width) - 1;
        let mut cells = CellArray::new(num_cells, width);
        let mut expected = BTreeMap::new();
        let mut rng = XorShift64::seeded(seed);
        while expected.len() < num_cells as usize / 4 {
            let index = rng.next_below(num_cells);
            let value = rng.next_below(ceiling + 1) as u32;
            if value > 0 && !expected.contains_key(&index) {
                cells.add(index, value);
                expected.insert(index, value);
            }
        }
        (cells, expected)
    }

    #[test]
    fn test_cursor_yields_all_non_zero_cells_in_order() {
        let (cells, expected) = seeded_contents(10_000, 7, 1);
        let visited: Vec<(u64, u32)> = cells.cursor().collect();
        let expected: Vec<(u64, u32)> = expected.into_iter().collect();
        assert_eq!(visited, expected);

        // A second pass sees the same contents.
        assert_eq!(cells.cursor().count(), visited.len());
    }

    #[test]
    fn test_clearing_cursor_consumes_everything() {
        let (mut cells, expected) = seeded_contents(10_000, 7, 1);
        let visited: Vec<(u64, u32)> = cells.clearing_cursor().collect();
        let expected: Vec<(u64, u32)> = expected.into_iter().collect();
        assert_eq!(visited, expected);

        for &word in cells.raw_words() {
            assert_eq!(word, 0);
        }
        assert_eq!(cells.population_count(), 0);
    }

    #[test]
    fn test_clearing_cursor_is_idempotent_on_exhaustion() {
        let mut cells = CellArray::new(100, 5);
        cells.add(42, 3);
        let mut cursor = cells.clearing_cursor();
        assert_eq!(cursor.next(), Some((42, 3)));
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_cursor_handles_straddling_cells() {
        // With 7-bit cells, cells 9, 18, 27, ... straddle word boundaries.
        let mut cells = CellArray::new(64, 7);
        cells.add(9, 100);
        cells.add(18, 1);
        cells.add(19, 127);
        let visited: Vec<(u64, u32)> = cells.cursor().collect();
        assert_eq!(visited, vec![(9, 100), (18, 1), (19, 127)]);
    }

    #[test]
    fn test_union_is_saturating_addition() {
        let mut left = CellArray::new(200, 4);
        let mut right = CellArray::new(200, 4);
        left.add(0, 3);
        right.add(0, 5);
        left.add(1, 12);
        right.add(1, 12);
        right.add(2, 1);

        left.union(&right);
        assert_eq!(left.get(0), 8);
        assert_eq!(left.get(1), 15);
        assert_eq!(left.get(2), 1);
        assert_eq!(left.population_count(), 3);
    }

    #[test]
    #[should_panic(expected = "cell arrays must have the same cell width")]
    fn test_union_rejects_mismatched_widths() {
        let mut left = CellArray::new(100, 4);
        let right = CellArray::new(100, 5);
        left.union(&right);
    }

    #[test]
    fn test_intersect_is_unsupported() {
        let mut left = CellArray::new(100, 4);
        let right = CellArray::new(100, 4);
        let err = left.intersect(&right).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedOperation);
    }
}
