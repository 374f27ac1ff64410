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

use std::hash::Hash;
use std::marker::PhantomData;

use crate::data::CellArray;
use crate::error::Error;
use crate::filter::optimal_num_cells;
use crate::filter::optimal_num_hashes;
use crate::filter::Funnel;
use crate::filter::HashFunnel;
use crate::filter::HashStrategy;

/// Estimates how many times each distinct element was inserted.
///
/// Every insert increments the cell at each of the element's `k` hashed
/// positions, clamped at the per-cell ceiling `2^b - 1`; the estimate is the
/// minimum across those cells. Estimates are never below the true count
/// (capped at the ceiling) but may exceed it when elements collide.
///
/// # Examples
///
/// ```
/// use spectral::filter::CountingFilter;
///
/// let mut filter = CountingFilter::with_accuracy(4, 100, 0.01);
/// filter.insert(&"apple");
/// filter.insert(&"apple");
/// filter.insert(&"banana");
///
/// assert!(filter.count(&"apple") >= 2);
/// assert!(filter.count(&"banana") >= 1);
/// assert_eq!(filter.count(&"grape"), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CountingFilter<T, F = HashFunnel> {
    cells: CellArray,
    num_hashes: u8,
    strategy: HashStrategy,
    funnel: F,
    marker: PhantomData<fn(&T)>,
}

impl<T: Hash> CountingFilter<T> {
    /// Creates a filter sized for `expected_items` distinct elements at the
    /// given false-positive probability, with `bits_per_cell`-bit counters,
    /// the default strategy and the default [`HashFunnel`].
    ///
    /// `expected_items == 0` is treated as 1.
    ///
    /// # Panics
    ///
    /// Panics if `fpp` is not in (0.0, 1.0), `bits_per_cell` is outside
    /// `[1, 31]`, or the derived number of hash functions leaves `[1, 255]`.
    pub fn with_accuracy(bits_per_cell: u32, expected_items: u64, fpp: f64) -> Self {
        Self::with_config(
            bits_per_cell,
            expected_items,
            fpp,
            HashStrategy::DoubleHash64,
            HashFunnel,
        )
    }
}

impl<T, F: Funnel<T>> CountingFilter<T, F> {
    /// Creates a filter with an explicit strategy and funnel.
    ///
    /// See [`with_accuracy`](CountingFilter::with_accuracy) for sizing and
    /// panics.
    pub fn with_config(
        bits_per_cell: u32,
        expected_items: u64,
        fpp: f64,
        strategy: HashStrategy,
        funnel: F,
    ) -> Self {
        assert!(
            fpp > 0.0 && fpp < 1.0,
            "fpp must be between 0.0 and 1.0 (exclusive)"
        );
        let expected_items = expected_items.max(1);
        let num_cells = optimal_num_cells(expected_items, fpp);
        let num_hashes = optimal_num_hashes(expected_items, num_cells);
        assert!(
            (1..=255).contains(&num_hashes),
            "num_hashes ({num_hashes}) must be between 1 and 255"
        );

        CountingFilter {
            cells: CellArray::new(num_cells, bits_per_cell),
            num_hashes: num_hashes as u8,
            strategy,
            funnel,
            marker: PhantomData,
        }
    }

    /// Inserts `item`, incrementing the cell at every hashed position.
    ///
    /// Returns whether any cell changed; `false` means every position was
    /// already saturated.
    pub fn insert(&mut self, item: &T) -> bool {
        self.strategy
            .put(item, &self.funnel, self.num_hashes, &mut self.cells)
    }

    /// Returns whether `item` might have been inserted. `false` is
    /// definitive.
    pub fn might_contain(&self, item: &T) -> bool {
        self.strategy
            .might_contain(item, &self.funnel, self.num_hashes, &self.cells)
    }

    /// Returns a lower-bound estimate of how many times `item` was
    /// inserted, capped at [`max_cell_value`](Self::max_cell_value).
    pub fn count(&self, item: &T) -> u32 {
        self.strategy
            .count(item, &self.funnel, self.num_hashes, &self.cells)
    }

    /// Adds the counts of `other` into this filter, saturating per cell.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Incompatible`](crate::error::ErrorKind) when the
    /// filters differ in size, cell width, hash count, strategy or funnel.
    pub fn union(&mut self, other: &Self) -> Result<(), Error>
    where
        F: PartialEq,
    {
        check_compatible(
            &self.cells,
            self.num_hashes,
            self.strategy,
            &other.cells,
            other.num_hashes,
            other.strategy,
            self.funnel == other.funnel,
        )?;
        self.cells.union(&other.cells);
        Ok(())
    }

    /// Resets all cells to zero. Dimensions are preserved.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Returns whether no element was ever counted.
    pub fn is_empty(&self) -> bool {
        self.cells.population_count() == 0
    }

    /// Number of cells (positions) in the filter.
    pub fn size(&self) -> u64 {
        self.cells.size()
    }

    /// Width of a single cell in bits.
    pub fn bits_per_cell(&self) -> u32 {
        self.cells.bits_per_cell()
    }

    /// The saturation ceiling `2^b - 1`; no estimate can exceed it.
    pub fn max_cell_value(&self) -> u32 {
        self.cells.cell_mask()
    }

    /// Number of hash functions applied per element.
    pub fn num_hashes(&self) -> u8 {
        self.num_hashes
    }

    /// The position-projection strategy in use.
    pub fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    /// The backing word buffer, for persistence.
    pub fn export_words(&self) -> &[u64] {
        self.cells.raw_words()
    }

    /// Rebinds the filter to an externally supplied word buffer, e.g. one
    /// previously obtained from [`export_words`](Self::export_words).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::SizeMismatch`](crate::error::ErrorKind) when the
    /// buffer does not hold exactly as many cells as this filter, and
    /// [`ErrorKind::InvalidDimension`](crate::error::ErrorKind) when it is
    /// empty.
    pub fn wrap(&mut self, words: Vec<u64>) -> Result<(), Error> {
        let cells = CellArray::from_words(words, self.cells.bits_per_cell())?;
        if cells.size() != self.cells.size() {
            return Err(
                Error::size_mismatch("word buffer does not match the filter size")
                    .with_context("buffer_cells", cells.size())
                    .with_context("filter_cells", self.cells.size()),
            );
        }
        self.cells = cells;
        Ok(())
    }
}

impl<T, F: Funnel<T> + PartialEq> PartialEq for CountingFilter<T, F> {
    fn eq(&self, other: &Self) -> bool {
        self.num_hashes == other.num_hashes
            && self.strategy == other.strategy
            && self.funnel == other.funnel
            && self.cells == other.cells
    }
}

impl<T, F: Funnel<T> + PartialEq> Eq for CountingFilter<T, F> {}

/// Shared compatibility check of the two filter facades.
pub(super) fn check_compatible(
    cells: &CellArray,
    num_hashes: u8,
    strategy: HashStrategy,
    other_cells: &CellArray,
    other_num_hashes: u8,
    other_strategy: HashStrategy,
    funnels_equal: bool,
) -> Result<(), Error> {
    if cells.size() != other_cells.size() {
        return Err(Error::incompatible("filters must have the same size")
            .with_context("self", cells.size())
            .with_context("other", other_cells.size()));
    }
    if cells.bits_per_cell() != other_cells.bits_per_cell() {
        return Err(
            Error::incompatible("filters must have the same cell width")
                .with_context("self", cells.bits_per_cell())
                .with_context("other", other_cells.bits_per_cell()),
        );
    }
    if num_hashes != other_num_hashes {
        return Err(
            Error::incompatible("filters must have the same number of hash functions")
                .with_context("self", num_hashes)
                .with_context("other", other_num_hashes),
        );
    }
    if strategy != other_strategy {
        return Err(Error::incompatible("filters must have the same strategy")
            .with_context("self", strategy.ordinal())
            .with_context("other", other_strategy.ordinal()));
    }
    if !funnels_equal {
        return Err(Error::incompatible("filters must have equal funnels"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_count() {
        let mut filter = CountingFilter::with_accuracy(4, 10, 0.01);
        assert!(filter.is_empty());
        assert_eq!(filter.count(&1u32), 0);

        for _ in 0..5 {
            filter.insert(&1u32);
        }
        assert!(filter.count(&1u32) >= 5);
        assert!(filter.might_contain(&1u32));
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_insert_reports_saturation() {
        let mut filter = CountingFilter::with_accuracy(1, 10, 0.01);
        assert!(filter.insert(&7u32));
        // One-bit cells saturate after a single hit.
        assert!(!filter.insert(&7u32));
        assert_eq!(filter.count(&7u32), 1);
    }

    #[test]
    fn test_clear_preserves_dimensions() {
        let mut filter = CountingFilter::with_accuracy(4, 100, 0.01);
        let size = filter.size();
        filter.insert(&42u64);
        filter.clear();
        assert!(filter.is_empty());
        assert_eq!(filter.count(&42u64), 0);
        assert_eq!(filter.size(), size);
    }

    #[test]
    fn test_equality_ignores_nothing_but_contents() {
        let mut left = CountingFilter::with_accuracy(4, 100, 0.01);
        let mut right = CountingFilter::with_accuracy(4, 100, 0.01);
        assert_eq!(left, right);

        left.insert(&"x");
        assert_ne!(left, right);
        right.insert(&"x");
        assert_eq!(left, right);
    }

    #[test]
    fn test_union_requires_compatibility() {
        let mut left = CountingFilter::<u32>::with_accuracy(4, 100, 0.01);
        let right = CountingFilter::<u32>::with_accuracy(4, 100, 0.02);
        let err = left.union(&right).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Incompatible);

        let right = CountingFilter::<u32>::with_config(
            4,
            100,
            0.01,
            HashStrategy::DoubleHash32,
            HashFunnel,
        );
        let err = left.union(&right).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Incompatible);
    }

    #[test]
    fn test_wrap_roundtrip() {
        let mut filter = CountingFilter::with_accuracy(4, 100, 0.01);
        filter.insert(&"persisted");
        let words = filter.export_words().to_vec();

        let mut restored = CountingFilter::with_accuracy(4, 100, 0.01);
        restored.wrap(words).unwrap();
        assert_eq!(filter, restored);
        assert!(restored.count(&"persisted") >= 1);
    }

    #[test]
    fn test_wrap_rejects_wrong_size() {
        let mut filter = CountingFilter::<u32>::with_accuracy(4, 100, 0.01);
        let err = filter.wrap(vec![0; 1]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SizeMismatch);
    }

    #[test]
    #[should_panic(expected = "fpp must be between")]
    fn test_invalid_fpp() {
        CountingFilter::<u32>::with_accuracy(4, 100, 1.5);
    }

    #[test]
    #[should_panic(expected = "bits_per_cell")]
    fn test_invalid_cell_width() {
        CountingFilter::<u32>::with_accuracy(32, 100, 0.01);
    }

    #[test]
    fn test_zero_expected_items_is_promoted() {
        let filter = CountingFilter::<u32>::with_accuracy(4, 0, 0.5);
        assert!(filter.size() >= 1);
        assert!(filter.num_hashes() >= 1);
    }
}
