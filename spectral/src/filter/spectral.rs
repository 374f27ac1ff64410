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

use crate::data::BitArray;
use crate::data::CellArray;
use crate::error::Error;
use crate::filter::counting::check_compatible;
use crate::filter::optimal_num_cells;
use crate::filter::optimal_num_hashes;
use crate::filter::Funnel;
use crate::filter::HashFunnel;
use crate::filter::HashStrategy;

/// Multiplicity estimator that inserts by the *minimum-increment* rule.
///
/// On insert, only the hashed positions currently holding the minimum value
/// among the element's `k` positions are incremented. Cells that already
/// over-count (because other elements collided into them) are left alone,
/// which keeps estimates much closer to the truth than incrementing every
/// position — while `count` remains a lower bound of the true multiplicity,
/// capped at the per-cell ceiling.
///
/// Batched insertion is supported through a transaction cache: positions
/// marked by [`insert_to_batch`](Self::insert_to_batch) collapse into a bit
/// set and [`flush_batch`](Self::flush_batch) applies at most one increment
/// per distinct position, no matter how often it was marked. The cache and
/// the internal position scratch buffer are allocated on first use and
/// reused; a filter must therefore not interleave two batches.
///
/// # Examples
///
/// ```
/// use spectral::filter::SpectralFilter;
///
/// let mut filter = SpectralFilter::with_accuracy(7, 100, 0.01);
/// for _ in 0..10 {
///     filter.insert(&"apple");
/// }
/// assert!(filter.count(&"apple") >= 10);
/// ```
#[derive(Debug, Clone)]
pub struct SpectralFilter<T, F = HashFunnel> {
    cells: CellArray,
    num_hashes: u8,
    strategy: HashStrategy,
    funnel: F,
    /// Aggregates the positions of a batch; allocated on first use.
    transaction_cache: Option<BitArray>,
    /// Scratch space for one element's positions; allocated on first use.
    min_positions: Option<Vec<u64>>,
    marker: PhantomData<fn(&T)>,
}

impl<T: Hash> SpectralFilter<T> {
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

impl<T, F: Funnel<T>> SpectralFilter<T, F> {
    /// Creates a filter with an explicit strategy and funnel.
    ///
    /// See [`with_accuracy`](SpectralFilter::with_accuracy) for sizing and
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

        SpectralFilter {
            cells: CellArray::new(num_cells, bits_per_cell),
            num_hashes: num_hashes as u8,
            strategy,
            funnel,
            transaction_cache: None,
            min_positions: None,
            marker: PhantomData,
        }
    }

    /// Inserts `item` by incrementing only its currently minimum-valued
    /// positions, each at most once per call.
    pub fn insert(&mut self, item: &T) {
        let SpectralFilter {
            cells,
            num_hashes,
            strategy,
            funnel,
            min_positions,
            ..
        } = self;
        let scratch = min_positions.get_or_insert_with(|| vec![0; *num_hashes as usize]);
        let found = strategy.min_positions(item, funnel, *num_hashes, &*cells, scratch);

        // The same position can appear more than once among the k hashes;
        // sort and skip duplicates so it is incremented at most once.
        let collected = &mut scratch[..found];
        collected.sort_unstable();
        let mut last = u64::MAX;
        for &position in collected.iter() {
            if position != last {
                cells.increment(position);
                last = position;
            }
        }
    }

    /// Marks `item`'s minimum-valued positions in the transaction cache
    /// instead of incrementing them; duplicates across the whole batch
    /// collapse into single bits.
    ///
    /// Apply the batch with [`flush_batch`](Self::flush_batch).
    pub fn insert_to_batch(&mut self, item: &T) {
        let SpectralFilter {
            cells,
            num_hashes,
            strategy,
            funnel,
            transaction_cache,
            min_positions,
            ..
        } = self;
        let cache = transaction_cache.get_or_insert_with(|| BitArray::new(cells.size()));
        let scratch = min_positions.get_or_insert_with(|| vec![0; *num_hashes as usize]);
        let found = strategy.min_positions(item, funnel, *num_hashes, &*cells, scratch);
        for &position in &scratch[..found] {
            cache.set(position);
        }
    }

    /// Drains the transaction cache, incrementing every marked position
    /// exactly once. A no-op when no batch was started.
    pub fn flush_batch(&mut self) {
        let SpectralFilter {
            cells,
            transaction_cache,
            ..
        } = self;
        if let Some(cache) = transaction_cache.as_mut() {
            for position in cache.clearing_iter() {
                cells.increment(position);
            }
        }
    }

    /// Adds `delta` occurrences of `item` in one step, saturating each of
    /// its distinct positions. Unlike [`insert`](Self::insert) this touches
    /// *all* hashed positions, not only the minimum-valued ones.
    /// `delta == 0` is a no-op.
    pub fn insert_weighted(&mut self, item: &T, delta: u32) {
        if delta == 0 {
            return;
        }
        let SpectralFilter {
            cells,
            num_hashes,
            strategy,
            funnel,
            min_positions,
            ..
        } = self;
        let scratch = min_positions.get_or_insert_with(|| vec![0; *num_hashes as usize]);
        let found = strategy.positions(item, funnel, *num_hashes, cells.size(), scratch);

        let collected = &mut scratch[..found];
        collected.sort_unstable();
        let mut last = u64::MAX;
        for &position in collected.iter() {
            if position != last {
                cells.add(position, delta);
                last = position;
            }
        }
    }

    /// Returns whether `item` might have been inserted. `false` is
    /// definitive.
    pub fn might_contain(&self, item: &T) -> bool {
        self.strategy
            .might_contain(item, &self.funnel, self.num_hashes, &self.cells)
    }

    /// Returns a lower-bound estimate of how many times `item` was
    /// inserted, capped at [`max_cell_value`](Self::max_cell_value).
    ///
    /// Under batched insertion the estimate is additionally bounded above
    /// by the number of flushes that saw the element; ceiling and flush
    /// count are distinct bounds.
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

    /// Resets all cells to zero. Dimensions are preserved, and an
    /// un-flushed batch in the transaction cache is *not* discarded.
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

impl<T, F: Funnel<T> + PartialEq> PartialEq for SpectralFilter<T, F> {
    fn eq(&self, other: &Self) -> bool {
        // Scratch state is not content.
        self.num_hashes == other.num_hashes
            && self.strategy == other.strategy
            && self.funnel == other.funnel
            && self.cells == other.cells
    }
}

impl<T, F: Funnel<T> + PartialEq> Eq for SpectralFilter<T, F> {}
