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

//! Approximate multiplicity filters.
//!
//! Both filters hash an element to `k` positions in an array of `m`
//! saturating `b`-bit counters and estimate an element's multiplicity as the
//! minimum value across its positions. They differ in their insertion
//! policy:
//!
//! - [`CountingFilter`] increments every hashed position.
//! - [`SpectralFilter`] increments only the positions currently holding the
//!   minimum value, which avoids inflating cells that already over-count.
//!
//! # Sizing
//!
//! `m` and `k` are derived from the expected number of distinct elements
//! `n` and the target false-positive probability `p` with the classic Bloom
//! filter formulas; see [`optimal_num_cells`] and [`optimal_num_hashes`].
//!
//! ```rust
//! use spectral::filter::CountingFilter;
//! use spectral::filter::SpectralFilter;
//!
//! let mut counting = CountingFilter::with_accuracy(4, 1000, 0.01);
//! let mut spectral = SpectralFilter::with_accuracy(4, 1000, 0.01);
//!
//! for value in [1u32, 1, 1, 2] {
//!     counting.insert(&value);
//!     spectral.insert(&value);
//! }
//!
//! assert!(counting.count(&1) >= 3);
//! assert!(spectral.count(&1) >= 3);
//! ```
//!
//! # Batched insertion
//!
//! The spectral filter can defer inserts through a transaction cache, which
//! collapses every position marked during the batch into a single
//! increment:
//!
//! ```rust
//! use spectral::filter::SpectralFilter;
//!
//! let mut filter = SpectralFilter::with_accuracy(31, 1000, 0.01);
//! for value in [1u32, 2, 1, 1, 3] {
//!     filter.insert_to_batch(&value);
//! }
//! filter.flush_batch();
//!
//! // One flush bounds every element's count by 1.
//! assert_eq!(filter.count(&1), 1);
//! ```

mod counting;
mod funnel;
mod spectral;
mod strategy;

pub use self::counting::CountingFilter;
pub use self::funnel::BytesFunnel;
pub use self::funnel::Funnel;
pub use self::funnel::HashFunnel;
pub use self::spectral::SpectralFilter;
pub use self::strategy::HashStrategy;

/// Computes the number of cells `m` expected to achieve the target
/// false-positive probability for `expected_items` distinct elements.
///
/// Formula: `m = ceil(-n * ln(p) / ln(2)^2)`. A probability of exactly zero
/// falls back to the smallest positive double.
///
/// # Examples
///
/// ```
/// # use spectral::filter::optimal_num_cells;
/// let cells = optimal_num_cells(1000, 0.01);
/// assert!(cells > 9000 && cells < 10000); // ~9586 cells
/// ```
pub fn optimal_num_cells(expected_items: u64, fpp: f64) -> u64 {
    let p = if fpp == 0.0 { f64::from_bits(1) } else { fpp };
    let n = expected_items as f64;
    let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;
    (-n * p.ln() / ln2_squared).ceil() as u64
}

/// Computes the number of hash functions `k` that minimizes the
/// false-positive probability for `expected_items` elements spread over
/// `num_cells` cells.
///
/// Formula: `k = max(1, round(m / n * ln(2)))`.
///
/// # Examples
///
/// ```
/// # use spectral::filter::optimal_num_hashes;
/// assert_eq!(optimal_num_hashes(1000, 9586), 7); // optimal k ~= 6.64
/// ```
pub fn optimal_num_hashes(expected_items: u64, num_cells: u64) -> u32 {
    let k = (num_cells as f64 / expected_items as f64 * std::f64::consts::LN_2).round();
    (k as u32).max(1)
}
