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

use crate::data::HashSink;
use crate::error::Error;
use crate::filter::Funnel;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::MurmurHash3X64128;

/// Projects an element to `k` positions in `[0, m)` by double hashing over
/// a 128-bit element hash.
///
/// Strategies are stateless and identified by a stable ordinal that is part
/// of any persisted filter's identity: the order of the variants can never
/// change, variants can never be removed, and new variants may only be
/// appended. Negative ordinals are reserved for user-defined strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashStrategy {
    /// Double-hashes over the two signed 32-bit halves of the first 64
    /// output bits. Negative combined hashes are mapped into range by
    /// bitwise complement, not absolute value, so `i32::MIN` maps to
    /// `i32::MAX`. Ordinal 0.
    DoubleHash32,
    /// Double-hashes over the full 128 output bits, read as two signed
    /// little-endian 64-bit halves, adding the high half per round and
    /// masking the sign bit away. Ordinal 1.
    DoubleHash64,
}

impl HashStrategy {
    /// The stable identifier of this strategy.
    pub fn ordinal(self) -> i8 {
        match self {
            HashStrategy::DoubleHash32 => 0,
            HashStrategy::DoubleHash64 => 1,
        }
    }

    /// Looks a strategy up by its stable identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidDimension`](crate::error::ErrorKind) for
    /// ordinals that do not name a built-in strategy.
    pub fn from_ordinal(ordinal: i8) -> Result<Self, Error> {
        match ordinal {
            0 => Ok(HashStrategy::DoubleHash32),
            1 => Ok(HashStrategy::DoubleHash64),
            _ => Err(Error::invalid_dimension("unknown hash strategy ordinal")
                .with_context("ordinal", ordinal)),
        }
    }

    /// Fills `out` with the `num_hashes` positions of `item` in
    /// `[0, position_size)` and returns how many were written.
    pub fn positions<T, F: Funnel<T>>(
        &self,
        item: &T,
        funnel: &F,
        num_hashes: u8,
        position_size: u64,
        out: &mut [u64],
    ) -> usize {
        let hash = hash128(item, funnel);
        let mut filled = 0;
        for position in self.position_seq(hash, num_hashes, position_size) {
            out[filled] = position;
            filled += 1;
        }
        filled
    }

    /// Registers a hit at every position of `item`.
    ///
    /// Returns whether any stored value changed.
    pub fn put<T, F: Funnel<T>, S: HashSink>(
        &self,
        item: &T,
        funnel: &F,
        num_hashes: u8,
        sink: &mut S,
    ) -> bool {
        let hash = hash128(item, funnel);
        let mut changed = false;
        for position in self.position_seq(hash, num_hashes, sink.position_size()) {
            changed |= sink.set(position);
        }
        changed
    }

    /// Collects into `out` the subset of `item`'s positions whose stored
    /// values equal the minimum value observed across all of them, and
    /// returns how many were written.
    ///
    /// The two variants disagree on how a "new minimum" is detected:
    /// [`DoubleHash32`](Self::DoubleHash32) restarts the collection on a
    /// strictly *greater* value while
    /// [`DoubleHash64`](Self::DoubleHash64) restarts on a strictly
    /// *smaller* one. The discrepancy is part of each strategy's persisted
    /// behavior and is preserved as is.
    pub fn min_positions<T, F: Funnel<T>, S: HashSink>(
        &self,
        item: &T,
        funnel: &F,
        num_hashes: u8,
        sink: &S,
        out: &mut [u64],
    ) -> usize {
        let hash = hash128(item, funnel);
        let mut min_value: i64 = -1;
        let mut filled = 0;
        match self {
            HashStrategy::DoubleHash32 => {
                for position in self.position_seq(hash, num_hashes, sink.position_size()) {
                    let value = i64::from(sink.get(position));
                    if value > min_value {
                        min_value = value;
                        out[0] = position;
                        filled = 1;
                    } else if value == min_value {
                        out[filled] = position;
                        filled += 1;
                    }
                }
            }
            HashStrategy::DoubleHash64 => {
                for position in self.position_seq(hash, num_hashes, sink.position_size()) {
                    let value = i64::from(sink.get(position));
                    if value < min_value || min_value == -1 {
                        min_value = value;
                        out[0] = position;
                        filled = 1;
                    } else if value == min_value {
                        out[filled] = position;
                        filled += 1;
                    }
                }
            }
        }
        filled
    }

    /// Returns whether every position of `item` holds a non-zero value,
    /// short-circuiting on the first zero.
    pub fn might_contain<T, F: Funnel<T>, S: HashSink>(
        &self,
        item: &T,
        funnel: &F,
        num_hashes: u8,
        sink: &S,
    ) -> bool {
        let hash = hash128(item, funnel);
        self.position_seq(hash, num_hashes, sink.position_size())
            .all(|position| sink.get(position) > 0)
    }

    /// Returns 0 if any position of `item` holds a zero, otherwise the
    /// minimum value across its positions.
    pub fn count<T, F: Funnel<T>, S: HashSink>(
        &self,
        item: &T,
        funnel: &F,
        num_hashes: u8,
        sink: &S,
    ) -> u32 {
        let hash = hash128(item, funnel);
        let mut min_value = u32::MAX;
        for position in self.position_seq(hash, num_hashes, sink.position_size()) {
            let value = sink.get(position);
            if value == 0 {
                return 0;
            }
            min_value = min_value.min(value);
        }
        min_value
    }

    fn position_seq(self, hash: (u64, u64), num_hashes: u8, position_size: u64) -> Positions {
        match self {
            HashStrategy::DoubleHash32 => Positions::Narrow {
                hash1: hash.0 as i32,
                hash2: (hash.0 >> 32) as i32,
                round: 0,
                rounds: num_hashes,
                position_size,
            },
            HashStrategy::DoubleHash64 => Positions::Wide {
                combined: hash.0 as i64,
                hash2: hash.1 as i64,
                remaining: num_hashes,
                position_size,
            },
        }
    }
}

fn hash128<T, F: Funnel<T>>(item: &T, funnel: &F) -> (u64, u64) {
    let mut hasher = MurmurHash3X64128::with_seed(DEFAULT_UPDATE_SEED);
    funnel.fill(item, &mut hasher);
    hasher.finish128()
}

/// Lazy double-hash position sequence of a single element.
enum Positions {
    Narrow {
        hash1: i32,
        hash2: i32,
        round: u8,
        rounds: u8,
        position_size: u64,
    },
    Wide {
        combined: i64,
        hash2: i64,
        remaining: u8,
        position_size: u64,
    },
}

impl Iterator for Positions {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match self {
            Positions::Narrow {
                hash1,
                hash2,
                round,
                rounds,
                position_size,
            } => {
                if round >= rounds {
                    return None;
                }
                *round += 1;
                let mut combined = hash1.wrapping_add((*round as i32).wrapping_mul(*hash2));
                // Map negative hashes into range by flipping all bits; this
                // is not an absolute value, i32::MIN becomes i32::MAX.
                if combined < 0 {
                    combined = !combined;
                }
                Some(combined as u64 % *position_size)
            }
            Positions::Wide {
                combined,
                hash2,
                remaining,
                position_size,
            } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                let position = (*combined & i64::MAX) as u64 % *position_size;
                *combined = combined.wrapping_add(*hash2);
                Some(position)
            }
        }
    }
}
