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

//! Bit-packed storage for filter positions.
//!
//! Both structures in this module pack their state into plain `u64` words:
//!
//! - [`BitArray`] keeps one bit per position and is used by the spectral
//!   filter as a transaction cache that collapses duplicate positions.
//! - [`CellArray`] keeps an unsigned saturating counter of 1 to 31 bits per
//!   position, packed back to back with no per-cell alignment, so a cell may
//!   straddle two words.
//!
//! The hash strategies address both through the [`HashSink`] trait and are
//! monomorphized per sink type, so position updates never go through a
//! vtable.

mod bit_array;
mod bit_block;
mod cell_array;

pub use self::bit_array::BitArray;
pub use self::bit_array::ClearingBits;
pub use self::cell_array::CellArray;
pub use self::cell_array::CellCursor;
pub use self::cell_array::ClearingCellCursor;

pub(crate) use self::bit_block::BitBlock;

/// Receives hash positions from a filter strategy.
///
/// The trait captures the narrow waist between a hash strategy and whatever
/// backs the positions: the strategy only ever needs the number of
/// addressable positions, the value currently stored at one, and a way to
/// register a hit.
///
/// Note that `set` means "register a hit", not "store a one": [`BitArray`]
/// turns a hit into a set bit while [`CellArray`] turns it into a saturating
/// increment. See [`CellArray::set`] for the rationale.
pub trait HashSink {
    /// Number of addressable positions in this sink.
    fn position_size(&self) -> u64;

    /// Returns the value stored at `index`.
    fn get(&self, index: u64) -> u32;

    /// Registers a hit at `index` and returns whether the stored value
    /// changed.
    fn set(&mut self, index: u64) -> bool;
}
