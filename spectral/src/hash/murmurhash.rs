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

use std::hash::Hasher;

use byteorder::ByteOrder;
use byteorder::LE;

const C1: u64 = 0x87c37b91114253d5;
const C2: u64 = 0x4cf5ad432745937f;

/// Streaming MurmurHash3, x64 128-bit variant.
///
/// A fast non-cryptographic hash with good avalanche behavior. The full
/// 16-byte digest is available through [`finish128`](Self::finish128); the
/// `Hasher` impl reports the low half only.
#[derive(Debug, Clone)]
pub(crate) struct MurmurHash3X64128 {
    h1: u64,
    h2: u64,
    processed: u64,
    tail: [u8; 16],
    tail_len: usize,
}

impl MurmurHash3X64128 {
    pub fn with_seed(seed: u64) -> Self {
        MurmurHash3X64128 {
            h1: seed,
            h2: seed,
            processed: 0,
            tail: [0; 16],
            tail_len: 0,
        }
    }

    /// Returns the two little-endian 64-bit halves of the 128-bit digest.
    pub fn finish128(&self) -> (u64, u64) {
        let mut h1 = self.h1;
        let mut h2 = self.h2;
        let total = self.processed + self.tail_len as u64;

        // Mix the 1..=15 byte tail, high lane first.
        if self.tail_len > 8 {
            let mut lane = [0u8; 8];
            lane[..self.tail_len - 8].copy_from_slice(&self.tail[8..self.tail_len]);
            h2 ^= scramble_k2(u64::from_le_bytes(lane));
        }
        if self.tail_len > 0 {
            let mut lane = [0u8; 8];
            let len = self.tail_len.min(8);
            lane[..len].copy_from_slice(&self.tail[..len]);
            h1 ^= scramble_k1(u64::from_le_bytes(lane));
        }

        h1 ^= total;
        h2 ^= total;
        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);
        h1 = fmix64(h1);
        h2 = fmix64(h2);
        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);
        (h1, h2)
    }

    #[inline]
    fn mix_block(&mut self, k1: u64, k2: u64) {
        self.h1 ^= scramble_k1(k1);
        self.h1 = self.h1.rotate_left(27).wrapping_add(self.h2);
        self.h1 = self.h1.wrapping_mul(5).wrapping_add(0x52dce729);

        self.h2 ^= scramble_k2(k2);
        self.h2 = self.h2.rotate_left(31).wrapping_add(self.h1);
        self.h2 = self.h2.wrapping_mul(5).wrapping_add(0x38495ab5);

        self.processed += 16;
    }
}

impl Hasher for MurmurHash3X64128 {
    fn finish(&self) -> u64 {
        self.finish128().0
    }

    fn write(&mut self, mut bytes: &[u8]) {
        // Complete a previously buffered partial block first.
        if self.tail_len > 0 {
            let wanted = 16 - self.tail_len;
            if bytes.len() < wanted {
                self.tail[self.tail_len..self.tail_len + bytes.len()].copy_from_slice(bytes);
                self.tail_len += bytes.len();
                return;
            }
            self.tail[self.tail_len..].copy_from_slice(&bytes[..wanted]);
            let k1 = LE::read_u64(&self.tail[..8]);
            let k2 = LE::read_u64(&self.tail[8..]);
            self.mix_block(k1, k2);
            self.tail_len = 0;
            bytes = &bytes[wanted..];
        }

        let mut blocks = bytes.chunks_exact(16);
        for block in blocks.by_ref() {
            self.mix_block(LE::read_u64(&block[..8]), LE::read_u64(&block[8..]));
        }

        let rest = blocks.remainder();
        self.tail[..rest.len()].copy_from_slice(rest);
        self.tail_len = rest.len();
    }
}

#[inline]
fn scramble_k1(k1: u64) -> u64 {
    k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2)
}

#[inline]
fn scramble_k2(k2: u64) -> u64 {
    k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1)
}

/// Finalization mix: force all bits of a hash block to avalanche.
#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^ (k >> 33)
}
