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
use std::hash::Hasher;

/// Turns an element into the byte stream that gets hashed.
///
/// Implementations must be deterministic: the same element must always
/// produce the same bytes, and distinct elements should produce distinct
/// bytes. The funnel is part of a filter's identity — two filters can only
/// be combined or compared when their funnels are equal — so funnels are
/// best modeled as fieldless unit structs, where every instance of a type
/// compares equal.
pub trait Funnel<T: ?Sized> {
    /// Writes a deterministic byte serialization of `item` into the hasher.
    fn fill<H: Hasher>(&self, item: &T, into: &mut H);
}

/// Funnel that defers to the element's [`Hash`] implementation.
///
/// This is the default funnel: any `T: Hash` works out of the box. Note
/// that `Hash` implementations of the primitive integer types write their
/// native-endian bytes, so serialized word buffers are only portable
/// between machines of the same endianness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HashFunnel;

impl<T: Hash + ?Sized> Funnel<T> for HashFunnel {
    fn fill<H: Hasher>(&self, item: &T, into: &mut H) {
        item.hash(into);
    }
}

/// Funnel for elements that already are byte strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BytesFunnel;

impl<T: AsRef<[u8]> + ?Sized> Funnel<T> for BytesFunnel {
    fn fill<H: Hasher>(&self, item: &T, into: &mut H) {
        into.write(item.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::MurmurHash3X64128;

    fn digest<T: ?Sized>(funnel: &impl Funnel<T>, item: &T) -> (u64, u64) {
        let mut hasher = MurmurHash3X64128::with_seed(0);
        funnel.fill(item, &mut hasher);
        hasher.finish128()
    }

    #[test]
    fn test_hash_funnel_is_deterministic() {
        assert_eq!(digest(&HashFunnel, &42u64), digest(&HashFunnel, &42u64));
        assert_ne!(digest(&HashFunnel, &42u64), digest(&HashFunnel, &43u64));
    }

    #[test]
    fn test_bytes_funnel_hashes_raw_bytes() {
        let via_slice = digest::<[u8]>(&BytesFunnel, b"spectral");
        let via_str = digest::<str>(&BytesFunnel, "spectral");
        assert_eq!(via_slice, via_str);
    }

    #[test]
    fn test_unit_funnels_compare_equal() {
        assert_eq!(HashFunnel, HashFunnel);
        assert_eq!(BytesFunnel, BytesFunnel);
    }
}
