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

use std::collections::HashMap;

use googletest::assert_that;
use googletest::prelude::contains_substring;
use spectral::error::ErrorKind;
use spectral::filter::CountingFilter;

#[test]
fn test_basic_counts_are_lower_bounds() {
    let mut filter = CountingFilter::with_accuracy(4, 10, 0.01);
    let mut inserted = HashMap::new();
    inserted.insert(1u32, 5u32);
    inserted.insert(2u32, 3u32);
    inserted.insert(7u32, 3u32);

    for (&value, &times) in &inserted {
        for _ in 0..times {
            filter.insert(&value);
        }
    }

    for (&value, &times) in &inserted {
        let estimate = filter.count(&value);
        assert!(
            estimate >= times,
            "count for {value}: expected >= {times}, found {estimate}"
        );
        assert!(filter.might_contain(&value));
    }
}

#[test]
fn test_counts_cap_at_the_cell_ceiling() {
    let mut filter = CountingFilter::with_accuracy(2, 10, 0.01);
    for _ in 0..100 {
        filter.insert(&1u32);
    }
    assert_eq!(filter.count(&1u32), filter.max_cell_value());
    assert_eq!(filter.max_cell_value(), 3);
}

#[test]
fn test_union_adds_counts() {
    let mut left = CountingFilter::with_accuracy(7, 100, 0.01);
    let mut right = CountingFilter::with_accuracy(7, 100, 0.01);
    for _ in 0..4 {
        left.insert(&10u64);
    }
    for _ in 0..9 {
        right.insert(&10u64);
    }
    for _ in 0..2 {
        right.insert(&20u64);
    }

    left.union(&right).unwrap();
    assert!(left.count(&10u64) >= 13);
    assert!(left.count(&20u64) >= 2);
}

#[test]
fn test_union_of_incompatible_filters_fails() {
    let mut left = CountingFilter::<u32>::with_accuracy(4, 100, 0.01);
    let right = CountingFilter::<u32>::with_accuracy(4, 200, 0.01);

    let err = left.union(&right).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Incompatible);
    assert_that!(err.message(), contains_substring("same size"));
}

#[test]
fn test_export_and_wrap_roundtrip() {
    let mut filter = CountingFilter::with_accuracy(4, 50, 0.01);
    for value in 0u32..20 {
        filter.insert(&value);
    }
    let words = filter.export_words().to_vec();

    let mut restored = CountingFilter::with_accuracy(4, 50, 0.01);
    restored.wrap(words).unwrap();
    assert_eq!(filter, restored);
    for value in 0u32..20 {
        assert!(restored.count(&value) >= 1);
    }
}

#[test]
fn test_wrap_with_wrong_buffer_size_fails() {
    let mut filter = CountingFilter::<u32>::with_accuracy(4, 50, 0.01);
    let mut words = filter.export_words().to_vec();
    words.push(0);

    let err = filter.wrap(words).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    assert_that!(err.message(), contains_substring("does not match"));
}
