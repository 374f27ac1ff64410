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

//! # Counting and Spectral Bloom Filters
//!
//! This library provides approximate multiplicity estimation over streams of
//! elements. Instead of the single bit per position of a classic Bloom
//! filter, both structures keep a small saturating counter (a *cell* of 1 to
//! 31 bits) per position, packed without padding into 64-bit words.
//!
//! Two filters are offered:
//!
//! - [`filter::CountingFilter`] increments every hashed position on insert.
//!   It is the cheapest estimator but over-counts systematically under hash
//!   collisions.
//! - [`filter::SpectralFilter`] increments only the positions currently
//!   holding the minimum value among the hashed positions, which tightens
//!   the estimate considerably. It additionally supports batched insertion
//!   through a transaction cache that collapses duplicate positions.
//!
//! Both report a lower-bound estimate through `count` and never produce
//! false negatives below the per-cell saturation ceiling.
//!
//! ```rust
//! use spectral::filter::SpectralFilter;
//!
//! let mut filter = SpectralFilter::with_accuracy(4, 100, 0.01);
//! for _ in 0..5 {
//!     filter.insert(&"apple");
//! }
//! assert!(filter.count(&"apple") >= 5);
//! assert_eq!(filter.count(&"grape"), 0);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod common;
pub mod data;
pub mod error;
pub mod filter;

mod hash;
