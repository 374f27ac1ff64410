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

mod murmurhash;

pub(crate) use self::murmurhash::MurmurHash3X64128;

/// The seed 9001 used by the filter update methods is a prime number that was
/// chosen very early on in experimental testing.
///
/// Choosing a seed is somewhat arbitrary, and the author cannot prove that
/// this particular seed is somehow superior to other seeds. What matters is
/// that every filter that may ever be combined uses the same one: the hash
/// projection is part of a filter's identity, and positions computed under a
/// different seed would be meaningless in its cells.
pub(crate) const DEFAULT_UPDATE_SEED: u64 = 9001;
