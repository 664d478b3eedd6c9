// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Precomputed pairwise similarity cache for lexical-semantic graphs.
//!
//! For a WordNet-scale graph (N around 10^5 synsets, ~5 billion
//! unordered pairs) the full dense triangle of similarity scores is
//! tens of gigabytes, yet most cells are undefined: synsets in
//! different part-of-speech classes or unrelated subgraphs have no
//! similarity at all. This crate computes the triangle once, in
//! parallel, quantizes every score to one byte, keeps only each row's
//! populated column band, and serves any pair in constant time.
//!
//! ```text
//!  synsets + sim(a,b) ──> TriangleBuilder ──> RowWindow index + value array
//!                              │                       │
//!                              │                  SimilarityCache ──> query(a,b) in O(1)
//!                              │                       │
//!                              └── progress hooks      └── save / load ("similarities" file)
//! ```
//!
//! ## Modules
//!
//! - [`quantize`]: the byte codec (reciprocal curve, 255 = sentinel)
//!   and the 256-entry decode table
//! - [`triangle`]: two-phase parallel construction (dense scratch
//!   triangle, per-row trim, sequential compaction)
//! - [`matrix`]: row descriptors and index validation
//! - [`cache`]: the immutable cache with its O(1) lookup path
//! - [`format`]: the little-endian on-disk codec
//!
//! ## Undefined similarities
//!
//! The graph and the metric are collaborators, not part of this crate.
//! The similarity function may declare any pair undefined by returning
//! a non-finite value or anything at or below zero; the cache answers
//! `-1.0` for those pairs, for unknown ids, and on an empty cache, so
//! callers make exactly one sentinel check.

pub mod cache;
pub mod error;
pub mod format;
pub mod matrix;
pub mod quantize;
pub mod triangle;

pub use cache::{SimilarityCache, SIMILARITIES_FILE};
pub use error::{CacheError, Result};
pub use matrix::RowWindow;
pub use quantize::{decode, encode, Quantizer, NULLSIM, UNDEFINED_SIMILARITY};
pub use triangle::{BuildProgress, TriangleBuilder};
