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

//! The similarity cache: constant-time pairwise lookups over the
//! compacted triangle.
//!
//! A cache is filled once, either by [`SimilarityCache::build`] from a
//! graph's synset list plus a similarity function, or by
//! [`SimilarityCache::load`] from a file written by
//! [`SimilarityCache::save`]. It is immutable afterwards, so
//! [`SimilarityCache::query`] is safe to call from any number of
//! threads without synchronization.
//!
//! Every flavor of "no similarity here" - unknown id, trimmed-out
//! column, stored sentinel byte, empty cache - is reported as the
//! single out-of-band value `-1.0`, so callers need exactly one
//! sentinel check.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::format;
use crate::matrix::RowWindow;
use crate::quantize::{Quantizer, UNDEFINED_SIMILARITY};
use crate::triangle::TriangleBuilder;

/// Canonical file name for a cache stored inside a directory.
pub const SIMILARITIES_FILE: &str = "similarities";

/// Precomputed pairwise similarity cache over dense synset ids.
///
/// ```no_run
/// use synsim_core::SimilarityCache;
///
/// let synsets: Vec<u32> = (0..100).collect();
/// let cache = SimilarityCache::build(&synsets, |&a, &b| {
///     if a == b { 1.0 } else { 1.0 / (1.0 + a.abs_diff(b) as f32) }
/// })?;
/// assert_eq!(cache.query(7, 7), 1.0);
/// assert_eq!(cache.query(3, 9), cache.query(9, 3));
/// # Ok::<(), synsim_core::CacheError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimilarityCache {
    rows: Vec<RowWindow>,
    values: Vec<u8>,
    quantizer: Quantizer,
}

impl SimilarityCache {
    /// Create an empty cache. Every query answers `-1.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the cache from an ordered synset list and a similarity
    /// function, with default build settings.
    ///
    /// The slice index is the dense synset id. `sim` must be pure and
    /// symmetric with `sim(a, a) = 1`; see
    /// [`TriangleBuilder::build`](crate::TriangleBuilder::build).
    pub fn build<S, F>(synsets: &[S], sim: F) -> Result<Self>
    where
        S: Sync,
        F: Fn(&S, &S) -> f32 + Sync,
    {
        Self::build_with(&TriangleBuilder::new(), synsets, sim)
    }

    /// Compute the cache with an explicitly configured builder (block
    /// size, progress callback).
    pub fn build_with<S, F>(builder: &TriangleBuilder<'_>, synsets: &[S], sim: F) -> Result<Self>
    where
        S: Sync,
        F: Fn(&S, &S) -> f32 + Sync,
    {
        let (rows, values) = builder.build(synsets, sim)?;
        info!(
            rows = rows.len(),
            stored_bytes = values.len(),
            "similarity cache built"
        );
        Ok(Self {
            rows,
            values,
            quantizer: Quantizer::new(),
        })
    }

    /// Load a cache from a file written by [`save`](Self::save).
    ///
    /// Any failure - I/O, truncation, an index that violates the
    /// matrix invariants - returns `Err`, so no partially loaded cache
    /// can be observed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let (rows, values) = format::read_matrix(&mut reader)?;
        info!(
            path = %path.display(),
            rows = rows.len(),
            stored_bytes = values.len(),
            "similarity cache loaded"
        );
        Ok(Self {
            rows,
            values,
            quantizer: Quantizer::new(),
        })
    }

    /// Load from the canonical [`SIMILARITIES_FILE`] inside `dir`.
    pub fn load_in(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(dir.as_ref().join(SIMILARITIES_FILE))
    }

    /// Write the cache to `path` in the format of [`crate::format`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        format::write_matrix(&mut writer, &self.rows, &self.values)?;
        writer.flush()?;
        info!(
            path = %path.display(),
            rows = self.rows.len(),
            stored_bytes = self.values.len(),
            "similarity cache saved"
        );
        Ok(())
    }

    /// Save to the canonical [`SIMILARITIES_FILE`] inside `dir`.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<()> {
        self.save(dir.as_ref().join(SIMILARITIES_FILE))
    }

    /// Similarity between synsets `a` and `b`.
    ///
    /// `1.0` on the diagonal, `-1.0` for unknown ids and undefined
    /// pairs, the decoded stored score otherwise. Three bounds checks,
    /// one table index, no allocation; callable concurrently from any
    /// number of threads.
    #[inline]
    pub fn query(&self, a: usize, b: usize) -> f32 {
        let n = self.rows.len();
        if a >= n || b >= n {
            return UNDEFINED_SIMILARITY;
        }
        if a == b {
            return 1.0;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let row = &self.rows[lo];
        if hi < row.from || hi >= row.to {
            return UNDEFINED_SIMILARITY;
        }
        self.quantizer
            .decode_cached(self.values[row.offset + hi - row.from])
    }

    /// Raw stored byte for the pair, if its column is inside the
    /// stored window. Diagnostic counterpart of [`query`](Self::query);
    /// the diagonal is never stored and reports `None`.
    pub fn stored_byte(&self, a: usize, b: usize) -> Option<u8> {
        let n = self.rows.len();
        if a >= n || b >= n || a == b {
            return None;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let row = &self.rows[lo];
        row.contains(hi)
            .then(|| self.values[row.offset + hi - row.from])
    }

    /// Whether the cache holds no rows at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows (synsets) covered by the cache.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Number of stored value bytes.
    pub fn size_bytes(&self) -> usize {
        self.values.len()
    }

    /// Occurrences of `value` in the value array. Diagnostic; counting
    /// [`crate::NULLSIM`] reports how much storage interior gaps cost.
    pub fn count(&self, value: u8) -> usize {
        self.values.iter().filter(|&&v| v == value).count()
    }

    /// The row index, in row order.
    pub fn rows(&self) -> &[RowWindow] {
        &self.rows
    }

    /// The value array.
    pub fn values(&self) -> &[u8] {
        &self.values
    }
}
