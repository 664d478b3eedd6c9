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

//! Two-phase parallel construction of the compacted similarity triangle.
//!
//! A row's stored window cannot be known before its similarities are
//! computed, so writing straight into the compacted layout is
//! impossible. Construction therefore runs in two phases over one
//! scratch buffer holding the dense upper triangle (diagonal included):
//!
//! ```text
//! Phase 1 (parallel, blocked over rows):
//!   [row 0 band][row 1 band][row 2 band]...        scratch, N(N+1)/2 bytes
//!    each task fills its own band, then trims leading/trailing
//!    NULLSIM runs into a RowWindow
//!
//! Phase 2 (sequential):
//!   slide each row's surviving span left to the running offset,
//!   truncate, shrink     ->     value array + prefix-sum offsets
//! ```
//!
//! Row bands are disjoint `split_at_mut` slices of the scratch buffer,
//! so Phase 1 needs no locks. The optional progress callback is the one
//! shared resource; it sits behind a mutex and fires at most once per
//! completed block of rows.
//!
//! The output is deterministic as long as the similarity function is
//! pure; scheduling order never affects a row's window.

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::matrix::{pos, RowWindow};
use crate::quantize::{encode, NULLSIM};

/// Rows per Phase 1 work unit. Small enough to keep the work-stealing
/// pool busy near the short tail rows, large enough that the progress
/// mutex stays cold.
const DEFAULT_ROWS_PER_BLOCK: usize = 64;

/// Snapshot handed to the progress callback after a completed block.
#[derive(Debug, Clone, Copy)]
pub struct BuildProgress {
    /// Rows fully computed and trimmed so far.
    pub rows_done: usize,
    /// Total rows in the build.
    pub total_rows: usize,
    /// Similarity evaluations performed so far (diagonal included).
    pub pairs_done: u64,
}

/// Progress counters plus the callback they feed, guarded as one unit
/// so snapshots arrive in order.
struct ProgressState<'cb> {
    callback: Box<dyn FnMut(BuildProgress) + Send + 'cb>,
    rows_done: usize,
    pairs_done: u64,
}

/// Builder for the row index and value array of a similarity cache.
///
/// ```no_run
/// use synsim_core::TriangleBuilder;
///
/// let words = vec!["amount", "measure", "quantity"];
/// let (rows, values) = TriangleBuilder::new()
///     .build(&words, |a, b| if a == b || a.len() == b.len() { 1.0 } else { -1.0 })?;
/// # Ok::<(), synsim_core::CacheError>(())
/// ```
pub struct TriangleBuilder<'cb> {
    rows_per_block: usize,
    progress: Option<Mutex<ProgressState<'cb>>>,
}

impl<'cb> TriangleBuilder<'cb> {
    pub fn new() -> Self {
        Self {
            rows_per_block: DEFAULT_ROWS_PER_BLOCK,
            progress: None,
        }
    }

    /// Override the Phase 1 block size (rows per work unit).
    pub fn rows_per_block(mut self, rows: usize) -> Self {
        self.rows_per_block = rows.max(1);
        self
    }

    /// Install a progress callback. It is invoked under a mutex, at
    /// most once per completed block, with cumulative counts.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(BuildProgress) + Send + 'cb,
    {
        self.progress = Some(Mutex::new(ProgressState {
            callback: Box::new(callback),
            rows_done: 0,
            pairs_done: 0,
        }));
        self
    }

    /// Compute the upper triangle of `sim` over `synsets` and compact
    /// it into a row index plus value array.
    ///
    /// `synsets` must be ordered by dense id; the slice index is the
    /// id. `sim` must be pure and symmetric with `sim(a, a) = 1`;
    /// non-finite results and results at or below zero are recorded as
    /// "undefined". The only failure mode is scratch allocation, which
    /// peaks at `N(N+1)/2` bytes.
    pub fn build<S, F>(&self, synsets: &[S], sim: F) -> Result<(Vec<RowWindow>, Vec<u8>)>
    where
        S: Sync,
        F: Fn(&S, &S) -> f32 + Sync,
    {
        let n = synsets.len();
        if n == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let cells = n
            .checked_mul(n + 1)
            .map(|c| c / 2)
            .ok_or(CacheError::Allocation { bytes: usize::MAX })?;

        let mut scratch: Vec<u8> = Vec::new();
        scratch
            .try_reserve_exact(cells)
            .map_err(|_| CacheError::Allocation { bytes: cells })?;
        scratch.resize(cells, NULLSIM);

        let mut windows = vec![RowWindow::default(); n];

        debug!(rows = n, scratch_bytes = cells, "phase 1: dense triangle");
        self.fill_and_trim(synsets, &sim, &mut scratch, &mut windows);

        debug!(rows = n, "phase 2: compaction");
        let stored = compact(&mut scratch, &mut windows, n);
        scratch.truncate(stored);
        scratch.shrink_to_fit();

        debug!(rows = n, stored_bytes = stored, "triangle compacted");
        Ok((windows, scratch))
    }

    /// Phase 1: fill each row's band of the scratch triangle and trim
    /// it to its surviving column window.
    fn fill_and_trim<S, F>(
        &self,
        synsets: &[S],
        sim: &F,
        scratch: &mut [u8],
        windows: &mut [RowWindow],
    ) where
        S: Sync,
        F: Fn(&S, &S) -> f32 + Sync,
    {
        let n = synsets.len();

        // Partition the scratch triangle into per-row bands. Row a owns
        // the n-a cells for columns [a, n), so every task writes a
        // disjoint range.
        let mut bands: Vec<(usize, &mut [u8])> = Vec::with_capacity(n);
        let mut rest = scratch;
        for a in 0..n {
            let (band, tail) = rest.split_at_mut(n - a);
            bands.push((a, band));
            rest = tail;
        }

        bands
            .par_chunks_mut(self.rows_per_block)
            .zip(windows.par_chunks_mut(self.rows_per_block))
            .for_each(|(block, block_windows)| {
                let mut block_pairs = 0u64;
                for ((a, band), window) in block.iter_mut().zip(block_windows.iter_mut()) {
                    let row = *a;
                    let anchor = &synsets[row];
                    for (j, cell) in band.iter_mut().enumerate() {
                        *cell = encode(sim(anchor, &synsets[row + j]));
                    }
                    block_pairs += band.len() as u64;
                    *window = trim(row, band);
                }

                if let Some(progress) = &self.progress {
                    let mut state = progress.lock();
                    state.rows_done += block.len();
                    state.pairs_done += block_pairs;
                    let snapshot = BuildProgress {
                        rows_done: state.rows_done,
                        total_rows: n,
                        pairs_done: state.pairs_done,
                    };
                    (state.callback)(snapshot);
                }
            });
    }
}

impl Default for TriangleBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan a row's band inward from both ends and report the surviving
/// column window. `band[0]` is the diagonal: implicit, never stored,
/// skipped by the scan. A band with nothing left collapses to `0..0`.
fn trim(row: usize, band: &[u8]) -> RowWindow {
    let mut lo = 1;
    while lo < band.len() && band[lo] == NULLSIM {
        lo += 1;
    }
    if lo == band.len() {
        return RowWindow::default();
    }
    let mut hi = band.len();
    while band[hi - 1] == NULLSIM {
        hi -= 1;
    }
    RowWindow {
        offset: 0,
        from: row + lo,
        to: row + hi,
    }
}

/// Phase 2: slide each row's surviving span down to the running output
/// offset and stamp the prefix-sum offsets. Returns the total stored
/// byte count. Sequential because each offset depends on the previous
/// row's size.
fn compact(scratch: &mut [u8], windows: &mut [RowWindow], n: usize) -> usize {
    let mut running = 0usize;
    for (row, window) in windows.iter_mut().enumerate() {
        let len = window.len();
        if len > 0 {
            let begin = pos(row, window.from, n);
            scratch.copy_within(begin..begin + len, running);
        }
        window.offset = running;
        running += len;
    }
    running
}
