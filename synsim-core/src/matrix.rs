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

//! Row descriptors for the compacted triangle matrix.
//!
//! The matrix stores, per row, only the contiguous column window that
//! still carries data after trimming leading and trailing sentinel
//! bytes. A row descriptor locates that window inside one shared value
//! array:
//!
//! ```text
//! row r:   [ .... NULLSIM run .... | from ........ to | .... NULLSIM run .... ]
//!                                    └── stored span ─┘
//! values:  [ row 0 span ][ row 1 span ][ row 2 span ] ...
//!            offset_0 = 0  offset_1      offset_2
//! ```
//!
//! Offsets form a strict prefix sum over the window sizes, the diagonal
//! is never materialized, and a fully trimmed row stores the empty
//! window `0..0`.

/// Per-row descriptor: the half-open column window `[from, to)` whose
/// bytes are physically stored, and the start of those bytes in the
/// value array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowWindow {
    /// Start index of this row's span in the value array.
    pub offset: usize,
    /// First stored column (inclusive). Always past the diagonal for
    /// non-empty windows.
    pub from: usize,
    /// One past the last stored column.
    pub to: usize,
}

impl RowWindow {
    /// Number of bytes stored for this row.
    #[inline]
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    /// Whether the row stores no bytes at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// Whether `col` falls inside the stored window.
    #[inline]
    pub fn contains(&self, col: usize) -> bool {
        col >= self.from && col < self.to
    }
}

/// Index of cell `(a, b)` with `a <= b` in a row-major dense upper
/// triangle that includes the diagonal.
#[inline]
pub(crate) fn pos(a: usize, b: usize, n: usize) -> usize {
    debug_assert!(a <= b && b < n, "({a},{b}) outside the {n}x{n} triangle");
    a * n + b - a * (a + 1) / 2
}

/// Check the structural invariants of a row index and return the total
/// number of value bytes it describes.
///
/// Rejects windows that leave `[r+1, n]`, windows with `from > to`, and
/// offsets that break the prefix sum. Used by the loader before any
/// payload allocation is sized from the descriptors.
pub(crate) fn validate(rows: &[RowWindow]) -> Result<usize, String> {
    let n = rows.len();
    let mut running = 0usize;
    for (r, row) in rows.iter().enumerate() {
        if row.from > row.to || row.to > n {
            return Err(format!(
                "row {r} window {}..{} out of bounds for {n} rows",
                row.from, row.to
            ));
        }
        if !row.is_empty() && row.from <= r {
            return Err(format!(
                "row {r} window starts at column {}, on or before the diagonal",
                row.from
            ));
        }
        if row.offset != running {
            return Err(format!(
                "row {r} offset {} breaks the prefix sum (expected {running})",
                row.offset
            ));
        }
        running += row.len();
    }
    Ok(running)
}

/// Check that no stored row starts or ends with a sentinel byte, i.e.
/// that trimming was exhaustive. Debug aid for freshly built matrices.
#[cfg(test)]
pub(crate) fn check_trimmed(rows: &[RowWindow], values: &[u8]) -> bool {
    use crate::quantize::NULLSIM;
    rows.iter().filter(|row| !row.is_empty()).all(|row| {
        values[row.offset] != NULLSIM && values[row.offset + row.len() - 1] != NULLSIM
    })
}
