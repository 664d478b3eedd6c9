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

//! Byte quantization for similarity scores.
//!
//! Stored similarities are one octet each. Byte 255 is the [`NULLSIM`]
//! sentinel ("no similarity stored"); every other byte encodes a finite
//! score along the reciprocal curve `code = round(1/s)`:
//!
//! ```text
//! similarity:  1.0   0.5   0.333  0.25  ...  1/254      <= 1/254.5
//! byte code:     1     2      3     4   ...    254      255 (NULLSIM)
//! ```
//!
//! Path-length metrics concentrate near small positive scores, so the
//! reciprocal curve spends most of the code space on that region and a
//! single code on everything at or above 1.0. The mapping is lossy and
//! fixed: files written with it are only readable with exactly these
//! formulas, so [`encode`] and [`decode`] must not be re-derived.

/// Sentinel byte: no similarity stored for this cell.
pub const NULLSIM: u8 = 255;

/// Out-of-band similarity returned for undefined pairs. [`NULLSIM`]
/// decodes to this value.
pub const UNDEFINED_SIMILARITY: f32 = -1.0;

/// Quantize a similarity score into one byte.
///
/// Total over all `f32` inputs: non-finite scores and scores at or
/// below zero map to [`NULLSIM`]. Scores so small that the reciprocal
/// rounds to 255 or beyond also collapse into the sentinel, and scores
/// at or above 1.0 saturate at byte 1.
#[inline]
pub fn encode(sim: f32) -> u8 {
    if !sim.is_finite() || sim <= 0.0 {
        return NULLSIM;
    }
    let code = (1.0 / f64::from(sim)).round();
    if code >= f64::from(NULLSIM) {
        NULLSIM
    } else if code < 1.0 {
        1
    } else {
        code as u8
    }
}

/// Decode one byte back into a similarity score.
///
/// [`NULLSIM`] yields [`UNDEFINED_SIMILARITY`]; any other code yields
/// `1/code`, evaluated in f64 and truncated to f32. Byte 0 decodes to
/// `+inf` by that formula; [`encode`] never produces it, so it cannot
/// occur in a well-formed matrix.
#[inline]
pub fn decode(code: u8) -> f32 {
    if code == NULLSIM {
        UNDEFINED_SIMILARITY
    } else {
        (1.0 / f64::from(code)) as f32
    }
}

/// Precomputed decode table.
///
/// Query paths decode with a single array index instead of a branch and
/// a division. The table is read-only after construction and safe to
/// share across reader threads.
#[derive(Debug, Clone)]
pub struct Quantizer {
    table: [f32; 256],
}

impl Quantizer {
    pub fn new() -> Self {
        let mut table = [0.0f32; 256];
        for (code, slot) in table.iter_mut().enumerate() {
            *slot = decode(code as u8);
        }
        Self { table }
    }

    /// Table-driven [`decode`].
    #[inline]
    pub fn decode_cached(&self, code: u8) -> f32 {
        self.table[code as usize]
    }
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new()
    }
}
