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

//! Error types for the similarity cache.

use std::io;

use thiserror::Error;

/// Errors raised while building, saving, or loading a similarity cache.
///
/// Lookups never fail; an undefined pair is reported through the
/// `-1.0` sentinel instead.
#[derive(Debug, Error)]
pub enum CacheError {
    /// File open/read/write failure, including short reads of the
    /// value payload.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A buffer reservation was refused. The Phase 1 scratch triangle
    /// peaks near N²/2 bytes, so this is the expected failure mode for
    /// oversized graphs and for hostile row counts in a loaded file.
    #[error("allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },

    /// The file's row index violates the matrix invariants.
    #[error("corrupted similarity file: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
