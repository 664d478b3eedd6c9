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

//! On-disk format for the compacted similarity matrix.
//!
//! Fixed-width little-endian integers, no compression, no checksum:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ Row count N                        u64        │
//! ├───────────────────────────────────────────────┤
//! │ Row descriptors, N entries:                   │
//! │   offset                           u64        │
//! │   from                             u64        │
//! │   to                               u64        │
//! ├───────────────────────────────────────────────┤
//! │ Value payload                      L raw bytes│
//! │   L = offset[N-1] + (to[N-1] - from[N-1])     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The payload length is not stored; the reader derives it from the
//! last descriptor after validating the whole index, so a truncated or
//! tampered file fails before any oversized allocation is attempted.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CacheError, Result};
use crate::matrix::{self, RowWindow};

/// Bytes per serialized row descriptor.
const ROW_DESCRIPTOR_BYTES: usize = 3 * 8;

/// Serialize a row index and value array.
pub fn write_matrix<W: Write>(writer: &mut W, rows: &[RowWindow], values: &[u8]) -> Result<()> {
    writer.write_u64::<LittleEndian>(rows.len() as u64)?;
    for row in rows {
        writer.write_u64::<LittleEndian>(row.offset as u64)?;
        writer.write_u64::<LittleEndian>(row.from as u64)?;
        writer.write_u64::<LittleEndian>(row.to as u64)?;
    }
    writer.write_all(values)?;
    Ok(())
}

/// Deserialize a row index and value array.
///
/// Short reads surface as [`CacheError::Io`]; an index that violates
/// the matrix invariants surfaces as [`CacheError::Corrupted`]; a row
/// count whose descriptors cannot be reserved surfaces as
/// [`CacheError::Allocation`].
pub fn read_matrix<R: Read>(reader: &mut R) -> Result<(Vec<RowWindow>, Vec<u8>)> {
    let n = reader.read_u64::<LittleEndian>()?;
    let n = usize::try_from(n)
        .map_err(|_| CacheError::Corrupted(format!("row count {n} exceeds the address space")))?;

    let mut rows: Vec<RowWindow> = Vec::new();
    rows.try_reserve_exact(n).map_err(|_| CacheError::Allocation {
        bytes: n.saturating_mul(ROW_DESCRIPTOR_BYTES),
    })?;
    for _ in 0..n {
        let offset = read_index_field(reader, "offset")?;
        let from = read_index_field(reader, "from")?;
        let to = read_index_field(reader, "to")?;
        rows.push(RowWindow { offset, from, to });
    }

    let payload_len = matrix::validate(&rows).map_err(CacheError::Corrupted)?;

    let mut values: Vec<u8> = Vec::new();
    values
        .try_reserve_exact(payload_len)
        .map_err(|_| CacheError::Allocation { bytes: payload_len })?;
    values.resize(payload_len, 0);
    reader.read_exact(&mut values)?;

    Ok((rows, values))
}

fn read_index_field<R: Read>(reader: &mut R, field: &'static str) -> Result<usize> {
    let value = reader.read_u64::<LittleEndian>()?;
    usize::try_from(value)
        .map_err(|_| CacheError::Corrupted(format!("{field} {value} exceeds the address space")))
}
