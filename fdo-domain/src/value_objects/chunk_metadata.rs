// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Metadata Value Object
//!
//! Per-packet bookkeeping the chunker attaches to each emitted packet: its
//! size, its position in the emission order, and whether it continues a
//! segmented run. `is_continuation` is what lets a receiver reassemble a
//! multi-packet atom without seeing the original source again.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub size: usize,
    pub sequence_index: usize,
    pub is_continuation: bool,
}

impl ChunkMetadata {
    pub fn new(size: usize, sequence_index: usize, is_continuation: bool) -> Self {
        Self { size, sequence_index, is_continuation }
    }
}
