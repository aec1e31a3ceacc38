// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stream Id Value Object
//!
//! A stream id is an unsigned integer carried little-endian after a token,
//! bounded by that token's stream-id width. `StreamId` stores the integer and
//! validates it fits a given width so width overflows are caught at
//! construction instead of silently truncating on encode.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamId(u32);

impl StreamId {
    /// Validates that `value` fits in `width` bytes before constructing.
    pub fn new(value: u32, width: u8) -> Result<Self, CoreError> {
        let max = max_for_width(width);
        if u64::from(value) > max {
            return Err(CoreError::Parse {
                line: 0,
                message: format!("stream id {value} does not fit in {width}-byte width (max {max})"),
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Encodes the stream id little-endian into exactly `width` bytes.
    pub fn to_le_bytes(&self, width: u8) -> Vec<u8> {
        self.0.to_le_bytes()[..width as usize].to_vec()
    }

    /// Decodes a little-endian stream id from the first `width` bytes of
    /// `bytes`.
    pub fn from_le_bytes(bytes: &[u8], width: u8) -> Result<Self, CoreError> {
        if bytes.len() < width as usize {
            return Err(CoreError::Parse {
                line: 0,
                message: format!("need {width} bytes for stream id, got {}", bytes.len()),
            });
        }
        let mut buf = [0u8; 4];
        buf[..width as usize].copy_from_slice(&bytes[..width as usize]);
        Ok(Self(u32::from_le_bytes(buf)))
    }
}

fn max_for_width(width: u8) -> u64 {
    (1u64 << (8 * u32::from(width))) - 1
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_value_above_width_max() {
        assert!(StreamId::new(256, 1).is_err());
        assert!(StreamId::new(255, 1).is_ok());
    }

    #[test]
    fn round_trips_through_le_bytes() {
        let id = StreamId::new(0x1234, 2).unwrap();
        let bytes = id.to_le_bytes(2);
        assert_eq!(bytes, vec![0x34, 0x12]);
        let back = StreamId::from_le_bytes(&bytes, 2).unwrap();
        assert_eq!(back, id);
    }
}
