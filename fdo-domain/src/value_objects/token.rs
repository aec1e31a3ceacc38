// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Token Value Object
//!
//! A `Token` is the two-ASCII-character classifier carried at the front of
//! every P3 payload (`AT`, `at`, `DD`, `ff`, ...). Its only real behavior is
//! determining the byte width of the stream id that follows it on the wire;
//! everything else about a packet is opaque to the token itself.

use serde::{Deserialize, Serialize};

/// Curated token -> stream-id width table, reverse engineered from captured
/// traffic. Widths are in bytes.
const KNOWN_TOKENS: &[(&str, u8)] = &[
    ("AT", 2),
    ("at", 4),
    ("At", 3),
    ("f1", 2),
    ("ff", 2),
    ("DD", 2),
    ("Dd", 2),
    ("D3", 2),
    ("NX", 2),
    ("OT", 2),
    ("XS", 2),
    ("Aa", 2),
    ("aS", 2),
    ("iO", 2),
    ("ME", 2),
    ("fh", 2),
    ("iS", 2),
    ("CA", 2),
];

/// Stream-id width used for a token absent from [`KNOWN_TOKENS`]. Chosen so
/// that JSONL forensics over uncurated captures never hard-fails on an
/// unfamiliar token.
pub const FALLBACK_WIDTH: u8 = 2;

/// A two-character FDO token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token(String);

impl Token {
    /// Builds a token from its two ASCII characters. Does not validate
    /// membership in the curated table; unknown tokens are legal and fall
    /// back to [`FALLBACK_WIDTH`].
    pub fn new(chars: impl Into<String>) -> Self {
        Self(chars.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this token appears in the curated reverse-engineered table.
    pub fn is_known(&self) -> bool {
        KNOWN_TOKENS.iter().any(|(t, _)| *t == self.0)
    }

    /// Stream-id width in bytes: the curated value if known, else
    /// [`FALLBACK_WIDTH`].
    pub fn stream_id_width(&self) -> u8 {
        KNOWN_TOKENS
            .iter()
            .find(|(t, _)| *t == self.0)
            .map(|(_, w)| *w)
            .unwrap_or(FALLBACK_WIDTH)
    }

    /// The token encoded as exactly two ASCII bytes, NUL-padded if shorter.
    pub fn to_ascii_bytes(&self) -> [u8; 2] {
        let bytes = self.0.as_bytes();
        let mut out = [0u8; 2];
        let n = bytes.len().min(2);
        out[..n].copy_from_slice(&bytes[..n]);
        out
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_token_widths_match_curated_table() {
        assert_eq!(Token::new("AT").stream_id_width(), 2);
        assert_eq!(Token::new("at").stream_id_width(), 4);
        assert_eq!(Token::new("At").stream_id_width(), 3);
    }

    #[test]
    fn unknown_token_falls_back_to_width_two() {
        let t = Token::new("zz");
        assert!(!t.is_known());
        assert_eq!(t.stream_id_width(), FALLBACK_WIDTH);
    }

    #[test]
    fn ascii_bytes_are_nul_padded() {
        assert_eq!(Token::new("A").to_ascii_bytes(), [b'A', 0]);
        assert_eq!(Token::new("AT").to_ascii_bytes(), [b'A', b'T']);
    }
}
