// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # P3 Packet Value Object
//!
//! A packet is the payload carried inside a P3 DATA frame: a two-byte token,
//! a little-endian stream id of token-dependent width, then the atom's
//! compiled bytes. This module builds and parses that header.

use crate::error::CoreError;
use crate::value_objects::stream_id::StreamId;
use crate::value_objects::token::Token;

/// Outbound packet payload ceiling (token + stream id + data).
pub const MAX_OUTBOUND_SIZE: usize = 119;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub token: Token,
    pub stream_id: StreamId,
    pub data: Vec<u8>,
}

/// Header size in bytes (`token` + stream-id width) for `token`.
pub fn header_size(token: &Token) -> usize {
    2 + token.stream_id_width() as usize
}

/// Builds the wire bytes for a packet. Validates that `stream_id` fits the
/// token's width; the caller is responsible for keeping the total length
/// within [`MAX_OUTBOUND_SIZE`].
pub fn build_packet(data: &[u8], stream_id: u32, token: &Token) -> Result<Vec<u8>, CoreError> {
    let width = token.stream_id_width();
    let sid = StreamId::new(stream_id, width)?;

    let mut out = Vec::with_capacity(header_size(token) + data.len());
    out.extend_from_slice(&token.to_ascii_bytes());
    out.extend_from_slice(&sid.to_le_bytes(width));
    out.extend_from_slice(data);
    Ok(out)
}

/// Parses a packet's token/stream-id header. Unlike [`build_packet`], an
/// unrecognized token is accepted with a fallback width instead of being
/// rejected, since this path serves JSONL forensics over uncurated captures.
pub fn parse_packet_header(packet: &[u8]) -> Result<Packet, CoreError> {
    if packet.len() < 2 {
        return Err(CoreError::parse(0, "packet shorter than a token"));
    }
    let token_str = std::str::from_utf8(&packet[..2])
        .map_err(|_| CoreError::parse(0, "token bytes are not valid ASCII"))?
        .trim_end_matches('\0')
        .to_string();
    let token = Token::new(token_str);
    let width = token.stream_id_width();

    if packet.len() < 2 + width as usize {
        return Err(CoreError::parse(0, "packet too short for its token's stream-id width"));
    }

    let stream_id = StreamId::from_le_bytes(&packet[2..2 + width as usize], width)?;
    let data = packet[2 + width as usize..].to_vec();

    Ok(Packet { token, stream_id, data })
}

/// Bytes of wire overhead (header only, no data) a packet for `token` costs.
pub fn calculate_packet_overhead(token: &Token) -> usize {
    header_size(token)
}

/// Whether `data.len()` bytes of payload fit alongside `token`'s header in
/// one outbound packet. Used by dry-run estimation, not the hot compile
/// path, which relies on the chunker's own flush logic instead.
pub fn validate_packet_size(token: &Token, data_len: usize) -> Result<(), CoreError> {
    let total = header_size(token) + data_len;
    if total > MAX_OUTBOUND_SIZE {
        return Err(CoreError::resource_cap(format!(
            "packet of {total} bytes exceeds the {MAX_OUTBOUND_SIZE}-byte outbound limit"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_round_trips() {
        let token = Token::new("AT");
        let packet = build_packet(&[1, 2, 3], 42, &token).unwrap();
        let parsed = parse_packet_header(&packet).unwrap();
        assert_eq!(parsed.token, token);
        assert_eq!(parsed.stream_id.value(), 42);
        assert_eq!(parsed.data, vec![1, 2, 3]);
    }

    #[test]
    fn build_rejects_stream_id_overflowing_width() {
        let token = Token::new("AT"); // width 2
        assert!(build_packet(&[], 1 << 16, &token).is_err());
    }

    #[test]
    fn parse_falls_back_on_unknown_token() {
        let mut bytes = b"zz".to_vec();
        bytes.extend_from_slice(&[0x01, 0x00]); // width-2 fallback stream id
        bytes.extend_from_slice(&[9, 9]);
        let parsed = parse_packet_header(&bytes).unwrap();
        assert_eq!(parsed.token.as_str(), "zz");
        assert_eq!(parsed.stream_id.value(), 1);
        assert_eq!(parsed.data, vec![9, 9]);
    }

    #[test]
    fn validate_packet_size_flags_overflow() {
        let token = Token::new("AT");
        assert!(validate_packet_size(&token, MAX_OUTBOUND_SIZE - header_size(&token)).is_ok());
        assert!(validate_packet_size(&token, MAX_OUTBOUND_SIZE).is_err());
    }
}
