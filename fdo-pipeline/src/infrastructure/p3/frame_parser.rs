// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FDO Detector (C5)
//!
//! Layers FDO-in-P3 detection on top of the domain's frame and packet
//! parsers ([`fdo_domain::parse_frame`], [`fdo_domain::parse_packet_header`]):
//! a P3 `DATA` frame whose payload parses as a packet header carries FDO; any
//! other packet type, or a payload whose token fails to parse, does not.

use fdo_domain::{parse_frame, parse_packet_header, CoreError, PacketType};

#[derive(Debug, Clone)]
pub struct FdoDetection {
    pub token: String,
    pub stream_id: u32,
    pub fdo_data: Vec<u8>,
}

/// Attempts to detect and extract FDO data from a single P3 frame.
///
/// Returns `Ok(None)` (not an error) when the frame is a well-formed P3
/// frame that simply doesn't carry FDO — a non-`DATA` packet type, empty
/// payload, or a payload whose token the curated table doesn't recognize
/// widely enough to parse. Returns `Err` only when the bytes aren't even a
/// valid P3 frame.
pub fn detect_fdo_in_frame(frame_bytes: &[u8]) -> Result<Option<FdoDetection>, CoreError> {
    let frame = parse_frame(frame_bytes)?;

    if !matches!(frame.packet_type, PacketType::Data) {
        return Ok(None);
    }
    if frame.data.is_empty() {
        return Ok(None);
    }

    match parse_packet_header(&frame.data) {
        Ok(packet) => Ok(Some(FdoDetection {
            token: packet.token.to_string(),
            stream_id: packet.stream_id.value(),
            fdo_data: packet.data,
        })),
        Err(_) => Ok(None),
    }
}

/// Cheap heuristic used by real-time UI hint paths that can't afford a full
/// frame parse: validates the P3 envelope, then checks that the first two
/// payload bytes look like a printable ASCII token.
pub fn quick_fdo_check(frame_bytes: &[u8]) -> bool {
    if !fdo_domain::quick_validate(frame_bytes) {
        return false;
    }
    let Ok(frame) = parse_frame(frame_bytes) else { return false };
    if frame.data.len() < 2 {
        return false;
    }
    let token_bytes: Vec<u8> = frame.data[..2].iter().copied().take_while(|&b| b != 0).collect();
    matches!(std::str::from_utf8(&token_bytes), Ok(s) if s.len() == 2 && s.chars().all(|c| c.is_ascii_graphic()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdo_domain::{build_packet, Token};

    fn build_frame(packet_type: u8, data: &[u8]) -> Vec<u8> {
        let length = (data.len() + 3) as u16;
        let mut frame = vec![0x5A, 0x00, 0x00];
        frame.extend_from_slice(&length.to_be_bytes());
        frame.push(1); // tx_seq
        frame.push(1); // rx_seq
        frame.push(packet_type);
        frame.extend_from_slice(data);
        frame.push(0x0D);
        frame
    }

    #[test]
    fn detects_fdo_in_data_frame() {
        let packet = build_packet(b"hello", 7, &Token::new("AT")).unwrap();
        let frame = build_frame(0x20, &packet);
        let detection = detect_fdo_in_frame(&frame).unwrap().unwrap();
        assert_eq!(detection.token, "AT");
        assert_eq!(detection.stream_id, 7);
        assert_eq!(detection.fdo_data, b"hello");
    }

    #[test]
    fn non_data_packet_is_not_fdo() {
        let frame = build_frame(0x24, b"xx");
        assert!(detect_fdo_in_frame(&frame).unwrap().is_none());
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(detect_fdo_in_frame(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn quick_check_accepts_printable_token() {
        let packet = build_packet(b"hello", 7, &Token::new("AT")).unwrap();
        let frame = build_frame(0x20, &packet);
        assert!(quick_fdo_check(&frame));
    }
}
