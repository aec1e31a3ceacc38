// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AOLBUF Chunker (C4)
//!
//! Splits an FDO script into P3-sized packets: action blocks are kept
//! textually whole, oversize compiled atoms are segmented with the `0x80|k`
//! continuation marker, and `raw_data` atoms are sliced into independent
//! frames carrying the `00 05 76` non-FDO prefix.

use std::sync::Arc;

use tracing::{debug, warn};

use fdo_domain::value_objects::packet::{build_packet, header_size, MAX_OUTBOUND_SIZE};
use fdo_domain::value_objects::segment::{segment_data_if_needed, MAX_SEGMENT_SIZE};
use fdo_domain::{AtomCompiler, AtomKind, AtomUnit, ChunkMetadata, CoreError, Token};

use crate::infrastructure::atoms::{manual_encoder, parse_atoms, preprocess_script, validate_syntax, SyntaxReport};

/// Effective wire ceiling for `raw_data` frames, derived from empirical
/// analysis rather than [`MAX_OUTBOUND_SIZE`]; the two are intentionally not
/// unified.
const RAW_DATA_MAX_PAYLOAD: usize = 128;
const RAW_DATA_PREFIX: [u8; 3] = [0x00, 0x05, 0x76];

pub struct ChunkResult {
    pub chunks: Vec<Vec<u8>>,
    pub chunk_info: Vec<ChunkMetadata>,
}

pub struct ChunkerService {
    compiler: Arc<dyn AtomCompiler>,
}

impl ChunkerService {
    pub fn new(compiler: Arc<dyn AtomCompiler>) -> Self {
        Self { compiler }
    }

    pub async fn process_fdo_script(&self, fdo_script: &str, stream_id: u32, token: &Token) -> Result<ChunkResult, CoreError> {
        let units = parse_atoms(&preprocess_script(fdo_script));

        let header = header_size(token);
        let per_packet_cap = MAX_OUTBOUND_SIZE.checked_sub(header).filter(|cap| *cap > 0).ok_or_else(|| {
            CoreError::resource_cap(format!("token header of {header} bytes leaves no room for any payload"))
        })?;

        let mut cur: Vec<u8> = Vec::new();
        let mut packets: Vec<Vec<u8>> = Vec::new();
        let mut chunk_info: Vec<ChunkMetadata> = Vec::new();
        let mut in_segmented_run = false;

        let flush = |cur: &mut Vec<u8>,
                     packets: &mut Vec<Vec<u8>>,
                     chunk_info: &mut Vec<ChunkMetadata>,
                     in_segmented_run: bool|
         -> Result<(), CoreError> {
            if cur.is_empty() {
                return Ok(());
            }
            let packet = build_packet(cur, stream_id, token)?;
            chunk_info.push(ChunkMetadata::new(packet.len(), packets.len(), in_segmented_run));
            packets.push(packet);
            cur.clear();
            Ok(())
        };

        for unit in &units {
            if unit.is_raw_data() {
                flush(&mut cur, &mut packets, &mut chunk_info, in_segmented_run)?;
                for frame in self.compile_raw_data_frames(unit, stream_id, token, header)? {
                    chunk_info.push(ChunkMetadata::new(frame.len(), packets.len(), false));
                    packets.push(frame);
                }
                continue;
            }

            let compiled = self.compile_unit(unit).await?;
            if unit.is_action_block() && compiled.len() > MAX_SEGMENT_SIZE {
                warn!(
                    "action block at line {} exceeds {MAX_SEGMENT_SIZE} bytes ({} bytes)",
                    unit.line_start,
                    compiled.len()
                );
            }

            let segments = segment_data_if_needed(&compiled);
            if segments.len() > 1 {
                flush(&mut cur, &mut packets, &mut chunk_info, in_segmented_run)?;
                for (j, segment) in segments.iter().enumerate() {
                    let packet = build_packet(segment, stream_id, token)?;
                    let is_continuation = j > 0 || in_segmented_run;
                    chunk_info.push(ChunkMetadata::new(packet.len(), packets.len(), is_continuation));
                    packets.push(packet);
                }
                in_segmented_run = true;
            } else {
                let segment = &segments[0];
                if cur.len() + segment.len() > per_packet_cap {
                    flush(&mut cur, &mut packets, &mut chunk_info, in_segmented_run)?;
                }
                cur.extend_from_slice(segment);
            }
        }

        flush(&mut cur, &mut packets, &mut chunk_info, in_segmented_run)?;

        debug!("chunking produced {} packets from {} atom units", packets.len(), units.len());
        Ok(ChunkResult { chunks: packets, chunk_info })
    }

    async fn compile_unit(&self, unit: &AtomUnit) -> Result<Vec<u8>, CoreError> {
        if let Some(bytes) = manual_encoder::compile_line(&unit.content) {
            return Ok(bytes);
        }
        self.compiler.compile(&unit.content).await
    }

    fn compile_raw_data_frames(&self, unit: &AtomUnit, stream_id: u32, token: &Token, header: usize) -> Result<Vec<Vec<u8>>, CoreError> {
        let hex = extract_raw_data_hex(&unit.content)
            .ok_or_else(|| CoreError::parse(unit.line_start, "malformed raw_data literal, expected raw_data <\"HEX\">"))?;
        let raw_binary = hex::decode(&hex).map_err(|e| CoreError::parse(unit.line_start, format!("invalid hex in raw_data: {e}")))?;

        let max_data_per_frame = RAW_DATA_MAX_PAYLOAD
            .checked_sub(header + RAW_DATA_PREFIX.len())
            .filter(|n| *n > 0)
            .ok_or_else(|| CoreError::resource_cap(format!("token header too large for raw_data frames (token={token})")))?;

        let mut frames = Vec::new();
        for chunk in raw_binary.chunks(max_data_per_frame) {
            let mut prefixed = Vec::with_capacity(RAW_DATA_PREFIX.len() + chunk.len());
            prefixed.extend_from_slice(&RAW_DATA_PREFIX);
            prefixed.extend_from_slice(chunk);
            frames.push(build_packet(&prefixed, stream_id, token)?);
        }
        Ok(frames)
    }

    /// Syntax validation plus a full compile of the whole script, for
    /// authoring tools that want a stronger guarantee than `estimate`.
    pub async fn validate_script(&self, fdo_script: &str) -> (SyntaxReport, Result<usize, CoreError>) {
        let syntax = validate_syntax(fdo_script);
        let compiled = self.compiler.compile(fdo_script).await.map(|bytes| bytes.len());
        (syntax, compiled)
    }

    /// Projects packet count and action-block count without compiling
    /// anything — a rough estimate from raw content length, useful for
    /// script-authoring tooling that wants instant feedback.
    pub fn estimate_chunks(&self, fdo_script: &str, token: &Token) -> ChunkEstimate {
        let units = parse_atoms(&preprocess_script(fdo_script));
        let header = header_size(token);
        let max_payload_per_packet = MAX_OUTBOUND_SIZE.saturating_sub(header);

        let estimated_total_size: usize = units.iter().map(|u| u.content.len()).sum();
        let estimated_chunks = if max_payload_per_packet == 0 {
            0
        } else {
            estimated_total_size.div_ceil(max_payload_per_packet).max(1)
        };

        ChunkEstimate {
            atom_units: units.len(),
            action_blocks: units.iter().filter(|u| u.is_action_block()).count(),
            estimated_compiled_size: estimated_total_size,
            estimated_chunks,
            header_size: header,
            max_payload_per_packet,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkEstimate {
    pub atom_units: usize,
    pub action_blocks: usize,
    pub estimated_compiled_size: usize,
    pub estimated_chunks: usize,
    pub header_size: usize,
    pub max_payload_per_packet: usize,
}

fn extract_raw_data_hex(content: &str) -> Option<String> {
    let start = content.find("raw_data")?;
    let rest = &content[start..];
    let open_quote = rest.find('"')?;
    let close_quote = rest[open_quote + 1..].find('"')? + open_quote + 1;
    let hex = &rest[open_quote + 1..close_quote];
    hex.chars().all(|c| c.is_ascii_hexdigit()).then(|| hex.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fdo_domain::parse_packet_header;

    struct EchoCompiler;

    #[async_trait]
    impl AtomCompiler for EchoCompiler {
        async fn compile(&self, source: &str) -> Result<Vec<u8>, CoreError> {
            Ok(source.as_bytes().to_vec())
        }
    }

    fn service() -> ChunkerService {
        ChunkerService::new(Arc::new(EchoCompiler))
    }

    #[tokio::test]
    async fn small_script_produces_one_packet() {
        let result = service().process_fdo_script("idb_append_data <01x, 02x>", 5, &Token::new("AT")).await.unwrap();
        assert_eq!(result.chunks.len(), 1);
        assert!(!result.chunk_info[0].is_continuation);
    }

    #[tokio::test]
    async fn raw_data_atoms_get_independent_prefixed_frames() {
        let hex = "AB".repeat(112);
        let script = format!(r#"raw_data <"{hex}">"#);
        let result = service().process_fdo_script(&script, 1, &Token::new("AT")).await.unwrap();
        assert_eq!(result.chunks.len(), 1);
        let parsed = parse_packet_header(&result.chunks[0]).unwrap();
        assert_eq!(&parsed.data[..3], &RAW_DATA_PREFIX);
        assert!(!result.chunk_info[0].is_continuation);
    }

    #[tokio::test]
    async fn large_raw_data_splits_into_multiple_frames() {
        let hex = "AB".repeat(200);
        let script = format!(r#"raw_data <"{hex}">"#);
        let result = service().process_fdo_script(&script, 1, &Token::new("AT")).await.unwrap();
        assert_eq!(result.chunks.len(), 2);
        assert!(result.chunk_info.iter().all(|c| !c.is_continuation));
    }

    #[test]
    fn estimate_reports_unit_and_action_block_counts() {
        let script = "idb_append_data <01x>\nact_do_action <self-contained>";
        let estimate = service().estimate_chunks(script, &Token::new("AT"));
        assert_eq!(estimate.atom_units, 2);
        assert_eq!(estimate.action_blocks, 0);
    }
}
