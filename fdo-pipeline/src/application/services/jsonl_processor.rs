// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # JSONL Stream Processor (C6)
//!
//! Two-pass streaming extractor over a newline-delimited JSON capture of P3
//! frames: pass one samples up to 100 leading frames to decide whether the
//! file is chronologically `oldest_first` or `newest_first`; pass two walks
//! every line, runs each candidate frame through [`detect_fdo_in_frame`], and
//! accumulates [`FdoFrameRecord`]s in chronological order. Malformed lines are
//! tolerated; only resource exhaustion terminates the pass early.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use fdo_domain::{CoreError, FdoFrameRecord, StreamId, Token};

use crate::infrastructure::p3::detect_fdo_in_frame;

const ORDER_SAMPLE_SIZE: usize = 100;
const MAX_FRAMES: u64 = 10_000_000;
const MAX_PROCESSING_TIME: Duration = Duration::from_secs(1800);
const MAX_MEMORY_MIB: u64 = 4096;
const MEMORY_CHECK_INTERVAL: u64 = 1000;
const PROGRESS_LOG_INTERVAL: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChronologicalOrder {
    OldestFirst,
    NewestFirst,
}

pub struct JsonlProcessResult {
    pub frames: Vec<FdoFrameRecord>,
    pub frames_processed: u64,
    pub fdo_frames_found: u64,
    pub supported_tokens: HashSet<String>,
    pub chronological_order: ChronologicalOrder,
    pub terminated_early: Option<String>,
}

#[derive(Deserialize)]
struct RawLine {
    #[serde(rename = "fullHex")]
    full_hex: Option<String>,
    #[serde(default)]
    ts: Option<Value>,
}

struct ParsedFrame {
    timestamp: f64,
    full_hex: String,
}

fn parse_timestamp(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_line(line: &str) -> Option<ParsedFrame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let raw: RawLine = serde_json::from_str(line).ok()?;
    let full_hex = raw.full_hex.filter(|h| !h.is_empty())?;
    let timestamp = raw.ts.as_ref().map(parse_timestamp).unwrap_or(0.0);
    Some(ParsedFrame { timestamp, full_hex: full_hex.to_ascii_uppercase() })
}

/// Samples up to [`ORDER_SAMPLE_SIZE`] leading frames and counts monotone-
/// increasing vs monotone-decreasing transitions between adjacent sampled
/// timestamps; ties (including a tied transition count) resolve to
/// `oldest_first`.
fn determine_order_from_samples<'a>(lines: impl Iterator<Item = &'a str>) -> (ChronologicalOrder, usize) {
    let mut timestamps = Vec::with_capacity(ORDER_SAMPLE_SIZE);
    for line in lines {
        if timestamps.len() >= ORDER_SAMPLE_SIZE {
            break;
        }
        if let Some(frame) = parse_line(line) {
            timestamps.push(frame.timestamp);
        }
    }
    let sample_count = timestamps.len();
    if timestamps.len() < 2 {
        return (ChronologicalOrder::OldestFirst, sample_count);
    }

    let mut increasing_count = 0;
    let mut decreasing_count = 0;
    for pair in timestamps.windows(2) {
        if pair[1] > pair[0] {
            increasing_count += 1;
        } else if pair[1] < pair[0] {
            decreasing_count += 1;
        }
    }

    let order =
        if decreasing_count > increasing_count { ChronologicalOrder::NewestFirst } else { ChronologicalOrder::OldestFirst };
    (order, sample_count)
}

fn extract_record(frame: &ParsedFrame) -> Option<FdoFrameRecord> {
    if frame.full_hex.len() % 2 != 0 {
        warn!("odd-length hex string in JSONL frame at ts {}", frame.timestamp);
        return None;
    }
    let bytes = hex::decode(&frame.full_hex).ok()?;
    let detection = detect_fdo_in_frame(&bytes).ok()??;
    let token = Token::new(detection.token);
    let width = token.stream_id_width();
    let stream_id = StreamId::new(detection.stream_id, width).ok()?;
    Some(FdoFrameRecord::new(token, stream_id, detection.fdo_data, frame.full_hex.clone()))
}

struct ResidentMemorySampler {
    system: sysinfo::System,
    pid: sysinfo::Pid,
}

impl ResidentMemorySampler {
    fn new() -> Self {
        let pid = sysinfo::Pid::from_u32(std::process::id());
        let mut system = sysinfo::System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
        Self { system, pid }
    }

    fn resident_mib(&mut self) -> u64 {
        self.system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[self.pid]), true);
        self.system.process(self.pid).map(|p| p.memory() / 1024 / 1024).unwrap_or(0)
    }
}

/// Streams `content` line by line, detecting chronological order from a
/// leading sample and extracting every FDO-carrying frame in that order.
pub fn process_jsonl(content: &str) -> Result<JsonlProcessResult, CoreError> {
    let (order, sample_count) = determine_order_from_samples(content.lines());
    info!("detected chronological order {:?} from {} sampled frames", order, sample_count);

    let start = Instant::now();
    let mut sampler = ResidentMemorySampler::new();

    let mut frames_processed: u64 = 0;
    let mut fdo_frames_found: u64 = 0;
    let mut supported_tokens = HashSet::new();
    let mut records = Vec::new();
    let mut terminated_early = None;

    for line in content.lines() {
        frames_processed += 1;

        if frames_processed % PROGRESS_LOG_INTERVAL == 0 {
            info!("processed {frames_processed} frames ({:.1}s elapsed)", start.elapsed().as_secs_f64());
        }

        if frames_processed >= MAX_FRAMES {
            terminated_early = Some(format!("frame limit exceeded ({MAX_FRAMES} frames)"));
            break;
        }
        if start.elapsed() >= MAX_PROCESSING_TIME {
            terminated_early = Some(format!("processing time limit exceeded ({} seconds)", MAX_PROCESSING_TIME.as_secs()));
            break;
        }
        if frames_processed % MEMORY_CHECK_INTERVAL == 0 {
            let resident = sampler.resident_mib();
            if resident > MAX_MEMORY_MIB {
                terminated_early = Some(format!("memory limit exceeded ({resident} MiB > {MAX_MEMORY_MIB} MiB)"));
                break;
            }
        }

        let Some(frame) = parse_line(line) else { continue };
        match extract_record(&frame) {
            Some(record) => {
                supported_tokens.insert(record.token.as_str().to_string());
                fdo_frames_found += 1;
                debug!("extracted FDO frame: token={} stream_id={}", record.token, record.stream_id.value());
                records.push(record);
            }
            None => continue,
        }
    }

    if matches!(order, ChronologicalOrder::NewestFirst) {
        records.reverse();
    }

    if let Some(reason) = &terminated_early {
        warn!("JSONL processing terminated early: {reason}");
    }
    info!(
        "JSONL processing complete: {fdo_frames_found} FDO frames from {frames_processed} total frames, tokens: {:?}",
        supported_tokens
    );

    Ok(JsonlProcessResult {
        frames: records,
        frames_processed,
        fdo_frames_found,
        supported_tokens,
        chronological_order: order,
        terminated_early,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_jsonl() -> String {
        let packet = fdo_domain::build_packet(b"hello", 3, &Token::new("AT")).unwrap();
        let length = (packet.len() + 3) as u16;
        let mut frame = vec![0x5A, 0x00, 0x00];
        frame.extend_from_slice(&length.to_be_bytes());
        frame.push(1);
        frame.push(1);
        frame.push(0x20);
        frame.extend_from_slice(&packet);
        frame.push(0x0D);
        let hex = hex::encode_upper(&frame);
        format!(
            "{{\"ts\": 1.0, \"fullHex\": \"{hex}\"}}\n{{\"ts\": 2.0, \"fullHex\": \"{hex}\"}}\nnot json\n{{\"ts\": 3.0}}\n"
        )
    }

    #[test]
    fn extracts_fdo_frames_in_oldest_first_order() {
        let result = process_jsonl(&sample_jsonl()).unwrap();
        assert_eq!(result.chronological_order, ChronologicalOrder::OldestFirst);
        assert_eq!(result.frames_processed, 4);
        assert_eq!(result.fdo_frames_found, 2);
        assert!(result.supported_tokens.contains("AT"));
        assert!(result.terminated_early.is_none());
    }

    #[test]
    fn reverses_records_for_newest_first_files() {
        let a = {
            let packet = fdo_domain::build_packet(b"a", 1, &Token::new("AT")).unwrap();
            let length = (packet.len() + 3) as u16;
            let mut frame = vec![0x5A, 0x00, 0x00];
            frame.extend_from_slice(&length.to_be_bytes());
            frame.push(1);
            frame.push(1);
            frame.push(0x20);
            frame.extend_from_slice(&packet);
            frame.push(0x0D);
            hex::encode_upper(&frame)
        };
        let content = format!(
            "{{\"ts\": 5.0, \"fullHex\": \"{a}\"}}\n{{\"ts\": 4.0, \"fullHex\": \"{a}\"}}\n{{\"ts\": 3.0, \"fullHex\": \"{a}\"}}\n"
        );
        let result = process_jsonl(&content).unwrap();
        assert_eq!(result.chronological_order, ChronologicalOrder::NewestFirst);
        assert_eq!(result.fdo_frames_found, 3);
    }

    #[test]
    fn single_frame_defaults_to_oldest_first() {
        let content = "{\"ts\": 1.0, \"fullHex\": \"00\"}\n";
        let result = process_jsonl(content).unwrap();
        assert_eq!(result.chronological_order, ChronologicalOrder::OldestFirst);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let content = "garbage\n{\"fullHex\": \"\"}\n{\"fullHex\": \"0\"}\n{}\n";
        let result = process_jsonl(content).unwrap();
        assert_eq!(result.fdo_frames_found, 0);
        assert!(result.terminated_early.is_none());
    }
}
