// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Forensic Decompiler Driver (C10)
//!
//! Drives [`Decompiler`] over the per-frame list C6 extracted, reassembling a
//! single annotated source text: a header comment per successfully
//! decompiled frame, a compact `FAILED` comment (with the offending hex) for
//! worker-reported rejections, and a `DAEMON_CRASH` comment plus an on-disk
//! forensics dump for true process crashes. Because this driver always talks
//! to a [`crate::infrastructure::worker::WorkerPool`]-backed [`Decompiler`],
//! recovery from a process crash is the pool's own health monitor restarting
//! the instance in the background; the driver itself never blocks a batch on
//! a manual restart.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use fdo_domain::{CoreError, Decompiler, FdoFrameRecord};

use crate::infrastructure::metrics::MetricsService;

pub struct DecompileSummary {
    pub source: String,
    pub frames_decompiled_successfully: u64,
    pub frames_failed_decompilation: u64,
    pub process_crashes: u64,
    pub frames_skipped_after_crash: u64,
}

impl DecompileSummary {
    pub fn failure_rate(&self, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.frames_failed_decompilation as f64 / total as f64 * 100.0
        }
    }
}

pub struct ForensicDriver {
    decompiler: Arc<dyn Decompiler>,
    metrics: Arc<MetricsService>,
    forensics_dir: PathBuf,
}

impl ForensicDriver {
    pub fn new(decompiler: Arc<dyn Decompiler>, metrics: Arc<MetricsService>, forensics_dir: PathBuf) -> Self {
        Self { decompiler, metrics, forensics_dir }
    }

    pub async fn process(&self, frames: &[FdoFrameRecord]) -> DecompileSummary {
        let mut source = String::new();
        let mut successful = 0u64;
        let mut failed = 0u64;
        let mut process_crashes = 0u64;

        for (index, frame) in frames.iter().enumerate() {
            match self.decompiler.decompile(&frame.data).await {
                Ok(decompiled) => {
                    successful += 1;
                    self.metrics.record_frame_decompiled();
                    source.push_str(&format!(
                        "// Frame {index}: Successfully decompiled (Token: {}, Stream ID: {}, Size: {} bytes)\n",
                        frame.token,
                        frame.stream_id.value(),
                        frame.data.len()
                    ));
                    source.push_str(&decompiled);
                    source.push_str("\n\n");
                }
                Err(e) if e.is_worker_crash() => {
                    process_crashes += 1;
                    failed += 1;
                    self.metrics.record_killer_frame();
                    self.metrics.record_frame_failed();
                    warn!("worker process crash on frame {index}: {e}");
                    self.save_crash_forensics(index, frame, &e).await;
                    source.push_str(&format!(
                        "// DAEMON_CRASH [{index}] {} stream:{} {}b : {}\n\n",
                        frame.token,
                        frame.stream_id.value(),
                        frame.data.len(),
                        frame.original_frame_hex
                    ));
                }
                Err(e) => {
                    failed += 1;
                    self.metrics.record_frame_failed();
                    source.push_str(&format!(
                        "// FAILED [{index}] {} stream:{} {}b : {}\n\n",
                        frame.token,
                        frame.stream_id.value(),
                        frame.data.len(),
                        frame.original_frame_hex
                    ));
                }
            }
        }

        info!(
            "decompilation complete: {successful}/{} successful, {process_crashes} process crashes, {failed} total failures",
            frames.len()
        );

        DecompileSummary {
            source: source.trim().to_string(),
            frames_decompiled_successfully: successful,
            frames_failed_decompilation: failed,
            process_crashes,
            frames_skipped_after_crash: 0,
        }
    }

    async fn save_crash_forensics(&self, index: usize, frame: &FdoFrameRecord, error: &CoreError) {
        if let Err(e) = tokio::fs::create_dir_all(&self.forensics_dir).await {
            warn!("failed to create forensics directory: {e}");
            return;
        }

        let data_path = self.forensics_dir.join(format!("crash_frame_{index}.bin"));
        if let Err(e) = tokio::fs::write(&data_path, &frame.data).await {
            warn!("failed to save crash frame forensics: {e}");
            return;
        }

        let metadata = format!(
            "Crash Frame {index}\n{}\nToken: {}\nStream ID: {}\nData Size: {} bytes\nError: {error}\nOriginal frame hex: {}\n",
            "=".repeat(50),
            frame.token,
            frame.stream_id.value(),
            frame.data.len(),
            frame.original_frame_hex
        );
        let metadata_path = self.forensics_dir.join(format!("crash_frame_{index}_metadata.txt"));
        if let Err(e) = tokio::fs::write(&metadata_path, metadata).await {
            warn!("failed to save crash frame metadata: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fdo_domain::{StreamId, Token};

    struct FlakyDecompiler;

    #[async_trait]
    impl Decompiler for FlakyDecompiler {
        async fn decompile(&self, data: &[u8]) -> Result<String, CoreError> {
            match data {
                b"ok" => Ok("source text".to_string()),
                b"reject" => Err(CoreError::worker_reported("Ada32 error rc=12: bad atom")),
                _ => Err(CoreError::transport("connection reset by peer")),
            }
        }
    }

    fn frame(data: &[u8]) -> FdoFrameRecord {
        FdoFrameRecord::new(Token::new("AT"), StreamId::new(1, 2).unwrap(), data.to_vec(), hex::encode_upper(data))
    }

    #[tokio::test]
    async fn classifies_success_rejection_and_crash_separately() {
        let dir = std::env::temp_dir().join(format!("fdo_forensic_driver_test_{}", std::process::id()));
        let metrics = Arc::new(MetricsService::new().unwrap());
        let driver = ForensicDriver::new(Arc::new(FlakyDecompiler), metrics, dir.clone());

        let frames = vec![frame(b"ok"), frame(b"reject"), frame(b"crash")];
        let summary = driver.process(&frames).await;

        assert_eq!(summary.frames_decompiled_successfully, 1);
        assert_eq!(summary.frames_failed_decompilation, 2);
        assert_eq!(summary.process_crashes, 1);
        assert!(summary.source.contains("Successfully decompiled"));
        assert!(summary.source.contains("// FAILED [1]"));
        assert!(summary.source.contains("// DAEMON_CRASH [2]"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
